//! 单槽 TCP 监听器
//!
//! 一次只服务一个活动连接：读取循环就地运行在接受线程上，
//! 期间不调用 `accept()`，第二个连接请求会停留在内核 backlog 中等待
//! 槽位空出（选择"阻塞等待"而非"主动拒绝"，不会悄悄丢弃现有会话的状态）。
//!
//! 每个连接配一对协作线程：本线程的会话读取循环 + 独立的遥测广播线程，
//! 通过停机通道和套接字 shutdown 联动，任何一侧退出都会在一个广播周期内
//! 带动另一侧，连接资源恰好释放一次。

use crate::broadcaster::TelemetryBroadcaster;
use crate::config::SimulatorConfig;
use crate::error::ServerError;
use crate::interpreter::CommandInterpreter;
use crate::session::SessionHandler;
use crate::store::{JointStateStore, RobotSessionState};
use crossbeam_channel::{Sender, bounded};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// 单槽 TCP 监听器
pub struct Listener {
    listener: TcpListener,
    config: SimulatorConfig,
    store: Arc<JointStateStore>,
}

/// 会话拆除保卫
///
/// 无论读取循环正常返回、提前返回还是 panic 展开，Drop 都会：
/// 1. 落下停机发送端（广播器在一个周期内退出）
/// 2. 关闭套接字两个方向（解除任何仍在阻塞的 IO）
struct SessionGuard<'a> {
    stream: &'a TcpStream,
    _shutdown_tx: Sender<()>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        // 连接可能已被对端或广播线程关闭，重复 shutdown 的错误可忽略
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl Listener {
    /// 绑定监听地址
    ///
    /// 绑定失败是唯一的致命错误路径：调用方应报告原因并退出进程。
    pub fn bind(config: &SimulatorConfig, store: Arc<JointStateStore>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| ServerError::Bind {
            addr: config.listen_addr.clone(),
            source: e,
        })?;
        Ok(Self {
            listener,
            config: config.clone(),
            store,
        })
    }

    /// 实际绑定到的地址（测试用 `127.0.0.1:0` 时由此取回真实端口）
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// 接受循环（不返回）
    ///
    /// 会话内的一切错误都就地解决为会话拆除，随后回到接受状态；
    /// `accept()` 本身的瞬时错误记录后继续。
    pub fn run(&self) {
        match self.local_addr() {
            Ok(addr) => info!(%addr, "simulator listening, waiting for controller"),
            Err(_) => info!("simulator listening, waiting for controller"),
        }

        loop {
            let (stream, peer) = match self.listener.accept() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept failed: {}", e);
                    continue;
                },
            };

            info!(%peer, "controller connected");
            self.serve_connection(stream);
            info!(%peer, "controller disconnected, slot free");
        }
    }

    /// 服务一个连接直到它关闭
    fn serve_connection(&self, stream: TcpStream) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("failed to set TCP_NODELAY: {}", e);
        }
        // 写超时保证停止读取的对端无法永久卡住广播循环
        if let Err(e) = stream.set_write_timeout(self.config.write_timeout()) {
            warn!("failed to set write timeout: {}", e);
        }

        let writer = match stream.try_clone() {
            Ok(writer) => writer,
            Err(e) => {
                warn!("failed to clone connection for broadcaster: {}", e);
                return;
            },
        };

        // 会话状态随连接创建，随连接销毁
        let session = Arc::new(RobotSessionState::new(self.config.initial_battery));
        session.set_connected(true);

        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let broadcaster = TelemetryBroadcaster::new(
            self.store.clone(),
            session.clone(),
            self.config.telemetry_period(),
        );

        let broadcast_handle = match thread::Builder::new()
            .name("telemetry-broadcast".to_string())
            .spawn(move || {
                let mut writer = writer;
                broadcaster.run(&mut writer, shutdown_rx);
                // 广播器先退出（写失败/写超时）时主动关闭套接字，
                // 解除读取循环的阻塞，避免僵死的对端占住唯一的会话槽
                let _ = writer.shutdown(Shutdown::Both);
            }) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("failed to spawn broadcaster thread: {}", e);
                return;
            },
        };

        {
            let _guard = SessionGuard {
                stream: &stream,
                _shutdown_tx: shutdown_tx,
            };
            let interpreter = CommandInterpreter::new(self.store.clone(), session.clone());
            let mut handler = SessionHandler::new(interpreter);
            // 读取循环就地运行（单槽语义的来源）
            handler.run(&stream);
        }

        session.set_connected(false);
        if broadcast_handle.join().is_err() {
            warn!("broadcaster thread panicked");
        }
    }
}
