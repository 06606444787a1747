//! 会话处理（读取-解释循环）
//!
//! 每个被接受的连接对应一个会话，状态机为
//! `Idle -> Accepted -> Closed`，`Closed` 对单个连接是终态；
//! 监听器随后立即回到接受新连接的状态。
//!
//! 在 `Accepted` 内：入站字节追加到行缓冲区，每个完整的换行分隔段
//! 去除首尾空白后按到达顺序交给命令解释器；不完整的尾部数据保留到
//! 下一次读取。读到 0 字节（对端 EOF）或读错误进入 `Closed`。

use crate::interpreter::CommandInterpreter;
use std::io::Read;
use tracing::{debug, trace, warn};

/// 会话状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// 尚未接受连接
    Idle,
    /// 连接已建立，正在读取命令
    Accepted,
    /// 连接已关闭（终态）
    Closed,
}

/// 会话处理器
///
/// 持有一个连接的读取侧，把字节流重组为命令行。
pub struct SessionHandler {
    interpreter: CommandInterpreter,
    phase: SessionPhase,
}

impl SessionHandler {
    pub fn new(interpreter: CommandInterpreter) -> Self {
        Self {
            interpreter,
            phase: SessionPhase::Idle,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// 读取-解释循环，阻塞直到对端 EOF、读错误或连接被另一侧关闭
    ///
    /// 返回时会话处于 [`SessionPhase::Closed`]。
    pub fn run<R: Read>(&mut self, mut reader: R) {
        self.phase = SessionPhase::Accepted;
        trace!("session accepted, reading commands");

        let mut chunk = [0u8; 1024];
        // 行缓冲按字节保存，避免在块边界截断多字节字符
        let mut pending: Vec<u8> = Vec::new();

        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => {
                    debug!("peer closed connection (EOF)");
                    break;
                },
                Ok(n) => n,
                Err(e) => {
                    warn!("session read error: {}", e);
                    break;
                },
            };

            pending.extend_from_slice(&chunk[..n]);
            self.drain_lines(&mut pending);
        }

        self.phase = SessionPhase::Closed;
        trace!("session closed");
    }

    /// 把缓冲区里所有完整的行交给解释器，保留不完整的尾部
    fn drain_lines(&self, pending: &mut Vec<u8>) {
        while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
            let rest = pending.split_off(pos + 1);
            let line_bytes = std::mem::replace(pending, rest);
            let line = String::from_utf8_lossy(&line_bytes[..pos]);
            let line = line.trim();
            if !line.is_empty() {
                self.interpreter.interpret(line);
            }
        }
    }
}
