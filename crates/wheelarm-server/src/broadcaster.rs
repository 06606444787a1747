//! 遥测广播器
//!
//! 与会话读取循环并发运行，固定周期（默认 100ms）从关节存储拍快照，
//! 序列化为一行 JSON 写到连接上。写失败即停止，不重试；
//! 停机信号（发送端被会话侧落下）在一个周期内生效。
//!
//! 周期等待复用停机通道的 `recv_timeout`：要么超时进入下一个广播 tick，
//! 要么收到信号/通道断开立即退出，拆除是确定性的。

use crate::store::{JointStateStore, RobotSessionState};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, trace, warn};
use wheelarm_protocol::TelemetryFrame;

/// 遥测广播器
pub struct TelemetryBroadcaster {
    store: Arc<JointStateStore>,
    session: Arc<RobotSessionState>,
    period: Duration,
}

impl TelemetryBroadcaster {
    pub fn new(
        store: Arc<JointStateStore>,
        session: Arc<RobotSessionState>,
        period: Duration,
    ) -> Self {
        Self {
            store,
            session,
            period,
        }
    }

    /// 广播循环
    ///
    /// 每个周期写一帧遥测；以下任一情况退出：
    /// - 收到停机信号或信号通道断开（会话读取侧已退出）
    /// - 写失败（对端断开或写超时，遥测不重试）
    pub fn run<W: Write>(&self, writer: &mut W, shutdown_rx: Receiver<()>) {
        trace!(period_ms = self.period.as_millis() as u64, "broadcaster started");

        loop {
            match shutdown_rx.recv_timeout(self.period) {
                Err(RecvTimeoutError::Timeout) => {},
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    trace!("broadcaster received shutdown signal");
                    break;
                },
            }

            let (now_secs, timestamp_ms) = unix_now();
            let frame = self.sample(now_secs, timestamp_ms);
            let line = match frame.to_line() {
                Ok(line) => line,
                Err(e) => {
                    // 固定结构的帧序列化失败属于程序缺陷，记录后跳过该 tick
                    error!("telemetry serialization failed: {}", e);
                    self.session.set_last_error(e.to_string());
                    continue;
                },
            };

            if let Err(e) = writer.write_all(line.as_bytes()).and_then(|_| writer.flush()) {
                warn!("telemetry write failed, stopping broadcaster: {}", e);
                break;
            }
        }

        trace!("broadcaster stopped");
    }

    /// 采样一帧遥测
    ///
    /// 快照在存储锁内一次性完成，不会观察到半条命令的效果；
    /// 电池电量每 tick 漂移一次。
    pub fn sample(&self, now_secs: f64, timestamp_ms: i64) -> TelemetryFrame {
        let emergency_stop = self.session.emergency_stop();
        let snapshot = self.store.snapshot(emergency_stop, now_secs);
        let battery = self.session.battery_tick(now_secs);

        TelemetryFrame {
            joints: snapshot.positions,
            velocities: snapshot.velocities,
            torques: snapshot.torques,
            enabled: snapshot.enabled,
            battery,
            emergency_stop,
            error: self.session.last_error(),
            timestamp: timestamp_ms,
        }
    }
}

/// 当前 Unix 时间：（秒，毫秒）
fn unix_now() -> (f64, i64) {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
    (now.as_secs_f64(), now.as_millis() as i64)
}
