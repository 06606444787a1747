//! 命令解释器
//!
//! 把一行输入解析为命令并作用到关节存储和会话状态上。
//!
//! 宽容策略（与原协议保持一致，见 DESIGN.md 的已知限制说明）：
//! 解析失败、未知命令、越界索引一律静默消费，只记日志，
//! 不向对端发送任何应答——协议没有错误应答通道。

use crate::store::{JointStateStore, RobotSessionState};
use std::sync::Arc;
use tracing::{debug, info, warn};
use wheelarm_protocol::command::{Axis, AxisCommand, Command, TokenCommand, parse_line};

/// 命令解释器
///
/// 每连接一个实例，持有共享的关节存储和本会话的状态。
pub struct CommandInterpreter {
    store: Arc<JointStateStore>,
    session: Arc<RobotSessionState>,
}

impl CommandInterpreter {
    pub fn new(store: Arc<JointStateStore>, session: Arc<RobotSessionState>) -> Self {
        Self { store, session }
    }

    /// 解释并应用一行命令
    ///
    /// 命令严格按到达顺序应用；单条命令的全部写入在存储锁内完成，
    /// 遥测快照不会观察到半条命令的效果。
    pub fn interpret(&self, line: &str) {
        debug!(line, "command received");
        match parse_line(line) {
            Command::Structured(cmd) => self.apply_axis(cmd),
            Command::Token(token) => self.apply_token(token),
            Command::Unparsed => {
                debug!(line, "unrecognized command line ignored");
            },
        }
    }

    fn apply_axis(&self, cmd: AxisCommand) {
        match cmd.axis {
            Axis::Position => self.store.apply_position(cmd.joint, cmd.value),
            Axis::Velocity => self.store.apply_velocity(cmd.joint, cmd.value),
            Axis::Torque => self.store.apply_torque(cmd.joint, cmd.value),
        }
    }

    fn apply_token(&self, token: TokenCommand) {
        match token {
            TokenCommand::EmergencyStop => {
                // 急停是锁存的安全状态：清零速度，位置保持，噪声被抑制，
                // 直到 RESET_ZERO 显式清除
                self.session.set_emergency_stop(true);
                self.store.halt();
                warn!("emergency stop engaged, all velocities zeroed");
            },
            TokenCommand::ResetZero => {
                self.session.set_emergency_stop(false);
                self.store.reset_to_zero();
                info!("robot reset to zero position");
            },
            TokenCommand::EnableAll => {
                self.store.enable_all();
                debug!("all joints enabled");
            },
            TokenCommand::DisableAll => {
                self.store.disable_all();
                debug!("all joints disabled");
            },
            TokenCommand::EnableJoint(joint) => {
                self.store.set_enabled(joint, true);
            },
            TokenCommand::DisableJoint(joint) => {
                self.store.set_enabled(joint, false);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wheelarm_protocol::JOINT_COUNT;

    fn setup() -> (Arc<JointStateStore>, Arc<RobotSessionState>, CommandInterpreter) {
        let store = JointStateStore::shared();
        let session = Arc::new(RobotSessionState::new(85.0));
        let interpreter = CommandInterpreter::new(store.clone(), session.clone());
        (store, session, interpreter)
    }

    #[test]
    fn test_structured_position_is_clamped() {
        let (store, _, interpreter) = setup();
        interpreter.interpret(r#"{"command":"position","joint":7,"value":200}"#);
        assert_eq!(store.commanded().positions[7], 180.0);
    }

    #[test]
    fn test_out_of_range_joint_leaves_state_unchanged() {
        let (store, _, interpreter) = setup();
        let before = store.commanded();
        interpreter.interpret(r#"{"command":"position","joint":99,"value":10}"#);
        assert_eq!(store.commanded(), before);
    }

    #[test]
    fn test_emergency_stop_zeroes_velocities_and_latches() {
        let (store, session, interpreter) = setup();
        interpreter.interpret(r#"{"command":"velocity","joint":3,"value":5.0}"#);
        interpreter.interpret(r#"{"command":"position","joint":3,"value":40.0}"#);
        interpreter.interpret("EMERGENCY_STOP");

        assert!(session.emergency_stop());
        let snap = store.commanded();
        assert_eq!(snap.velocities, [0.0; JOINT_COUNT]);
        // 位置不受急停影响
        assert_eq!(snap.positions[3], 40.0);
    }

    #[test]
    fn test_position_command_accepted_during_emergency_stop() {
        // 急停只抑制遥测噪声，不拒绝新的位置命令
        let (store, session, interpreter) = setup();
        interpreter.interpret("EMERGENCY_STOP");
        interpreter.interpret(r#"{"command":"position","joint":4,"value":30.0}"#);
        assert_eq!(store.commanded().positions[4], 30.0);

        // 急停期间遥测上报精确指令值（无噪声）
        let snap = store.snapshot(session.emergency_stop(), 0.7);
        assert_eq!(snap.positions[4], 30.0);
    }

    #[test]
    fn test_reset_zero_clears_emergency_stop_and_state() {
        let (store, session, interpreter) = setup();
        interpreter.interpret(r#"{"command":"position","joint":10,"value":-170.0}"#);
        interpreter.interpret("EMERGENCY_STOP");
        interpreter.interpret("RESET_ZERO");

        assert!(!session.emergency_stop());
        let snap = store.commanded();
        assert_eq!(snap.positions, [0.0; JOINT_COUNT]);
        assert_eq!(snap.velocities, [0.0; JOINT_COUNT]);
    }

    #[test]
    fn test_disable_joint_suppresses_noise_for_that_joint_only() {
        let (store, session, interpreter) = setup();
        interpreter.interpret("DISABLE_JOINT 5");
        interpreter.interpret(r#"{"command":"position","joint":5,"value":25.0}"#);
        interpreter.interpret(r#"{"command":"position","joint":6,"value":25.0}"#);

        // 失能关节仍然接受位置命令
        assert_eq!(store.commanded().positions[5], 25.0);

        let snap = store.snapshot(session.emergency_stop(), 0.7);
        assert_eq!(snap.positions[5], 25.0);
        assert_ne!(snap.positions[6], 25.0);
    }

    #[test]
    fn test_enable_disable_all() {
        let (store, _, interpreter) = setup();
        interpreter.interpret("DISABLE_ALL");
        assert_eq!(store.commanded().enabled, [false; JOINT_COUNT]);
        interpreter.interpret("ENABLE_ALL");
        assert_eq!(store.commanded().enabled, [true; JOINT_COUNT]);
        interpreter.interpret("disable_joint 20");
        assert!(!store.commanded().enabled[20]);
    }

    #[test]
    fn test_garbage_lines_are_consumed_silently() {
        let (store, session, interpreter) = setup();
        let before = store.commanded();
        interpreter.interpret("");
        interpreter.interpret("NO_SUCH_COMMAND 1 2 3");
        interpreter.interpret(r#"{"command":"position","#);
        interpreter.interpret(r#"{"command":"fly","joint":1,"value":2}"#);
        assert_eq!(store.commanded(), before);
        assert!(!session.emergency_stop());
    }
}
