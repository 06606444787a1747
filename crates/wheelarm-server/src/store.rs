//! 关节状态存储与会话状态
//!
//! [`JointStateStore`] 持有全部 21 个关节的位置/速度/扭矩/使能数组，
//! 进程级单例，连接断开不清空，只有显式的 RESET_ZERO 会归零。
//! 命令解释器是唯一写者，遥测广播器是唯一读者，二者共用一把粗粒度锁：
//! 状态很小、竞争极低，一把锁保证快照绝不观察到撕裂的更新。
//!
//! [`RobotSessionState`] 是每个连接一份的会话状态（急停、电池、错误信息），
//! 连接建立时创建，断开时销毁。

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};
use wheelarm_protocol::{JOINT_COUNT, joint_limit};

/// 关节快照
///
/// 在单一锁下一次性拍摄，各数组间相互一致。
#[derive(Debug, Clone, PartialEq)]
pub struct JointSnapshot {
    /// 位置（`snapshot()` 返回叠加噪声后的反馈值，`commanded()` 返回指令值）
    pub positions: [f64; JOINT_COUNT],
    pub velocities: [f64; JOINT_COUNT],
    pub torques: [f64; JOINT_COUNT],
    pub enabled: [bool; JOINT_COUNT],
}

/// 锁保护的关节数组（21 个关节作为一个整体加锁）
#[derive(Debug)]
struct JointArrays {
    positions: [f64; JOINT_COUNT],
    velocities: [f64; JOINT_COUNT],
    torques: [f64; JOINT_COUNT],
    enabled: [bool; JOINT_COUNT],
}

impl JointArrays {
    fn new() -> Self {
        Self {
            positions: [0.0; JOINT_COUNT],
            velocities: [0.0; JOINT_COUNT],
            torques: [0.0; JOINT_COUNT],
            enabled: [true; JOINT_COUNT],
        }
    }
}

/// 关节状态存储
///
/// 所有写入方法对越界索引静默无效果（协议层宽容策略的延续）；
/// 位置写入按静态限位 clamp，永不拒绝。
pub struct JointStateStore {
    inner: Mutex<JointArrays>,
}

impl JointStateStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(JointArrays::new()),
        }
    }

    /// 进程级共享存储
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// 校验协议层传来的原始关节索引
    fn index(joint: i64) -> Option<usize> {
        usize::try_from(joint).ok().filter(|&i| i < JOINT_COUNT)
    }

    /// 写入位置命令（按限位 clamp，命令总是成功）
    pub fn apply_position(&self, joint: i64, value: f64) {
        let Some(i) = Self::index(joint) else {
            trace!(joint, "position command ignored: index out of range");
            return;
        };
        let Some((min, max)) = joint_limit(i) else {
            return;
        };
        let clamped = value.clamp(min, max);
        self.inner.lock().positions[i] = clamped;
        debug!(joint = i, value = clamped, "joint position set");
    }

    /// 写入速度命令（不做限位）
    pub fn apply_velocity(&self, joint: i64, value: f64) {
        let Some(i) = Self::index(joint) else {
            trace!(joint, "velocity command ignored: index out of range");
            return;
        };
        self.inner.lock().velocities[i] = value;
        debug!(joint = i, value, "joint velocity set");
    }

    /// 写入扭矩命令（不做限位）
    pub fn apply_torque(&self, joint: i64, value: f64) {
        let Some(i) = Self::index(joint) else {
            trace!(joint, "torque command ignored: index out of range");
            return;
        };
        self.inner.lock().torques[i] = value;
        debug!(joint = i, value, "joint torque set");
    }

    /// 设置单个关节的使能标志
    pub fn set_enabled(&self, joint: i64, enabled: bool) {
        let Some(i) = Self::index(joint) else {
            trace!(joint, enabled, "enable command ignored: index out of range");
            return;
        };
        self.inner.lock().enabled[i] = enabled;
        debug!(joint = i, enabled, "joint enable flag set");
    }

    /// 使能全部关节
    pub fn enable_all(&self) {
        self.inner.lock().enabled = [true; JOINT_COUNT];
    }

    /// 失能全部关节
    pub fn disable_all(&self) {
        self.inner.lock().enabled = [false; JOINT_COUNT];
    }

    /// 急停动作：清零全部速度（位置不变）
    pub fn halt(&self) {
        self.inner.lock().velocities = [0.0; JOINT_COUNT];
    }

    /// 复位：全部位置和速度归零，使能标志不变
    pub fn reset_to_zero(&self) {
        let mut arrays = self.inner.lock();
        arrays.positions = [0.0; JOINT_COUNT];
        arrays.velocities = [0.0; JOINT_COUNT];
    }

    /// 指令值快照（无噪声，用于状态报告和测试断言）
    pub fn commanded(&self) -> JointSnapshot {
        let arrays = self.inner.lock();
        JointSnapshot {
            positions: arrays.positions,
            velocities: arrays.velocities,
            torques: arrays.torques,
            enabled: arrays.enabled,
        }
    }

    /// 遥测快照
    ///
    /// 使能且非急停的关节在位置上叠加反馈噪声（模拟真实反馈）；
    /// 失能关节和急停状态下上报精确的指令位置。
    pub fn snapshot(&self, emergency_stop: bool, now_secs: f64) -> JointSnapshot {
        let arrays = self.inner.lock();
        let mut positions = arrays.positions;
        if !emergency_stop {
            for (i, pos) in positions.iter_mut().enumerate() {
                if arrays.enabled[i] {
                    *pos += feedback_noise(now_secs, i);
                }
            }
        }
        JointSnapshot {
            positions,
            velocities: arrays.velocities,
            torques: arrays.torques,
            enabled: arrays.enabled,
        }
    }
}

impl Default for JointStateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// 反馈噪声：时间与关节索引的确定性函数，有界（幅度 0.1）且随时间连续变化
fn feedback_noise(now_secs: f64, joint: usize) -> f64 {
    (now_secs * 2.0 + joint as f64).sin() * 0.1
}

/// 会话状态字段
#[derive(Debug)]
struct SessionFields {
    emergency_stop: bool,
    last_error: String,
    battery_level: f64,
    connected: bool,
}

/// 每连接一份的机器人会话状态
///
/// 由会话读取线程（写者）和遥测广播线程（读者）共享。
pub struct RobotSessionState {
    inner: Mutex<SessionFields>,
}

impl RobotSessionState {
    pub fn new(initial_battery: f64) -> Self {
        Self {
            inner: Mutex::new(SessionFields {
                emergency_stop: false,
                last_error: String::new(),
                battery_level: initial_battery,
                connected: false,
            }),
        }
    }

    pub fn emergency_stop(&self) -> bool {
        self.inner.lock().emergency_stop
    }

    pub fn set_emergency_stop(&self, engaged: bool) {
        self.inner.lock().emergency_stop = engaged;
    }

    pub fn last_error(&self) -> String {
        self.inner.lock().last_error.clone()
    }

    pub fn set_last_error(&self, message: impl Into<String>) {
        self.inner.lock().last_error = message.into();
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    pub fn set_connected(&self, connected: bool) {
        self.inner.lock().connected = connected;
    }

    /// 电池电量漂移：每个广播 tick 调用一次
    ///
    /// 缓慢有界振荡，始终保持在 [20, 100]。返回按 1 位小数舍入后的上报值
    /// （内部保留未舍入值继续漂移）。
    pub fn battery_tick(&self, now_secs: f64) -> f64 {
        let mut fields = self.inner.lock();
        let drifted = fields.battery_level + (now_secs * 0.1).sin() * 0.1;
        fields.battery_level = drifted.clamp(20.0, 100.0);
        (fields.battery_level * 10.0).round() / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_clamping_law() {
        // 对所有关节、所有极端指令值，存储后的位置都落在静态限位内
        let store = JointStateStore::new();
        for joint in 0..JOINT_COUNT {
            for value in [-1e9, -500.0, -180.0, -1.0, 0.0, 7.5, 180.0, 650.0, 1e9] {
                store.apply_position(joint as i64, value);
                let (min, max) = joint_limit(joint).unwrap();
                let stored = store.commanded().positions[joint];
                assert!(
                    stored >= min && stored <= max,
                    "joint {} value {} stored {}",
                    joint,
                    value,
                    stored
                );
            }
        }
    }

    #[test]
    fn test_clamp_examples() {
        let store = JointStateStore::new();
        // 手臂关节：200 -> 180
        store.apply_position(7, 200.0);
        assert_eq!(store.commanded().positions[7], 180.0);
        // 升降：负值 clamp 到下限 0
        store.apply_position(20, -10.0);
        assert_eq!(store.commanded().positions[20], 0.0);
        // 腰部：-120 -> -90
        store.apply_position(16, -120.0);
        assert_eq!(store.commanded().positions[16], -90.0);
    }

    #[test]
    fn test_out_of_range_index_is_silent_noop() {
        let store = JointStateStore::new();
        let before = store.commanded();
        store.apply_position(99, 10.0);
        store.apply_position(-1, 10.0);
        store.apply_velocity(21, 1.0);
        store.apply_torque(i64::MIN, 1.0);
        store.set_enabled(21, false);
        assert_eq!(store.commanded(), before);
    }

    #[test]
    fn test_velocity_and_torque_not_clamped() {
        let store = JointStateStore::new();
        store.apply_velocity(0, 9999.0);
        store.apply_torque(0, -9999.0);
        let snap = store.commanded();
        assert_eq!(snap.velocities[0], 9999.0);
        assert_eq!(snap.torques[0], -9999.0);
    }

    #[test]
    fn test_halt_zeroes_velocities_only() {
        let store = JointStateStore::new();
        store.apply_position(3, 45.0);
        store.apply_velocity(3, 12.0);
        store.halt();
        let snap = store.commanded();
        assert_eq!(snap.velocities, [0.0; JOINT_COUNT]);
        assert_eq!(snap.positions[3], 45.0);
    }

    #[test]
    fn test_reset_to_zero_keeps_enable_flags() {
        let store = JointStateStore::new();
        store.apply_position(5, 90.0);
        store.apply_velocity(5, 1.0);
        store.set_enabled(5, false);
        store.reset_to_zero();
        let snap = store.commanded();
        assert_eq!(snap.positions, [0.0; JOINT_COUNT]);
        assert_eq!(snap.velocities, [0.0; JOINT_COUNT]);
        assert!(!snap.enabled[5]);
    }

    #[test]
    fn test_snapshot_noise_for_enabled_joints() {
        let store = JointStateStore::new();
        store.apply_position(2, 30.0);
        // 选一个噪声非零的时刻（sin(t*2 + 2) != 0）
        let now = 1.0;
        let snap = store.snapshot(false, now);
        assert_ne!(snap.positions[2], 30.0);
        assert!((snap.positions[2] - 30.0).abs() <= 0.1 + 1e-12);
    }

    #[test]
    fn test_snapshot_noise_suppressed_for_disabled_joint() {
        let store = JointStateStore::new();
        store.apply_position(5, 10.0);
        store.apply_position(6, 10.0);
        store.set_enabled(5, false);

        // 噪声对每个关节在绝大多数时刻非零；关节 5 被失能后上报精确指令值
        let now = 0.7;
        let snap = store.snapshot(false, now);
        assert_eq!(snap.positions[5], 10.0);
        assert_ne!(snap.positions[6], 10.0);
    }

    #[test]
    fn test_snapshot_exact_under_emergency_stop() {
        let store = JointStateStore::new();
        store.apply_position(0, 15.0);
        let snap = store.snapshot(true, 0.7);
        assert_eq!(snap.positions[0], 15.0);
    }

    #[test]
    fn test_enable_all_disable_all() {
        let store = JointStateStore::new();
        store.disable_all();
        assert_eq!(store.commanded().enabled, [false; JOINT_COUNT]);
        store.enable_all();
        assert_eq!(store.commanded().enabled, [true; JOINT_COUNT]);
    }

    #[test]
    fn test_battery_stays_in_range() {
        let session = RobotSessionState::new(20.1);
        for step in 0..5000 {
            let reported = session.battery_tick(step as f64 * 0.1);
            assert!(
                (20.0..=100.0).contains(&reported),
                "battery {} out of range",
                reported
            );
        }
    }

    #[test]
    fn test_battery_reported_with_one_decimal() {
        let session = RobotSessionState::new(85.0);
        let reported = session.battery_tick(0.3);
        assert_eq!(reported, (reported * 10.0).round() / 10.0);
    }

    #[test]
    fn test_session_state_defaults() {
        let session = RobotSessionState::new(85.0);
        assert!(!session.emergency_stop());
        assert!(!session.is_connected());
        assert_eq!(session.last_error(), "");
    }
}
