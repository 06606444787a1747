//! 遥测帧
//!
//! 模拟器每个广播周期向上位机发送一个 JSON 对象，以换行符结尾。
//! 字段集合与原协议逐一对应，上位机按行解析，无请求-应答关联。

use crate::limits::JOINT_COUNT;
use serde::{Deserialize, Serialize};

/// 一帧遥测快照
///
/// `joints` 是叠加了反馈噪声的位置（使能且非急停的关节才有噪声），
/// `timestamp` 是毫秒级 Unix 时间戳。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryFrame {
    pub joints: [f64; JOINT_COUNT],
    pub velocities: [f64; JOINT_COUNT],
    pub torques: [f64; JOINT_COUNT],
    pub enabled: [bool; JOINT_COUNT],
    pub battery: f64,
    pub emergency_stop: bool,
    pub error: String,
    pub timestamp: i64,
}

impl TelemetryFrame {
    /// 序列化为一行线缆格式（JSON + `\n`）
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
