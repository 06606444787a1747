//! 轮臂机器人模拟器协议层
//!
//! 本模块提供模拟器与上位机之间的线缆级协议定义，包括：
//! - 关节限位表与关节分组（21 自由度）
//! - 命令解析（JSON 结构化形式 + 文本令牌形式，二选一落空则忽略）
//! - 遥测帧结构体及其 JSON 序列化
//!
//! # 协议概述
//!
//! 传输层为纯 TCP，UTF-8 文本，按换行符分帧，无握手、无长度前缀。
//! 上位机到模拟器：每行一条命令；模拟器到上位机：每行一个遥测 JSON 对象。
//! 协议没有应答通道，无法识别的输入一律静默忽略（仅记录日志）。

pub mod command;
pub mod limits;
pub mod telemetry;

pub use command::{Axis, AxisCommand, Command, TokenCommand, parse_line};
pub use limits::{DEFAULT_PORT, JOINT_COUNT, JOINT_NAMES, JointGroup, joint_limit};
pub use telemetry::TelemetryFrame;
