//! 轮臂机器人模拟器服务层
//!
//! 21 自由度轮臂机器人的硬件在环替身：接受单个控制连接，
//! 提供按行分帧的命令协议（设置关节目标、安全命令），
//! 并以固定周期向上位机回送模拟遥测。
//!
//! # 架构
//!
//! ```text
//! Listener ──> SessionHandler ──> CommandInterpreter ──> JointStateStore
//!     │                                                       ▲
//!     └──────> TelemetryBroadcaster ────────── snapshot ──────┘
//! ```
//!
//! 关节存储是进程级单例，连接断开不清空（只有显式 RESET_ZERO 归零）；
//! 会话状态（急停、电池、错误信息）每连接一份。
//!
//! 关节运动模型是装饰性的噪声函数而非物理仿真；协议面向单控制器，
//! 不做多客户端扇出、鉴权和状态持久化。

pub mod broadcaster;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod listener;
pub mod session;
pub mod store;

pub use broadcaster::TelemetryBroadcaster;
pub use config::SimulatorConfig;
pub use error::ServerError;
pub use interpreter::CommandInterpreter;
pub use listener::Listener;
pub use session::{SessionHandler, SessionPhase};
pub use store::{JointSnapshot, JointStateStore, RobotSessionState};
