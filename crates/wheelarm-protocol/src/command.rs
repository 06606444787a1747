//! 命令解析
//!
//! 协议在单行文本上承载两种命令形式：
//!
//! 1. **结构化形式**：JSON 对象，字段 `command`（`position`/`velocity`/
//!    `torque`）、`joint`（整数）、`value`（数值）。
//! 2. **令牌形式**：空白分隔的文本，首个令牌不区分大小写
//!    （`EMERGENCY_STOP`、`RESET_ZERO`、`ENABLE_ALL`、`DISABLE_ALL`、
//!    `ENABLE_JOINT <n>`、`DISABLE_JOINT <n>`）。
//!
//! 以 `{` 开头的行先尝试结构化解析，失败后回落到令牌解析——这个顺序是
//! 兼容性约定，不可调换。任何无法识别的输入解析为 [`Command::Unparsed`]，
//! 由调用方静默丢弃（协议没有错误应答通道）。

use serde::Deserialize;

/// 结构化命令作用的物理量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// 关节目标位置（入库前按限位 clamp）
    Position,
    /// 关节目标速度（不做限位）
    Velocity,
    /// 关节目标扭矩（不做限位）
    Torque,
}

/// 结构化命令（JSON 形式）
///
/// `joint` 保持原始整数，越界校验由状态存储负责（越界时命令无效果）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCommand {
    pub axis: Axis,
    pub joint: i64,
    pub value: f64,
}

/// 令牌命令（文本形式）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCommand {
    /// 急停：置位 emergency_stop 并清零全部速度（位置不变）
    EmergencyStop,
    /// 复位：清除 emergency_stop，全部位置和速度归零
    ResetZero,
    /// 使能全部关节
    EnableAll,
    /// 失能全部关节
    DisableAll,
    /// 使能单个关节
    EnableJoint(i64),
    /// 失能单个关节
    DisableJoint(i64),
}

/// 单行命令的解析结果
///
/// 显式三分支标签，替代"先当 JSON 再当文本"的鸭子类型分支。
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// JSON 结构化命令
    Structured(AxisCommand),
    /// 文本令牌命令
    Token(TokenCommand),
    /// 无法识别的输入（消费该行，不产生任何效果）
    Unparsed,
}

/// 结构化命令的原始反序列化形式
///
/// 缺省值与原协议一致：`command` 为空串、`joint` 为 -1、`value` 为 0.0，
/// 缺字段不构成解析错误。
#[derive(Debug, Deserialize)]
struct RawStructured {
    #[serde(default)]
    command: String,
    #[serde(default = "default_joint")]
    joint: i64,
    #[serde(default)]
    value: f64,
}

fn default_joint() -> i64 {
    -1
}

/// 解析一行命令
///
/// 永不失败：无法识别的行返回 [`Command::Unparsed`]。
pub fn parse_line(line: &str) -> Command {
    let line = line.trim();

    if line.starts_with('{') {
        if let Some(command) = try_parse_structured(line) {
            return command;
        }
        // JSON 解析失败，回落到令牌解析（通常也匹配不上，最终 Unparsed）
    }

    parse_token(line)
}

/// 尝试结构化解析
///
/// 返回 `None` 表示 JSON 本身无法解析（调用方回落到令牌形式）；
/// JSON 合法但 `command` 值无法识别时返回 `Some(Unparsed)`，不再回落。
fn try_parse_structured(line: &str) -> Option<Command> {
    let raw: RawStructured = serde_json::from_str(line).ok()?;

    let axis = match raw.command.as_str() {
        "position" => Axis::Position,
        "velocity" => Axis::Velocity,
        "torque" => Axis::Torque,
        _ => return Some(Command::Unparsed),
    };

    Some(Command::Structured(AxisCommand {
        axis,
        joint: raw.joint,
        value: raw.value,
    }))
}

/// 令牌解析
///
/// 仅首个令牌不区分大小写；参数缺失或非整数一律 `Unparsed`。
fn parse_token(line: &str) -> Command {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Command::Unparsed;
    };

    let arg_joint = |parts: &mut std::str::SplitWhitespace| -> Option<i64> {
        parts.next()?.parse::<i64>().ok()
    };

    let token = match head.to_ascii_uppercase().as_str() {
        "EMERGENCY_STOP" => TokenCommand::EmergencyStop,
        "RESET_ZERO" => TokenCommand::ResetZero,
        "ENABLE_ALL" => TokenCommand::EnableAll,
        "DISABLE_ALL" => TokenCommand::DisableAll,
        "ENABLE_JOINT" => match arg_joint(&mut parts) {
            Some(n) => TokenCommand::EnableJoint(n),
            None => return Command::Unparsed,
        },
        "DISABLE_JOINT" => match arg_joint(&mut parts) {
            Some(n) => TokenCommand::DisableJoint(n),
            None => return Command::Unparsed,
        },
        _ => return Command::Unparsed,
    };

    Command::Token(token)
}
