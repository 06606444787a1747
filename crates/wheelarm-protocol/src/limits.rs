//! 关节分组与静态限位表
//!
//! 轮臂机器人共 21 个自由度：
//! - 左臂：8 个关节（索引 0-7）
//! - 右臂：8 个关节（索引 8-15）
//! - 腰部：2 个关节（索引 16-17）
//! - 底盘：2 个电机（索引 18-19）
//! - 升降：1 个电机（索引 20）
//!
//! 限位在构造时固定，运行期不可修改。位置命令超出限位时取最近边界
//! （clamp），而不是拒绝。

use std::ops::RangeInclusive;

/// 自由度总数
pub const JOINT_COUNT: usize = 21;

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 8080;

/// 关节名称表（索引 0-20，用于状态报告和日志）
pub static JOINT_NAMES: [&str; JOINT_COUNT] = [
    "left_arm_1",
    "left_arm_2",
    "left_arm_3",
    "left_arm_4",
    "left_arm_5",
    "left_arm_6",
    "left_arm_7",
    "left_arm_8",
    "right_arm_1",
    "right_arm_2",
    "right_arm_3",
    "right_arm_4",
    "right_arm_5",
    "right_arm_6",
    "right_arm_7",
    "right_arm_8",
    "waist_1",
    "waist_2",
    "chassis_1",
    "chassis_2",
    "lift",
];

/// 关节分组
///
/// 决定每个关节的静态限位范围。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointGroup {
    /// 左臂关节（索引 0-7），限位 [-180, 180]
    LeftArm,
    /// 右臂关节（索引 8-15），限位 [-180, 180]
    RightArm,
    /// 腰部关节（索引 16-17），限位 [-90, 90]
    Waist,
    /// 底盘驱动电机（索引 18-19），限位 [-1000, 1000]（速度单位）
    Chassis,
    /// 升降机构（索引 20），限位 [0, 500]（位置单位）
    Lift,
}

impl JointGroup {
    /// 根据关节索引返回所属分组
    ///
    /// 索引超出 0-20 时返回 `None`（协议层宽容策略：无效索引不报错）。
    pub fn of(index: usize) -> Option<Self> {
        match index {
            0..=7 => Some(JointGroup::LeftArm),
            8..=15 => Some(JointGroup::RightArm),
            16..=17 => Some(JointGroup::Waist),
            18..=19 => Some(JointGroup::Chassis),
            20 => Some(JointGroup::Lift),
            _ => None,
        }
    }

    /// 分组的静态限位 (min, max)
    pub fn limit(self) -> (f64, f64) {
        match self {
            JointGroup::LeftArm | JointGroup::RightArm => (-180.0, 180.0),
            JointGroup::Waist => (-90.0, 90.0),
            JointGroup::Chassis => (-1000.0, 1000.0),
            JointGroup::Lift => (0.0, 500.0),
        }
    }

    /// 分组覆盖的关节索引区间
    pub fn indices(self) -> RangeInclusive<usize> {
        match self {
            JointGroup::LeftArm => 0..=7,
            JointGroup::RightArm => 8..=15,
            JointGroup::Waist => 16..=17,
            JointGroup::Chassis => 18..=19,
            JointGroup::Lift => 20..=20,
        }
    }

    /// 分组的可读标签
    pub fn label(self) -> &'static str {
        match self {
            JointGroup::LeftArm => "left arm",
            JointGroup::RightArm => "right arm",
            JointGroup::Waist => "waist",
            JointGroup::Chassis => "chassis",
            JointGroup::Lift => "lift",
        }
    }

    /// 全部分组（按索引顺序）
    pub fn all() -> [JointGroup; 5] {
        [
            JointGroup::LeftArm,
            JointGroup::RightArm,
            JointGroup::Waist,
            JointGroup::Chassis,
            JointGroup::Lift,
        ]
    }
}

/// 关节索引对应的静态限位 (min, max)
///
/// 索引超出 0-20 时返回 `None`。
pub fn joint_limit(index: usize) -> Option<(f64, f64)> {
    JointGroup::of(index).map(JointGroup::limit)
}
