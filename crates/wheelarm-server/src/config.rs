//! 模拟器运行时配置
//!
//! 支持从 TOML 文件加载，所有字段都有默认值，命令行参数可逐项覆盖。

use crate::error::ServerError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use wheelarm_protocol::DEFAULT_PORT;

/// 模拟器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// 监听地址（默认 `127.0.0.1:8080`）
    pub listen_addr: String,

    /// 遥测广播周期（毫秒，默认 100）
    pub telemetry_period_ms: u64,

    /// 遥测写超时（毫秒，默认 1000；0 表示不限）
    ///
    /// 防止上位机停止读取时广播循环被永久卡住。
    pub write_timeout_ms: u64,

    /// 初始电池电量（百分比，默认 85.0，运行期在 [20, 100] 内缓慢振荡）
    pub initial_battery: f64,

    /// 状态报告周期（秒，默认 5；0 表示关闭）
    pub status_period_secs: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            telemetry_period_ms: 100,
            write_timeout_ms: 1000,
            initial_battery: 85.0,
            status_period_secs: 5,
        }
    }
}

impl SimulatorConfig {
    /// 从 TOML 文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)?;
        let config: SimulatorConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.telemetry_period_ms == 0 {
            return Err(ServerError::Config(
                "telemetry_period_ms must be greater than 0".to_string(),
            ));
        }
        if !(20.0..=100.0).contains(&self.initial_battery) {
            return Err(ServerError::Config(format!(
                "initial_battery must be within [20, 100], got {}",
                self.initial_battery
            )));
        }
        Ok(())
    }

    /// 遥测广播周期
    pub fn telemetry_period(&self) -> Duration {
        Duration::from_millis(self.telemetry_period_ms)
    }

    /// 遥测写超时（`None` 表示不限）
    pub fn write_timeout(&self) -> Option<Duration> {
        if self.write_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.write_timeout_ms))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimulatorConfig::default();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.telemetry_period(), Duration::from_millis(100));
        assert_eq!(config.write_timeout(), Some(Duration::from_millis(1000)));
        assert_eq!(config.initial_battery, 85.0);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_partial_toml() {
        // 缺省字段回落到默认值
        let config: SimulatorConfig = toml::from_str(
            r#"
            listen_addr = "0.0.0.0:9000"
            telemetry_period_ms = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.telemetry_period_ms, 50);
        assert_eq!(config.write_timeout_ms, 1000);
        assert_eq!(config.status_period_secs, 5);
    }

    #[test]
    fn test_validate_rejects_zero_period() {
        let config = SimulatorConfig {
            telemetry_period_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_battery_out_of_range() {
        let config = SimulatorConfig {
            initial_battery: 120.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_write_timeout_means_unbounded() {
        let config = SimulatorConfig {
            write_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.write_timeout(), None);
    }
}
