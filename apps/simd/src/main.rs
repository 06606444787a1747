//! 轮臂机器人模拟器守护进程主入口
//!
//! 启动硬件在环模拟器：绑定 TCP 监听地址，接受单个控制连接，
//! 按行解释命令并周期性回送遥测。配置来源优先级：
//! 命令行参数 > TOML 配置文件 > 内置默认值。

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;
use wheelarm_protocol::{JOINT_COUNT, JointGroup};
use wheelarm_server::{JointStateStore, Listener, SimulatorConfig};

/// 轮臂机器人模拟器
///
/// 21 自由度轮臂机器人的硬件在环替身，供上位机控制软件在没有
/// 真实硬件时联调命令协议和遥测解析
#[derive(Parser, Debug)]
#[command(name = "wheelarm-simd")]
#[command(about = "Hardware-in-the-loop simulator for the wheeled-arm robot", long_about = None)]
#[command(version)]
struct Args {
    /// TOML 配置文件路径
    ///
    /// 不指定时使用内置默认配置
    #[arg(long)]
    config: Option<PathBuf>,

    /// 监听地址（覆盖配置文件）
    ///
    /// 格式: IP:PORT (例如: 127.0.0.1:8080)
    #[arg(long)]
    listen: Option<String>,

    /// 遥测广播周期（毫秒，覆盖配置文件）
    #[arg(long)]
    period_ms: Option<u64>,

    /// 遥测写超时（毫秒，0 表示不限，覆盖配置文件）
    #[arg(long)]
    write_timeout_ms: Option<u64>,

    /// 初始电池电量（百分比，覆盖配置文件）
    #[arg(long)]
    battery: Option<f64>,

    /// 状态报告周期（秒，0 表示关闭，覆盖配置文件）
    #[arg(long)]
    status_period_secs: Option<u64>,
}

impl Args {
    /// 组装最终配置：文件（或默认）打底，命令行逐项覆盖
    fn resolve_config(&self) -> Result<SimulatorConfig> {
        let mut config = match &self.config {
            Some(path) => SimulatorConfig::load_from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => SimulatorConfig::default(),
        };

        if let Some(ref listen) = self.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(period_ms) = self.period_ms {
            config.telemetry_period_ms = period_ms;
        }
        if let Some(write_timeout_ms) = self.write_timeout_ms {
            config.write_timeout_ms = write_timeout_ms;
        }
        if let Some(battery) = self.battery {
            config.initial_battery = battery;
        }
        if let Some(status_period_secs) = self.status_period_secs {
            config.status_period_secs = status_period_secs;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// 打印启动横幅：机器人构型和各分组限位
fn log_startup_banner(config: &SimulatorConfig) {
    info!("wheelarm simulator starting");
    info!("  listen: {}", config.listen_addr);
    info!("  telemetry period: {} ms", config.telemetry_period_ms);
    info!("  joints: {} total", JOINT_COUNT);
    for group in JointGroup::all() {
        let (min, max) = group.limit();
        let indices = group.indices();
        info!(
            "    {}: joints {}-{}, limits [{}, {}]",
            group.label(),
            indices.start(),
            indices.end(),
            min,
            max
        );
    }
}

/// 周期性状态报告线程
///
/// 与具体连接无关：汇报进程级关节存储的指令值，按分组给出
/// 使能数量和位置范围，便于长时间运行时从日志确认模拟器活着。
fn spawn_status_reporter(store: Arc<JointStateStore>, period: Duration) {
    let spawned = thread::Builder::new()
        .name("status-report".to_string())
        .spawn(move || {
            loop {
                thread::sleep(period);
                let snapshot = store.commanded();
                for group in JointGroup::all() {
                    let indices = group.indices();
                    let enabled = indices.clone().filter(|&i| snapshot.enabled[i]).count();
                    let total = indices.clone().count();
                    let mut min_pos = f64::INFINITY;
                    let mut max_pos = f64::NEG_INFINITY;
                    for i in indices {
                        min_pos = min_pos.min(snapshot.positions[i]);
                        max_pos = max_pos.max(snapshot.positions[i]);
                    }
                    info!(
                        "status: {} enabled {}/{}, positions [{:.2}, {:.2}]",
                        group.label(),
                        enabled,
                        total,
                        min_pos,
                        max_pos
                    );
                }
            }
        });
    if spawned.is_err() {
        tracing::warn!("failed to spawn status reporter thread");
    }
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wheelarm_simd=info".parse().unwrap())
                .add_directive("wheelarm_server=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let config = args.resolve_config()?;

    // Ctrl+C 优雅退出
    ctrlc::set_handler(move || {
        eprintln!("\nReceived interrupt signal. Shutting down...");
        process::exit(0);
    })
    .context("failed to set signal handler")?;

    log_startup_banner(&config);

    // 关节存储是进程级单例：连接断开不清空，状态报告线程也引用它
    let store = JointStateStore::shared();

    if config.status_period_secs > 0 {
        spawn_status_reporter(
            store.clone(),
            Duration::from_secs(config.status_period_secs),
        );
    }

    // 绑定失败是唯一的致命错误：报告原因并退出
    let listener = Listener::bind(&config, store)
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    info!("simulator started, press Ctrl+C to stop");
    listener.run();
    Ok(())
}
