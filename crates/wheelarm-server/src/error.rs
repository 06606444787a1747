//! 服务层错误类型定义
//!
//! 注意错误分层：会话内的读写失败不会以 `Err` 形式穿越到监听器，
//! 它们就地解决为会话拆除；这里只定义会跨层传播的错误
//! （启动失败是唯一的致命路径）。

use thiserror::Error;

/// 服务层错误类型
#[derive(Error, Debug)]
pub enum ServerError {
    /// 监听地址绑定失败（致命：进程应报告原因并退出）
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件解析错误
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// 配置取值非法
    #[error("invalid config: {0}")]
    Config(String),
}
