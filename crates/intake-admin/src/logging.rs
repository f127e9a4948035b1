//! 日志初始化
//!
//! 安装全局 `tracing-subscriber`，`RUST_LOG` 优先于配置中的级别

use crate::config::LoggingConfig;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use tracing_subscriber::EnvFilter;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// 构建日志过滤器
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(config.level.to_ascii_lowercase())
        .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", config.level, e))
}

/// 初始化全局日志，重复调用不做任何事
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if INITIALIZED.load(Ordering::SeqCst) {
        debug!("Logging already initialised");
        return Ok(());
    }

    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let result = if config.compact {
        builder.compact().try_init()
    } else {
        builder.try_init()
    };

    // 其他组件可能已安装全局订阅者
    if let Err(e) = result {
        debug!("Global subscriber already set: {}", e);
    }
    INITIALIZED.store(true, Ordering::SeqCst);
    Ok(())
}
