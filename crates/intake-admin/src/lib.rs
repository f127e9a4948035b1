//! # 问诊管理模块
//!
//! 提供配置管理与日志初始化等运维功能

pub mod config;
pub mod logging;

pub use config::{
    ConfigManager, ConfigValidator, ExportConfig, IntakeConfig, LoggingConfig, SubmissionConfig,
    ENV_PREFIX,
};
pub use logging::init_logging;
