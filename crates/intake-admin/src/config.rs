//! 配置管理
//!
//! 分层加载配置：内置默认值 -> 配置文件 -> `INTAKE__*` 环境变量，加载后按规则校验

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "INTAKE";

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<IntakeConfig>>,
    /// 配置文件路径
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

/// 问诊向导完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// 提交服务配置
    pub submission: SubmissionConfig,
    /// 本地导出配置
    pub export: ExportConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 提交服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// 服务根地址
    pub base_url: String,
    /// 问诊提交端点
    pub endpoint: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
    /// 访问令牌
    pub access_token: Option<String>,
    pub user_agent: String,
}

/// 本地导出配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// 输出目录
    pub output_dir: String,
    /// 输出格式：json | text
    pub format: String,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 紧凑格式
    pub compact: bool,
    /// 输出日志目标模块
    pub with_target: bool,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001/api/v1".to_string(),
            endpoint: "consultations".to_string(),
            timeout_secs: 30,
            access_token: None,
            user_agent: "intake-wizard/0.1".to_string(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: "./exports".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            compact: false,
            with_target: true,
        }
    }
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&IntakeConfig) -> Result<()>,
    /// 错误消息
    error_message: &'static str,
}

impl ConfigManager {
    /// 加载配置；`config_path` 为空时只使用默认值和环境变量
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        Self::from_config(config, config_path)
    }

    /// 使用现成的配置创建管理器
    pub fn from_config(config: IntakeConfig, config_path: Option<&str>) -> Result<Self> {
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: config_path.map(str::to_string),
            validator,
        })
    }

    /// 从默认值、文件和环境变量加载配置
    fn load_config(config_path: Option<&str>) -> Result<IntakeConfig> {
        let defaults = Config::try_from(&IntakeConfig::default())
            .context("Failed to build default configuration")?;

        let mut builder = Config::builder().add_source(defaults);
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        let config: IntakeConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        match config_path {
            Some(path) => info!("Configuration loaded successfully from: {}", path),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    /// 获取配置
    pub async fn get_config(&self) -> IntakeConfig {
        let config = self.config.read().await;
        config.clone()
    }

    /// 更新配置，有配置文件时同时写回
    pub async fn update_config(&self, new_config: IntakeConfig) -> Result<()> {
        self.validator.validate(&new_config)?;

        {
            let mut config = self.config.write().await;
            *config = new_config;
        }

        if let Some(path) = &self.config_path {
            self.save_to(path).await?;
        }

        info!("Configuration updated successfully");
        Ok(())
    }

    /// 以 TOML 格式保存配置
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_str = {
            let config = self.config.read().await;
            toml::to_string_pretty(&*config).context("Failed to serialize configuration")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create configuration directory")?;
        }
        tokio::fs::write(path, config_str)
            .await
            .context("Failed to write configuration file")?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// 重新加载配置
    pub async fn reload_config(&self) -> Result<()> {
        let new_config = Self::load_config(self.config_path.as_deref())?;
        self.validator.validate(&new_config)?;
        *self.config.write().await = new_config;
        info!("Configuration reloaded");
        Ok(())
    }

    /// 验证配置
    pub async fn validate_config(&self) -> Result<()> {
        let config = self.config.read().await;
        self.validator.validate(&config)
    }
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "submission.base_url",
                validator: |config| {
                    let url = &config.submission.base_url;
                    if url.starts_with("http://") || url.starts_with("https://") {
                        Ok(())
                    } else {
                        Err(anyhow::anyhow!("'{}' is not an http(s) URL", url))
                    }
                },
                error_message: "Invalid submission base URL",
            },
            ValidationRule {
                field_path: "submission.endpoint",
                validator: |config| {
                    if config.submission.endpoint.trim().is_empty() {
                        Err(anyhow::anyhow!("Submission endpoint cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid submission endpoint",
            },
            ValidationRule {
                field_path: "submission.timeout_secs",
                validator: |config| {
                    if config.submission.timeout_secs == 0 {
                        Err(anyhow::anyhow!("Submission timeout cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid submission timeout",
            },
            ValidationRule {
                field_path: "export.output_dir",
                validator: |config| {
                    if config.export.output_dir.trim().is_empty() {
                        Err(anyhow::anyhow!("Export directory cannot be empty"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid export directory",
            },
            ValidationRule {
                field_path: "export.format",
                validator: |config| match config.export.format.to_ascii_lowercase().as_str() {
                    "json" | "text" | "txt" => Ok(()),
                    other => Err(anyhow::anyhow!("Unsupported export format: {}", other)),
                },
                error_message: "Invalid export format",
            },
            ValidationRule {
                field_path: "logging.level",
                validator: |config| match config.logging.level.to_ascii_lowercase().as_str() {
                    "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
                    other => Err(anyhow::anyhow!("Unknown log level: {}", other)),
                },
                error_message: "Invalid log level",
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &IntakeConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!(
                    "Configuration validation failed for {}: {}",
                    rule.field_path, e
                );
                return Err(anyhow::anyhow!("{}: {}", rule.error_message, e));
            }
        }

        info!("Configuration validation passed");
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
