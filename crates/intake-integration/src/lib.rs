//! # 问诊集成模块
//!
//! 提供向导与外部系统之间的协作者实现，包括：
//! - HTTP提交：将问诊载荷POST到远程服务
//! - 用户通知：将提交结果与服务端错误映射为提示
//! - 本地导出：提交成功后写出问诊副本

pub mod export;
pub mod notification;
pub mod submission;

pub use export::{ExportFormat, FileExporter};
pub use notification::{
    messages_for_status, Notification, NotificationLevel, Notifier, RecordingNotifier,
    TracingNotifier,
};
pub use submission::{HttpSubmitter, HttpSubmitterConfig, SubmitError};
