//! 用户通知
//!
//! 提交结果通过 `Notifier` 转为用户可见的提示，并负责把服务端错误映射为提示文本。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{error, info};

pub const SUBMIT_SUCCESS: &str = "Consultation submitted successfully!";
pub const REQUEST_TIMED_OUT: &str = "Request timed out. Please try again.";
pub const SERVER_UNREACHABLE: &str = "Unable to reach server. Please try again later.";
pub const CONNECTION_FAILED: &str = "Connection to server failed!";
pub const UNAUTHORIZED: &str = "Unauthorized access";
pub const SESSION_EXPIRED: &str = "Session expired";
pub const SERVER_ERROR: &str = "Server Error, try again later!";
pub const GENERIC_ERROR: &str = "An error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

impl NotificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// 一条用户提示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// 通知发送接口
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// 写入日志的默认通知器
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => info!("[notify] {}", notification.message),
            NotificationLevel::Error => error!("[notify] {}", notification.message),
        }
    }
}

/// 记录全部通知，供调用方检查
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        match self.notifications.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .map(|n| n.message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        match self.notifications.lock() {
            Ok(mut guard) => guard.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}

/// 服务端 `message` 字段：字符串原样返回，数组逐条返回
fn server_messages(body: &serde_json::Value) -> Vec<String> {
    match body.get("message") {
        Some(serde_json::Value::String(message)) if !message.is_empty() => vec![message.clone()],
        Some(serde_json::Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| match entry {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// 将非 2xx 响应映射为提示文本
pub fn messages_for_status(status: u16, body: &serde_json::Value) -> Vec<String> {
    let from_server = server_messages(body);
    let fallback = match status {
        401 => UNAUTHORIZED,
        403 => SESSION_EXPIRED,
        500 => return vec![SERVER_ERROR.to_string()],
        _ => GENERIC_ERROR,
    };

    if from_server.is_empty() {
        vec![fallback.to_string()]
    } else {
        from_server
    }
}
