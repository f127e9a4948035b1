//! 外部协作者接口
//!
//! 提交与导出都通过 trait 注入，向导只消费其结果。

use crate::summary::SummaryView;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use intake_core::{Result, SubmissionPayload};
use serde::{Deserialize, Serialize};

/// 提交成功回执
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// 服务端响应体，空响应为 `null`
    pub body: serde_json::Value,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionReceipt {
    pub fn new(body: serde_json::Value) -> Self {
        Self {
            body,
            submitted_at: Utc::now(),
        }
    }
}

/// 一次提交的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Success(SubmissionReceipt),
    Failure(String),
}

/// 提交状态
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Pending,
    Succeeded(SubmissionReceipt),
    Failed(String),
}

impl SubmissionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, SubmissionStatus::Pending)
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, SubmissionStatus::Succeeded(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Idle => "idle",
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Succeeded(_) => "succeeded",
            SubmissionStatus::Failed(_) => "failed",
        }
    }
}

/// 提交协作者
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, payload: &SubmissionPayload) -> SubmissionOutcome;
}

/// 本地副本导出协作者
#[async_trait]
pub trait Exporter: Send + Sync {
    /// 导出摘要，返回副本位置
    async fn export(&self, summary: &SummaryView, payload: &SubmissionPayload) -> Result<String>;
}
