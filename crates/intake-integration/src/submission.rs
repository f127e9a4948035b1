//! HTTP提交协作者
//!
//! 以 JSON 形式 POST 问诊载荷到 `{base_url}/{endpoint}`，
//! 并把传输错误和非 2xx 响应映射为用户提示。

use crate::notification::{
    messages_for_status, Notification, Notifier, CONNECTION_FAILED, REQUEST_TIMED_OUT,
    SERVER_UNREACHABLE, SUBMIT_SUCCESS,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use intake_core::SubmissionPayload;
use intake_workflow::{SubmissionOutcome, SubmissionReceipt, Submitter};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// 提交客户端配置
#[derive(Debug, Clone)]
pub struct HttpSubmitterConfig {
    pub base_url: String,
    pub endpoint: String,
    pub timeout: Duration,
    pub access_token: Option<String>,
    pub user_agent: String,
}

impl Default for HttpSubmitterConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001/api/v1".to_string(),
            endpoint: "consultations".to_string(),
            timeout: Duration::from_secs(30),
            access_token: None,
            user_agent: "intake-wizard/0.1".to_string(),
        }
    }
}

impl HttpSubmitterConfig {
    /// 完整提交地址
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}

/// 提交失败原因，Display 即用户提示
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Request timed out. Please try again.")]
    Timeout,

    #[error("Unable to reach server. Please try again later.")]
    Unreachable,

    #[error("Connection to server failed!")]
    Transport(String),

    #[error("{}", .messages.join("; "))]
    Rejected { status: u16, messages: Vec<String> },
}

impl SubmitError {
    fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            SubmitError::Timeout
        } else if err.is_connect() {
            SubmitError::Unreachable
        } else {
            SubmitError::Transport(err.to_string())
        }
    }

    /// 需要逐条展示的提示
    pub fn messages(&self) -> Vec<String> {
        match self {
            SubmitError::Timeout => vec![REQUEST_TIMED_OUT.to_string()],
            SubmitError::Unreachable => vec![SERVER_UNREACHABLE.to_string()],
            SubmitError::Transport(_) => vec![CONNECTION_FAILED.to_string()],
            SubmitError::Rejected { messages, .. } => messages.clone(),
        }
    }
}

/// 基于 reqwest 的提交协作者
pub struct HttpSubmitter {
    client: reqwest::Client,
    url: String,
    access_token: Option<String>,
    notifier: Arc<dyn Notifier>,
}

impl HttpSubmitter {
    pub fn new(config: HttpSubmitterConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: config.url(),
            access_token: config.access_token.filter(|t| !t.is_empty()),
            notifier,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 发送载荷，返回服务端响应体
    pub async fn post(
        &self,
        payload: &SubmissionPayload,
    ) -> std::result::Result<serde_json::Value, SubmitError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(payload);

        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        debug!("POST {}", self.url);
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to send consultation to {}: {}", self.url, e);
                return Err(SubmitError::from_transport(&e));
            }
        };

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!("Failed to read response from {}: {}", self.url, e);
            SubmitError::from_transport(&e)
        })?;
        let body = parse_body(&text);

        if status.is_success() {
            info!("Consultation accepted by {} ({})", self.url, status);
            Ok(body)
        } else {
            warn!("Consultation rejected by {} with status {}", self.url, status);
            Err(SubmitError::Rejected {
                status: status.as_u16(),
                messages: messages_for_status(status.as_u16(), &body),
            })
        }
    }
}

fn parse_body(text: &str) -> serde_json::Value {
    if text.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, payload: &SubmissionPayload) -> SubmissionOutcome {
        match self.post(payload).await {
            Ok(body) => {
                self.notifier.notify(Notification::success(SUBMIT_SUCCESS));
                SubmissionOutcome::Success(SubmissionReceipt::new(body))
            }
            Err(e) => {
                for message in e.messages() {
                    self.notifier.notify(Notification::error(message));
                }
                SubmissionOutcome::Failure(e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for HttpSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSubmitter")
            .field("url", &self.url)
            .field("authenticated", &self.access_token.is_some())
            .finish()
    }
}
