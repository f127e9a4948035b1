//! 本地副本导出
//!
//! 提交成功后将摘要写入 `{output_dir}/consultation-<lastname>-<timestamp>.{json|txt}`

use async_trait::async_trait;
use chrono::Utc;
use intake_core::{IntakeError, Result, SubmissionPayload};
use intake_workflow::{Exporter, SummaryView};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Text,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "txt",
        }
    }
}

impl TryFrom<&str> for ExportFormat {
    type Error = IntakeError;

    fn try_from(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            other => Err(IntakeError::UnknownValue {
                field: "export.format".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    exported_at: String,
    summary: &'a SummaryView,
    payload: &'a SubmissionPayload,
}

/// 写入本地文件的导出器
#[derive(Debug, Clone)]
pub struct FileExporter {
    output_dir: PathBuf,
    format: ExportFormat,
}

impl FileExporter {
    pub fn new(output_dir: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self {
            output_dir: output_dir.into(),
            format,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn file_name(&self, last_name: &str, timestamp: &str) -> String {
        let slug: String = last_name
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        let slug = slug.trim_matches('-');
        let slug = if slug.is_empty() { "patient" } else { slug };

        format!(
            "consultation-{}-{}.{}",
            slug,
            timestamp,
            self.format.extension()
        )
    }
}

#[async_trait]
impl Exporter for FileExporter {
    async fn export(&self, summary: &SummaryView, payload: &SubmissionPayload) -> Result<String> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let now = Utc::now();
        let path = self.output_dir.join(self.file_name(
            &payload.patient_info.last_name,
            &now.format("%Y%m%d%H%M%S").to_string(),
        ));

        let contents = match self.format {
            ExportFormat::Json => serde_json::to_string_pretty(&ExportDocument {
                exported_at: now.to_rfc3339(),
                summary,
                payload,
            })?,
            ExportFormat::Text => summary.to_text(),
        };

        tokio::fs::write(&path, contents).await?;
        info!("Wrote consultation copy to {}", path.display());
        Ok(path.display().to_string())
    }
}
