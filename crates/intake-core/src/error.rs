//! 错误定义模块

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// 字段级校验错误：字段名 -> 提示信息
///
/// 按字段名排序，保证视图与日志输出稳定。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录字段错误；同一字段只保留第一条信息
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 没有错误时返回 `Ok(())`，否则包装为校验错误
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(IntakeError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

/// 问诊系统统一错误类型
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("验证错误: {0}")]
    Validation(FieldErrors),

    #[error("步骤校验未通过: {0}")]
    GateRefused(String),

    #[error("无效步骤转换: 从 {from} 经 {event}")]
    InvalidStateTransition { from: String, event: String },

    #[error("提交正在进行中")]
    SubmissionPending,

    #[error("提交失败: {0}")]
    Submission(String),

    #[error("未知取值 {field}: {value}")]
    UnknownValue { field: String, value: String },

    #[error("无效标识符: {0}")]
    InvalidIdentifier(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

impl IntakeError {
    /// 字段级错误（仅校验错误携带）
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            IntakeError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// 问诊系统统一结果类型
pub type Result<T> = std::result::Result<T, IntakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_wins() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Email is required");
        errors.add("email", "Email is invalid");
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_display_is_sorted() {
        let mut errors = FieldErrors::new();
        errors.add("lastName", "Last name is required");
        errors.add("email", "Email is required");
        assert_eq!(
            errors.to_string(),
            "email: Email is required; lastName: Last name is required"
        );
    }

    #[test]
    fn test_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());

        let mut errors = FieldErrors::new();
        errors.add("urgency", "Urgency level is required");
        let err = errors.into_result().unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("urgency"));
    }
}
