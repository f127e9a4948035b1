//! 通用工具函数

use crate::models::SymptomId;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use uuid::Uuid;

/// 症状标识符生成能力
///
/// 每次调用都必须返回此前未出现过的非空标识符。
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> SymptomId;
}

/// 随机UUID生成器（默认实现）
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> SymptomId {
        SymptomId::generated(Uuid::new_v4().to_string())
    }
}

/// 顺序生成器，输出 `{prefix}-1`, `{prefix}-2`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("symptom")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> SymptomId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        SymptomId::generated(format!("{}-{}", self.prefix, n))
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
            .unwrap_or_else(|e| panic!("invalid email pattern: {}", e))
    })
}

/// 验证邮箱格式
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.len() <= 254 && !email.contains("..") && email_pattern().is_match(email)
}
