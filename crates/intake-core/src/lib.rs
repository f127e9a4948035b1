//! # Intake Core
//!
//! 问诊向导的核心模块，提供数据模型、错误定义、标识符生成与字段校验。

pub mod error;
pub mod models;
pub mod utils;
pub mod validation;

pub use error::{FieldErrors, IntakeError, Result};
pub use models::*;
pub use utils::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use validation::{SchemaValidator, Validation, Validator};
