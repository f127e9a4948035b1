//! # 患者问诊向导
//!
//! 汇总各子模块的公共接口

pub use intake_core;
pub use intake_integration;
pub use intake_workflow;
