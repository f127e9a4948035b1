//! # 问诊工作流模块
//!
//! 提供问诊向导的状态与转换模型，包括：
//! - 记录存储：纯函数 reducer 与按序应用的意图队列
//! - 步骤状态机：带校验门的前进/后退
//! - 症状录入：草稿校验后生成标识符并追加
//! - 向导引擎：组合以上组件并对接提交与导出协作者

pub mod collaborators;
pub mod engine;
pub mod state_machine;
pub mod store;
pub mod summary;
pub mod symptom_entry;

// 重新导出主要类型
pub use collaborators::{
    Exporter, SubmissionOutcome, SubmissionReceipt, SubmissionStatus, Submitter,
};
pub use engine::{IntakeWizard, StepView};
pub use state_machine::{
    MarkerState, Progress, StepController, StepEvent, StepMarker, StepStateMachine, WizardStep,
    SYMPTOMS_REQUIRED,
};
pub use store::{apply, Intent, RecordStore, StoreHandle};
pub use summary::{FollowUpSummary, PatientSummary, SummaryAction, SummaryView, SymptomLine};
pub use symptom_entry::SymptomEntry;
