//! 问诊向导引擎
//!
//! 组合记录存储、步骤控制器、症状录入与外部协作者，提供统一的向导接口

use crate::{
    collaborators::{Exporter, SubmissionOutcome, SubmissionReceipt, SubmissionStatus, Submitter},
    state_machine::{Progress, StepController, WizardStep},
    store::{Intent, RecordStore, StoreHandle},
    summary::{SummaryAction, SummaryView},
    symptom_entry::SymptomEntry,
};
use intake_core::{
    ConsultationRecord, FieldErrors, FollowUp, FollowUpPatch, IdGenerator, IntakeError,
    PatientInfo, PatientInfoPatch, Result, SchemaValidator, Symptom, SymptomDraft, SymptomId,
    SubmissionPayload, UuidIdGenerator, Validator,
};
use std::sync::Arc;
use tracing::{info, warn};

/// 当前步骤对应的视图数据
#[derive(Debug)]
pub enum StepView<'a> {
    Welcome,
    PatientInfo {
        info: &'a PatientInfo,
        errors: &'a FieldErrors,
    },
    Symptoms {
        symptoms: &'a [Symptom],
        draft: &'a SymptomDraft,
        draft_errors: &'a FieldErrors,
        general_error: Option<&'a str>,
    },
    FollowUp {
        follow_up: &'a FollowUp,
        errors: &'a FieldErrors,
    },
    Summary {
        view: SummaryView,
        status: &'a SubmissionStatus,
    },
}

/// 问诊向导
///
/// 记录存储是问诊记录的唯一持有者；视图只读取快照并投递意图。
pub struct IntakeWizard {
    store: RecordStore,
    controller: StepController,
    entry: SymptomEntry,
    validator: Arc<dyn Validator>,
    ids: Arc<dyn IdGenerator>,
    submitter: Arc<dyn Submitter>,
    exporter: Option<Arc<dyn Exporter>>,
    status: SubmissionStatus,
    step_errors: FieldErrors,
    general_error: Option<String>,
}

impl IntakeWizard {
    /// 使用默认校验规则和 UUID 标识符创建向导
    pub fn new(submitter: Arc<dyn Submitter>) -> Self {
        Self {
            store: RecordStore::new(),
            controller: StepController::new(),
            entry: SymptomEntry::new(),
            validator: Arc::new(SchemaValidator::new()),
            ids: Arc::new(UuidIdGenerator),
            submitter,
            exporter: None,
            status: SubmissionStatus::Idle,
            step_errors: FieldErrors::new(),
            general_error: None,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn current_step(&self) -> WizardStep {
        self.controller.current()
    }

    pub fn progress(&self) -> Progress {
        self.controller.progress()
    }

    pub fn record(&self) -> &ConsultationRecord {
        self.store.snapshot()
    }

    pub fn status(&self) -> &SubmissionStatus {
        &self.status
    }

    pub fn step_errors(&self) -> &FieldErrors {
        &self.step_errors
    }

    pub fn general_error(&self) -> Option<&str> {
        self.general_error.as_deref()
    }

    /// 供视图共享的意图投递句柄，投递的意图在下一次 `sync` 或操作时应用
    pub fn handle(&self) -> StoreHandle {
        self.store.handle()
    }

    pub fn sync(&mut self) -> usize {
        self.store.sync()
    }

    pub fn dispatch(&mut self, intent: Intent) {
        self.store.dispatch(intent);
    }

    pub fn update_patient(&mut self, patch: PatientInfoPatch) {
        self.store.dispatch(Intent::SetPatientField(patch));
    }

    pub fn toggle_medical_history(&mut self, tag: &str) {
        self.store.sync();
        let patch = self.store.snapshot().patient_info.toggle_medical_history(tag);
        self.store.dispatch(Intent::SetPatientField(patch));
    }

    pub fn update_follow_up(&mut self, patch: FollowUpPatch) {
        self.store.dispatch(Intent::SetFollowUpField(patch));
    }

    pub fn symptom_draft_mut(&mut self) -> &mut SymptomDraft {
        self.entry.draft_mut()
    }

    /// 提交症状草稿
    pub fn add_symptom(&mut self) -> Result<SymptomId> {
        let id = self
            .entry
            .submit(&mut self.store, self.validator.as_ref(), self.ids.as_ref())?;
        self.general_error = None;
        Ok(id)
    }

    pub fn remove_symptom(&mut self, id: SymptomId) {
        self.entry.remove(&mut self.store, id);
    }

    /// 前进到下一步；校验失败时记录错误并保持原地
    pub fn next(&mut self) -> Result<WizardStep> {
        self.store.sync();
        match self
            .controller
            .advance(self.store.snapshot(), self.validator.as_ref())
        {
            Ok(step) => {
                self.step_errors = FieldErrors::new();
                self.general_error = None;
                Ok(step)
            }
            Err(e) => {
                match &e {
                    IntakeError::Validation(errors) => self.step_errors = errors.clone(),
                    IntakeError::GateRefused(message) => {
                        self.general_error = Some(message.clone())
                    }
                    _ => {}
                }
                Err(e)
            }
        }
    }

    /// 后退一步，已填写的数据保留在存储中
    ///
    /// 离开摘要页时清除已结束的提交状态，返回后需重新提交。
    pub fn back(&mut self) -> Result<WizardStep> {
        let from = self.controller.current();
        let step = self.controller.retreat()?;
        if from == WizardStep::Summary && !self.status.is_pending() {
            self.status = SubmissionStatus::Idle;
        }
        self.step_errors = FieldErrors::new();
        self.general_error = None;
        Ok(step)
    }

    pub fn summary_action(&self) -> SummaryAction {
        if self.status.is_succeeded() {
            SummaryAction::DownloadCopy
        } else {
            SummaryAction::Submit
        }
    }

    pub fn summary_view(&self) -> SummaryView {
        SummaryView::from_record(self.store.snapshot(), self.summary_action())
    }

    pub fn submission_payload(&self) -> SubmissionPayload {
        self.store.snapshot().to_payload()
    }

    /// 当前步骤的视图数据
    pub fn active_view(&self) -> StepView<'_> {
        let record = self.store.snapshot();
        match self.controller.current() {
            WizardStep::Welcome => StepView::Welcome,
            WizardStep::PatientInfo => StepView::PatientInfo {
                info: &record.patient_info,
                errors: &self.step_errors,
            },
            WizardStep::Symptoms => StepView::Symptoms {
                symptoms: &record.symptoms,
                draft: self.entry.draft(),
                draft_errors: self.entry.errors(),
                general_error: self.general_error.as_deref(),
            },
            WizardStep::FollowUp => StepView::FollowUp {
                follow_up: &record.follow_up,
                errors: &self.step_errors,
            },
            WizardStep::Summary => StepView::Summary {
                view: self.summary_view(),
                status: &self.status,
            },
        }
    }

    /// 进入提交中状态并返回载荷；已有提交进行中或已提交成功时拒绝
    pub fn begin_submit(&mut self) -> Result<SubmissionPayload> {
        if self.status.is_pending() {
            warn!("Submit ignored: a submission is already pending");
            return Err(IntakeError::SubmissionPending);
        }
        if self.status.is_succeeded() {
            warn!("Submit ignored: the consultation was already submitted");
            return Err(IntakeError::GateRefused(
                "Consultation already submitted".to_string(),
            ));
        }
        if self.controller.current() != WizardStep::Summary {
            return Err(IntakeError::InvalidStateTransition {
                from: format!("{:?}", self.controller.current()),
                event: "Submit".to_string(),
            });
        }

        self.store.sync();
        self.status = SubmissionStatus::Pending;
        info!(
            "Submitting consultation with {} symptom(s)",
            self.store.snapshot().symptoms.len()
        );
        Ok(self.submission_payload())
    }

    /// 结束提交，步骤与记录都不改变
    pub fn finish_submit(&mut self, outcome: SubmissionOutcome) -> &SubmissionStatus {
        self.status = match outcome {
            SubmissionOutcome::Success(receipt) => {
                info!("Consultation submitted");
                SubmissionStatus::Succeeded(receipt)
            }
            SubmissionOutcome::Failure(reason) => {
                warn!("Consultation submission failed: {}", reason);
                SubmissionStatus::Failed(reason)
            }
        };
        &self.status
    }

    /// 提交当前记录；失败后可重试
    pub async fn submit(&mut self) -> Result<SubmissionReceipt> {
        let payload = self.begin_submit()?;
        let outcome = self.submitter.submit(&payload).await;

        match self.finish_submit(outcome) {
            SubmissionStatus::Succeeded(receipt) => Ok(receipt.clone()),
            SubmissionStatus::Failed(reason) => Err(IntakeError::Submission(reason.clone())),
            _ => Err(IntakeError::Submission("submission did not settle".to_string())),
        }
    }

    /// 提交成功后导出本地副本
    pub async fn export(&mut self) -> Result<String> {
        if self.summary_action() != SummaryAction::DownloadCopy {
            return Err(IntakeError::GateRefused(
                "Submit the consultation before downloading a copy".to_string(),
            ));
        }
        let exporter = match &self.exporter {
            Some(exporter) => Arc::clone(exporter),
            None => {
                return Err(IntakeError::Config("no exporter configured".to_string()));
            }
        };

        let view = self.summary_view();
        let location = exporter.export(&view, &self.submission_payload()).await?;
        info!("Consultation copy exported to {}", location);
        Ok(location)
    }

    /// 清空记录并回到欢迎页
    pub fn reset(&mut self) {
        self.store.dispatch(Intent::Reset);
        self.controller.reset();
        self.entry.clear();
        self.status = SubmissionStatus::Idle;
        self.step_errors = FieldErrors::new();
        self.general_error = None;
        info!("Wizard reset");
    }
}

impl std::fmt::Debug for IntakeWizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntakeWizard")
            .field("step", &self.controller.current())
            .field("status", &self.status.as_str())
            .field("symptoms", &self.store.snapshot().symptoms.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use intake_core::{
        ContactMethod, Frequency, Gender, PreferredTime, SequentialIdGenerator, Severity,
        SymptomDuration, SymptomName, Urgency,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockSubmitter {
        calls: AtomicUsize,
        failures_left: AtomicUsize,
        last_payload: Mutex<Option<serde_json::Value>>,
    }

    impl MockSubmitter {
        fn new(failures: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(failures),
                last_payload: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl Submitter for MockSubmitter {
        async fn submit(&self, payload: &SubmissionPayload) -> SubmissionOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_payload.lock().unwrap() = serde_json::to_value(payload).ok();

            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                SubmissionOutcome::Failure("Server Error, try again later!".to_string())
            } else {
                SubmissionOutcome::Success(SubmissionReceipt::new(serde_json::json!({"id": 7})))
            }
        }
    }

    struct MemoryExporter {
        exported: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Exporter for MemoryExporter {
        async fn export(&self, summary: &SummaryView, _: &SubmissionPayload) -> Result<String> {
            self.exported.lock().unwrap().push(summary.to_text());
            Ok("memory://copy-1".to_string())
        }
    }

    fn wizard(submitter: Arc<MockSubmitter>) -> IntakeWizard {
        IntakeWizard::new(submitter).with_id_generator(Arc::new(SequentialIdGenerator::new("s")))
    }

    fn fill_patient(wizard: &mut IntakeWizard) {
        wizard.update_patient(
            PatientInfoPatch::default()
                .first_name("Ada")
                .last_name("Lovelace")
                .email("ada@example.com")
                .phone_number("555-0100")
                .date_of_birth("1815-12-10")
                .gender(Gender::Female)
                .address("London")
                .emergency_contact_name("Mary")
                .emergency_contact_phone("555-0101"),
        );
        wizard.toggle_medical_history("None");
    }

    fn fill_symptom(wizard: &mut IntakeWizard) {
        let draft = wizard.symptom_draft_mut();
        draft.name = Some(SymptomName::Cough);
        draft.description = "dry cough".to_string();
        draft.severity = Some(Severity::Mild);
        draft.duration = Some(SymptomDuration::OneDay);
        draft.frequency = Some(Frequency::Intermittent);
    }

    fn fill_follow_up(wizard: &mut IntakeWizard) {
        wizard.update_follow_up(
            FollowUpPatch::default()
                .preferred_contact_method(ContactMethod::Email)
                .preferred_time(PreferredTime::Morning)
                .urgency(Urgency::Low),
        );
    }

    async fn walk_to_summary(wizard: &mut IntakeWizard) {
        wizard.next().unwrap();
        fill_patient(wizard);
        wizard.next().unwrap();
        fill_symptom(wizard);
        wizard.add_symptom().unwrap();
        wizard.next().unwrap();
        fill_follow_up(wizard);
        wizard.next().unwrap();
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let submitter = Arc::new(MockSubmitter::new(0));
        let mut wizard = wizard(Arc::clone(&submitter));

        assert_eq!(wizard.current_step(), WizardStep::Welcome);
        assert_eq!(wizard.next().unwrap(), WizardStep::PatientInfo);
        fill_patient(&mut wizard);
        assert_eq!(wizard.next().unwrap(), WizardStep::Symptoms);
        fill_symptom(&mut wizard);
        wizard.add_symptom().unwrap();
        assert_eq!(wizard.next().unwrap(), WizardStep::FollowUp);
        fill_follow_up(&mut wizard);
        assert_eq!(wizard.next().unwrap(), WizardStep::Summary);

        let payload = serde_json::to_value(wizard.submission_payload()).unwrap();
        assert_eq!(payload["firstName"], "Ada");
        assert_eq!(payload["email"], "ada@example.com");
        assert_eq!(payload["medicalHistory"], serde_json::json!(["None"]));
        assert_eq!(payload["symptoms"].as_array().unwrap().len(), 1);
        assert_eq!(payload["symptoms"][0]["symptomId"], "s-1");
        assert_eq!(payload["followUp"]["urgency"], "low");

        assert_eq!(wizard.summary_action(), SummaryAction::Submit);
        let receipt = wizard.submit().await.unwrap();
        assert_eq!(receipt.body["id"], 7);
        assert_eq!(wizard.summary_action(), SummaryAction::DownloadCopy);
        assert_eq!(wizard.current_step(), WizardStep::Summary);
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(submitter.last_payload.lock().unwrap().as_ref(), Some(&payload));
    }

    #[tokio::test]
    async fn test_gate_errors_are_exposed_to_views() {
        let mut wizard = wizard(Arc::new(MockSubmitter::new(0)));
        wizard.next().unwrap();
        wizard.update_patient(PatientInfoPatch::default().first_name("Ada"));

        assert!(wizard.next().is_err());
        assert_eq!(wizard.current_step(), WizardStep::PatientInfo);
        match wizard.active_view() {
            StepView::PatientInfo { errors, info } => {
                assert!(errors.contains_key("email"));
                assert_eq!(info.first_name, "Ada");
            }
            other => panic!("unexpected view: {:?}", other),
        }

        fill_patient(&mut wizard);
        wizard.next().unwrap();
        assert!(wizard.next().is_err());
        match wizard.active_view() {
            StepView::Symptoms { general_error, .. } => {
                assert_eq!(general_error, Some(crate::state_machine::SYMPTOMS_REQUIRED));
            }
            other => panic!("unexpected view: {:?}", other),
        }

        assert_eq!(wizard.back().unwrap(), WizardStep::PatientInfo);
        assert_eq!(wizard.record().patient_info.first_name, "Ada");
        assert!(wizard.step_errors().is_empty());
    }

    #[tokio::test]
    async fn test_failed_submission_allows_retry() {
        let submitter = Arc::new(MockSubmitter::new(1));
        let mut wizard = wizard(Arc::clone(&submitter));
        walk_to_summary(&mut wizard).await;
        let before = wizard.record().clone();

        match wizard.submit().await {
            Err(IntakeError::Submission(reason)) => {
                assert_eq!(reason, "Server Error, try again later!")
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(wizard.status(), SubmissionStatus::Failed(_)));
        assert_eq!(wizard.summary_action(), SummaryAction::Submit);
        assert_eq!(wizard.current_step(), WizardStep::Summary);
        assert_eq!(wizard.record(), &before);

        wizard.submit().await.unwrap();
        assert!(wizard.status().is_succeeded());
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pending_submission_blocks_duplicates() {
        let mut wizard = wizard(Arc::new(MockSubmitter::new(0)));
        walk_to_summary(&mut wizard).await;

        let payload = wizard.begin_submit().unwrap();
        assert_eq!(payload.symptoms.len(), 1);
        assert!(wizard.status().is_pending());
        assert!(matches!(
            wizard.begin_submit(),
            Err(IntakeError::SubmissionPending)
        ));
        assert!(matches!(
            wizard.submit().await,
            Err(IntakeError::SubmissionPending)
        ));

        wizard.finish_submit(SubmissionOutcome::Failure("Request timed out. Please try again.".to_string()));
        assert!(wizard.begin_submit().is_ok());
    }

    #[tokio::test]
    async fn test_submit_only_from_summary() {
        let mut wizard = wizard(Arc::new(MockSubmitter::new(0)));
        assert!(matches!(
            wizard.submit().await,
            Err(IntakeError::InvalidStateTransition { .. })
        ));
        assert_eq!(wizard.status(), &SubmissionStatus::Idle);
    }

    #[tokio::test]
    async fn test_export_after_success() {
        let exporter = Arc::new(MemoryExporter {
            exported: Mutex::new(Vec::new()),
        });
        let mut wizard =
            wizard(Arc::new(MockSubmitter::new(0))).with_exporter(exporter.clone());
        walk_to_summary(&mut wizard).await;

        assert!(matches!(
            wizard.export().await,
            Err(IntakeError::GateRefused(_))
        ));

        wizard.submit().await.unwrap();
        assert_eq!(wizard.export().await.unwrap(), "memory://copy-1");
        let exported = exporter.exported.lock().unwrap();
        assert!(exported[0].contains("1. Cough — dry cough"));
    }

    #[tokio::test]
    async fn test_queued_view_intents_and_reset() {
        let mut wizard = wizard(Arc::new(MockSubmitter::new(0)));
        let handle = wizard.handle();
        handle.dispatch(Intent::SetPatientField(
            PatientInfoPatch::default().first_name("Grace"),
        ));
        assert_eq!(wizard.sync(), 1);
        assert_eq!(wizard.record().patient_info.first_name, "Grace");

        walk_to_summary(&mut wizard).await;
        wizard.submit().await.unwrap();

        wizard.reset();
        assert_eq!(wizard.current_step(), WizardStep::Welcome);
        assert_eq!(wizard.record(), &ConsultationRecord::empty());
        assert_eq!(wizard.status(), &SubmissionStatus::Idle);
        assert_eq!(wizard.summary_action(), SummaryAction::Submit);
    }

    #[tokio::test]
    async fn test_second_submit_after_success_is_refused() {
        let submitter = Arc::new(MockSubmitter::new(0));
        let mut wizard = wizard(Arc::clone(&submitter));
        walk_to_summary(&mut wizard).await;

        wizard.submit().await.unwrap();
        assert!(matches!(
            wizard.submit().await,
            Err(IntakeError::GateRefused(_))
        ));
        assert!(wizard.status().is_succeeded());
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_leaving_summary_clears_submission_status() {
        let submitter = Arc::new(MockSubmitter::new(0));
        let mut wizard = wizard(Arc::clone(&submitter));
        walk_to_summary(&mut wizard).await;
        wizard.submit().await.unwrap();

        assert_eq!(wizard.back().unwrap(), WizardStep::FollowUp);
        assert_eq!(wizard.status(), &SubmissionStatus::Idle);
        wizard.update_follow_up(FollowUpPatch::default().urgency(Urgency::High));
        assert_eq!(wizard.next().unwrap(), WizardStep::Summary);

        assert_eq!(wizard.summary_action(), SummaryAction::Submit);
        assert!(matches!(
            wizard.export().await,
            Err(IntakeError::GateRefused(_))
        ));
        wizard.submit().await.unwrap();
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            submitter.last_payload.lock().unwrap().as_ref().unwrap()["followUp"]["urgency"],
            "high"
        );
    }
}
