//! 症状录入子流程
//!
//! 草稿先校验，通过后生成标识符、投递 `AddSymptom` 并清空草稿；
//! 校验失败时草稿原样保留，错误可供视图显示。

use crate::store::{Intent, RecordStore};
use intake_core::{FieldErrors, IdGenerator, IntakeError, Result, SymptomDraft, SymptomId, Validator};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct SymptomEntry {
    draft: SymptomDraft,
    errors: FieldErrors,
}

impl SymptomEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &SymptomDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut SymptomDraft {
        &mut self.draft
    }

    pub fn set_draft(&mut self, draft: SymptomDraft) {
        self.draft = draft;
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// 提交草稿，成功时返回新症状的标识符
    pub fn submit(
        &mut self,
        store: &mut RecordStore,
        validator: &dyn Validator,
        ids: &dyn IdGenerator,
    ) -> Result<SymptomId> {
        if let Err(errors) = validator.validate_symptom(&self.draft) {
            debug!("Symptom draft rejected: {}", errors);
            self.errors = errors.clone();
            return Err(IntakeError::Validation(errors));
        }

        let symptom = self.draft.clone().into_symptom(ids.next_id())?;
        let id = symptom.symptom_id.clone();
        store.dispatch(Intent::AddSymptom(symptom));

        self.draft = SymptomDraft::default();
        self.errors = FieldErrors::new();
        info!("Symptom {} added", id);
        Ok(id)
    }

    /// 删除症状，无需确认
    pub fn remove(&self, store: &mut RecordStore, id: SymptomId) {
        debug!("Removing symptom {}", id);
        store.dispatch(Intent::RemoveSymptom(id));
    }

    pub fn clear(&mut self) {
        self.draft = SymptomDraft::default();
        self.errors = FieldErrors::new();
    }
}
