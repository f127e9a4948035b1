//! 字段校验模块
//!
//! 校验规则通过 `Validator` 接口注入，向导本身只关心“通过”或“字段错误映射”。

use crate::error::{FieldErrors, IntakeError, Result};
use crate::models::{FollowUp, PatientInfo, Symptom, SymptomDraft, SymptomId};
use crate::utils::is_valid_email;
use tracing::debug;

/// 校验结果：通过，或字段 -> 提示信息
pub type Validation = std::result::Result<(), FieldErrors>;

/// 记录校验接口
pub trait Validator: Send + Sync {
    fn validate_patient(&self, patient: &PatientInfo) -> Validation;

    fn validate_symptom(&self, draft: &SymptomDraft) -> Validation;

    fn validate_follow_up(&self, follow_up: &FollowUp) -> Validation;
}

/// 默认的表单规则集
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Validator for SchemaValidator {
    fn validate_patient(&self, patient: &PatientInfo) -> Validation {
        let mut errors = FieldErrors::new();

        let required = [
            ("firstName", &patient.first_name, "First name is required"),
            ("lastName", &patient.last_name, "Last name is required"),
            ("email", &patient.email, "Email is required"),
            ("phoneNumber", &patient.phone_number, "Phone number is required"),
            ("dateOfBirth", &patient.date_of_birth, "Date of birth is required"),
            ("address", &patient.address, "Address is required"),
            (
                "emergencyContactName",
                &patient.emergency_contact_name,
                "Emergency contact is required",
            ),
            (
                "emergencyContactPhone",
                &patient.emergency_contact_phone,
                "Emergency phone is required",
            ),
        ];
        for (field, value, message) in required {
            if value.trim().is_empty() {
                errors.add(field, message);
            }
        }

        if !patient.email.trim().is_empty() && !is_valid_email(&patient.email) {
            errors.add("email", "Email is invalid");
        }

        if patient.gender.is_none() {
            errors.add("gender", "Gender is required");
        }

        if !patient.medical_history.iter().any(|tag| !tag.trim().is_empty()) {
            errors.add("medicalHistory", "Medical history is required");
        }

        finish("patientInfo", errors)
    }

    fn validate_symptom(&self, draft: &SymptomDraft) -> Validation {
        finish("symptom", missing_symptom_fields(draft))
    }

    fn validate_follow_up(&self, follow_up: &FollowUp) -> Validation {
        let mut errors = FieldErrors::new();

        if follow_up.preferred_contact_method.is_none() {
            errors.add("preferredContactMethod", "Contact method is required");
        }
        if follow_up.preferred_time.is_none() {
            errors.add("preferredTime", "Preferred time is required");
        }
        if follow_up.urgency.is_none() {
            errors.add("urgency", "Urgency level is required");
        }

        finish("followUp", errors)
    }
}

fn finish(record: &str, errors: FieldErrors) -> Validation {
    if errors.is_empty() {
        debug!("{} validation passed", record);
        Ok(())
    } else {
        debug!("{} validation failed: {}", record, errors);
        Err(errors)
    }
}

fn missing_symptom_fields(draft: &SymptomDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if draft.name.is_none() {
        errors.add("name", "Symptom name is required");
    }
    if draft.description.trim().is_empty() {
        errors.add("description", "Description is required");
    }
    if draft.severity.is_none() {
        errors.add("severity", "Severity is required");
    }
    if draft.duration.is_none() {
        errors.add("duration", "Duration is required");
    }
    if draft.frequency.is_none() {
        errors.add("frequency", "Frequency is required");
    }
    errors
}

impl SymptomDraft {
    /// 以给定标识符生成症状；缺少必填字段时返回字段错误
    pub fn into_symptom(self, symptom_id: SymptomId) -> Result<Symptom> {
        match (self.name, self.severity, self.duration, self.frequency) {
            (Some(name), Some(severity), Some(duration), Some(frequency))
                if !self.description.trim().is_empty() =>
            {
                Ok(Symptom {
                    symptom_id,
                    name,
                    description: self.description,
                    severity,
                    duration,
                    frequency,
                })
            }
            _ => Err(IntakeError::Validation(missing_symptom_fields(&self))),
        }
    }
}
