//! 摘要视图
//!
//! 从问诊记录派生的只读视图，用于最后一步展示和本地副本导出。

use intake_core::{ConsultationRecord, Symptom};
use serde::Serialize;
use std::fmt;

/// 摘要页的主操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SummaryAction {
    Submit,
    DownloadCopy,
}

impl SummaryAction {
    pub fn label(&self) -> &'static str {
        match self {
            SummaryAction::Submit => "Submit Consultation",
            SummaryAction::DownloadCopy => "Download a Copy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub date_of_birth: String,
    pub gender: String,
    pub address: String,
    /// "姓名 (电话)"
    pub emergency_contact: String,
    pub medical_history: Vec<String>,
    pub current_medications: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomLine {
    pub heading: String,
    pub severity: String,
    pub duration: String,
    pub frequency: String,
}

impl SymptomLine {
    fn new(position: usize, symptom: &Symptom) -> Self {
        Self {
            heading: format!("{}. {} — {}", position, symptom.name, symptom.description),
            severity: symptom.severity.to_string(),
            duration: symptom.duration.label().to_string(),
            frequency: symptom.frequency.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpSummary {
    pub contact_method: String,
    pub preferred_time: String,
    pub urgency: String,
    pub additional_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    pub patient: PatientSummary,
    pub symptoms: Vec<SymptomLine>,
    pub follow_up: FollowUpSummary,
    pub action: SummaryAction,
}

fn or_dash(value: Option<String>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or_else(|| "-".to_string())
}

impl SummaryView {
    pub fn from_record(record: &ConsultationRecord, action: SummaryAction) -> Self {
        let p = &record.patient_info;
        let f = &record.follow_up;

        let patient = PatientSummary {
            full_name: p.full_name(),
            email: p.email.clone(),
            phone_number: p.phone_number.clone(),
            date_of_birth: p.date_of_birth.clone(),
            gender: or_dash(p.gender.map(|g| g.to_string())),
            address: p.address.clone(),
            emergency_contact: format!(
                "{} ({})",
                p.emergency_contact_name, p.emergency_contact_phone
            ),
            medical_history: p.medical_history.clone(),
            current_medications: p.current_medications.clone().filter(|m| !m.is_empty()),
        };

        let symptoms = record
            .symptoms
            .iter()
            .enumerate()
            .map(|(i, s)| SymptomLine::new(i + 1, s))
            .collect();

        let follow_up = FollowUpSummary {
            contact_method: or_dash(f.preferred_contact_method.map(|v| v.to_string())),
            preferred_time: or_dash(f.preferred_time.map(|v| v.to_string())),
            urgency: or_dash(f.urgency.map(|v| v.to_string())),
            additional_notes: f.additional_notes.clone().filter(|n| !n.is_empty()),
        };

        Self {
            patient,
            symptoms,
            follow_up,
            action,
        }
    }

    /// 纯文本格式，用于打印或导出
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SummaryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.patient;
        writeln!(f, "Consultation Summary")?;
        writeln!(f)?;
        writeln!(f, "Patient Information")?;
        writeln!(f, "  Name: {}", p.full_name)?;
        writeln!(f, "  Email: {}", p.email)?;
        writeln!(f, "  Phone: {}", p.phone_number)?;
        writeln!(f, "  Date of Birth: {}", p.date_of_birth)?;
        writeln!(f, "  Gender: {}", p.gender)?;
        writeln!(f, "  Address: {}", p.address)?;
        writeln!(f, "  Emergency Contact: {}", p.emergency_contact)?;
        writeln!(f, "  Medical History: {}", p.medical_history.join(", "))?;
        if let Some(meds) = &p.current_medications {
            writeln!(f, "  Current Medications: {}", meds)?;
        }

        writeln!(f)?;
        writeln!(f, "Symptoms")?;
        for line in &self.symptoms {
            writeln!(f, "  {}", line.heading)?;
            writeln!(
                f,
                "     Severity: {} | Duration: {} | Frequency: {}",
                line.severity, line.duration, line.frequency
            )?;
        }

        let fu = &self.follow_up;
        writeln!(f)?;
        writeln!(f, "Follow-up Preferences")?;
        writeln!(f, "  Contact Method: {}", fu.contact_method)?;
        writeln!(f, "  Preferred Time: {}", fu.preferred_time)?;
        writeln!(f, "  Urgency: {}", fu.urgency)?;
        if let Some(notes) = &fu.additional_notes {
            writeln!(f, "  Additional Notes: {}", notes)?;
        }
        Ok(())
    }
}
