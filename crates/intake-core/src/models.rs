//! 核心数据模型定义

use crate::error::{IntakeError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 固定取值目录：线上取值即 `as_str()`，反序列化时按目录解析
macro_rules! catalog {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($variant:ident => $wire:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// 目录中的全部取值（按展示顺序）
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IntakeError;

            fn try_from(value: &str) -> Result<Self> {
                match value.trim() {
                    $($wire $(| $alias)* => Ok($name::$variant),)+
                    other => Err(IntakeError::UnknownValue {
                        field: $field.to_string(),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = IntakeError;

            fn from_str(s: &str) -> Result<Self> {
                Self::try_from(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::try_from(raw.as_str()).map_err(serde::de::Error::custom)
            }
        }
    };
}

catalog! {
    /// 性别
    Gender, "gender" {
        Male => "male" | "Male",
        Female => "female" | "Female",
        Other => "other" | "Other",
    }
}

catalog! {
    /// 症状严重程度
    Severity, "severity" {
        Mild => "mild" | "Mild",
        Moderate => "moderate" | "Moderate",
        Severe => "severe" | "Severe",
    }
}

catalog! {
    /// 症状发作频率
    Frequency, "frequency" {
        Intermittent => "Intermittent" | "intermittent",
        Constant => "Constant" | "constant",
    }
}

catalog! {
    /// 症状持续时间
    SymptomDuration, "duration" {
        LessThanHour => "less_than_hour",
        FewHours => "few_hours",
        OneDay => "1 day",
        FewDays => "few_days",
        OneWeek => "one_week",
        MoreThanWeek => "more_than_week",
    }
}

impl SymptomDuration {
    /// 展示用标签
    pub fn label(&self) -> &'static str {
        match self {
            SymptomDuration::LessThanHour => "Less than an hour",
            SymptomDuration::FewHours => "A few hours",
            SymptomDuration::OneDay => "1 day",
            SymptomDuration::FewDays => "A few days",
            SymptomDuration::OneWeek => "One week",
            SymptomDuration::MoreThanWeek => "More than a week",
        }
    }
}

catalog! {
    /// 症状名称目录
    SymptomName, "name" {
        Fever => "Fever/High Temperature",
        ChestPain => "Chest Pain",
        DifficultyBreathing => "Difficulty Breathing",
        SevereHeadache => "Severe Headache",
        AbdominalPain => "Abdominal Pain",
        NauseaVomiting => "Nausea/Vomiting",
        Diarrhea => "Diarrhea",
        Cough => "Cough",
        SoreThroat => "Sore Throat",
        FatigueWeakness => "Fatigue/Weakness",
        Dizziness => "Dizziness",
        SkinRash => "Skin Rash",
        JointPain => "Joint Pain",
        BackPain => "Back Pain",
        UrinaryProblems => "Urinary Problems",
    }
}

catalog! {
    /// 首选联系方式
    ContactMethod, "preferredContactMethod" {
        Email => "email",
        Phone => "phone",
        Sms => "sms",
    }
}

catalog! {
    /// 首选联系时段
    PreferredTime, "preferredTime" {
        Morning => "morning",
        Afternoon => "afternoon",
        Evening => "evening",
        Anytime => "anytime",
    }
}

catalog! {
    /// 紧急程度
    Urgency, "urgency" {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

/// 病史多选项
pub const MEDICAL_HISTORY_OPTIONS: &[&str] = &[
    "Diabetes",
    "Hypertension",
    "Asthma",
    "Heart Disease",
    "Known Allergies",
    "None",
];

/// 症状标识符，创建时生成，永不为空
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SymptomId(String);

impl SymptomId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(IntakeError::InvalidIdentifier(
                "symptom id cannot be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// 生成器产出的标识符，调用方保证非空
    pub(crate) fn generated(value: String) -> Self {
        debug_assert!(!value.trim().is_empty());
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SymptomId {
    type Error = IntakeError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SymptomId> for String {
    fn from(id: SymptomId) -> Self {
        id.0
    }
}

impl fmt::Display for SymptomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 患者身份与联系信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub date_of_birth: String,
    pub gender: Option<Gender>,
    pub address: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub medical_history: Vec<String>,
    pub current_medications: Option<String>,
}

impl PatientInfo {
    /// 合并部分字段，未提供的字段保持不变
    pub fn merge(&mut self, patch: PatientInfoPatch) {
        let PatientInfoPatch {
            first_name,
            last_name,
            email,
            phone_number,
            date_of_birth,
            gender,
            address,
            emergency_contact_name,
            emergency_contact_phone,
            medical_history,
            current_medications,
        } = patch;

        if let Some(v) = first_name {
            self.first_name = v;
        }
        if let Some(v) = last_name {
            self.last_name = v;
        }
        if let Some(v) = email {
            self.email = v;
        }
        if let Some(v) = phone_number {
            self.phone_number = v;
        }
        if let Some(v) = date_of_birth {
            self.date_of_birth = v;
        }
        if let Some(v) = gender {
            self.gender = Some(v);
        }
        if let Some(v) = address {
            self.address = v;
        }
        if let Some(v) = emergency_contact_name {
            self.emergency_contact_name = v;
        }
        if let Some(v) = emergency_contact_phone {
            self.emergency_contact_phone = v;
        }
        if let Some(mut v) = medical_history {
            // 集合语义：保留首次出现的顺序
            let mut seen = std::collections::HashSet::new();
            v.retain(|tag| seen.insert(tag.clone()));
            self.medical_history = v;
        }
        if let Some(v) = current_medications {
            self.current_medications = Some(v);
        }
    }

    /// 病史多选切换：已选则移除，未选则追加
    pub fn toggle_medical_history(&self, tag: &str) -> PatientInfoPatch {
        let mut history = self.medical_history.clone();
        if let Some(pos) = history.iter().position(|t| t == tag) {
            history.remove(pos);
        } else {
            history.push(tag.to_string());
        }
        PatientInfoPatch::default().medical_history(history)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// 患者信息的部分更新
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientInfoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_medications: Option<String>,
}

impl PatientInfoPatch {
    pub fn first_name(mut self, v: impl Into<String>) -> Self {
        self.first_name = Some(v.into());
        self
    }

    pub fn last_name(mut self, v: impl Into<String>) -> Self {
        self.last_name = Some(v.into());
        self
    }

    pub fn email(mut self, v: impl Into<String>) -> Self {
        self.email = Some(v.into());
        self
    }

    pub fn phone_number(mut self, v: impl Into<String>) -> Self {
        self.phone_number = Some(v.into());
        self
    }

    pub fn date_of_birth(mut self, v: impl Into<String>) -> Self {
        self.date_of_birth = Some(v.into());
        self
    }

    pub fn gender(mut self, v: Gender) -> Self {
        self.gender = Some(v);
        self
    }

    pub fn address(mut self, v: impl Into<String>) -> Self {
        self.address = Some(v.into());
        self
    }

    pub fn emergency_contact_name(mut self, v: impl Into<String>) -> Self {
        self.emergency_contact_name = Some(v.into());
        self
    }

    pub fn emergency_contact_phone(mut self, v: impl Into<String>) -> Self {
        self.emergency_contact_phone = Some(v.into());
        self
    }

    pub fn medical_history(mut self, v: Vec<String>) -> Self {
        self.medical_history = Some(v);
        self
    }

    pub fn current_medications(mut self, v: impl Into<String>) -> Self {
        self.current_medications = Some(v.into());
        self
    }
}

/// 一条已登记的症状
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symptom {
    pub symptom_id: SymptomId,
    pub name: SymptomName,
    pub description: String,
    pub severity: Severity,
    pub duration: SymptomDuration,
    pub frequency: Frequency,
}

/// 症状录入草稿，校验通过后才成为 `Symptom`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SymptomDraft {
    pub name: Option<SymptomName>,
    pub description: String,
    pub severity: Option<Severity>,
    pub duration: Option<SymptomDuration>,
    pub frequency: Option<Frequency>,
}

impl SymptomDraft {
    pub fn is_blank(&self) -> bool {
        *self == SymptomDraft::default()
    }
}

/// 随访偏好
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FollowUp {
    pub preferred_contact_method: Option<ContactMethod>,
    pub preferred_time: Option<PreferredTime>,
    pub urgency: Option<Urgency>,
    pub additional_notes: Option<String>,
}

impl FollowUp {
    pub fn merge(&mut self, patch: FollowUpPatch) {
        if let Some(v) = patch.preferred_contact_method {
            self.preferred_contact_method = Some(v);
        }
        if let Some(v) = patch.preferred_time {
            self.preferred_time = Some(v);
        }
        if let Some(v) = patch.urgency {
            self.urgency = Some(v);
        }
        if let Some(v) = patch.additional_notes {
            self.additional_notes = Some(v);
        }
    }
}

/// 随访偏好的部分更新
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FollowUpPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_contact_method: Option<ContactMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_time: Option<PreferredTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

impl FollowUpPatch {
    pub fn preferred_contact_method(mut self, v: ContactMethod) -> Self {
        self.preferred_contact_method = Some(v);
        self
    }

    pub fn preferred_time(mut self, v: PreferredTime) -> Self {
        self.preferred_time = Some(v);
        self
    }

    pub fn urgency(mut self, v: Urgency) -> Self {
        self.urgency = Some(v);
        self
    }

    pub fn additional_notes(mut self, v: impl Into<String>) -> Self {
        self.additional_notes = Some(v.into());
        self
    }
}

/// 一次问诊的聚合记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsultationRecord {
    pub patient_info: PatientInfo,
    pub symptoms: Vec<Symptom>,
    pub follow_up: FollowUp,
}

impl ConsultationRecord {
    /// 空聚合：所有字符串为空，症状列表为空
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn find_symptom(&self, id: &SymptomId) -> Option<&Symptom> {
        self.symptoms.iter().find(|s| &s.symptom_id == id)
    }

    /// 展平为提交载荷
    pub fn to_payload(&self) -> SubmissionPayload {
        SubmissionPayload {
            patient_info: self.patient_info.clone(),
            symptoms: self.symptoms.clone(),
            follow_up: self.follow_up.clone(),
        }
    }
}

/// 提交载荷：患者字段展开在顶层，另附症状列表与随访偏好
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    #[serde(flatten)]
    pub patient_info: PatientInfo,
    pub symptoms: Vec<Symptom>,
    pub follow_up: FollowUp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cough(id: &str) -> Symptom {
        Symptom {
            symptom_id: SymptomId::new(id).unwrap(),
            name: SymptomName::Cough,
            description: "dry cough".to_string(),
            severity: Severity::Mild,
            duration: SymptomDuration::OneDay,
            frequency: Frequency::Intermittent,
        }
    }

    #[test]
    fn test_catalog_round_trip_values() {
        assert_eq!(SymptomName::try_from("Cough").unwrap(), SymptomName::Cough);
        assert_eq!(SymptomDuration::try_from("1 day").unwrap(), SymptomDuration::OneDay);
        assert_eq!(Frequency::try_from("intermittent").unwrap(), Frequency::Intermittent);
        assert_eq!(Frequency::Intermittent.as_str(), "Intermittent");
        assert_eq!(SymptomName::ALL.len(), 15);
        assert_eq!(SymptomDuration::FewDays.label(), "A few days");
    }

    #[test]
    fn test_unknown_catalog_value() {
        let err = Urgency::try_from("extreme").unwrap_err();
        match err {
            IntakeError::UnknownValue { field, value } => {
                assert_eq!(field, "urgency");
                assert_eq!(value, "extreme");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_symptom_id_rejects_blank() {
        assert!(SymptomId::new("").is_err());
        assert!(SymptomId::new("   ").is_err());
        assert!(serde_json::from_str::<SymptomId>("\"\"").is_err());
        assert_eq!(SymptomId::new("abc").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_patient_merge_keeps_other_fields() {
        let mut info = PatientInfo {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            ..Default::default()
        };
        info.merge(PatientInfoPatch::default().email("ada@example.com"));

        assert_eq!(info.first_name, "Ada");
        assert_eq!(info.last_name, "Lovelace");
        assert_eq!(info.email, "ada@example.com");
        assert!(info.gender.is_none());
    }

    #[test]
    fn test_merge_drops_duplicate_history_tags() {
        let mut info = PatientInfo::default();
        info.merge(PatientInfoPatch::default().medical_history(vec![
            "Asthma".to_string(),
            "None".to_string(),
            "Asthma".to_string(),
        ]));
        assert_eq!(info.medical_history, vec!["Asthma", "None"]);
    }

    #[test]
    fn test_toggle_medical_history() {
        let mut info = PatientInfo::default();
        let patch = info.toggle_medical_history("Asthma");
        info.merge(patch);
        assert_eq!(info.medical_history, vec!["Asthma".to_string()]);

        let patch = info.toggle_medical_history("Asthma");
        info.merge(patch);
        assert!(info.medical_history.is_empty());
    }

    #[test]
    fn test_payload_flattens_patient_info() {
        let mut record = ConsultationRecord::empty();
        record.patient_info.first_name = "Ada".to_string();
        record.patient_info.email = "ada@example.com".to_string();
        record.symptoms.push(cough("s-1"));
        record.follow_up.urgency = Some(Urgency::Low);

        let value = serde_json::to_value(record.to_payload()).unwrap();
        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["email"], "ada@example.com");
        assert!(value.get("patientInfo").is_none());
        assert_eq!(value["symptoms"][0]["symptomId"], "s-1");
        assert_eq!(value["symptoms"][0]["duration"], "1 day");
        assert_eq!(value["symptoms"][0]["frequency"], "Intermittent");
        assert_eq!(value["followUp"]["urgency"], "low");
        assert!(value["followUp"].get("frequency").is_none());
    }

    #[test]
    fn test_patch_deserializes_partial_json() {
        let patch: PatientInfoPatch =
            serde_json::from_str(r#"{"firstName":"Ada","gender":"female"}"#).unwrap();
        assert_eq!(patch.first_name.as_deref(), Some("Ada"));
        assert_eq!(patch.gender, Some(Gender::Female));
        assert!(patch.email.is_none());
    }
}
