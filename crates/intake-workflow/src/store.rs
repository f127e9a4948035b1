//! 问诊记录存储
//!
//! 记录只能通过 `Intent` 修改。`apply` 是纯函数且对所有输入都有定义；
//! `RecordStore` 持有唯一的记录实例，并按到达顺序应用排队的意图。

use intake_core::{ConsultationRecord, FollowUpPatch, PatientInfoPatch, Symptom, SymptomId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// 记录修改意图
///
/// 线上格式为 `{ "type": "...", "payload": ... }`，未知类型解析为 `Unrecognized`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", try_from = "RawIntent")]
pub enum Intent {
    #[serde(rename = "UPDATE_PATIENT_INFO")]
    SetPatientField(PatientInfoPatch),
    #[serde(rename = "UPDATE_FOLLOW_UP")]
    SetFollowUpField(FollowUpPatch),
    #[serde(rename = "ADD_SYMPTOM")]
    AddSymptom(Symptom),
    #[serde(rename = "REMOVE_SYMPTOM")]
    RemoveSymptom(SymptomId),
    #[serde(rename = "RESET")]
    Reset,
    #[serde(rename = "UNRECOGNIZED")]
    Unrecognized,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::SetPatientField(_) => "UPDATE_PATIENT_INFO",
            Intent::SetFollowUpField(_) => "UPDATE_FOLLOW_UP",
            Intent::AddSymptom(_) => "ADD_SYMPTOM",
            Intent::RemoveSymptom(_) => "REMOVE_SYMPTOM",
            Intent::Reset => "RESET",
            Intent::Unrecognized => "UNRECOGNIZED",
        }
    }
}

#[derive(Deserialize)]
struct RawIntent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

impl TryFrom<RawIntent> for Intent {
    type Error = serde_json::Error;

    fn try_from(raw: RawIntent) -> Result<Self, Self::Error> {
        let intent = match raw.kind.as_str() {
            "UPDATE_PATIENT_INFO" => Intent::SetPatientField(serde_json::from_value(raw.payload)?),
            "UPDATE_FOLLOW_UP" => Intent::SetFollowUpField(serde_json::from_value(raw.payload)?),
            "ADD_SYMPTOM" => Intent::AddSymptom(serde_json::from_value(raw.payload)?),
            "REMOVE_SYMPTOM" => Intent::RemoveSymptom(serde_json::from_value(raw.payload)?),
            "RESET" => Intent::Reset,
            _ => Intent::Unrecognized,
        };
        Ok(intent)
    }
}

/// 应用一个意图，返回新的记录
///
/// 未修改的子记录原样移动到新状态中。
pub fn apply(mut state: ConsultationRecord, intent: Intent) -> ConsultationRecord {
    match intent {
        Intent::SetPatientField(patch) => {
            state.patient_info.merge(patch);
            state
        }
        Intent::SetFollowUpField(patch) => {
            state.follow_up.merge(patch);
            state
        }
        Intent::AddSymptom(symptom) => {
            state.symptoms.push(symptom);
            state
        }
        Intent::RemoveSymptom(id) => {
            if let Some(pos) = state.symptoms.iter().position(|s| s.symptom_id == id) {
                state.symptoms.remove(pos);
            }
            state
        }
        Intent::Reset => ConsultationRecord::empty(),
        Intent::Unrecognized => state,
    }
}

/// 意图投递句柄，可在视图间克隆共享
#[derive(Debug, Clone)]
pub struct StoreHandle {
    sender: mpsc::UnboundedSender<Intent>,
}

impl StoreHandle {
    /// 投递意图；存储已释放时返回 false
    pub fn dispatch(&self, intent: Intent) -> bool {
        self.sender.send(intent).is_ok()
    }
}

/// 问诊记录存储
#[derive(Debug)]
pub struct RecordStore {
    state: ConsultationRecord,
    sender: mpsc::UnboundedSender<Intent>,
    receiver: mpsc::UnboundedReceiver<Intent>,
    applied: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::with_state(ConsultationRecord::empty())
    }

    pub fn with_state(state: ConsultationRecord) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            state,
            sender,
            receiver,
            applied: 0,
        }
    }

    pub fn handle(&self) -> StoreHandle {
        StoreHandle {
            sender: self.sender.clone(),
        }
    }

    /// 立即应用意图（先应用已排队的意图以保持到达顺序）
    pub fn dispatch(&mut self, intent: Intent) {
        self.sync();
        self.apply_one(intent);
    }

    /// 应用所有已排队的意图，返回应用数量
    pub fn sync(&mut self) -> usize {
        let mut count = 0;
        while let Ok(intent) = self.receiver.try_recv() {
            self.apply_one(intent);
            count += 1;
        }
        count
    }

    /// 当前已应用的记录快照
    pub fn snapshot(&self) -> &ConsultationRecord {
        &self.state
    }

    /// 已应用意图总数
    pub fn applied_count(&self) -> u64 {
        self.applied
    }

    fn apply_one(&mut self, intent: Intent) {
        let kind = intent.as_str();
        let state = std::mem::take(&mut self.state);
        self.state = apply(state, intent);
        self.applied += 1;
        debug!(
            "Applied intent {} (symptoms: {})",
            kind,
            self.state.symptoms.len()
        );
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}
