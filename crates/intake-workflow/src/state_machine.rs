//! 向导步骤状态机
//!
//! 管理 Welcome -> PatientInfo -> Symptoms -> FollowUp -> Summary 的步骤转换。
//! 前进需要通过当前步骤的校验门；后退不做校验。

use intake_core::{ConsultationRecord, IntakeError, Result, Validator};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

/// 症状步骤的通用错误信息
pub const SYMPTOMS_REQUIRED: &str = "Please add at least one symptom to continue";

/// 向导步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WizardStep {
    Welcome,
    PatientInfo,
    Symptoms,
    FollowUp,
    Summary,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::Welcome,
        WizardStep::PatientInfo,
        WizardStep::Symptoms,
        WizardStep::FollowUp,
        WizardStep::Summary,
    ];

    pub fn index(&self) -> usize {
        match self {
            WizardStep::Welcome => 0,
            WizardStep::PatientInfo => 1,
            WizardStep::Symptoms => 2,
            WizardStep::FollowUp => 3,
            WizardStep::Summary => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            WizardStep::Welcome => "Welcome",
            WizardStep::PatientInfo => "Patient Info",
            WizardStep::Symptoms => "Symptoms",
            WizardStep::FollowUp => "Follow-up",
            WizardStep::Summary => "Summary",
        }
    }
}

impl Default for WizardStep {
    fn default() -> Self {
        WizardStep::Welcome
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 步骤转换事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepEvent {
    Advance,
    Retreat,
}

/// 步骤转换表
#[derive(Debug)]
pub struct StepStateMachine {
    transitions: HashMap<(WizardStep, StepEvent), WizardStep>,
}

impl StepStateMachine {
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        for pair in WizardStep::ALL.windows(2) {
            transitions.insert((pair[0], StepEvent::Advance), pair[1]);
            transitions.insert((pair[1], StepEvent::Retreat), pair[0]);
        }

        Self { transitions }
    }

    pub fn can_transition(&self, from: WizardStep, event: StepEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    pub fn transition(&self, from: WizardStep, event: StepEvent) -> Result<WizardStep> {
        match self.transitions.get(&(from, event)) {
            Some(to) => Ok(*to),
            None => Err(IntakeError::InvalidStateTransition {
                from: format!("{:?}", from),
                event: format!("{:?}", event),
            }),
        }
    }

    pub fn get_possible_events(&self, current: WizardStep) -> Vec<StepEvent> {
        let mut events: Vec<StepEvent> = self
            .transitions
            .keys()
            .filter(|(step, _)| *step == current)
            .map(|(_, event)| *event)
            .collect();
        events.sort_by_key(|e| matches!(e, StepEvent::Retreat));
        events
    }
}

impl Default for StepStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// 进度条上单个步骤的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerState {
    Completed,
    Current,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepMarker {
    pub step: WizardStep,
    pub label: &'static str,
    pub state: MarkerState,
}

/// 进度指示
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub step: WizardStep,
    pub total: usize,
    pub label: &'static str,
    pub percent: u8,
    pub markers: Vec<StepMarker>,
}

impl Progress {
    pub fn for_step(step: WizardStep) -> Self {
        let total = WizardStep::ALL.len();
        let percent = (((step.index() + 1) as f64 / total as f64) * 100.0).round() as u8;
        let markers = WizardStep::ALL
            .iter()
            .map(|s| StepMarker {
                step: *s,
                label: s.label(),
                state: match s.index().cmp(&step.index()) {
                    std::cmp::Ordering::Less => MarkerState::Completed,
                    std::cmp::Ordering::Equal => MarkerState::Current,
                    std::cmp::Ordering::Greater => MarkerState::Upcoming,
                },
            })
            .collect();

        Self {
            step,
            total,
            label: step.label(),
            percent,
            markers,
        }
    }
}

/// 步骤控制器：持有当前步骤，并在前进前执行校验门
#[derive(Debug, Default)]
pub struct StepController {
    machine: StepStateMachine,
    current: WizardStep,
}

impl StepController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> WizardStep {
        self.current
    }

    pub fn progress(&self) -> Progress {
        Progress::for_step(self.current)
    }

    /// 检查离开 `step` 的校验门
    pub fn check_gate(
        step: WizardStep,
        record: &ConsultationRecord,
        validator: &dyn Validator,
    ) -> Result<()> {
        match step {
            WizardStep::Welcome => Ok(()),
            WizardStep::PatientInfo => validator
                .validate_patient(&record.patient_info)
                .map_err(IntakeError::Validation),
            WizardStep::Symptoms => {
                if record.symptoms.is_empty() {
                    Err(IntakeError::GateRefused(SYMPTOMS_REQUIRED.to_string()))
                } else {
                    Ok(())
                }
            }
            WizardStep::FollowUp => validator
                .validate_follow_up(&record.follow_up)
                .map_err(IntakeError::Validation),
            // Summary 没有前进转换，由提交负责
            WizardStep::Summary => Ok(()),
        }
    }

    /// 前进一步；校验失败或无后续步骤时保持原地
    pub fn advance(
        &mut self,
        record: &ConsultationRecord,
        validator: &dyn Validator,
    ) -> Result<WizardStep> {
        let from = self.current;
        let to = self.machine.transition(from, StepEvent::Advance)?;

        if let Err(e) = Self::check_gate(from, record, validator) {
            warn!("Gate refused leaving step {}: {}", from, e);
            return Err(e);
        }

        self.current = to;
        info!("Wizard advanced from {} to {}", from, to);
        Ok(to)
    }

    /// 后退一步，不做校验
    pub fn retreat(&mut self) -> Result<WizardStep> {
        let from = self.current;
        let to = self.machine.transition(from, StepEvent::Retreat)?;
        self.current = to;
        info!("Wizard went back from {} to {}", from, to);
        Ok(to)
    }

    /// 按目标步骤移动，只接受相邻步骤
    pub fn move_to(
        &mut self,
        target: WizardStep,
        record: &ConsultationRecord,
        validator: &dyn Validator,
    ) -> Result<WizardStep> {
        let current = self.current.index();
        let target_index = target.index();

        if target_index == current + 1 {
            self.advance(record, validator)
        } else if target_index + 1 == current {
            self.retreat()
        } else if target_index == current {
            Ok(self.current)
        } else {
            Err(IntakeError::InvalidStateTransition {
                from: format!("{:?}", self.current),
                event: format!("JumpTo({:?})", target),
            })
        }
    }

    pub fn reset(&mut self) {
        self.current = WizardStep::Welcome;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_core::{
        ContactMethod, Frequency, Gender, PreferredTime, SchemaValidator, Severity, Symptom,
        SymptomDuration, SymptomId, SymptomName, Urgency,
    };

    fn complete_record() -> ConsultationRecord {
        let mut record = ConsultationRecord::empty();
        let p = &mut record.patient_info;
        p.first_name = "Ada".to_string();
        p.last_name = "Lovelace".to_string();
        p.email = "ada@example.com".to_string();
        p.phone_number = "555-0100".to_string();
        p.date_of_birth = "1815-12-10".to_string();
        p.gender = Some(Gender::Female);
        p.address = "London".to_string();
        p.emergency_contact_name = "Mary".to_string();
        p.emergency_contact_phone = "555-0101".to_string();
        p.medical_history = vec!["None".to_string()];
        record.symptoms.push(Symptom {
            symptom_id: SymptomId::new("s-1").unwrap(),
            name: SymptomName::Cough,
            description: "dry cough".to_string(),
            severity: Severity::Mild,
            duration: SymptomDuration::OneDay,
            frequency: Frequency::Intermittent,
        });
        record.follow_up.preferred_contact_method = Some(ContactMethod::Email);
        record.follow_up.preferred_time = Some(PreferredTime::Morning);
        record.follow_up.urgency = Some(Urgency::Low);
        record
    }

    #[test]
    fn test_valid_transitions() {
        let sm = StepStateMachine::new();

        assert!(sm.can_transition(WizardStep::Welcome, StepEvent::Advance));
        assert!(sm.can_transition(WizardStep::FollowUp, StepEvent::Advance));
        assert!(sm.can_transition(WizardStep::Summary, StepEvent::Retreat));
        assert_eq!(
            sm.transition(WizardStep::Symptoms, StepEvent::Retreat).unwrap(),
            WizardStep::PatientInfo
        );
    }

    #[test]
    fn test_invalid_transitions() {
        let sm = StepStateMachine::new();

        assert!(!sm.can_transition(WizardStep::Welcome, StepEvent::Retreat));
        assert!(!sm.can_transition(WizardStep::Summary, StepEvent::Advance));
        assert_eq!(
            sm.get_possible_events(WizardStep::Welcome),
            vec![StepEvent::Advance]
        );
        assert_eq!(
            sm.get_possible_events(WizardStep::Symptoms),
            vec![StepEvent::Advance, StepEvent::Retreat]
        );
    }

    #[test]
    fn test_patient_gate_reports_email() {
        let mut record = complete_record();
        record.patient_info.email.clear();

        let mut controller = StepController::new();
        controller.advance(&record, &SchemaValidator).unwrap();
        assert_eq!(controller.current(), WizardStep::PatientInfo);

        let err = controller.advance(&record, &SchemaValidator).unwrap_err();
        let errors = err.field_errors().unwrap();
        assert!(!errors.is_empty());
        assert!(errors.contains_key("email"));
        assert_eq!(controller.current(), WizardStep::PatientInfo);
    }

    #[test]
    fn test_symptoms_gate() {
        let mut record = complete_record();
        let symptoms = std::mem::take(&mut record.symptoms);

        let mut controller = StepController::new();
        controller.advance(&record, &SchemaValidator).unwrap();
        controller.advance(&record, &SchemaValidator).unwrap();
        assert_eq!(controller.current(), WizardStep::Symptoms);

        match controller.advance(&record, &SchemaValidator) {
            Err(IntakeError::GateRefused(msg)) => assert_eq!(msg, SYMPTOMS_REQUIRED),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(controller.current(), WizardStep::Symptoms);

        record.symptoms = symptoms;
        assert_eq!(
            controller.advance(&record, &SchemaValidator).unwrap(),
            WizardStep::FollowUp
        );
    }

    #[test]
    fn test_summary_has_no_forward_transition() {
        let record = complete_record();
        let mut controller = StepController::new();
        for _ in 0..4 {
            controller.advance(&record, &SchemaValidator).unwrap();
        }
        assert_eq!(controller.current(), WizardStep::Summary);

        let err = controller.advance(&record, &SchemaValidator).unwrap_err();
        assert!(matches!(err, IntakeError::InvalidStateTransition { .. }));
        assert_eq!(controller.current(), WizardStep::Summary);
    }

    #[test]
    fn test_retreat_needs_no_validation() {
        let record = complete_record();
        let mut controller = StepController::new();
        assert!(controller.retreat().is_err());

        controller.advance(&record, &SchemaValidator).unwrap();
        controller.advance(&record, &SchemaValidator).unwrap();
        assert_eq!(controller.retreat().unwrap(), WizardStep::PatientInfo);
        assert_eq!(controller.retreat().unwrap(), WizardStep::Welcome);
    }

    #[test]
    fn test_move_to_only_adjacent() {
        let record = complete_record();
        let mut controller = StepController::new();

        assert!(controller
            .move_to(WizardStep::Summary, &record, &SchemaValidator)
            .is_err());
        assert_eq!(
            controller
                .move_to(WizardStep::PatientInfo, &record, &SchemaValidator)
                .unwrap(),
            WizardStep::PatientInfo
        );
        assert_eq!(
            controller
                .move_to(WizardStep::Welcome, &record, &SchemaValidator)
                .unwrap(),
            WizardStep::Welcome
        );
    }

    #[test]
    fn test_progress() {
        let progress = Progress::for_step(WizardStep::Symptoms);
        assert_eq!(progress.total, 5);
        assert_eq!(progress.percent, 60);
        assert_eq!(progress.label, "Symptoms");
        assert_eq!(progress.markers[1].state, MarkerState::Completed);
        assert_eq!(progress.markers[2].state, MarkerState::Current);
        assert_eq!(progress.markers[4].state, MarkerState::Upcoming);

        assert_eq!(Progress::for_step(WizardStep::Welcome).percent, 20);
        assert_eq!(Progress::for_step(WizardStep::Summary).percent, 100);
    }
}
