//! 问诊向导演示程序
//!
//! 展示记录存储、步骤校验门、症状录入和提交协作者的完整流程

use async_trait::async_trait;
use intake_core::{
    ContactMethod, Frequency, Gender, PreferredTime, Severity, SubmissionPayload,
    SymptomDuration, SymptomName, Urgency,
};
use intake_core::{FollowUpPatch, PatientInfoPatch};
use intake_workflow::{IntakeWizard, SubmissionOutcome, SubmissionReceipt, Submitter};
use std::sync::Arc;
use tracing::info;

/// 本地回显的提交协作者，不访问网络
struct EchoSubmitter;

#[async_trait]
impl Submitter for EchoSubmitter {
    async fn submit(&self, payload: &SubmissionPayload) -> SubmissionOutcome {
        match serde_json::to_value(payload) {
            Ok(body) => SubmissionOutcome::Success(SubmissionReceipt::new(body)),
            Err(e) => SubmissionOutcome::Failure(e.to_string()),
        }
    }
}

fn print_progress(wizard: &IntakeWizard) {
    let progress = wizard.progress();
    println!(
        "📍 步骤 {}/{}: {} ({}%)",
        progress.step.index() + 1,
        progress.total,
        progress.label,
        progress.percent
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    let mut wizard = IntakeWizard::new(Arc::new(EchoSubmitter));

    println!("🚀 问诊向导演示\n");
    print_progress(&wizard);
    wizard.next()?;
    print_progress(&wizard);

    // 1. 信息不完整时无法前进
    wizard.update_patient(PatientInfoPatch::default().first_name("Ada"));
    if let Err(e) = wizard.next() {
        println!("⚠️  患者信息未通过校验: {}", e);
        for (field, message) in wizard.step_errors().iter() {
            println!("   - {}: {}", field, message);
        }
    }

    // 2. 补全患者信息
    wizard.update_patient(
        PatientInfoPatch::default()
            .last_name("Lovelace")
            .email("ada@example.com")
            .phone_number("555-0100")
            .date_of_birth("1815-12-10")
            .gender(Gender::Female)
            .address("12 St James's Square, London")
            .emergency_contact_name("Mary Somerville")
            .emergency_contact_phone("555-0101"),
    );
    wizard.toggle_medical_history("None");
    wizard.next()?;
    println!("✅ 患者信息已通过");
    print_progress(&wizard);

    // 3. 没有症状时无法前进
    if let Err(e) = wizard.next() {
        println!("⚠️  {}", e);
    }

    // 4. 录入症状
    let draft = wizard.symptom_draft_mut();
    draft.name = Some(SymptomName::Cough);
    draft.description = "dry cough".to_string();
    draft.severity = Some(Severity::Mild);
    draft.duration = Some(SymptomDuration::OneDay);
    draft.frequency = Some(Frequency::Intermittent);
    let symptom_id = wizard.add_symptom()?;
    info!("Symptom {} added", symptom_id);
    println!("✅ 已添加症状 {}", symptom_id);
    wizard.next()?;
    print_progress(&wizard);

    // 5. 随访偏好
    wizard.update_follow_up(
        FollowUpPatch::default()
            .preferred_contact_method(ContactMethod::Email)
            .preferred_time(PreferredTime::Morning)
            .urgency(Urgency::Low),
    );
    wizard.next()?;
    print_progress(&wizard);

    // 6. 摘要与提交
    println!("\n{}", wizard.summary_view().to_text());
    println!("🔘 {}", wizard.summary_action().label());

    let receipt = wizard.submit().await?;
    info!("Demo submission settled: {}", wizard.status().as_str());
    println!("📨 提交成功，服务端回显 {} 个字段", receipt.body.as_object().map_or(0, |o| o.len()));
    println!("🔘 {}", wizard.summary_action().label());

    println!("\n🎉 演示完成!");
    Ok(())
}
