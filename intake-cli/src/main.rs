//! 问诊向导命令行程序
//!
//! 从 JSON 答卷文件驱动一次完整问诊：逐步通过校验门，然后提交并可选导出副本

use anyhow::{Context, Result};
use clap::Parser;
use intake_admin::{init_logging, ConfigManager, IntakeConfig};
use intake_core::{FollowUpPatch, IntakeError, PatientInfoPatch, SymptomDraft};
use intake_integration::{ExportFormat, FileExporter, HttpSubmitter, HttpSubmitterConfig, TracingNotifier};
use intake_workflow::{IntakeWizard, WizardStep};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// 问诊向导命令行参数
#[derive(Parser, Debug)]
#[command(name = "intake")]
#[command(about = "患者问诊向导 (Consultation Intake Wizard)")]
struct Args {
    /// 答卷文件 (JSON)
    #[arg(short, long)]
    answers: String,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,

    /// 只打印提交载荷，不发送
    #[arg(long)]
    dry_run: bool,

    /// 提交成功后导出本地副本
    #[arg(long)]
    export: bool,
}

/// 答卷文件内容
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Answers {
    patient_info: PatientInfoPatch,
    symptoms: Vec<SymptomDraft>,
    follow_up: FollowUpPatch,
}

impl Answers {
    fn load(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read answers file: {}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid answers file: {}", path))
    }
}

fn report_refusal(step: WizardStep, err: &IntakeError) {
    eprintln!("Cannot continue past {}:", step);
    match err.field_errors() {
        Some(errors) => {
            for (field, message) in errors.iter() {
                eprintln!("  - {}: {}", field, message);
            }
        }
        None => eprintln!("  - {}", err),
    }
}

fn advance(wizard: &mut IntakeWizard) -> Result<WizardStep> {
    let step = wizard.current_step();
    wizard.next().map_err(|e| {
        report_refusal(step, &e);
        anyhow::anyhow!("Step {} was refused", step)
    })
}

/// 按答卷逐步填写，直到摘要页
fn fill_wizard(wizard: &mut IntakeWizard, answers: Answers) -> Result<()> {
    advance(wizard)?;

    wizard.update_patient(answers.patient_info);
    advance(wizard)?;

    for draft in answers.symptoms {
        *wizard.symptom_draft_mut() = draft;
        if let Err(e) = wizard.add_symptom() {
            report_refusal(WizardStep::Symptoms, &e);
            return Err(anyhow::anyhow!("Symptom entry was rejected"));
        }
    }
    advance(wizard)?;

    wizard.update_follow_up(answers.follow_up);
    advance(wizard)?;
    Ok(())
}

fn submitter_config(config: &IntakeConfig) -> HttpSubmitterConfig {
    HttpSubmitterConfig {
        base_url: config.submission.base_url.clone(),
        endpoint: config.submission.endpoint.clone(),
        timeout: Duration::from_secs(config.submission.timeout_secs),
        access_token: config.submission.access_token.clone(),
        user_agent: config.submission.user_agent.clone(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let manager = ConfigManager::new(args.config.as_deref())?;
    let mut config = manager.get_config().await;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    init_logging(&config.logging)?;

    info!("启动问诊向导...");

    let answers = Answers::load(&args.answers)?;
    let submitter = HttpSubmitter::new(submitter_config(&config), Arc::new(TracingNotifier))?;
    info!("提交地址: {}", submitter.url());

    let format = ExportFormat::try_from(config.export.format.as_str())?;
    let exporter = FileExporter::new(&config.export.output_dir, format);

    let mut wizard = IntakeWizard::new(Arc::new(submitter)).with_exporter(Arc::new(exporter));
    fill_wizard(&mut wizard, answers)?;

    println!("{}", wizard.summary_view().to_text());

    if args.dry_run {
        let payload = serde_json::to_string_pretty(&wizard.submission_payload())?;
        println!("{}", payload);
        return Ok(());
    }

    if let Err(e) = wizard.submit().await {
        error!("提交失败: {}", e);
        return Err(e.into());
    }
    println!("Consultation submitted successfully!");

    if args.export {
        let location = wizard.export().await?;
        println!("Copy saved to {}", location);
    }

    Ok(())
}
