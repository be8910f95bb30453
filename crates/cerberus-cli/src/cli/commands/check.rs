//! `cerberusctl check` - Verify the engine before running jobs.

use anyhow::Result;
use cerberus::{EngineConfig, stages::Engine};
use colored::Colorize;
use serde::Serialize;

use super::Context;
use crate::output::{self, OutputFormat};

#[derive(Serialize)]
struct CheckReport {
    engine: String,
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    timeout_secs: u64,
    history: String,
}

pub async fn execute(ctx: Context) -> Result<()> {
    let engine = Engine::new(EngineConfig::new(&ctx.engine));
    let status = engine.check().await;

    let report = CheckReport {
        engine: ctx.engine.display().to_string(),
        available: status.is_ok(),
        reason: status.as_ref().err().map(ToString::to_string),
        timeout_secs: ctx.config.timeout().as_secs(),
        history: ctx.history_path()?.display().to_string(),
    };

    match ctx.output_format {
        OutputFormat::Json => output::print_json(&report)?,
        OutputFormat::Yaml => output::print_yaml(&report)?,
        OutputFormat::Csv => output::print_csv([&report])?,
        OutputFormat::Pretty => {
            let verdict = if report.available {
                "ready".green().bold()
            } else {
                "unavailable".red().bold()
            };
            println!("  {:>8}  {} ({})", "Engine".bold(), report.engine.cyan(), verdict);
            println!("  {:>8}  {}s", "Timeout".bold(), report.timeout_secs);
            println!("  {:>8}  {}", "History".bold(), report.history);
        }
    }

    status?;
    Ok(())
}
