//! `cerberusctl analyze` - Run files through the analysis engine.

use anyhow::Result;
use cerberus::{CerberusError, EngineOptions, ErrorKind, JobRecord};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tabled::Tabled;

use super::Context;
use crate::cli::args::AnalyzeArgs;
use crate::output::{self, OutputFormat};

/// Result of one file, as printed in JSON/YAML
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum JobOutcome<'a> {
    Completed {
        file: String,
        record: &'a JobRecord,
    },
    Failed {
        file: String,
        kind: ErrorKind,
        error: String,
    },
}

#[derive(Serialize, Tabled)]
struct OutcomeRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Job ID")]
    id: String,
    #[tabled(rename = "Instructions")]
    instructions: String,
    #[tabled(rename = "ML Ops")]
    ml_operations: String,
    #[tabled(rename = "Frameworks")]
    frameworks: String,
    #[tabled(rename = "Sections")]
    sections: String,
}

pub async fn execute(ctx: Context, args: AnalyzeArgs) -> Result<()> {
    // Toggles nobody set are not passed, so the engine keeps its own default.
    let mut options = EngineOptions::new();
    if let Some(enabled) = args.include_strings.or(ctx.config.include_strings) {
        options = options.include_strings(enabled);
    }
    if let Some(enabled) = args.disassemble.or(ctx.config.disassemble) {
        options = options.disassemble(enabled);
    }
    if let Some(level) = args.log_level.as_ref().or(ctx.config.log_level.as_ref()) {
        options = options.log_level(level.clone());
    }
    let timeout = args
        .timeout
        .map_or_else(|| ctx.config.timeout(), Duration::from_secs);

    let pipeline = ctx.pipeline_with(options, timeout, args.jobs).await?;

    let spinner = (ctx.output_format == OutputFormat::Pretty).then(|| progress_bar(args.files.len()));

    let jobs = args.files.iter().map(|file| {
        let pipeline = pipeline.clone();
        let spinner = spinner.clone();
        async move {
            let outcome = pipeline.submit_path(file).await;
            if let Some(spinner) = &spinner {
                spinner.inc(1);
            }
            (file, outcome)
        }
    });
    let outcomes = futures_util::future::join_all(jobs).await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    render(&ctx, &outcomes)?;

    let failed = outcomes.iter().filter(|(_, outcome)| outcome.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} analyses failed", outcomes.len());
    }

    Ok(())
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} analysing {pos}/{len} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn render(ctx: &Context, outcomes: &[(&PathBuf, cerberus::Result<JobRecord>)]) -> Result<()> {
    match ctx.output_format {
        OutputFormat::Json => output::print_json(&json_outcomes(outcomes)),
        OutputFormat::Yaml => output::print_yaml(&json_outcomes(outcomes)),
        OutputFormat::Csv => output::print_csv(outcomes.iter().map(|(file, o)| row(file, o, false))),
        OutputFormat::Pretty => {
            let rows: Vec<OutcomeRow> = outcomes.iter().map(|(file, o)| row(file, o, true)).collect();
            output::print_table(&rows);

            for (file, outcome) in outcomes {
                if let Err(e) = outcome {
                    eprintln!("{} {}: {}", "Error:".red().bold(), file.display(), e);
                    if let Some(hint) = hint(e) {
                        eprintln!("  {}", hint.dimmed());
                    }
                }
            }
            Ok(())
        }
    }
}

fn json_outcomes<'a>(outcomes: &'a [(&PathBuf, cerberus::Result<JobRecord>)]) -> Vec<JobOutcome<'a>> {
    outcomes
        .iter()
        .map(|(file, outcome)| match outcome {
            Ok(record) => JobOutcome::Completed {
                file: file.display().to_string(),
                record,
            },
            Err(e) => JobOutcome::Failed {
                file: file.display().to_string(),
                kind: e.kind(),
                error: e.to_string(),
            },
        })
        .collect()
}

fn row(file: &Path, outcome: &cerberus::Result<JobRecord>, color: bool) -> OutcomeRow {
    let file = file.display().to_string();
    match outcome {
        Ok(record) => {
            let stats = record.stats();
            OutcomeRow {
                file,
                status: if color { "ok".green().to_string() } else { "ok".to_string() },
                id: record.id.to_string(),
                instructions: stats.instructions.to_string(),
                ml_operations: stats.ml_operations.to_string(),
                frameworks: stats.frameworks.to_string(),
                sections: stats.sections.to_string(),
            }
        }
        Err(e) => OutcomeRow {
            file,
            status: if color {
                e.kind().to_string().red().to_string()
            } else {
                e.kind().to_string()
            },
            id: String::new(),
            instructions: String::new(),
            ml_operations: String::new(),
            frameworks: String::new(),
            sections: String::new(),
        },
    }
}

/// Operator-facing hint for the failure classes that have an obvious next step.
fn hint(error: &CerberusError) -> Option<&'static str> {
    match error.kind() {
        ErrorKind::EngineUnavailable => {
            Some("Set the engine with --engine, CERBERUS_ENGINE, or `cerberusctl config set engine_path <PATH>`")
        }
        ErrorKind::Timeout => Some("Raise the time budget with --timeout <SECS>"),
        ErrorKind::OutputMissing | ErrorKind::MalformedOutput | ErrorKind::IncompleteResult => {
            Some("The engine exited successfully but its report is unusable; run with --log-level debug")
        }
        _ => None,
    }
}
