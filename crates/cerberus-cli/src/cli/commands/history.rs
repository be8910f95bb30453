//! `cerberusctl history` - Browse past analyses.

use anyhow::Result;
use cerberus::{HistoryStats, JobId, JobRecord, MlOperation};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use super::Context;
use crate::cli::args::{HistoryArgs, HistoryCommands};
use crate::output::{self, truncate, OutputFormat};

#[derive(Serialize, Tabled)]
struct HistoryRow {
    #[tabled(rename = "Job ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "File")]
    name: String,
    #[tabled(rename = "Instructions")]
    instructions: u64,
    #[tabled(rename = "ML Ops")]
    ml_operations: u64,
    #[tabled(rename = "Frameworks")]
    frameworks: usize,
    #[tabled(rename = "Sections")]
    sections: usize,
}

impl From<&JobRecord> for HistoryRow {
    fn from(record: &JobRecord) -> Self {
        let stats = record.stats();
        Self {
            id: record.id.to_string(),
            date: record.date.to_rfc3339(),
            name: record.name.clone(),
            instructions: stats.instructions,
            ml_operations: stats.ml_operations,
            frameworks: stats.frameworks,
            sections: stats.sections,
        }
    }
}

#[derive(Serialize, Tabled)]
struct OperationRow {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Start")]
    start_address: String,
    #[tabled(rename = "End")]
    end_address: String,
    #[tabled(rename = "Instructions")]
    instruction_count: String,
    #[tabled(rename = "Detect (ms)")]
    detection_time_ms: String,
    #[tabled(rename = "Details")]
    details: String,
}

impl From<&MlOperation> for OperationRow {
    fn from(op: &MlOperation) -> Self {
        let display = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
        Self {
            kind: display(op.kind.clone()),
            start_address: display(op.start_address.as_ref().map(ToString::to_string)),
            end_address: display(op.end_address.as_ref().map(ToString::to_string)),
            instruction_count: display(op.instruction_count.map(|n| n.to_string())),
            detection_time_ms: display(op.detection_time_ms().map(|ms| format!("{ms:.2}"))),
            details: display(op.details.clone()),
        }
    }
}

#[derive(Tabled)]
struct SectionRow {
    #[tabled(rename = "Section")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "ML Patterns")]
    ml_patterns_found: String,
}

pub async fn execute(ctx: Context, args: HistoryArgs) -> Result<()> {
    match args.command {
        HistoryCommands::List { search, limit } => list(&ctx, search.as_deref(), limit).await,
        HistoryCommands::Show { id } => show(&ctx, &JobId::from(id)).await,
        HistoryCommands::Export { id, out } => export(&ctx, &JobId::from(id), &out).await,
        HistoryCommands::Stats => stats(&ctx).await,
    }
}

async fn list(ctx: &Context, search: Option<&str>, limit: Option<usize>) -> Result<()> {
    let pipeline = ctx.pipeline().await?;
    let records = match search {
        Some(term) => pipeline.history().search(term).await?,
        None => pipeline.history().list().await?,
    };
    let total = records.len();
    let rows: Vec<HistoryRow> = records
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(HistoryRow::from)
        .collect();

    match ctx.output_format {
        OutputFormat::Json => output::print_json(&rows)?,
        OutputFormat::Yaml => output::print_yaml(&rows)?,
        OutputFormat::Csv => output::print_csv(&rows)?,
        OutputFormat::Pretty => {
            if rows.is_empty() {
                match search {
                    Some(term) => println!("No analyses match {}.", term.cyan()),
                    None => println!("No analyses yet. Run {} to add one.", "cerberusctl analyze <FILE>".cyan()),
                }
                return Ok(());
            }

            output::print_table(&rows);
            if rows.len() < total {
                println!("{}", format!("... and {} more", total - rows.len()).dimmed());
            }
        }
    }

    Ok(())
}

async fn show(ctx: &Context, id: &JobId) -> Result<()> {
    let record = ctx.pipeline().await?.history().get(id).await?;

    match ctx.output_format {
        OutputFormat::Json => output::print_json(&record)?,
        OutputFormat::Yaml => output::print_yaml(&record)?,
        OutputFormat::Csv => {
            let operations = record
                .data
                .ml_operations
                .as_ref()
                .and_then(|ops| ops.operations.as_ref());
            output::print_csv(operations.into_iter().flatten().map(OperationRow::from))?;
        }
        OutputFormat::Pretty => print_record_pretty(&record, ctx.verbose),
    }

    Ok(())
}

fn print_record_pretty(record: &JobRecord, verbose: bool) {
    let stats = record.stats();
    let data = &record.data;

    println!("{} {}", "File:".bold(), record.name.cyan());
    println!("{} {}", "Job ID:".bold(), record.id);
    println!(
        "{} {}",
        "Analysed:".bold(),
        record.date.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S %:z")
    );
    println!();
    println!("  {:>14}  {}", "Instructions".bold(), stats.instructions);
    println!("  {:>14}  {}", "ML operations".bold(), stats.ml_operations);
    println!("  {:>14}  {}", "Frameworks".bold(), stats.frameworks);
    println!("  {:>14}  {}", "Sections".bold(), stats.sections);

    if let Some(breakdown) = data.operation_breakdown().filter(|b| !b.is_empty()) {
        println!();
        println!("{}", "Operation Breakdown:".bold().underline());
        for (kind, count) in breakdown {
            println!("  {:>8}  {}", count.to_string().cyan(), kind);
        }
    }

    if let Some(frameworks) = &data.framework_analysis {
        let counts = frameworks.counts();
        let detected = frameworks.detected_frameworks.as_deref().unwrap_or_default();
        if !detected.is_empty() || !counts.is_empty() {
            println!();
            println!("{}", "Frameworks:".bold().underline());
            for name in detected {
                let refs = counts.get(name).copied().unwrap_or(0);
                println!("  {} {}", name.yellow(), format!("({refs} references)").dimmed());
            }
            for (name, refs) in counts.iter().filter(|(name, _)| !detected.contains(*name)) {
                println!("  {} {}", name, format!("({refs} references)").dimmed());
            }
        }
    }

    if let Some(top) = data
        .instruction_statistics
        .as_ref()
        .map(|s| s.top_instructions(10))
        .filter(|top| !top.is_empty())
    {
        println!();
        println!("{}", "Top Instructions:".bold().underline());
        for (mnemonic, count) in top {
            println!("  {:>8}  {}", count.to_string().cyan(), mnemonic);
        }
    }

    if let Some(sections) = data.section_analysis.as_ref().filter(|s| !s.is_empty()) {
        println!();
        println!("{}", "Sections:".bold().underline());
        let rows: Vec<SectionRow> = sections
            .iter()
            .map(|s| SectionRow {
                name: s.name.clone().unwrap_or_default(),
                address: s.address.as_ref().map(ToString::to_string).unwrap_or_default(),
                size: s.size.map(|n| n.to_string()).unwrap_or_default(),
                ml_patterns_found: s.ml_patterns_found.map(|n| n.to_string()).unwrap_or_default(),
            })
            .collect();
        output::print_table(&rows);
    }

    let operations = data
        .ml_operations
        .as_ref()
        .and_then(|ops| ops.operations.as_ref())
        .filter(|ops| !ops.is_empty());
    if let Some(operations) = operations {
        println!();
        println!("{}", "ML Operations:".bold().underline());
        let limit = if verbose { operations.len() } else { 25 };
        let rows: Vec<OperationRow> = operations
            .iter()
            .take(limit)
            .map(|op| {
                let mut row = OperationRow::from(op);
                row.details = truncate(&row.details, 40);
                row
            })
            .collect();
        output::print_table(&rows);

        if operations.len() > limit {
            println!(
                "{}",
                format!("... and {} more (use --verbose to show all)", operations.len() - limit).dimmed()
            );
        }
    }
}

async fn export(ctx: &Context, id: &JobId, out: &Path) -> Result<()> {
    let path = ctx.pipeline().await?.history().export(id, out).await?;

    match ctx.output_format {
        OutputFormat::Json => output::print_json(&serde_json::json!({ "path": path }))?,
        OutputFormat::Yaml => output::print_yaml(&serde_json::json!({ "path": path }))?,
        OutputFormat::Csv => {
            println!("path");
            println!("{}", path.display());
        }
        OutputFormat::Pretty => {
            println!("{} Report written to {}", "Success:".green().bold(), path.display().to_string().cyan());
        }
    }

    Ok(())
}

async fn stats(ctx: &Context) -> Result<()> {
    let stats: HistoryStats = ctx.pipeline().await?.history().stats().await?;

    match ctx.output_format {
        OutputFormat::Json => output::print_json(&stats)?,
        OutputFormat::Yaml => output::print_yaml(&stats)?,
        OutputFormat::Csv => output::print_csv([stats])?,
        OutputFormat::Pretty => {
            println!("{}", "Analysis History:".bold());
            println!();
            println!("  {:>20}  {}", "Analyses".bold(), stats.analyses.to_string().cyan());
            println!("  {:>20}  {}", "Instructions".bold(), stats.instructions.to_string().cyan());
            println!("  {:>20}  {}", "ML operations".bold(), stats.ml_operations.to_string().cyan());
            println!("  {:>20}  {}", "Frameworks detected".bold(), stats.frameworks.to_string().cyan());
        }
    }

    Ok(())
}
