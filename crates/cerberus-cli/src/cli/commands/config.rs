//! `cerberusctl config` - CLI configuration management.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::Config;
use crate::output::{self, OutputFormat};

pub async fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx),
        ConfigCommands::Set { key, value } => set_config(&key, &value),
        ConfigCommands::Path => show_path(),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    match ctx.output_format {
        OutputFormat::Json => output::print_json(config)?,
        OutputFormat::Yaml => output::print_yaml(config)?,
        _ => {
            let unset = || "(not set)".dimmed().to_string();

            println!("{}", "Current Configuration:".bold());
            println!();
            println!(
                "  {} {}",
                "engine_path:".bold(),
                config.engine_path.clone().unwrap_or_else(unset)
            );
            println!("  {} {}s", "timeout_secs:".bold(), config.timeout().as_secs());
            println!(
                "  {} {}",
                "scratch_dir:".bold(),
                config.scratch_dir.clone().unwrap_or_else(unset)
            );
            println!(
                "  {} {}",
                "history_path:".bold(),
                config.history_path.clone().unwrap_or_else(unset)
            );
            println!(
                "  {} {}",
                "output_format:".bold(),
                config.output_format.unwrap_or_default()
            );
            println!(
                "  {} {}",
                "include_strings:".bold(),
                config.include_strings.map_or_else(unset, |on| on.to_string())
            );
            println!(
                "  {} {}",
                "disassemble:".bold(),
                config.disassemble.map_or_else(unset, |on| on.to_string())
            );
            println!(
                "  {} {}",
                "log_level:".bold(),
                config.log_level.clone().unwrap_or_else(unset)
            );
        }
    }

    Ok(())
}

fn set_config(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    println!("{} {} set to {}.", "Success:".green().bold(), key, value.cyan());
    Ok(())
}

fn show_path() -> Result<()> {
    let path = Config::path()?;
    println!("{}", path.display());
    Ok(())
}
