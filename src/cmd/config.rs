use std::io::{self, Write};
use std::path::Path;

use clap::{Args, Subcommand};

use crate::config::{DEFAULT_OLLAMA_HOST, DEFAULT_OLLAMA_MODEL, StoredConfig};
use crate::error::{AppError, AppResult};

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored configuration.
    Show,
}

pub fn run(command: ConfigCommand, path: &Path) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(path),
        ConfigCommand::Show => run_show(path),
    }
}

fn run_init(path: &Path) -> AppResult<()> {
    let mut cfg = StoredConfig::load(path)?;

    println!("Configuring historian.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!();

    apply_prompt("Repository path", &mut cfg.repo_path)?;
    apply_prompt("Git user name", &mut cfg.git_user_name)?;
    apply_prompt("Git user email", &mut cfg.git_user_email)?;
    apply_prompt("Ollama model", &mut cfg.ollama_model)?;
    apply_prompt("Ollama host", &mut cfg.ollama_host)?;
    apply_prompt("Earliest commit date (YYYY-MM-DD)", &mut cfg.start_date)?;
    apply_prompt("Latest commit date (YYYY-MM-DD)", &mut cfg.end_date)?;
    apply_prompt("Branch to rewrite (empty = current)", &mut cfg.branch)?;

    let mut attempts = cfg.generation_attempts.map(|n| n.to_string());
    apply_prompt("Generation attempts per commit", &mut attempts)?;
    cfg.generation_attempts = attempts
        .map(|value| {
            value.parse::<u32>().map_err(|_| {
                AppError::Configuration(format!("'{value}' is not a valid attempt count"))
            })
        })
        .transpose()?;

    cfg.save(path)?;

    println!("\nConfiguration saved to {}", path.display());
    Ok(())
}

fn run_show(path: &Path) -> AppResult<()> {
    let cfg = StoredConfig::load(path)?;

    println!("Configuration file: {}", path.display());
    println!("Repository path: {}", display_value(&cfg.repo_path));
    println!("Git user name: {}", display_value(&cfg.git_user_name));
    println!("Git user email: {}", display_value(&cfg.git_user_email));
    println!(
        "Ollama model: {}",
        display_or_default(&cfg.ollama_model, DEFAULT_OLLAMA_MODEL)
    );
    println!(
        "Ollama host: {}",
        display_or_default(&cfg.ollama_host, DEFAULT_OLLAMA_HOST)
    );
    println!("Start date: {}", display_value(&cfg.start_date));
    println!("End date: {}", display_value(&cfg.end_date));
    println!("Branch: {}", display_value(&cfg.branch));
    println!(
        "Generation attempts: {}",
        cfg.generation_attempts
            .map(|n| n.to_string())
            .unwrap_or_else(|| "<not set>".to_string())
    );

    Ok(())
}

fn apply_prompt(field: &str, target: &mut Option<String>) -> AppResult<()> {
    match prompt(field, target.as_deref())? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(value),
    }
    Ok(())
}

fn prompt(field: &str, current: Option<&str>) -> AppResult<PromptAction> {
    let mut stdout = io::stdout();

    match current {
        Some(value) => write!(stdout, "{field} [{value}] (Enter to keep, '-' to clear): ")?,
        None => write!(stdout, "{field} (Enter to skip): ")?,
    }
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(PromptAction::from_input(&input))
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn display_or_default(value: &Option<String>, default: &str) -> String {
    match value.as_deref().filter(|v| !v.is_empty()) {
        Some(v) => v.to_string(),
        None => format!("{default} (default)"),
    }
}

#[derive(Debug, PartialEq)]
enum PromptAction {
    Keep,
    Clear,
    Set(String),
}

impl PromptAction {
    fn from_input(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            PromptAction::Keep
        } else if trimmed == "-" {
            PromptAction::Clear
        } else {
            PromptAction::Set(trimmed.to_string())
        }
    }
}
