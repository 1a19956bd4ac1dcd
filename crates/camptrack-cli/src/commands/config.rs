//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use camptrack_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "user_id": config.user_id,
                    "user_email": config.user_email,
                    "admin_emails": config.admin_emails,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:     {}", config.data_dir.display());
            println!(
                "  user_id:      {}",
                config.user_id.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  user_email:   {}",
                config.user_email.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  admin_emails: {}",
                if config.admin_emails.is_empty() {
                    "(none)".to_string()
                } else {
                    config.admin_emails.join(", ")
                }
            );
            println!(
                "  log_file:     {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "user_id" => {
            config.user_id = optional(value);
        }
        "user_email" => {
            config.user_email = optional(value).map(|email| email.to_lowercase());
        }
        "admin_emails" => {
            config.admin_emails = value
                .split(',')
                .map(str::trim)
                .filter(|email| !email.is_empty() && *email != "none")
                .map(str::to_lowercase)
                .collect();
        }
        "log_file" => {
            config.log_file = optional(value).map(PathBuf::from);
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, user_id, user_email, admin_emails, log_file",
                key
            );
        }
    }
    Ok(())
}

/// Empty and "none" clear a value
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}
