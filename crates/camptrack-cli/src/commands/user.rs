//! User command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use camptrack_core::{CampStore, Config, LocalDatabase};

use crate::output::{Output, OutputFormat};
use crate::UserCommands;

/// Register an email and sign in as that user
pub fn register(
    email: &str,
    mut config: Config,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let db = LocalDatabase::open(&config).context("Failed to open database")?;
    let profile = CampStore::register_user(&db, email)?;

    config.user_id = Some(profile.id.clone());
    config.user_email = Some(profile.email.clone());
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    match output.format {
        OutputFormat::Json => output.json(&profile),
        OutputFormat::Quiet => println!("{}", profile.id),
        OutputFormat::Human => {
            output.success(&format!("Signed in as {} ({})", profile.email, profile.id));
            if config.is_admin(&profile.email) {
                println!("This account is an administrator and sees every camp.");
            }
        }
    }
    Ok(())
}

pub fn handle(command: UserCommands, store: &CampStore, output: &Output) -> Result<()> {
    match command {
        UserCommands::Whoami => whoami(store, output),
        // Register runs before a store is opened
        UserCommands::Register { .. } => Ok(()),
    }
}

fn whoami(store: &CampStore, output: &Output) -> Result<()> {
    let session = store.session();
    match output.format {
        OutputFormat::Json => output.json(&serde_json::json!({
            "user_id": session.user_id,
            "email": session.email,
            "admin": session.is_admin(),
        })),
        OutputFormat::Quiet => println!("{}", session.user_id),
        OutputFormat::Human => {
            println!("{} ({})", session.email, session.user_id);
            if session.is_admin() {
                println!("Role: administrator");
            }
        }
    }
    Ok(())
}
