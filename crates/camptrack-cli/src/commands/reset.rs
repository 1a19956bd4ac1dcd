//! Reset command handler

use anyhow::{Context, Result};

use camptrack_core::{Config, LocalDatabase};

use crate::editor::confirm;
use crate::output::Output;

/// Delete the local database and the selected camp
pub fn reset(config: &Config, yes: bool, output: &Output) -> Result<()> {
    if !yes {
        if !output.should_prompt() {
            anyhow::bail!("Refusing to reset without confirmation. Pass --yes.");
        }
        println!("This deletes all local data in {}", config.data_dir.display());
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    LocalDatabase::reset(config).context("Failed to reset database")?;

    output.success("Local data deleted");
    Ok(())
}
