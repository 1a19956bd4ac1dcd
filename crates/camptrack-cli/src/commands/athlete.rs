//! Athlete command handlers

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use camptrack_core::{AthleteUpdate, CampStore, NewAthlete};

use crate::commands::{parse_athlete_id, parse_group_ref};
use crate::editor::confirm;
use crate::output::{group_name, short_id, Output, OutputFormat};
use crate::AthleteCommands;

pub async fn handle(
    command: AthleteCommands,
    store: &mut CampStore,
    output: &Output,
) -> Result<()> {
    match command {
        AthleteCommands::Add {
            name,
            nickname,
            parent,
            phone,
            email,
            medical,
            allergies,
        } => {
            let profile = NewAthlete {
                nickname: nickname.unwrap_or_default(),
                parent_name: parent.unwrap_or_default(),
                parent_phone: phone.unwrap_or_default(),
                contact_email: email.unwrap_or_default(),
                medical_notes: medical.unwrap_or_default(),
                allergies: allergies.unwrap_or_default(),
                ..NewAthlete::named(name)
            };
            let athlete = store.add_athlete(profile)?;
            output.success(&format!(
                "Added {} ({})",
                athlete.display_name(),
                short_id(&athlete.id)
            ));
            Ok(())
        }
        AthleteCommands::Import { file } => import(store, &file, output),
        AthleteCommands::List { query } => {
            let athletes = match query {
                Some(q) => store.search(&q),
                None => store.athletes(),
            };
            output.print_athletes(&athletes, store.groups());
            Ok(())
        }
        AthleteCommands::Show { id } => show(store, &id, output),
        AthleteCommands::Edit {
            id,
            name,
            nickname,
            parent,
            phone,
            email,
            birth_date,
            shirt_size,
            medical,
            allergies,
        } => {
            let athlete_id = parse_athlete_id(&id, store)?;
            let update = AthleteUpdate {
                name,
                nickname,
                parent_name: parent,
                parent_phone: phone,
                contact_email: email,
                birth_date,
                shirt_size,
                medical_notes: medical,
                allergies,
            };
            if update.is_empty() {
                output.message("Nothing to change.");
                return Ok(());
            }
            let athlete = store.update_athlete(athlete_id, update)?;
            output.success(&format!("Updated {}", athlete.display_name()));
            Ok(())
        }
        AthleteCommands::SetGroup { id, group } => {
            let athlete_id = parse_athlete_id(&id, store)?;
            let group = parse_group_ref(&group, store)?;
            store.set_default_group(athlete_id, group)?;
            output.success(&format!(
                "Default group set to {}",
                group_name(store.groups(), group.id())
            ));
            Ok(())
        }
        AthleteCommands::Photo { id, file, remove } => {
            photo(store, &id, file.as_deref(), remove, output).await
        }
        AthleteCommands::Delete { id } => delete(store, &id, output),
    }
}

/// Show, replace or remove an athlete's photo
async fn photo(
    store: &CampStore,
    id: &str,
    file: Option<&Path>,
    remove: bool,
    output: &Output,
) -> Result<()> {
    let athlete_id = parse_athlete_id(id, store)?;
    let name = store.athlete(athlete_id)?.display_name();

    if remove {
        if store.remove_photo(athlete_id)? {
            output.success(&format!("Removed photo of {}", name));
        } else {
            output.message(&format!("{} has no photo.", name));
        }
        return Ok(());
    }

    let path: Option<PathBuf> = match file {
        Some(file) => {
            let saved = store.set_photo(athlete_id, file).await?;
            output.success(&format!("Saved photo of {}", name));
            Some(saved)
        }
        None => store.photo(athlete_id),
    };

    match output.format {
        OutputFormat::Json => output.json(&serde_json::json!({
            "athlete_id": athlete_id,
            "photo": path,
        })),
        OutputFormat::Quiet => {
            if let Some(path) = &path {
                println!("{}", path.display());
            }
        }
        OutputFormat::Human => match &path {
            Some(path) => println!("Photo: {}", path.display()),
            None => println!("{} has no photo.", name),
        },
    }
    Ok(())
}

fn import(store: &mut CampStore, file: &Path, output: &Output) -> Result<()> {
    let reader =
        File::open(file).with_context(|| format!("Failed to open roster file: {:?}", file))?;
    let report = store.import_athletes(reader)?;

    match output.format {
        OutputFormat::Json => output.json(&serde_json::json!({
            "imported": report.athletes.len(),
            "skipped_rows": report.skipped_rows,
        })),
        OutputFormat::Quiet => println!("{}", report.athletes.len()),
        OutputFormat::Human => {
            output.success(&format!("Imported {} athlete(s)", report.athletes.len()));
            if report.skipped_rows > 0 {
                println!("Skipped {} row(s) without a name", report.skipped_rows);
            }
        }
    }
    Ok(())
}

fn show(store: &CampStore, id: &str, output: &Output) -> Result<()> {
    let athlete_id = parse_athlete_id(id, store)?;
    let athlete = store.athlete(athlete_id)?;
    let history = store.attendance_history(athlete_id)?;
    let notes = store.notes_for(athlete_id);
    let photo = store.photo(athlete_id);
    output.print_athlete(athlete, store.groups(), &history, &notes, photo.as_deref());
    Ok(())
}

fn delete(store: &mut CampStore, id: &str, output: &Output) -> Result<()> {
    let athlete_id = parse_athlete_id(id, store)?;
    let name = store.athlete(athlete_id)?.display_name();

    // Confirm deletion
    if output.should_prompt() {
        println!("Delete athlete: {} - {}", short_id(&athlete_id), name);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .delete_athlete(athlete_id)
        .context("Failed to delete athlete")?;
    output.success(&format!("Deleted athlete: {}", name));
    Ok(())
}
