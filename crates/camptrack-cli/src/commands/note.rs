//! Note command handlers
//!
//! Notes belong to an athlete and a date, and carry a kind (admin,
//! performance or interests).

use anyhow::{anyhow, bail, Context, Result};

use camptrack_core::{CampStore, NoteKind};

use crate::commands::{parse_athlete_id, parse_date_arg};
use crate::editor::NoteDraft;
use crate::output::{short_id, Output};
use crate::NoteCommands;

pub fn handle(command: NoteCommands, store: &mut CampStore, output: &Output) -> Result<()> {
    match command {
        NoteCommands::Add {
            athlete,
            kind,
            content,
            date,
        } => add(store, &athlete, &kind, content, date, output),
        NoteCommands::List { athlete, date } => {
            let notes = match athlete {
                Some(id) => {
                    let athlete_id = parse_athlete_id(&id, store)?;
                    store.notes_for(athlete_id)
                }
                None => store.daily_notes(parse_date_arg(date.as_deref())?),
            };
            output.print_notes(&notes, |note| {
                store
                    .athlete(note.athlete_id)
                    .map(|a| a.display_name())
                    .unwrap_or_else(|_| "(removed)".to_string())
            });
            Ok(())
        }
    }
}

fn add(
    store: &mut CampStore,
    athlete: &str,
    kind: &str,
    content: Option<String>,
    date: Option<String>,
    output: &Output,
) -> Result<()> {
    let athlete_id = parse_athlete_id(athlete, store)?;
    let kind: NoteKind = kind.parse().map_err(|e: String| anyhow!(e))?;
    let date = parse_date_arg(date.as_deref())?;

    let content = match content {
        Some(c) => c,
        None => {
            let name = store.athlete(athlete_id)?.display_name();
            NoteDraft {
                athlete: &name,
                kind,
                date,
            }
            .write()
            .context("Failed to edit note")?
        }
    };

    if content.trim().is_empty() {
        bail!("Note cannot be empty");
    }

    let note = store.add_note(athlete_id, date, kind, &content)?;
    output.success(&format!(
        "Added {} note {} for {}",
        kind.label().to_lowercase(),
        short_id(&note.id),
        date
    ));
    Ok(())
}
