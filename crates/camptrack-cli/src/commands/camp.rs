//! Camp command handlers

use anyhow::{Context, Result};
use uuid::Uuid;

use camptrack_core::models::default_end_date;
use camptrack_core::{ActionError, CampStore, CampUpdate};

use crate::commands::{parse_camp_id, parse_date_arg};
use crate::editor::confirm;
use crate::output::{short_id, Output};
use crate::CampCommands;

pub fn handle(command: CampCommands, store: &mut CampStore, output: &Output) -> Result<()> {
    match command {
        CampCommands::Create { name, start, end } => create(store, &name, start, end, output),
        CampCommands::List => {
            output.print_camps(store.camps(), store.current_camp().map(|c| c.id));
            Ok(())
        }
        CampCommands::Select { id } => select(store, &id, output),
        CampCommands::Show => show(store, output),
        CampCommands::Edit {
            id,
            name,
            start,
            end,
        } => edit(store, id, name, start, end, output),
        CampCommands::Delete { id } => delete(store, &id, output),
        CampCommands::Share { email } => {
            let user = store.add_collaborator(&email)?;
            output.success(&format!("Shared camp with {}", user.email));
            Ok(())
        }
        CampCommands::Unshare { user_id } => {
            store.remove_collaborator(&user_id)?;
            output.success(&format!("Removed {} from camp", user_id));
            Ok(())
        }
    }
}

fn create(
    store: &mut CampStore,
    name: &str,
    start: Option<String>,
    end: Option<String>,
    output: &Output,
) -> Result<()> {
    let dates = match (start, end) {
        (None, None) => None,
        (start, end) => {
            let start = parse_date_arg(start.as_deref())?;
            let end = match end {
                Some(end) => parse_date_arg(Some(&end))?,
                None => default_end_date(start),
            };
            Some((start, end))
        }
    };

    let camp = store.add_camp(name, dates)?;
    output.success(&format!("Created camp {} ({})", camp.name, short_id(&camp.id)));
    output.print_camp(&camp, 0, store.groups().len());
    Ok(())
}

fn select(store: &mut CampStore, id: &str, output: &Output) -> Result<()> {
    let camp_id = parse_camp_id(id, store)?;
    store.select_camp(camp_id)?;
    let name = store
        .current_camp()
        .map(|c| c.name.clone())
        .unwrap_or_default();
    output.success(&format!("Selected camp {}", name));
    Ok(())
}

fn show(store: &CampStore, output: &Output) -> Result<()> {
    let camp = store.current_camp().ok_or(ActionError::NoCampSelected)?;
    output.print_camp(camp, store.athletes().len(), store.groups().len());
    Ok(())
}

fn edit(
    store: &mut CampStore,
    id: Option<String>,
    name: Option<String>,
    start: Option<String>,
    end: Option<String>,
    output: &Output,
) -> Result<()> {
    let camp_id = match id {
        Some(id) => parse_camp_id(&id, store)?,
        None => current_id(store)?,
    };
    let update = CampUpdate {
        name,
        start_date: start.map(|s| parse_date_arg(Some(&s))).transpose()?,
        end_date: end.map(|s| parse_date_arg(Some(&s))).transpose()?,
    };
    if update.is_empty() {
        output.message("Nothing to change. Pass --name, --start or --end.");
        return Ok(());
    }

    let camp = store.update_camp(camp_id, update)?;
    output.success("Camp updated");
    let counts = if store.current_camp().map(|c| c.id) == Some(camp.id) {
        (store.athletes().len(), store.groups().len())
    } else {
        (0, 0)
    };
    output.print_camp(&camp, counts.0, counts.1);
    Ok(())
}

fn delete(store: &mut CampStore, id: &str, output: &Output) -> Result<()> {
    let camp_id = parse_camp_id(id, store)?;
    let name = store
        .camps()
        .iter()
        .find(|c| c.id == camp_id)
        .map(|c| c.name.clone())
        .ok_or(ActionError::CampNotVisible(camp_id))?;

    // Confirm deletion
    if output.should_prompt() {
        println!("Delete camp: {} - {}", short_id(&camp_id), name);
        println!("This removes its athletes, groups, attendance and notes.");
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .delete_camp(camp_id)
        .context("Failed to delete camp")?;
    output.success(&format!("Deleted camp: {}", name));
    Ok(())
}

fn current_id(store: &CampStore) -> Result<Uuid> {
    Ok(store
        .current_camp()
        .ok_or(ActionError::NoCampSelected)?
        .id)
}
