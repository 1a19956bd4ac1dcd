//! Group command handlers

use anyhow::{Context, Result};

use camptrack_core::{CampStore, GroupUpdate};

use crate::commands::{
    parse_athlete_id, parse_date_arg, parse_group_ref, parse_id, with_lock_prompt,
};
use crate::editor::confirm;
use crate::output::{group_name, short_id, Output};
use crate::GroupCommands;

pub fn handle(command: GroupCommands, store: &mut CampStore, output: &Output) -> Result<()> {
    match command {
        GroupCommands::List => {
            output.print_groups(store.groups());
            Ok(())
        }
        GroupCommands::Add { name, color, icon } => {
            let group = store.add_group(&name, &color, icon.as_deref())?;
            output.success(&format!("Added group {} ({})", group.name, short_id(&group.id)));
            Ok(())
        }
        GroupCommands::Edit {
            id,
            name,
            color,
            icon,
        } => {
            let group_id = parse_group_id(&id, store)?;
            let group = store.update_group(group_id, GroupUpdate { name, color, icon })?;
            output.success(&format!("Updated group {}", group.name));
            Ok(())
        }
        GroupCommands::Delete { id } => delete(store, &id, output),
        GroupCommands::Assign {
            athlete,
            group,
            date,
            force,
        } => {
            let athlete_id = parse_athlete_id(&athlete, store)?;
            let group = parse_group_ref(&group, store)?;
            let date = parse_date_arg(date.as_deref())?;

            let assigned = with_lock_prompt(output, force, |confirmation| {
                store.assign_group(athlete_id, date, group, confirmation)
            })?;
            if assigned.is_some() {
                output.success(&format!(
                    "{} is in {} on {}",
                    store.athlete(athlete_id)?.display_name(),
                    group_name(store.groups(), group.id()),
                    date
                ));
            }
            Ok(())
        }
        GroupCommands::Board { date } => {
            let date = parse_date_arg(date.as_deref())?;
            output.print_board(&store.group_board(date));
            Ok(())
        }
    }
}

fn parse_group_id(id: &str, store: &CampStore) -> Result<uuid::Uuid> {
    parse_id(id, "group", store.groups(), |g| g.id, |g| g.name.clone())
}

fn delete(store: &mut CampStore, id: &str, output: &Output) -> Result<()> {
    let group_id = parse_group_id(id, store)?;
    let name = store.group(group_id)?.name.clone();

    // Confirm deletion
    if output.should_prompt() {
        println!("Delete group: {} - {}", short_id(&group_id), name);
        println!("Athletes in this group become unassigned.");
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .delete_group(group_id)
        .context("Failed to delete group")?;
    output.success(&format!("Deleted group: {}", name));
    Ok(())
}
