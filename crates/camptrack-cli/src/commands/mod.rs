//! Command handlers and the helpers they share

pub mod athlete;
pub mod attendance;
pub mod camp;
pub mod config;
pub mod group;
pub mod note;
pub mod reset;
pub mod status;
pub mod user;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use camptrack_core::models::parse_date;
use camptrack_core::{ActionError, CampStore, Confirmation, GroupRef};

use crate::editor::confirm;
use crate::output::Output;

/// Parse an ID (full UUID or unique prefix) against known items
pub fn parse_id<'a, T>(
    id: &str,
    kind: &str,
    items: impl IntoIterator<Item = &'a T>,
    item_id: impl Fn(&T) -> Uuid,
    label: impl Fn(&T) -> String,
) -> Result<Uuid>
where
    T: 'a,
{
    // Try full UUID first
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid);
    }

    // Try prefix match
    let matches: Vec<&T> = items
        .into_iter()
        .filter(|item| item_id(*item).to_string().starts_with(id))
        .collect();

    match matches.len() {
        0 => bail!("No {} found matching: {}", kind, id),
        1 => Ok(item_id(matches[0])),
        _ => {
            eprintln!("Multiple {}s match '{}':", kind, id);
            for item in &matches {
                eprintln!("  {} - {}", item_id(*item), label(*item));
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

pub fn parse_athlete_id(id: &str, store: &CampStore) -> Result<Uuid> {
    parse_id(id, "athlete", store.athletes(), |a| a.id, |a| a.display_name())
}

pub fn parse_camp_id(id: &str, store: &CampStore) -> Result<Uuid> {
    parse_id(id, "camp", store.camps(), |c| c.id, |c| c.name.clone())
}

/// Parse a group reference: "unassigned", a group ID or a prefix
pub fn parse_group_ref(id: &str, store: &CampStore) -> Result<GroupRef> {
    if id.trim().is_empty() || id.eq_ignore_ascii_case(camptrack_core::models::UNASSIGNED) {
        return Ok(GroupRef::Unassigned);
    }
    parse_id(id, "group", store.groups(), |g| g.id, |g| g.name.clone()).map(GroupRef::Group)
}

/// Parse an optional `YYYY-MM-DD` argument, defaulting to today
pub fn parse_date_arg(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(s) => parse_date(s).with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD.", s)),
        None => Ok(Utc::now().date_naive()),
    }
}

/// Run a date-scoped edit, asking before touching a locked date
///
/// Returns `None` when the user declines.
pub fn with_lock_prompt<T>(
    output: &Output,
    force: bool,
    mut action: impl FnMut(Confirmation) -> Result<T>,
) -> Result<Option<T>> {
    if force {
        return action(Confirmation::Confirmed).map(Some);
    }

    let err = match action(Confirmation::Unconfirmed) {
        Ok(value) => return Ok(Some(value)),
        Err(err) => err,
    };
    let locked = match err.downcast_ref::<ActionError>() {
        Some(ActionError::DateLocked { date }) => *date,
        _ => return Err(err),
    };

    if !output.should_prompt() {
        bail!("{} is locked. Pass --force to edit it.", locked);
    }
    if !confirm(&format!("{} is locked. Edit it anyway?", locked))? {
        output.message("Cancelled.");
        return Ok(None);
    }
    action(Confirmation::Confirmed).map(Some)
}
