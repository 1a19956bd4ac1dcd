//! Attendance command handlers

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

use camptrack_core::resolve::AttendanceSource;
use camptrack_core::{AttendanceStatus, CampStore};

use crate::commands::{parse_athlete_id, parse_date_arg, with_lock_prompt};
use crate::output::{short_id, Output, OutputFormat};
use crate::AttendanceCommands;

pub fn handle(command: AttendanceCommands, store: &mut CampStore, output: &Output) -> Result<()> {
    match command {
        AttendanceCommands::Mark {
            status,
            athletes,
            all,
            date,
            force,
        } => {
            let status: AttendanceStatus = status.parse().map_err(|e: String| anyhow!(e))?;
            let date = parse_date_arg(date.as_deref())?;
            let ids = if all {
                store.athletes().iter().map(|a| a.id).collect()
            } else {
                athletes
                    .iter()
                    .map(|id| parse_athlete_id(id, store))
                    .collect::<Result<Vec<_>>>()?
            };

            let marked = with_lock_prompt(output, force, |confirmation| {
                store.bulk_set_attendance(&ids, date, status, confirmation)
            })?;
            if marked.is_some() {
                output.success(&format!("Marked {} athlete(s) {} on {}", ids.len(), status, date));
            }
            Ok(())
        }
        AttendanceCommands::Toggle {
            athlete,
            date,
            force,
        } => {
            let athlete_id = parse_athlete_id(&athlete, store)?;
            let date = parse_date_arg(date.as_deref())?;

            let toggled = with_lock_prompt(output, force, |confirmation| {
                store.toggle_attendance(athlete_id, date, confirmation)
            })?;
            if let Some(status) = toggled {
                output.success(&format!(
                    "{} is {} on {}",
                    store.athlete(athlete_id)?.display_name(),
                    status,
                    date
                ));
            }
            Ok(())
        }
        AttendanceCommands::Show { date } => {
            let date = parse_date_arg(date.as_deref())?;
            show(store, date, output);
            Ok(())
        }
        AttendanceCommands::Lock { date } => {
            let date = parse_date_arg(date.as_deref())?;
            let locked = store.toggle_date_lock(date)?;
            output.success(&format!(
                "{} {}",
                if locked { "Locked" } else { "Unlocked" },
                date
            ));
            Ok(())
        }
    }
}

fn show(store: &CampStore, date: NaiveDate, output: &Output) {
    let summary = store.attendance_summary(date);
    let locked = store.is_date_locked(date);
    let rows: Vec<_> = store
        .athletes()
        .into_iter()
        .map(|a| (a, store.attendance_on(a.id, date)))
        .collect();

    match output.format {
        OutputFormat::Json => output.json(&serde_json::json!({
            "date": date,
            "locked": locked,
            "present": summary.present,
            "absent": summary.absent,
            "athletes": rows
                .iter()
                .map(|(a, r)| serde_json::json!({
                    "id": a.id,
                    "name": a.display_name(),
                    "status": r.status,
                    "source": r.source,
                }))
                .collect::<Vec<_>>(),
        })),
        OutputFormat::Quiet => println!("{} {}", summary.present, summary.absent),
        OutputFormat::Human => {
            println!(
                "Attendance for {}{}",
                date,
                if locked { " [locked]" } else { "" }
            );
            println!();
            for (athlete, resolved) in &rows {
                let marker = match resolved.source {
                    AttendanceSource::Recorded => "",
                    AttendanceSource::LockedDefault | AttendanceSource::Default => " (default)",
                };
                println!(
                    "{} {:<7} {}{}",
                    short_id(&athlete.id),
                    resolved.status.as_str(),
                    athlete.display_name(),
                    marker
                );
            }
            println!();
            println!(
                "{} present, {} absent, {} total",
                summary.present,
                summary.absent,
                summary.total()
            );
        }
    }
}
