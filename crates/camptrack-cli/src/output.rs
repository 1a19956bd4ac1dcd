//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::path::Path;

use serde::Serialize;

use camptrack_core::models::{Athlete, AttendanceStatus, Camp, Group, Note};
use camptrack_core::views::{GroupBoard, HistoryEntry};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Failed to serialize output: {}", e),
        }
    }

    /// Print a list of camps, marking the current one
    pub fn print_camps(&self, camps: &[Camp], current: Option<uuid::Uuid>) {
        match self.format {
            OutputFormat::Human => {
                if camps.is_empty() {
                    println!("No camps found.");
                    return;
                }
                for camp in camps {
                    let marker = if Some(camp.id) == current { "*" } else { " " };
                    println!(
                        "{} {} | {} | {} to {}",
                        marker,
                        short_id(&camp.id),
                        truncate(&camp.name, 35),
                        camp.start_date,
                        camp.end_date
                    );
                }
                println!("\n{} camp(s)", camps.len());
            }
            OutputFormat::Json => self.json(camps),
            OutputFormat::Quiet => {
                for camp in camps {
                    println!("{}", camp.id);
                }
            }
        }
    }

    /// Print a single camp
    pub fn print_camp(&self, camp: &Camp, athletes: usize, groups: usize) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:            {}", camp.id);
                println!("Name:          {}", camp.name);
                println!("Dates:         {} to {}", camp.start_date, camp.end_date);
                println!("Owner:         {}", camp.owner_id);
                if !camp.collaborator_ids.is_empty() {
                    println!("Collaborators: {}", camp.collaborator_ids.join(", "));
                }
                println!("Athletes:      {}", athletes);
                println!("Groups:        {}", groups);
                println!("Created:       {}", camp.created_at.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => self.json(camp),
            OutputFormat::Quiet => println!("{}", camp.id),
        }
    }

    /// Print a list of athletes with their default group
    pub fn print_athletes(&self, athletes: &[&Athlete], groups: &[Group]) {
        match self.format {
            OutputFormat::Human => {
                if athletes.is_empty() {
                    println!("No athletes found.");
                    return;
                }
                for athlete in athletes {
                    println!(
                        "{} | {} | {}",
                        short_id(&athlete.id),
                        truncate(&athlete.display_name(), 35),
                        group_name(groups, athlete.group_id.id())
                    );
                }
                println!("\n{} athlete(s)", athletes.len());
            }
            OutputFormat::Json => self.json(athletes),
            OutputFormat::Quiet => {
                for athlete in athletes {
                    println!("{}", athlete.id);
                }
            }
        }
    }

    /// Print an athlete's profile, attendance history and notes
    pub fn print_athlete(
        &self,
        athlete: &Athlete,
        groups: &[Group],
        history: &[HistoryEntry],
        notes: &[&Note],
        photo: Option<&Path>,
    ) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:        {}", athlete.id);
                println!("Name:      {}", athlete.display_name());
                println!("Group:     {}", group_name(groups, athlete.group_id.id()));
                if let Some(photo) = photo {
                    println!("Photo:     {}", photo.display());
                }
                let fields = [
                    ("Parent", &athlete.parent_name),
                    ("Phone", &athlete.parent_phone),
                    ("Email", &athlete.contact_email),
                    ("Born", &athlete.birth_date),
                    ("Shirt", &athlete.shirt_size),
                    ("Medical", &athlete.medical_notes),
                    ("Allergies", &athlete.allergies),
                ];
                for (label, value) in fields {
                    if !value.is_empty() {
                        println!("{:<10} {}", format!("{}:", label), value);
                    }
                }

                if !history.is_empty() {
                    let absent = history
                        .iter()
                        .filter(|h| h.attendance.status == AttendanceStatus::Absent)
                        .count();
                    println!();
                    println!("── Attendance ({} of {} days absent) ──", absent, history.len());
                    for entry in history {
                        println!(
                            "{} {:<7} {}{}",
                            entry.date,
                            entry.attendance.status.as_str(),
                            group_name(groups, entry.group.id()),
                            if entry.locked { "  [locked]" } else { "" }
                        );
                    }
                }

                if !notes.is_empty() {
                    println!();
                    println!("── Notes ({}) ──", notes.len());
                    for note in notes {
                        println!(
                            "[{}] {}: {}",
                            note.date,
                            note.kind.label(),
                            truncate_line(&note.content, 60)
                        );
                    }
                }
            }
            OutputFormat::Json => self.json(&serde_json::json!({
                "athlete": athlete,
                "history": history,
                "notes": notes,
                "photo": photo,
            })),
            OutputFormat::Quiet => println!("{}", athlete.id),
        }
    }

    pub fn print_groups(&self, groups: &[Group]) {
        match self.format {
            OutputFormat::Human => {
                if groups.is_empty() {
                    println!("No groups found.");
                    return;
                }
                for group in groups {
                    println!(
                        "{} | {} | {}{}",
                        short_id(&group.id),
                        group.name,
                        group.color,
                        group
                            .icon
                            .as_ref()
                            .map(|i| format!(" | {}", i))
                            .unwrap_or_default()
                    );
                }
                println!("\n{} group(s)", groups.len());
            }
            OutputFormat::Json => self.json(groups),
            OutputFormat::Quiet => {
                for group in groups {
                    println!("{}", group.id);
                }
            }
        }
    }

    pub fn print_board(&self, board: &GroupBoard) {
        match self.format {
            OutputFormat::Human => {
                println!("Groups for {}", board.date);
                for column in &board.columns {
                    println!();
                    println!("── {} ({}) ──", column.group.name, column.athletes.len());
                    for athlete in &column.athletes {
                        println!("  {} {}", short_id(&athlete.id), athlete.display_name());
                    }
                }
                println!();
                println!("── Unassigned ({}) ──", board.unassigned.len());
                for athlete in &board.unassigned {
                    println!("  {} {}", short_id(&athlete.id), athlete.display_name());
                }
            }
            OutputFormat::Json => self.json(board),
            OutputFormat::Quiet => {}
        }
    }

    pub fn print_notes(&self, notes: &[&Note], athlete_name: impl Fn(&Note) -> String) {
        match self.format {
            OutputFormat::Human => {
                if notes.is_empty() {
                    println!("No notes found.");
                    return;
                }
                for note in notes {
                    println!("────────────────────────────────────────");
                    println!(
                        "{} | {} | {} | {}",
                        short_id(&note.id),
                        note.date,
                        note.kind.label(),
                        athlete_name(note)
                    );
                    println!();
                    println!("{}", note.content);
                    println!();
                }
                println!("{} note(s)", notes.len());
            }
            OutputFormat::Json => self.json(notes),
            OutputFormat::Quiet => {
                for note in notes {
                    println!("{}", note.id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// First eight characters of an id
pub fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Group name for a group id, "Unassigned" for none or a deleted group
pub fn group_name(groups: &[Group], id: Option<uuid::Uuid>) -> String {
    id.and_then(|id| groups.iter().find(|g| g.id == id))
        .map(|g| g.name.clone())
        .unwrap_or_else(|| "Unassigned".to_string())
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
    }

    #[test]
    fn test_group_name() {
        let groups = Group::defaults_for(Uuid::new_v4());
        assert_eq!(group_name(&groups, Some(groups[0].id)), "Red Team");
        assert_eq!(group_name(&groups, Some(Uuid::new_v4())), "Unassigned");
        assert_eq!(group_name(&groups, None), "Unassigned");
    }
}
