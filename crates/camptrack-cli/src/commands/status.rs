//! Status command handler

use anyhow::Result;
use chrono::Utc;

use camptrack_core::{CampStore, Config};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &CampStore, config: &Config, output: &Output) -> Result<()> {
    let session = store.session();
    let camp = store.current_camp();
    let today = Utc::now().date_naive();
    let summary = store.attendance_summary(today);
    let database_path = config.database_path();
    let database_size = std::fs::metadata(&database_path)
        .map(|m| m.len())
        .unwrap_or(0);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "user": {
                        "id": session.user_id,
                        "email": session.email,
                        "admin": session.is_admin()
                    },
                    "camp": camp,
                    "visible_camps": store.camps().len(),
                    "storage": {
                        "database_path": database_path,
                        "database_size": database_size
                    },
                    "counts": {
                        "athletes": store.athletes().len(),
                        "groups": store.groups().len(),
                        "notes": store.state().notes.len(),
                        "present_today": summary.present,
                        "absent_today": summary.absent
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            if let Some(camp) = camp {
                println!("{}", camp.id);
            }
        }
        OutputFormat::Human => {
            println!("camptrack Status");
            println!("================");
            println!();
            println!("User:");
            println!("  Email: {}", session.email);
            println!("  ID:    {}", session.user_id);
            if session.is_admin() {
                println!("  Role:  administrator");
            }
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!("  Size:     {}", human_size(database_size));
            println!();
            println!("Camps: {} visible", store.camps().len());
            match camp {
                Some(camp) => {
                    println!();
                    println!("Current camp: {}", camp.name);
                    println!("  Dates:    {} to {}", camp.start_date, camp.end_date);
                    println!("  Athletes: {}", store.athletes().len());
                    println!("  Groups:   {}", store.groups().len());
                    println!("  Notes:    {}", store.state().notes.len());
                    if camp.contains(today) {
                        println!(
                            "  Today:    {} present, {} absent{}",
                            summary.present,
                            summary.absent,
                            if store.is_date_locked(today) {
                                " [locked]"
                            } else {
                                ""
                            }
                        );
                    }
                }
                None => {
                    println!("No camp selected. Run `camptrack camp select <id>`.");
                }
            }
        }
    }

    Ok(())
}

fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
