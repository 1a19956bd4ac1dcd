//! Roster import from CSV
//!
//! Columns are found by case-insensitive substring matches on the header
//! row, so exports from registration forms work without renaming columns.

use std::io::Read;

use thiserror::Error;
use tracing::debug;

use crate::models::NewAthlete;

/// Name cell value that registration forms use for blank entries
const UNKNOWN_NAME: &str = "Unknown";

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Could not read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("No valid athletes found. Check column headers.")]
    NoValidAthletes,
}

/// Column positions detected from the header row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: Option<usize>,
    pub nickname: Option<usize>,
    pub parent_name: Option<usize>,
    pub parent_phone: Option<usize>,
    pub contact_email: Option<usize>,
    pub birth_date: Option<usize>,
    pub shirt_size: Option<usize>,
    pub medical_notes: Option<usize>,
    pub allergies: Option<usize>,
}

impl ColumnMap {
    /// Detect columns from header names
    pub fn detect<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let headers: Vec<String> = headers
            .into_iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let find = |pred: &dyn Fn(&str) -> bool| headers.iter().position(|h| pred(h.as_str()));

        let is_nickname = |h: &str| h.contains("nick");
        let is_parent_name = |h: &str| h.contains("parent") && h.contains("name");

        let is_name = |h: &str| h.contains("name") && !is_nickname(h) && !is_parent_name(h);

        let name = find(&|h| {
            is_name(h) && (h.contains("athlete") || h.contains("child") || h.contains("kid"))
        })
        .or_else(|| find(&is_name));

        Self {
            name,
            nickname: find(&is_nickname),
            parent_name: find(&is_parent_name),
            parent_phone: find(&|h| h.contains("phone")),
            contact_email: find(&|h| h.contains("email")),
            birth_date: find(&|h| h.contains("birth") || h == "dob"),
            shirt_size: find(&|h| h.contains("shirt")),
            medical_notes: find(&|h| {
                h.contains("medical") || (h.contains("notes") && h.contains("med"))
            }),
            allergies: find(&|h| h.contains("allerg")),
        }
    }

    fn athlete_from(&self, record: &csv::StringRecord) -> Option<NewAthlete> {
        let cell = |column: Option<usize>| {
            column
                .and_then(|i| record.get(i))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let name = cell(self.name);
        if name.is_empty() || name == UNKNOWN_NAME {
            return None;
        }

        Some(NewAthlete {
            name,
            nickname: cell(self.nickname),
            parent_name: cell(self.parent_name),
            parent_phone: cell(self.parent_phone),
            contact_email: cell(self.contact_email),
            birth_date: cell(self.birth_date),
            shirt_size: cell(self.shirt_size),
            medical_notes: cell(self.medical_notes),
            allergies: cell(self.allergies),
        })
    }
}

/// Parsed roster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub athletes: Vec<NewAthlete>,
    /// Data rows dropped for lacking a usable name
    pub skipped_rows: usize,
}

/// Parse a roster CSV with a header row
pub fn parse_roster<R: Read>(reader: R) -> Result<ImportReport, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = ColumnMap::detect(reader.headers()?.iter());
    debug!("Detected roster columns: {:?}", columns);

    let mut athletes = Vec::new();
    let mut skipped_rows = 0;
    for record in reader.records() {
        let record = record?;
        match columns.athlete_from(&record) {
            Some(athlete) => athletes.push(athlete),
            None => skipped_rows += 1,
        }
    }

    if athletes.is_empty() {
        return Err(ImportError::NoValidAthletes);
    }

    Ok(ImportReport {
        athletes,
        skipped_rows,
    })
}
