//! Read-only views over the mirrored state

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::mirror::LocalState;
use crate::models::{Athlete, AttendanceStatus, Camp, Group, GroupRef, Note};
use crate::resolve::{group_details, resolve_attendance, resolve_group, ResolvedAttendance};

/// Athletes of the camp sorted by name
pub fn roster(state: &LocalState) -> Vec<&Athlete> {
    let mut athletes: Vec<&Athlete> = state.athletes.iter().collect();
    athletes.sort_by_key(|a| a.name.to_lowercase());
    athletes
}

/// Athletes whose name or nickname contains the query, sorted by name
pub fn search<'a>(state: &'a LocalState, query: &str) -> Vec<&'a Athlete> {
    let query = query.trim();
    roster(state)
        .into_iter()
        .filter(|a| query.is_empty() || a.matches(query))
        .collect()
}

/// One column of the group board
#[derive(Debug, Clone, Serialize)]
pub struct GroupColumn {
    pub group: Group,
    pub athletes: Vec<Athlete>,
}

/// Athletes bucketed by their group on a date
#[derive(Debug, Clone, Serialize)]
pub struct GroupBoard {
    pub date: NaiveDate,
    pub columns: Vec<GroupColumn>,
    /// Unassigned athletes, and those pointing at a deleted group
    pub unassigned: Vec<Athlete>,
}

pub fn group_board(state: &LocalState, date: NaiveDate) -> GroupBoard {
    let mut columns: Vec<GroupColumn> = state
        .groups
        .iter()
        .map(|group| GroupColumn {
            group: group.clone(),
            athletes: Vec::new(),
        })
        .collect();
    let mut unassigned = Vec::new();

    for athlete in roster(state) {
        let group = resolve_group(&state.group_overrides, athlete, date).group;
        let column = group_details(&state.groups, group)
            .and_then(|g| columns.iter_mut().find(|c| c.group.id == g.id));
        match column {
            Some(column) => column.athletes.push(athlete.clone()),
            None => unassigned.push(athlete.clone()),
        }
    }

    GroupBoard {
        date,
        columns,
        unassigned,
    }
}

/// Present and absent counts for a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub present: usize,
    pub absent: usize,
}

impl AttendanceSummary {
    pub fn total(&self) -> usize {
        self.present + self.absent
    }
}

pub fn attendance_summary(state: &LocalState, date: NaiveDate) -> AttendanceSummary {
    let mut summary = AttendanceSummary {
        present: 0,
        absent: 0,
    };
    for athlete in &state.athletes {
        match resolve_attendance(&state.attendance, &state.saved_dates, athlete.id, date).status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Absent => summary.absent += 1,
        }
    }
    summary
}

/// One day of an athlete's attendance history
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub locked: bool,
    pub attendance: ResolvedAttendance,
    pub group: GroupRef,
}

/// Attendance and group of an athlete for every day of the camp
pub fn attendance_history(state: &LocalState, camp: &Camp, athlete: &Athlete) -> Vec<HistoryEntry> {
    camp.dates()
        .into_iter()
        .map(|date| HistoryEntry {
            date,
            locked: state.saved_dates.contains(&date),
            attendance: resolve_attendance(&state.attendance, &state.saved_dates, athlete.id, date),
            group: resolve_group(&state.group_overrides, athlete, date).group,
        })
        .collect()
}

/// An athlete's notes, newest first
pub fn notes_for(state: &LocalState, athlete_id: Uuid) -> Vec<&Note> {
    let mut notes: Vec<&Note> = state
        .notes
        .iter()
        .filter(|n| n.athlete_id == athlete_id)
        .collect();
    notes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    notes
}

/// Notes written for a date, oldest first
pub fn daily_notes(state: &LocalState, date: NaiveDate) -> Vec<&Note> {
    let mut notes: Vec<&Note> = state.notes.iter().filter(|n| n.date == date).collect();
    notes.sort_by_key(|n| n.timestamp);
    notes
}
