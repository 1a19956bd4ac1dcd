//! Date-scoped resolution
//!
//! An athlete's group on a date is the override for exactly that date when
//! one exists, else their default group. Attendance is the recorded status
//! for the date, else present. Nothing here is cached; every call looks the
//! tables up again.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Athlete, AttendanceStatus, DateKey, Group, GroupRef};

/// Where a resolved group came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupSource {
    /// A per-date override
    Override,
    /// The athlete's default group
    Default,
    /// Neither exists
    Unassigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedGroup {
    pub group: GroupRef,
    pub source: GroupSource,
}

/// Where a resolved attendance status came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AttendanceSource {
    /// An explicit record for the date
    Recorded,
    /// No record, on a locked date
    LockedDefault,
    /// No record, on an open date
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedAttendance {
    pub status: AttendanceStatus,
    pub source: AttendanceSource,
}

/// Resolve an athlete's group on a date, with its source
pub fn resolve_group(
    overrides: &HashMap<DateKey, GroupRef>,
    athlete: &Athlete,
    date: NaiveDate,
) -> ResolvedGroup {
    if let Some(group) = overrides.get(&DateKey::new(date, athlete.id)) {
        return ResolvedGroup {
            group: *group,
            source: GroupSource::Override,
        };
    }

    match athlete.group_id {
        GroupRef::Unassigned => ResolvedGroup {
            group: GroupRef::Unassigned,
            source: GroupSource::Unassigned,
        },
        group => ResolvedGroup {
            group,
            source: GroupSource::Default,
        },
    }
}

/// An athlete's group on a date
pub fn effective_group(
    overrides: &HashMap<DateKey, GroupRef>,
    athlete: &Athlete,
    date: NaiveDate,
) -> GroupRef {
    resolve_group(overrides, athlete, date).group
}

/// Resolve an athlete's attendance on a date, with its source
pub fn resolve_attendance(
    records: &HashMap<DateKey, AttendanceStatus>,
    locked: &BTreeSet<NaiveDate>,
    athlete_id: Uuid,
    date: NaiveDate,
) -> ResolvedAttendance {
    if let Some(status) = records.get(&DateKey::new(date, athlete_id)) {
        return ResolvedAttendance {
            status: *status,
            source: AttendanceSource::Recorded,
        };
    }

    if locked.contains(&date) {
        // A locked day was reviewed; no record there means they were present
        ResolvedAttendance {
            status: AttendanceStatus::Present,
            source: AttendanceSource::LockedDefault,
        }
    } else {
        ResolvedAttendance {
            status: AttendanceStatus::Present,
            source: AttendanceSource::Default,
        }
    }
}

/// An athlete's attendance on a date
pub fn effective_attendance(
    records: &HashMap<DateKey, AttendanceStatus>,
    locked: &BTreeSet<NaiveDate>,
    athlete_id: Uuid,
    date: NaiveDate,
) -> AttendanceStatus {
    resolve_attendance(records, locked, athlete_id, date).status
}

/// Look a group reference up among a camp's groups
///
/// Unassigned and dangling references both yield `None`.
pub fn group_details(groups: &[Group], group: GroupRef) -> Option<&Group> {
    let id = group.id()?;
    groups.iter().find(|g| g.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_date, NewAthlete};

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn athlete_in(group: GroupRef) -> Athlete {
        let mut athlete = Athlete::new(Uuid::new_v4(), NewAthlete::named("Sam"));
        athlete.group_id = group;
        athlete
    }

    #[test]
    fn test_override_wins_on_its_date_only() {
        let red = GroupRef::Group(Uuid::new_v4());
        let blue = GroupRef::Group(Uuid::new_v4());
        let athlete = athlete_in(red);

        let mut overrides = HashMap::new();
        overrides.insert(DateKey::new(date("2024-07-02"), athlete.id), blue);

        let resolved = resolve_group(&overrides, &athlete, date("2024-07-02"));
        assert_eq!(resolved.group, blue);
        assert_eq!(resolved.source, GroupSource::Override);

        let resolved = resolve_group(&overrides, &athlete, date("2024-07-03"));
        assert_eq!(resolved.group, red);
        assert_eq!(resolved.source, GroupSource::Default);
    }

    #[test]
    fn test_other_athletes_override_ignored() {
        let athlete = athlete_in(GroupRef::Unassigned);
        let mut overrides = HashMap::new();
        overrides.insert(
            DateKey::new(date("2024-07-02"), Uuid::new_v4()),
            GroupRef::Group(Uuid::new_v4()),
        );

        let resolved = resolve_group(&overrides, &athlete, date("2024-07-02"));
        assert_eq!(resolved.group, GroupRef::Unassigned);
        assert_eq!(resolved.source, GroupSource::Unassigned);
    }

    #[test]
    fn test_override_to_unassigned() {
        let athlete = athlete_in(GroupRef::Group(Uuid::new_v4()));
        let mut overrides = HashMap::new();
        overrides.insert(DateKey::new(date("2024-07-02"), athlete.id), GroupRef::Unassigned);

        assert_eq!(
            effective_group(&overrides, &athlete, date("2024-07-02")),
            GroupRef::Unassigned
        );
    }

    #[test]
    fn test_attendance_absent_only_when_recorded() {
        let athlete_id = Uuid::new_v4();
        let day = date("2024-07-02");
        let mut records = HashMap::new();
        let mut locked = BTreeSet::new();

        let open = resolve_attendance(&records, &locked, athlete_id, day);
        assert_eq!(open.status, AttendanceStatus::Present);
        assert_eq!(open.source, AttendanceSource::Default);

        locked.insert(day);
        let reviewed = resolve_attendance(&records, &locked, athlete_id, day);
        assert_eq!(reviewed.status, AttendanceStatus::Present);
        assert_eq!(reviewed.source, AttendanceSource::LockedDefault);

        records.insert(DateKey::new(day, athlete_id), AttendanceStatus::Absent);
        let recorded = resolve_attendance(&records, &locked, athlete_id, day);
        assert_eq!(recorded.status, AttendanceStatus::Absent);
        assert_eq!(recorded.source, AttendanceSource::Recorded);

        assert_eq!(
            effective_attendance(&records, &locked, athlete_id, date("2024-07-03")),
            AttendanceStatus::Present
        );
    }

    #[test]
    fn test_dangling_group_has_no_details() {
        let camp_id = Uuid::new_v4();
        let groups = Group::defaults_for(camp_id);

        let known = GroupRef::Group(groups[1].id);
        assert_eq!(group_details(&groups, known).map(|g| g.name.as_str()), Some("Blue Team"));

        assert!(group_details(&groups, GroupRef::Group(Uuid::new_v4())).is_none());
        assert!(group_details(&groups, GroupRef::Unassigned).is_none());
    }
}
