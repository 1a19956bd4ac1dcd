//! Data models for camptrack
//!
//! Defines the core records: Camp, Athlete, Group, attendance and group
//! override entries, Note, saved dates and user profiles.
//! Field names serialize as camelCase, matching the document database.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Sentinel stored in `groupId` fields for athletes without a group
pub const UNASSIGNED: &str = "unassigned";

/// Date format used on the wire and in document keys
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A time-boxed roster container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Camp {
    /// Unique identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// First day of the camp
    pub start_date: NaiveDate,
    /// Last day of the camp (inclusive)
    pub end_date: NaiveDate,
    /// User who created the camp
    pub owner_id: String,
    /// Users granted edit access without owning the camp
    #[serde(default)]
    pub collaborator_ids: Vec<String>,
    /// When this camp was created
    pub created_at: DateTime<Utc>,
}

impl Camp {
    /// Create a camp running from today until one month from today
    pub fn new(name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let today = Utc::now().date_naive();
        Self::with_dates(name, owner_id, today, default_end_date(today))
    }

    /// Create a camp with an explicit date range
    pub fn with_dates(
        name: impl Into<String>,
        owner_id: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start_date,
            end_date,
            owner_id: owner_id.into(),
            collaborator_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Whether the user owns or collaborates on this camp
    pub fn is_member(&self, user_id: &str) -> bool {
        self.owner_id == user_id || self.collaborator_ids.iter().any(|c| c == user_id)
    }

    /// Whether the date falls inside the camp's range
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Every date of the camp, in order
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start_date
            .iter_days()
            .take_while(|d| *d <= self.end_date)
            .collect()
    }
}

/// Changes to a camp's settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampUpdate {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl CampUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.start_date.is_none() && self.end_date.is_none()
    }
}

/// Reference to a group from an athlete or an override
///
/// Serializes as the group's id, or as `"unassigned"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum GroupRef {
    #[default]
    Unassigned,
    Group(Uuid),
}

impl GroupRef {
    /// The group id, if assigned
    pub fn id(&self) -> Option<Uuid> {
        match self {
            GroupRef::Unassigned => None,
            GroupRef::Group(id) => Some(*id),
        }
    }

    pub fn is_unassigned(&self) -> bool {
        matches!(self, GroupRef::Unassigned)
    }
}

impl From<Uuid> for GroupRef {
    fn from(id: Uuid) -> Self {
        GroupRef::Group(id)
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupRef::Unassigned => f.write_str(UNASSIGNED),
            GroupRef::Group(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for GroupRef {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.eq_ignore_ascii_case(UNASSIGNED) {
            return Ok(GroupRef::Unassigned);
        }
        Uuid::parse_str(s).map(GroupRef::Group)
    }
}

impl Serialize for GroupRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GroupRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(GroupRef::Unassigned),
            Some(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A tracked individual in a camp
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Athlete {
    pub id: Uuid,
    pub camp_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub parent_name: String,
    #[serde(default)]
    pub parent_phone: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub shirt_size: String,
    #[serde(default)]
    pub medical_notes: String,
    #[serde(default)]
    pub allergies: String,
    /// Default group, used when no override exists for a date
    #[serde(default)]
    pub group_id: GroupRef,
}

impl Athlete {
    /// Create an athlete in a camp from profile fields, without a group
    pub fn new(camp_id: Uuid, profile: NewAthlete) -> Self {
        Self {
            id: Uuid::new_v4(),
            camp_id,
            name: profile.name,
            nickname: profile.nickname,
            parent_name: profile.parent_name,
            parent_phone: profile.parent_phone,
            contact_email: profile.contact_email,
            birth_date: profile.birth_date,
            shirt_size: profile.shirt_size,
            medical_notes: profile.medical_notes,
            allergies: profile.allergies,
            group_id: GroupRef::Unassigned,
        }
    }

    /// Name shown in lists: nickname in quotes when present
    pub fn display_name(&self) -> String {
        if self.nickname.is_empty() {
            self.name.clone()
        } else {
            format!("{} \"{}\"", self.name, self.nickname)
        }
    }

    /// Case-insensitive match on name or nickname
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || (!self.nickname.is_empty() && self.nickname.to_lowercase().contains(&query))
    }
}

/// Profile fields for a new athlete (form input or CSV row)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAthlete {
    pub name: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub parent_name: String,
    #[serde(default)]
    pub parent_phone: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub shirt_size: String,
    #[serde(default)]
    pub medical_notes: String,
    #[serde(default)]
    pub allergies: String,
}

impl NewAthlete {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Profile edits; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AthleteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shirt_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
}

impl AthleteUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A named, colored cohort inside a camp
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub camp_id: Uuid,
    pub name: String,
    /// Color class, e.g. `bg-red-500`
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Group {
    pub fn new(camp_id: Uuid, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            camp_id,
            name: name.into(),
            color: color.into(),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Groups every new camp starts with
    pub fn defaults_for(camp_id: Uuid) -> Vec<Group> {
        vec![
            Group::new(camp_id, "Red Team", "bg-red-500"),
            Group::new(camp_id, "Blue Team", "bg-blue-500"),
            Group::new(camp_id, "Green Team", "bg-green-500"),
        ]
    }
}

/// Changes to a group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Attendance status for an athlete on a date
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn toggled(self) -> Self {
        match self {
            AttendanceStatus::Present => AttendanceStatus::Absent,
            AttendanceStatus::Absent => AttendanceStatus::Present,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "present" | "p" | "here" => Ok(AttendanceStatus::Present),
            "absent" | "a" | "away" => Ok(AttendanceStatus::Absent),
            other => Err(format!(
                "Unknown attendance status '{}'. Use 'present' or 'absent'.",
                other
            )),
        }
    }
}

/// Key of a date-scoped record: `<date>_<athleteId>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey {
    pub date: NaiveDate,
    pub athlete_id: Uuid,
}

impl DateKey {
    pub fn new(date: NaiveDate, athlete_id: Uuid) -> Self {
        Self { date, athlete_id }
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.date.format(DATE_FORMAT), self.athlete_id)
    }
}

/// Stored attendance document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub camp_id: Uuid,
    pub athlete_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    pub fn key(&self) -> DateKey {
        DateKey::new(self.date, self.athlete_id)
    }
}

/// Stored per-date group exception
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupOverride {
    pub camp_id: Uuid,
    pub athlete_id: Uuid,
    pub date: NaiveDate,
    pub group_id: GroupRef,
}

impl GroupOverride {
    pub fn key(&self) -> DateKey {
        DateKey::new(self.date, self.athlete_id)
    }
}

/// Kind of a note
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Admin,
    Performance,
    Interests,
}

impl NoteKind {
    pub fn label(&self) -> &'static str {
        match self {
            NoteKind::Admin => "Admin",
            NoteKind::Performance => "Performance",
            NoteKind::Interests => "Interests",
        }
    }
}

impl FromStr for NoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(NoteKind::Admin),
            "performance" => Ok(NoteKind::Performance),
            "interests" | "interest" => Ok(NoteKind::Interests),
            other => Err(format!(
                "Unknown note type '{}'. Use admin, performance or interests.",
                other
            )),
        }
    }
}

/// A free-text note about an athlete on a date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub camp_id: Uuid,
    pub athlete_id: Uuid,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: NoteKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Note {
    pub fn new(
        camp_id: Uuid,
        athlete_id: Uuid,
        date: NaiveDate,
        kind: NoteKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            camp_id,
            athlete_id,
            date,
            kind,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Marker document for a locked date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedDate {
    pub date: NaiveDate,
    pub saved_at: DateTime<Utc>,
}

/// User profile written at registration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            email: email.into(),
            created_at: Utc::now(),
        }
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
}

/// Last day of a camp that starts on `start` when no end is given: one
/// month later, clamped to the end of a shorter month
pub fn default_end_date(start: NaiveDate) -> NaiveDate {
    start.checked_add_months(Months::new(1)).unwrap_or(start)
}
