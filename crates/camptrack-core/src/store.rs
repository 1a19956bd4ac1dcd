//! Camp store
//!
//! The `CampStore` is the entry point for everything the application does:
//! - mirrors the database into local state for the session
//! - performs mutations as single writes or atomic batches
//! - answers reads from the mirror, resolving date-scoped overrides
//!
//! After each mutation the mirror is polled, so reads reflect the write.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = CampStore::open(&config)?;
//!
//! let camp = store.add_camp("Summer Elite", None)?;
//! let athlete = store.add_athlete(NewAthlete::named("Jordan Lee"))?;
//! store.set_attendance(athlete.id, today, AttendanceStatus::Absent, Confirmation::Unconfirmed)?;
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::database::{
    to_object, CollectionPath, DocumentStore, LocalDatabase, Query, WriteBatch,
};
use crate::import::{parse_roster, ImportReport};
use crate::mirror::{decode_all, LocalState, Mirror};
use crate::models::{
    Athlete, AthleteUpdate, AttendanceRecord, AttendanceStatus, Camp, CampUpdate, Group,
    GroupOverride, GroupRef, GroupUpdate, NewAthlete, Note, NoteKind, SavedDate, UserProfile,
    DATE_FORMAT, UNASSIGNED,
};
use crate::photos::PhotoStore;
use crate::resolve::{resolve_attendance, resolve_group, ResolvedAttendance, ResolvedGroup};
use crate::session::{CampSelection, Session};
use crate::views::{self, AttendanceSummary, GroupBoard, HistoryEntry};

/// Whether the user has confirmed editing a locked date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Unconfirmed,
    Confirmed,
}

/// Action failures the caller is expected to handle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("{date} is locked. Confirm to edit it anyway.")]
    DateLocked { date: NaiveDate },

    #[error("No camp selected. Run `camptrack camp select <id>` first.")]
    NoCampSelected,

    #[error("Camp not found: {0}")]
    CampNotVisible(Uuid),

    #[error("Athlete not found: {0}")]
    AthleteNotFound(Uuid),

    #[error("Group not found: {0}")]
    GroupNotFound(Uuid),

    #[error("No user registered with email {0}")]
    UserNotFound(String),

    #[error("{0}")]
    Invalid(String),
}

/// Camp roster, attendance and groups for one session
pub struct CampStore {
    db: Arc<dyn DocumentStore>,
    session: Session,
    mirror: Mirror,
    selection: CampSelection,
    photos: Option<PhotoStore>,
}

impl CampStore {
    /// Open the local database and session described by the configuration
    pub fn open(config: &Config) -> Result<Self> {
        let session = Session::from_config(config)?;
        let db = LocalDatabase::open(config).context("Failed to open database")?;
        Ok(Self::new(Arc::new(db), session, CampSelection::load(config))
            .with_photos(PhotoStore::new(config.photos_dir())))
    }

    /// Keep athlete photos in this store
    pub fn with_photos(mut self, photos: PhotoStore) -> Self {
        self.photos = Some(photos);
        self
    }

    /// Build a store over any database
    pub fn new(db: Arc<dyn DocumentStore>, session: Session, selection: CampSelection) -> Self {
        let mirror = Mirror::new(db.clone(), &session);
        let mut store = Self {
            db,
            session,
            mirror,
            selection,
            photos: None,
        };
        store.sync();
        store
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &LocalState {
        self.mirror.state()
    }

    /// Apply pending snapshots and follow the selected camp
    ///
    /// Returns true if local state changed.
    pub fn sync(&mut self) -> bool {
        let mut changed = self.mirror.poll();

        let visible = self
            .selection
            .current()
            .filter(|id| self.state().camps.iter().any(|c| c.id == *id));
        if self.mirror.attached_camp() != visible {
            self.mirror.attach_camp(visible);
            self.mirror.poll();
            changed = true;
        }
        changed
    }

    // ==================== Users ====================

    /// Register an email, or return the existing profile for it
    pub fn register_user(db: &dyn DocumentStore, email: &str) -> Result<UserProfile> {
        let email = normalize_email(email)?;
        if let Some(existing) = find_user(db, &email)? {
            return Ok(existing);
        }

        let profile = UserProfile::new(email);
        let mut batch = WriteBatch::new();
        batch.set(CollectionPath::users(), profile.id.as_str(), &profile)?;
        db.commit(batch).context("Failed to register user")?;
        info!("Registered user {}", profile.email);
        Ok(profile)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        find_user(self.db.as_ref(), &normalize_email(email)?)
    }

    // ==================== Camps ====================

    /// Create a camp owned by the session user, seeded with default groups,
    /// and select it
    pub fn add_camp(
        &mut self,
        name: &str,
        dates: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Camp> {
        let name = required(name, "Camp name")?;
        let camp = match dates {
            Some((start, end)) => {
                check_range(start, end)?;
                Camp::with_dates(name, self.session.user_id.as_str(), start, end)
            }
            None => Camp::new(name, self.session.user_id.as_str()),
        };

        let mut batch = WriteBatch::new();
        batch.set(CollectionPath::camps(), camp.id.to_string(), &camp)?;
        for group in Group::defaults_for(camp.id) {
            batch.set(CollectionPath::groups(), group.id.to_string(), &group)?;
        }
        self.commit(batch, "create camp")?;
        info!("Created camp {} ({})", camp.name, camp.id);

        self.select_camp(camp.id)?;
        Ok(camp)
    }

    /// Rename a camp or change its dates
    pub fn update_camp(&mut self, camp_id: Uuid, update: CampUpdate) -> Result<Camp> {
        let camp = self.camp(camp_id)?.clone();
        if update.is_empty() {
            return Ok(camp);
        }

        let mut fields = Map::new();
        if let Some(name) = &update.name {
            fields.insert("name".into(), required(name, "Camp name")?.into());
        }
        let start = update.start_date.unwrap_or(camp.start_date);
        let end = update.end_date.unwrap_or(camp.end_date);
        check_range(start, end)?;
        if let Some(start) = update.start_date {
            fields.insert("startDate".into(), date_value(start));
        }
        if let Some(end) = update.end_date {
            fields.insert("endDate".into(), date_value(end));
        }

        let mut batch = WriteBatch::new();
        batch.update(CollectionPath::camps(), camp_id.to_string(), fields);
        self.commit(batch, "update camp")?;
        Ok(self.camp(camp_id)?.clone())
    }

    /// Delete a camp with everything that belongs to it
    pub fn delete_camp(&mut self, camp_id: Uuid) -> Result<()> {
        self.camp(camp_id)?;
        let camp_key = camp_id.to_string();

        let athlete_ids: Vec<Uuid> = self
            .db
            .query(&Query::all(CollectionPath::athletes()).where_eq("campId", camp_key.as_str()))
            .context("Failed to query athletes")?
            .iter()
            .filter_map(|doc| doc.id.parse().ok())
            .collect();

        let mut batch = WriteBatch::new();
        for collection in [
            CollectionPath::athletes(),
            CollectionPath::groups(),
            CollectionPath::attendance(),
            CollectionPath::group_assignments(),
            CollectionPath::notes(),
        ] {
            let query = Query::all(collection.clone()).where_eq("campId", camp_key.as_str());
            self.delete_matching(&mut batch, &query)?;
        }
        self.delete_matching(&mut batch, &Query::all(CollectionPath::saved_dates(camp_id)))?;
        batch.delete(CollectionPath::camps(), camp_key);

        let removed = batch.len();
        self.commit(batch, "delete camp")?;
        info!("Deleted camp {} ({} documents)", camp_id, removed);
        self.remove_photos(athlete_ids);

        if self.selection.current() == Some(camp_id) {
            self.selection.clear()?;
            self.sync();
        }
        Ok(())
    }

    /// Make a visible camp the current one
    pub fn select_camp(&mut self, camp_id: Uuid) -> Result<()> {
        self.camp(camp_id)?;
        self.selection.select(camp_id)?;
        self.sync();
        Ok(())
    }

    pub fn clear_selection(&mut self) -> Result<()> {
        self.selection.clear()?;
        self.sync();
        Ok(())
    }

    /// Camps visible to the session
    pub fn camps(&self) -> &[Camp] {
        &self.state().camps
    }

    /// The selected camp, if it is visible
    pub fn current_camp(&self) -> Option<&Camp> {
        let id = self.mirror.attached_camp()?;
        self.state().camps.iter().find(|c| c.id == id)
    }

    /// Grant a registered user access to the current camp
    pub fn add_collaborator(&mut self, email: &str) -> Result<UserProfile> {
        let camp = self.require_camp()?.clone();
        let user = self
            .find_user_by_email(email)?
            .ok_or_else(|| ActionError::UserNotFound(email.trim().to_string()))?;

        if camp.is_member(&user.id) {
            debug!("{} already has access to {}", user.email, camp.name);
            return Ok(user);
        }

        let mut collaborators = camp.collaborator_ids.clone();
        collaborators.push(user.id.clone());
        let mut batch = WriteBatch::new();
        batch.update_field(
            CollectionPath::camps(),
            camp.id.to_string(),
            "collaboratorIds",
            collaborators,
        );
        self.commit(batch, "share camp")?;
        info!("Shared camp {} with {}", camp.name, user.email);
        Ok(user)
    }

    /// Revoke a collaborator's access to the current camp
    ///
    /// The local camp list drops the collaborator before the write is sent.
    pub fn remove_collaborator(&mut self, user_id: &str) -> Result<()> {
        let camp_id = self.active_camp()?;

        let mut collaborators = Vec::new();
        if let Some(camp) = self
            .mirror
            .state_mut()
            .camps
            .iter_mut()
            .find(|c| c.id == camp_id)
        {
            camp.collaborator_ids.retain(|c| c != user_id);
            collaborators = camp.collaborator_ids.clone();
        }

        let mut batch = WriteBatch::new();
        batch.update_field(
            CollectionPath::camps(),
            camp_id.to_string(),
            "collaboratorIds",
            collaborators,
        );
        self.commit(batch, "remove collaborator")
    }

    // ==================== Athletes ====================

    pub fn add_athlete(&mut self, profile: NewAthlete) -> Result<Athlete> {
        let camp_id = self.active_camp()?;
        required(&profile.name, "Athlete name")?;

        let athlete = Athlete::new(camp_id, profile);
        let mut batch = WriteBatch::new();
        batch.set(CollectionPath::athletes(), athlete.id.to_string(), &athlete)?;
        self.commit(batch, "add athlete")?;
        Ok(athlete)
    }

    /// Add every usable row of a roster CSV to the current camp
    pub fn import_athletes<R: Read>(&mut self, reader: R) -> Result<ImportReport> {
        let camp_id = self.active_camp()?;
        let report = parse_roster(reader)?;

        let mut batch = WriteBatch::new();
        for profile in &report.athletes {
            let athlete = Athlete::new(camp_id, profile.clone());
            batch.set(CollectionPath::athletes(), athlete.id.to_string(), &athlete)?;
        }
        self.commit(batch, "import athletes")?;
        info!(
            "Imported {} athletes ({} rows skipped)",
            report.athletes.len(),
            report.skipped_rows
        );
        Ok(report)
    }

    pub fn update_athlete(&mut self, athlete_id: Uuid, update: AthleteUpdate) -> Result<Athlete> {
        self.athlete(athlete_id)?;
        if let Some(name) = &update.name {
            required(name, "Athlete name")?;
        }
        if update.is_empty() {
            return Ok(self.athlete(athlete_id)?.clone());
        }

        let fields = to_object(&CollectionPath::athletes(), &athlete_id.to_string(), &update)?;
        let mut batch = WriteBatch::new();
        batch.update(CollectionPath::athletes(), athlete_id.to_string(), fields);
        self.commit(batch, "update athlete")?;
        Ok(self.athlete(athlete_id)?.clone())
    }

    /// Change the group an athlete is in when no override applies
    pub fn set_default_group(&mut self, athlete_id: Uuid, group: GroupRef) -> Result<()> {
        self.athlete(athlete_id)?;
        self.check_group(group)?;

        let mut batch = WriteBatch::new();
        batch.update_field(
            CollectionPath::athletes(),
            athlete_id.to_string(),
            "groupId",
            group.to_string(),
        );
        self.commit(batch, "set default group")
    }

    /// Delete an athlete and their attendance, overrides and notes
    pub fn delete_athlete(&mut self, athlete_id: Uuid) -> Result<()> {
        self.athlete(athlete_id)?;
        let athlete_key = athlete_id.to_string();

        let mut batch = WriteBatch::new();
        for collection in [
            CollectionPath::attendance(),
            CollectionPath::group_assignments(),
            CollectionPath::notes(),
        ] {
            let query = Query::all(collection).where_eq("athleteId", athlete_key.as_str());
            self.delete_matching(&mut batch, &query)?;
        }
        batch.delete(CollectionPath::athletes(), athlete_key);

        debug!("Deleting athlete {} with {} writes", athlete_id, batch.len());
        self.commit(batch, "delete athlete")?;
        self.remove_photos([athlete_id]);
        Ok(())
    }

    /// Copy an image file in as the athlete's photo
    ///
    /// The copy is abandoned if it runs past the upload timeout.
    pub async fn set_photo(&self, athlete_id: Uuid, source: &Path) -> Result<PathBuf> {
        self.athlete(athlete_id)?;
        let photos = self.photos.as_ref().ok_or_else(no_photo_store)?;
        photos
            .upload(athlete_id, source)
            .await
            .with_context(|| format!("Failed to save photo from {:?}", source))
    }

    /// Stored photo of an athlete, if any
    pub fn photo(&self, athlete_id: Uuid) -> Option<PathBuf> {
        self.photos.as_ref()?.find(athlete_id)
    }

    pub fn remove_photo(&self, athlete_id: Uuid) -> Result<bool> {
        self.athlete(athlete_id)?;
        let photos = self.photos.as_ref().ok_or_else(no_photo_store)?;
        Ok(photos.remove(athlete_id)?)
    }

    pub fn athletes(&self) -> Vec<&Athlete> {
        views::roster(self.state())
    }

    pub fn athlete(&self, athlete_id: Uuid) -> Result<&Athlete> {
        self.state()
            .athletes
            .iter()
            .find(|a| a.id == athlete_id)
            .ok_or_else(|| ActionError::AthleteNotFound(athlete_id).into())
    }

    pub fn search(&self, query: &str) -> Vec<&Athlete> {
        views::search(self.state(), query)
    }

    // ==================== Groups ====================

    pub fn add_group(&mut self, name: &str, color: &str, icon: Option<&str>) -> Result<Group> {
        let camp_id = self.active_camp()?;
        let mut group = Group::new(
            camp_id,
            required(name, "Group name")?,
            required(color, "Group color")?,
        );
        if let Some(icon) = icon {
            group = group.with_icon(icon);
        }

        let mut batch = WriteBatch::new();
        batch.set(CollectionPath::groups(), group.id.to_string(), &group)?;
        self.commit(batch, "add group")?;
        Ok(group)
    }

    pub fn update_group(&mut self, group_id: Uuid, update: GroupUpdate) -> Result<Group> {
        self.group(group_id)?;

        let mut fields = Map::new();
        if let Some(name) = &update.name {
            fields.insert("name".into(), required(name, "Group name")?.into());
        }
        if let Some(color) = &update.color {
            fields.insert("color".into(), required(color, "Group color")?.into());
        }
        if let Some(icon) = update.icon {
            fields.insert("icon".into(), icon.into());
        }
        if !fields.is_empty() {
            let mut batch = WriteBatch::new();
            batch.update(CollectionPath::groups(), group_id.to_string(), fields);
            self.commit(batch, "update group")?;
        }
        Ok(self.group(group_id)?.clone())
    }

    /// Delete a group; its members become unassigned
    ///
    /// Per-date overrides pointing at the group are left in place and
    /// resolve to a group that no longer exists.
    pub fn delete_group(&mut self, group_id: Uuid) -> Result<()> {
        self.group(group_id)?;
        let camp_id = self.active_camp()?;
        let group_key = group_id.to_string();

        let members = Query::all(CollectionPath::athletes())
            .where_eq("campId", camp_id.to_string())
            .where_eq("groupId", group_key.as_str());
        let mut batch = WriteBatch::new();
        for athlete in self.db.query(&members)? {
            batch.update_field(CollectionPath::athletes(), athlete.id, "groupId", UNASSIGNED);
        }
        batch.delete(CollectionPath::groups(), group_key);

        debug!("Deleting group {} with {} writes", group_id, batch.len());
        self.commit(batch, "delete group")
    }

    pub fn groups(&self) -> &[Group] {
        &self.state().groups
    }

    pub fn group(&self, group_id: Uuid) -> Result<&Group> {
        self.state()
            .groups
            .iter()
            .find(|g| g.id == group_id)
            .ok_or_else(|| ActionError::GroupNotFound(group_id).into())
    }

    // ==================== Attendance & groups by date ====================

    pub fn set_attendance(
        &mut self,
        athlete_id: Uuid,
        date: NaiveDate,
        status: AttendanceStatus,
        confirmation: Confirmation,
    ) -> Result<()> {
        self.bulk_set_attendance(&[athlete_id], date, status, confirmation)
    }

    /// Record the same status for several athletes in one batch
    pub fn bulk_set_attendance(
        &mut self,
        athlete_ids: &[Uuid],
        date: NaiveDate,
        status: AttendanceStatus,
        confirmation: Confirmation,
    ) -> Result<()> {
        let camp_id = self.active_camp()?;
        self.check_unlocked(date, confirmation)?;

        let mut batch = WriteBatch::new();
        for &athlete_id in athlete_ids {
            self.athlete(athlete_id)?;
            let record = AttendanceRecord {
                camp_id,
                athlete_id,
                date,
                status,
            };
            batch.set(CollectionPath::attendance(), record.key().to_string(), &record)?;
        }
        self.commit(batch, "record attendance")
    }

    /// Flip an athlete's attendance for a date; returns the new status
    pub fn toggle_attendance(
        &mut self,
        athlete_id: Uuid,
        date: NaiveDate,
        confirmation: Confirmation,
    ) -> Result<AttendanceStatus> {
        let status = self.attendance_on(athlete_id, date).status.toggled();
        self.set_attendance(athlete_id, date, status, confirmation)?;
        Ok(status)
    }

    /// Put an athlete in a group for one date without touching their default
    pub fn assign_group(
        &mut self,
        athlete_id: Uuid,
        date: NaiveDate,
        group: GroupRef,
        confirmation: Confirmation,
    ) -> Result<()> {
        let camp_id = self.active_camp()?;
        self.athlete(athlete_id)?;
        self.check_group(group)?;
        self.check_unlocked(date, confirmation)?;

        let assignment = GroupOverride {
            camp_id,
            athlete_id,
            date,
            group_id: group,
        };
        let mut batch = WriteBatch::new();
        batch.set(
            CollectionPath::group_assignments(),
            assignment.key().to_string(),
            &assignment,
        )?;
        self.commit(batch, "assign group")
    }

    pub fn attendance_on(&self, athlete_id: Uuid, date: NaiveDate) -> ResolvedAttendance {
        let state = self.state();
        resolve_attendance(&state.attendance, &state.saved_dates, athlete_id, date)
    }

    pub fn group_on(&self, athlete_id: Uuid, date: NaiveDate) -> Result<ResolvedGroup> {
        let athlete = self.athlete(athlete_id)?;
        Ok(resolve_group(&self.state().group_overrides, athlete, date))
    }

    /// Lock or unlock a date; returns true if the date is now locked
    pub fn toggle_date_lock(&mut self, date: NaiveDate) -> Result<bool> {
        let camp_id = self.active_camp()?;
        let key = date.format(DATE_FORMAT).to_string();
        let lock = !self.is_date_locked(date);

        let mut batch = WriteBatch::new();
        if lock {
            let saved = SavedDate {
                date,
                saved_at: Utc::now(),
            };
            batch.set(CollectionPath::saved_dates(camp_id), key, &saved)?;
        } else {
            batch.delete(CollectionPath::saved_dates(camp_id), key);
        }
        self.commit(batch, "toggle date lock")?;
        info!("{} {}", if lock { "Locked" } else { "Unlocked" }, date);
        Ok(lock)
    }

    pub fn is_date_locked(&self, date: NaiveDate) -> bool {
        self.state().saved_dates.contains(&date)
    }

    pub fn group_board(&self, date: NaiveDate) -> GroupBoard {
        views::group_board(self.state(), date)
    }

    pub fn attendance_summary(&self, date: NaiveDate) -> AttendanceSummary {
        views::attendance_summary(self.state(), date)
    }

    pub fn attendance_history(&self, athlete_id: Uuid) -> Result<Vec<HistoryEntry>> {
        let camp = self.require_camp()?;
        let athlete = self.athlete(athlete_id)?;
        Ok(views::attendance_history(self.state(), camp, athlete))
    }

    // ==================== Notes ====================

    pub fn add_note(
        &mut self,
        athlete_id: Uuid,
        date: NaiveDate,
        kind: NoteKind,
        content: &str,
    ) -> Result<Note> {
        let camp_id = self.active_camp()?;
        self.athlete(athlete_id)?;
        let note = Note::new(camp_id, athlete_id, date, kind, required(content, "Note")?);

        let mut batch = WriteBatch::new();
        batch.set(CollectionPath::notes(), note.id.to_string(), &note)?;
        self.commit(batch, "add note")?;
        Ok(note)
    }

    /// An athlete's notes, newest first
    pub fn notes_for(&self, athlete_id: Uuid) -> Vec<&Note> {
        views::notes_for(self.state(), athlete_id)
    }

    pub fn daily_notes(&self, date: NaiveDate) -> Vec<&Note> {
        views::daily_notes(self.state(), date)
    }

    // ==================== Helpers ====================

    /// Commit a batch, log failures, and bring the mirror up to date
    fn commit(&mut self, batch: WriteBatch, action: &str) -> Result<()> {
        if let Err(e) = self.db.commit(batch) {
            error!("Failed to {}: {}", action, e);
            return Err(e).with_context(|| format!("Failed to {}", action));
        }
        self.sync();
        Ok(())
    }

    /// Queue deletes for every document a query matches
    fn delete_matching(&self, batch: &mut WriteBatch, query: &Query) -> Result<()> {
        let docs = self
            .db
            .query(query)
            .with_context(|| format!("Failed to query {}", query))?;
        for doc in docs {
            batch.delete(query.collection.clone(), doc.id);
        }
        Ok(())
    }

    /// Drop photos of deleted athletes; failures only leave stray files
    fn remove_photos(&self, athlete_ids: impl IntoIterator<Item = Uuid>) {
        let Some(photos) = &self.photos else {
            return;
        };
        for athlete_id in athlete_ids {
            if let Err(e) = photos.remove(athlete_id) {
                warn!("Failed to remove photo of {}: {}", athlete_id, e);
            }
        }
    }

    fn active_camp(&self) -> Result<Uuid> {
        Ok(self.require_camp()?.id)
    }

    fn require_camp(&self) -> Result<&Camp> {
        self.current_camp()
            .ok_or_else(|| ActionError::NoCampSelected.into())
    }

    fn camp(&self, camp_id: Uuid) -> Result<&Camp> {
        self.state()
            .camps
            .iter()
            .find(|c| c.id == camp_id)
            .ok_or_else(|| ActionError::CampNotVisible(camp_id).into())
    }

    fn check_group(&self, group: GroupRef) -> Result<()> {
        if let Some(id) = group.id() {
            self.group(id)?;
        }
        Ok(())
    }

    fn check_unlocked(&self, date: NaiveDate, confirmation: Confirmation) -> Result<()> {
        if self.is_date_locked(date) && confirmation == Confirmation::Unconfirmed {
            return Err(ActionError::DateLocked { date }.into());
        }
        Ok(())
    }
}

fn find_user(db: &dyn DocumentStore, email: &str) -> Result<Option<UserProfile>> {
    let query = Query::all(CollectionPath::users()).where_eq("email", email);
    let docs = db.query(&query).context("Failed to look up user")?;
    Ok(decode_all(&query, &docs).into_iter().next())
}

fn no_photo_store() -> anyhow::Error {
    ActionError::Invalid("Photos are not stored for this session".to_string()).into()
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ActionError::Invalid(format!("Invalid email: {}", email)).into());
    }
    Ok(email)
}

fn required<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ActionError::Invalid(format!("{} cannot be empty", what)).into());
    }
    Ok(value)
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if end < start {
        return Err(ActionError::Invalid(format!(
            "Camp cannot end ({}) before it starts ({})",
            end, start
        ))
        .into());
    }
    Ok(())
}

fn date_value(date: NaiveDate) -> Value {
    Value::String(date.format(DATE_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::faulty::FaultyDatabase;
    use crate::models::parse_date;
    use crate::session::Role;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn member(id: &str) -> Session {
        Session::new(id, format!("{}@camp.org", id), Role::Member)
    }

    fn store_for(db: &Arc<LocalDatabase>, session: Session) -> CampStore {
        CampStore::new(db.clone(), session, CampSelection::in_memory())
    }

    /// A store with a selected camp running 2024-07-01..=2024-07-05
    fn setup() -> (Arc<LocalDatabase>, CampStore, Camp) {
        let db = Arc::new(LocalDatabase::in_memory());
        let mut store = store_for(&db, member("u1"));
        let camp = store
            .add_camp("Summer Elite", Some((date("2024-07-01"), date("2024-07-05"))))
            .unwrap();
        (db, store, camp)
    }

    fn is_action_error(err: &anyhow::Error, expected: &ActionError) -> bool {
        err.downcast_ref::<ActionError>() == Some(expected)
    }

    #[test]
    fn test_add_camp_seeds_groups_and_selects() {
        let (_db, store, camp) = setup();
        assert_eq!(store.current_camp().map(|c| c.id), Some(camp.id));
        assert_eq!(camp.owner_id, "u1");

        let names: Vec<_> = store.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"Red Team"));
        assert!(names.contains(&"Blue Team"));
        assert!(names.contains(&"Green Team"));
    }

    #[test]
    fn test_add_camp_validates() {
        let db = Arc::new(LocalDatabase::in_memory());
        let mut store = store_for(&db, member("u1"));

        assert!(store.add_camp("  ", None).is_err());
        assert!(store
            .add_camp("Backwards", Some((date("2024-07-05"), date("2024-07-01"))))
            .is_err());
        assert!(store.camps().is_empty());
    }

    #[test]
    fn test_update_camp() {
        let (_db, mut store, camp) = setup();
        let updated = store
            .update_camp(
                camp.id,
                CampUpdate {
                    name: Some("Summer Pro".to_string()),
                    end_date: Some(date("2024-07-10")),
                    ..CampUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Summer Pro");
        assert_eq!(updated.start_date, date("2024-07-01"));
        assert_eq!(updated.end_date, date("2024-07-10"));
    }

    #[test]
    fn test_actions_require_selected_camp() {
        let db = Arc::new(LocalDatabase::in_memory());
        let mut store = store_for(&db, member("u1"));

        let err = store.add_athlete(NewAthlete::named("Ana")).unwrap_err();
        assert!(is_action_error(&err, &ActionError::NoCampSelected));
    }

    #[test]
    fn test_import_uses_active_camp() {
        let (_db, mut store, camp) = setup();
        let csv = "Athlete Name,Parent Phone\nAna,555-0100\nUnknown,\nBen,555-0101\n,\n";

        let report = store.import_athletes(csv.as_bytes()).unwrap();
        assert_eq!(report.athletes.len(), 2);
        assert_eq!(store.athletes().len(), 2);
        assert!(store.athletes().iter().all(|a| a.camp_id == camp.id));
        assert!(store.athletes().iter().all(|a| a.group_id.is_unassigned()));
    }

    #[test]
    fn test_import_without_names_fails() {
        let (_db, mut store, _camp) = setup();
        let err = store.import_athletes("Phone\n555\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("No valid athletes found"));
        assert!(store.athletes().is_empty());
    }

    #[test]
    fn test_update_athlete_merges_fields() {
        let (_db, mut store, _camp) = setup();
        let mut profile = NewAthlete::named("Ana");
        profile.allergies = "Peanuts".to_string();
        let athlete = store.add_athlete(profile).unwrap();

        let updated = store
            .update_athlete(
                athlete.id,
                AthleteUpdate {
                    nickname: Some("Annie".to_string()),
                    ..AthleteUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.nickname, "Annie");
        assert_eq!(updated.allergies, "Peanuts");
        assert_eq!(store.search("annie").len(), 1);
    }

    #[test]
    fn test_override_applies_to_its_date_only() {
        let (_db, mut store, _camp) = setup();
        let red = store.groups()[0].id;
        let blue = store.groups()[1].id;
        let athlete = store.add_athlete(NewAthlete::named("Ana")).unwrap();
        store.set_default_group(athlete.id, red.into()).unwrap();
        store
            .assign_group(athlete.id, date("2024-07-02"), blue.into(), Confirmation::Unconfirmed)
            .unwrap();

        assert_eq!(
            store.group_on(athlete.id, date("2024-07-02")).unwrap().group,
            GroupRef::Group(blue)
        );
        assert_eq!(
            store.group_on(athlete.id, date("2024-07-03")).unwrap().group,
            GroupRef::Group(red)
        );
        assert_eq!(store.athlete(athlete.id).unwrap().group_id, GroupRef::Group(red));
    }

    #[test]
    fn test_attendance_toggle_and_bulk() {
        let (_db, mut store, _camp) = setup();
        let ana = store.add_athlete(NewAthlete::named("Ana")).unwrap();
        let ben = store.add_athlete(NewAthlete::named("Ben")).unwrap();
        let day = date("2024-07-02");

        assert_eq!(store.attendance_on(ana.id, day).status, AttendanceStatus::Present);
        let status = store
            .toggle_attendance(ana.id, day, Confirmation::Unconfirmed)
            .unwrap();
        assert_eq!(status, AttendanceStatus::Absent);
        assert_eq!(store.attendance_on(ana.id, day).status, AttendanceStatus::Absent);

        store
            .bulk_set_attendance(
                &[ana.id, ben.id],
                day,
                AttendanceStatus::Present,
                Confirmation::Unconfirmed,
            )
            .unwrap();
        assert_eq!(store.attendance_summary(day).present, 2);
    }

    #[test]
    fn test_locked_date_requires_confirmation() {
        let (_db, mut store, _camp) = setup();
        let ana = store.add_athlete(NewAthlete::named("Ana")).unwrap();
        let day = date("2024-07-02");

        assert!(store.toggle_date_lock(day).unwrap());
        assert!(store.is_date_locked(day));
        assert_eq!(
            store.attendance_on(ana.id, day).source,
            crate::resolve::AttendanceSource::LockedDefault
        );

        let err = store
            .set_attendance(ana.id, day, AttendanceStatus::Absent, Confirmation::Unconfirmed)
            .unwrap_err();
        assert!(is_action_error(&err, &ActionError::DateLocked { date: day }));
        assert_eq!(store.attendance_on(ana.id, day).status, AttendanceStatus::Present);

        store
            .set_attendance(ana.id, day, AttendanceStatus::Absent, Confirmation::Confirmed)
            .unwrap();
        assert_eq!(store.attendance_on(ana.id, day).status, AttendanceStatus::Absent);

        assert!(!store.toggle_date_lock(day).unwrap());
        assert!(!store.is_date_locked(day));
    }

    #[test]
    fn test_delete_athlete_cascades() {
        let (db, mut store, camp) = setup();
        let blue = store.groups()[1].id;
        let ana = store.add_athlete(NewAthlete::named("Ana")).unwrap();
        let ben = store.add_athlete(NewAthlete::named("Ben")).unwrap();
        let day = date("2024-07-02");
        for athlete in [ana.id, ben.id] {
            store
                .set_attendance(athlete, day, AttendanceStatus::Absent, Confirmation::Unconfirmed)
                .unwrap();
            store
                .assign_group(athlete, day, blue.into(), Confirmation::Unconfirmed)
                .unwrap();
            store
                .add_note(athlete, day, NoteKind::Admin, "Left early")
                .unwrap();
        }

        store.delete_athlete(ana.id).unwrap();

        let by_athlete = |collection: CollectionPath, id: Uuid| {
            db.query(&Query::all(collection).where_eq("athleteId", id.to_string()))
                .unwrap()
                .len()
        };
        for collection in [
            CollectionPath::attendance(),
            CollectionPath::group_assignments(),
            CollectionPath::notes(),
        ] {
            assert_eq!(by_athlete(collection.clone(), ana.id), 0);
            assert_eq!(by_athlete(collection, ben.id), 1);
        }
        assert!(store.athlete(ana.id).is_err());
        assert_eq!(store.groups().len(), 3);
        assert_eq!(store.camps().len(), 1);
        assert_eq!(store.current_camp().map(|c| c.id), Some(camp.id));
    }

    #[test]
    fn test_delete_group_unassigns_and_leaves_overrides() {
        let (_db, mut store, _camp) = setup();
        let red = store.groups()[0].id;
        let ana = store.add_athlete(NewAthlete::named("Ana")).unwrap();
        store.set_default_group(ana.id, red.into()).unwrap();
        let day = date("2024-07-02");
        store
            .assign_group(ana.id, day, red.into(), Confirmation::Unconfirmed)
            .unwrap();

        store.delete_group(red).unwrap();

        assert!(store.group(red).is_err());
        assert_eq!(store.athlete(ana.id).unwrap().group_id, GroupRef::Unassigned);
        // The override still points at the deleted group
        let resolved = store.group_on(ana.id, day).unwrap();
        assert_eq!(resolved.group, GroupRef::Group(red));
        assert!(store.group_board(day).unassigned.iter().any(|a| a.id == ana.id));
    }

    #[test]
    fn test_delete_camp_removes_everything() {
        let (db, mut store, camp) = setup();
        let blue = store.groups()[1].id;
        let ana = store.add_athlete(NewAthlete::named("Ana")).unwrap();
        let day = date("2024-07-02");
        store
            .set_attendance(ana.id, day, AttendanceStatus::Absent, Confirmation::Unconfirmed)
            .unwrap();
        store
            .assign_group(ana.id, day, blue.into(), Confirmation::Unconfirmed)
            .unwrap();
        store.add_note(ana.id, day, NoteKind::Interests, "Likes chess").unwrap();
        store.toggle_date_lock(day).unwrap();
        assert_eq!(db.count(&CollectionPath::group_assignments()).unwrap(), 1);

        store.delete_camp(camp.id).unwrap();

        assert!(store.camps().is_empty());
        assert!(store.current_camp().is_none());
        for collection in [
            CollectionPath::camps(),
            CollectionPath::athletes(),
            CollectionPath::groups(),
            CollectionPath::attendance(),
            CollectionPath::group_assignments(),
            CollectionPath::notes(),
            CollectionPath::saved_dates(camp.id),
        ] {
            assert_eq!(db.count(&collection).unwrap(), 0, "{} not empty", collection);
        }
    }

    #[test]
    fn test_failed_collaborator_removal_stays_local() {
        let db = Arc::new(FaultyDatabase::new());
        let coach = CampStore::register_user(db.as_ref(), "coach@camp.org").unwrap();
        let mut store = CampStore::new(db.clone(), member("u1"), CampSelection::in_memory());
        let camp = store.add_camp("Shared", None).unwrap();
        store.add_collaborator("coach@camp.org").unwrap();
        assert_eq!(store.current_camp().unwrap().collaborator_ids, vec![coach.id.clone()]);

        db.set_offline(true);
        let err = store.remove_collaborator(&coach.id).unwrap_err();
        assert!(err.to_string().contains("Failed to remove collaborator"));

        // The local camp list already dropped the collaborator
        assert!(store.current_camp().unwrap().collaborator_ids.is_empty());
        let stored = db.query(&Query::all(CollectionPath::camps())).unwrap();
        let stored: Camp = stored[0].decode().unwrap();
        assert_eq!(stored.id, camp.id);
        assert_eq!(stored.collaborator_ids, vec![coach.id]);
    }

    fn photo_store(temp_dir: &TempDir) -> (Arc<LocalDatabase>, CampStore) {
        let db = Arc::new(LocalDatabase::in_memory());
        let mut store = store_for(&db, member("u1"))
            .with_photos(PhotoStore::new(temp_dir.path().join("photos")));
        store
            .add_camp("Summer Elite", Some((date("2024-07-01"), date("2024-07-05"))))
            .unwrap();
        (db, store)
    }

    #[tokio::test]
    async fn test_set_photo() {
        let temp_dir = TempDir::new().unwrap();
        let (_db, mut store) = photo_store(&temp_dir);
        let ana = store.add_athlete(NewAthlete::named("Ana")).unwrap();
        let source = temp_dir.path().join("ana.png");
        std::fs::write(&source, b"png bytes").unwrap();

        assert!(store.photo(ana.id).is_none());
        let saved = store.set_photo(ana.id, &source).await.unwrap();
        assert_eq!(store.photo(ana.id), Some(saved));

        assert!(store.remove_photo(ana.id).unwrap());
        assert!(store.photo(ana.id).is_none());

        let err = store.set_photo(Uuid::new_v4(), &source).await.unwrap_err();
        assert!(err.downcast_ref::<ActionError>().is_some());
    }

    #[tokio::test]
    async fn test_photos_need_a_photo_store() {
        let (_db, mut store, _camp) = setup();
        let ana = store.add_athlete(NewAthlete::named("Ana")).unwrap();

        assert!(store.photo(ana.id).is_none());
        let err = store
            .set_photo(ana.id, Path::new("ana.png"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Photos are not stored"));
    }

    #[tokio::test]
    async fn test_deletes_remove_photos() {
        let temp_dir = TempDir::new().unwrap();
        let (_db, mut store) = photo_store(&temp_dir);
        let ana = store.add_athlete(NewAthlete::named("Ana")).unwrap();
        let ben = store.add_athlete(NewAthlete::named("Ben")).unwrap();
        let source = temp_dir.path().join("photo.jpg");
        std::fs::write(&source, b"jpg bytes").unwrap();
        for athlete in [ana.id, ben.id] {
            store.set_photo(athlete, &source).await.unwrap();
        }

        store.delete_athlete(ana.id).unwrap();
        assert!(store.photo(ana.id).is_none());
        assert!(store.photo(ben.id).is_some());

        let camp_id = store.current_camp().unwrap().id;
        store.delete_camp(camp_id).unwrap();
        assert!(store.photo(ben.id).is_none());
        assert!(source.exists());
    }

    #[test]
    fn test_sharing_between_sessions() {
        let db = Arc::new(LocalDatabase::in_memory());
        let owner = CampStore::register_user(db.as_ref(), "Owner@Camp.org").unwrap();
        let coach = CampStore::register_user(db.as_ref(), "coach@camp.org").unwrap();
        assert_eq!(owner.email, "owner@camp.org");
        // Registering again returns the same profile
        assert_eq!(
            CampStore::register_user(db.as_ref(), "COACH@camp.org").unwrap().id,
            coach.id
        );

        let mut owner_store =
            store_for(&db, Session::new(owner.id.as_str(), owner.email.as_str(), Role::Member));
        let camp = owner_store.add_camp("Shared", None).unwrap();
        owner_store.add_camp("Private", None).unwrap();
        owner_store.select_camp(camp.id).unwrap();

        let mut coach_store =
            store_for(&db, Session::new(coach.id.as_str(), coach.email.as_str(), Role::Member));
        assert!(coach_store.camps().is_empty());

        owner_store.add_collaborator("coach@camp.org").unwrap();
        coach_store.sync();
        assert_eq!(coach_store.camps().len(), 1);
        assert_eq!(coach_store.camps()[0].id, camp.id);

        owner_store.remove_collaborator(&coach.id).unwrap();
        assert!(owner_store.current_camp().unwrap().collaborator_ids.is_empty());
        coach_store.sync();
        assert!(coach_store.camps().is_empty());

        let err = owner_store.add_collaborator("stranger@camp.org").unwrap_err();
        assert!(is_action_error(
            &err,
            &ActionError::UserNotFound("stranger@camp.org".to_string())
        ));
    }

    #[test]
    fn test_admin_sees_all_camps() {
        let db = Arc::new(LocalDatabase::in_memory());
        let mut first = store_for(&db, member("u1"));
        first.add_camp("One", None).unwrap();
        let mut second = store_for(&db, member("u2"));
        second.add_camp("Two", None).unwrap();

        let admin = store_for(&db, Session::new("boss", "boss@camp.org", Role::Admin));
        assert_eq!(admin.camps().len(), 2);
        assert_eq!(first.camps().len(), 1);
    }

    #[test]
    fn test_selection_of_hidden_camp_is_rejected() {
        let db = Arc::new(LocalDatabase::in_memory());
        let mut owner = store_for(&db, member("u1"));
        let camp = owner.add_camp("Mine", None).unwrap();

        let mut other = store_for(&db, member("u2"));
        let err = other.select_camp(camp.id).unwrap_err();
        assert!(is_action_error(&err, &ActionError::CampNotVisible(camp.id)));
    }

    #[test]
    fn test_open_persists_selection() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            user_id: Some("u1".to_string()),
            user_email: Some("u1@camp.org".to_string()),
            ..Config::default()
        };

        let camp_id = {
            let mut store = CampStore::open(&config).unwrap();
            let camp = store.add_camp("Summer", None).unwrap();
            store.add_athlete(NewAthlete::named("Ana")).unwrap();
            camp.id
        };

        let store = CampStore::open(&config).unwrap();
        assert_eq!(store.current_camp().map(|c| c.id), Some(camp_id));
        assert_eq!(store.athletes().len(), 1);
    }

    #[test]
    fn test_notes_for_athlete() {
        let (_db, mut store, _camp) = setup();
        let ana = store.add_athlete(NewAthlete::named("Ana")).unwrap();
        let day = date("2024-07-02");

        assert!(store.add_note(ana.id, day, NoteKind::Admin, "  ").is_err());
        store
            .add_note(ana.id, day, NoteKind::Performance, "Strong backhand")
            .unwrap();

        assert_eq!(store.notes_for(ana.id).len(), 1);
        assert_eq!(store.daily_notes(day)[0].content, "Strong backhand");
        assert_eq!(store.attendance_history(ana.id).unwrap().len(), 5);
    }
}
