//! Local mirror of the database
//!
//! The mirror holds one listener per collection and rebuilds the matching
//! local collection from each full snapshot. Camp-scoped collections follow
//! the selected camp and are re-subscribed when it changes.
//!
//! A listener error is logged and the last-known state is kept.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::access::CampFeed;
use crate::database::{
    CollectionPath, DocumentStore, Listener, ListenerEvent, Query, RemoteDocument,
};
use crate::models::{
    Athlete, AttendanceRecord, AttendanceStatus, Camp, DateKey, Group, GroupOverride, GroupRef,
    Note, SavedDate,
};
use crate::session::Session;

/// Everything the session currently knows
#[derive(Debug, Clone, Default)]
pub struct LocalState {
    pub camps: Vec<Camp>,
    pub athletes: Vec<Athlete>,
    pub groups: Vec<Group>,
    pub attendance: HashMap<DateKey, AttendanceStatus>,
    pub group_overrides: HashMap<DateKey, GroupRef>,
    pub notes: Vec<Note>,
    pub saved_dates: BTreeSet<NaiveDate>,
}

impl LocalState {
    fn clear_camp_data(&mut self) {
        self.athletes.clear();
        self.groups.clear();
        self.attendance.clear();
        self.group_overrides.clear();
        self.notes.clear();
        self.saved_dates.clear();
    }
}

/// Listeners for the collections of one camp
struct CampListeners {
    camp_id: Uuid,
    athletes: Listener,
    groups: Listener,
    attendance: Listener,
    group_overrides: Listener,
    notes: Listener,
    saved_dates: Listener,
}

impl CampListeners {
    fn subscribe(db: &dyn DocumentStore, camp_id: Uuid) -> Self {
        let scoped = |collection: CollectionPath| {
            db.listen(Query::all(collection).where_eq("campId", camp_id.to_string()))
        };
        Self {
            camp_id,
            athletes: scoped(CollectionPath::athletes()),
            groups: scoped(CollectionPath::groups()),
            attendance: scoped(CollectionPath::attendance()),
            group_overrides: scoped(CollectionPath::group_assignments()),
            notes: scoped(CollectionPath::notes()),
            saved_dates: db.listen(Query::all(CollectionPath::saved_dates(camp_id))),
        }
    }
}

/// Keeps a `LocalState` in step with the database
pub struct Mirror {
    db: Arc<dyn DocumentStore>,
    camps: CampFeed,
    scoped: Option<CampListeners>,
    state: LocalState,
}

impl Mirror {
    /// Start following the camps visible to the session
    pub fn new(db: Arc<dyn DocumentStore>, session: &Session) -> Self {
        let camps = CampFeed::subscribe(db.as_ref(), session);
        Self {
            db,
            camps,
            scoped: None,
            state: LocalState::default(),
        }
    }

    pub fn state(&self) -> &LocalState {
        &self.state
    }

    /// Mutable access for optimistic local edits
    pub(crate) fn state_mut(&mut self) -> &mut LocalState {
        &mut self.state
    }

    /// Camp whose collections are being followed
    pub fn attached_camp(&self) -> Option<Uuid> {
        self.scoped.as_ref().map(|s| s.camp_id)
    }

    /// Follow a different camp's collections, or none
    pub fn attach_camp(&mut self, camp_id: Option<Uuid>) {
        if self.attached_camp() == camp_id {
            return;
        }

        // Dropping the old listeners unsubscribes them
        self.scoped = None;
        self.state.clear_camp_data();

        if let Some(camp_id) = camp_id {
            debug!("Following collections of camp {}", camp_id);
            self.scoped = Some(CampListeners::subscribe(self.db.as_ref(), camp_id));
        }
    }

    /// Apply pending snapshots; true if anything changed
    pub fn poll(&mut self) -> bool {
        let mut changed = false;

        if self.camps.poll() {
            self.state.camps = self.camps.camps();
            changed = true;
        }

        let Some(scoped) = self.scoped.as_mut() else {
            return changed;
        };
        let state = &mut self.state;

        changed |= drain(&mut scoped.athletes, &mut state.athletes);
        changed |= drain(&mut scoped.groups, &mut state.groups);
        changed |= drain(&mut scoped.notes, &mut state.notes);

        let mut records: Vec<AttendanceRecord> = Vec::new();
        if drain(&mut scoped.attendance, &mut records) {
            state.attendance = records.iter().map(|r| (r.key(), r.status)).collect();
            changed = true;
        }

        let mut overrides: Vec<GroupOverride> = Vec::new();
        if drain(&mut scoped.group_overrides, &mut overrides) {
            state.group_overrides = overrides.iter().map(|o| (o.key(), o.group_id)).collect();
            changed = true;
        }

        let mut saved: Vec<SavedDate> = Vec::new();
        if drain(&mut scoped.saved_dates, &mut saved) {
            state.saved_dates = saved.iter().map(|s| s.date).collect();
            changed = true;
        }

        changed
    }
}

/// Replace `target` with the listener's latest snapshot, if there is one
///
/// Returns false when nothing new arrived or the listener reported an error.
pub(crate) fn drain<T: DeserializeOwned>(listener: &mut Listener, target: &mut Vec<T>) -> bool {
    match listener.poll() {
        Some(ListenerEvent::Snapshot(docs)) => {
            *target = decode_all(listener.query(), &docs);
            true
        }
        Some(ListenerEvent::Error(message)) => {
            error!("Listener on {} failed: {}", listener.query(), message);
            false
        }
        Some(ListenerEvent::Pending) | None => false,
    }
}

/// Decode every document, skipping the ones that don't fit the model
pub(crate) fn decode_all<T: DeserializeOwned>(query: &Query, docs: &[RemoteDocument]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match doc.decode() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping malformed document {} in {}: {}", doc.id, query.collection, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::faulty::FaultyDatabase;
    use crate::database::{LocalDatabase, WriteBatch};
    use crate::models::{parse_date, NewAthlete};
    use crate::session::Role;
    use serde_json::json;

    fn setup() -> (Arc<LocalDatabase>, Mirror, Camp) {
        let db = Arc::new(LocalDatabase::in_memory());
        let camp = Camp::new("Summer", "u1");
        db.set(CollectionPath::camps(), &camp.id.to_string(), &camp)
            .unwrap();
        let session = Session::new("u1", "coach@camp.org", Role::Member);
        let mirror = Mirror::new(db.clone(), &session);
        (db, mirror, camp)
    }

    #[test]
    fn test_empty_before_first_poll() {
        let (_db, mut mirror, camp) = setup();
        assert!(mirror.state().camps.is_empty());

        assert!(mirror.poll());
        assert_eq!(mirror.state().camps, vec![camp]);
        assert!(!mirror.poll());
    }

    #[test]
    fn test_camp_collections_follow_selection() {
        let (db, mut mirror, camp) = setup();
        let other = Camp::new("Winter", "u1");
        let mut batch = WriteBatch::new();
        batch
            .set(CollectionPath::camps(), other.id.to_string(), &other)
            .unwrap();
        for (camp_id, name) in [(camp.id, "Ana"), (other.id, "Ben")] {
            let athlete = Athlete::new(camp_id, NewAthlete::named(name));
            batch
                .set(CollectionPath::athletes(), athlete.id.to_string(), &athlete)
                .unwrap();
        }
        db.commit(batch).unwrap();

        mirror.attach_camp(Some(camp.id));
        mirror.poll();
        let names: Vec<_> = mirror.state().athletes.iter().map(|a| a.name.clone()).collect();
        assert_eq!(names, vec!["Ana"]);

        mirror.attach_camp(Some(other.id));
        assert!(mirror.state().athletes.is_empty());
        mirror.poll();
        assert_eq!(mirror.state().athletes[0].name, "Ben");

        mirror.attach_camp(None);
        assert!(mirror.state().athletes.is_empty());
        assert_eq!(mirror.attached_camp(), None);
    }

    #[test]
    fn test_date_keyed_tables() {
        let (db, mut mirror, camp) = setup();
        mirror.attach_camp(Some(camp.id));
        mirror.poll();

        let athlete_id = Uuid::new_v4();
        let day = parse_date("2024-07-02").unwrap();
        let record = AttendanceRecord {
            camp_id: camp.id,
            athlete_id,
            date: day,
            status: AttendanceStatus::Absent,
        };
        let saved = SavedDate {
            date: day,
            saved_at: chrono::Utc::now(),
        };
        let mut batch = WriteBatch::new();
        batch
            .set(CollectionPath::attendance(), record.key().to_string(), &record)
            .unwrap();
        batch
            .set(CollectionPath::saved_dates(camp.id), "2024-07-02", &saved)
            .unwrap();
        db.commit(batch).unwrap();

        assert!(mirror.poll());
        let key = DateKey::new(day, athlete_id);
        assert_eq!(mirror.state().attendance.get(&key), Some(&AttendanceStatus::Absent));
        assert!(mirror.state().saved_dates.contains(&day));
    }

    #[test]
    fn test_malformed_documents_are_skipped() {
        let (db, mut mirror, camp) = setup();
        mirror.attach_camp(Some(camp.id));

        db.set(
            CollectionPath::groups(),
            "broken",
            &json!({"campId": camp.id.to_string(), "name": 42}),
        )
        .unwrap();
        let group = Group::new(camp.id, "Red Team", "bg-red-500");
        db.set(CollectionPath::groups(), &group.id.to_string(), &group)
            .unwrap();

        mirror.poll();
        assert_eq!(mirror.state().groups, vec![group]);
    }

    #[test]
    fn test_listener_error_keeps_last_state() {
        let db = Arc::new(FaultyDatabase::new());
        let camp = Camp::new("Summer", "u1");
        db.set(CollectionPath::camps(), &camp.id.to_string(), &camp)
            .unwrap();
        let athlete = Athlete::new(camp.id, NewAthlete::named("Ana"));
        db.set(CollectionPath::athletes(), &athlete.id.to_string(), &athlete)
            .unwrap();

        let session = Session::new("u1", "coach@camp.org", Role::Member);
        let mut mirror = Mirror::new(db.clone(), &session);
        mirror.attach_camp(Some(camp.id));
        assert!(mirror.poll());
        let before = mirror.state().clone();

        db.break_listeners("permission denied");
        assert!(!mirror.poll());
        assert_eq!(mirror.state().camps, before.camps);
        assert_eq!(mirror.state().athletes, before.athletes);

        // The next good snapshot is applied as usual
        let ben = Athlete::new(camp.id, NewAthlete::named("Ben"));
        db.set(CollectionPath::athletes(), &ben.id.to_string(), &ben)
            .unwrap();
        assert!(mirror.poll());
        assert_eq!(mirror.state().athletes.len(), 2);
        assert_eq!(mirror.state().camps, before.camps);
    }
}
