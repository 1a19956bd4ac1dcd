//! In-process document database
//!
//! `LocalDatabase` keeps the database document behind a mutex, stages each
//! batch on a fork so a failing write leaves nothing behind, persists after
//! every commit when backed by a file, and fans snapshots out to listeners.

use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::batch::WriteBatch;
use super::document::CampDocument;
use super::error::{DatabaseError, DatabaseResult};
use super::listener::{Listener, ListenerEvent};
use super::persistence::DatabasePersistence;
use super::query::{CollectionPath, Query, RemoteDocument};
use super::DocumentStore;
use crate::config::Config;

struct Subscriber {
    query: Query,
    tx: watch::Sender<ListenerEvent>,
}

struct Inner {
    doc: CampDocument,
    persistence: Option<DatabasePersistence>,
    subscribers: Vec<Subscriber>,
}

/// Document database living in this process
pub struct LocalDatabase {
    inner: Mutex<Inner>,
}

impl LocalDatabase {
    /// Create an empty database that is never written to disk
    pub fn in_memory() -> Self {
        Self::from_parts(CampDocument::new(), None)
    }

    /// Open the database file under the configured data directory,
    /// creating it on first run
    pub fn open(config: &Config) -> DatabaseResult<Self> {
        let persistence = DatabasePersistence::new(config.clone());
        let doc = persistence.load_or_create()?;
        info!("Opened database at {:?}", config.database_path());
        Ok(Self::from_parts(doc, Some(persistence)))
    }

    fn from_parts(doc: CampDocument, persistence: Option<DatabasePersistence>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                doc,
                persistence,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.lock()
            .map(|mut inner| {
                inner.subscribers.retain(|s| !s.tx.is_closed());
                inner.subscribers.len()
            })
            .unwrap_or(0)
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &CollectionPath) -> DatabaseResult<usize> {
        self.lock()?.doc.count(collection)
    }

    /// Delete the database files and start over with an empty database
    ///
    /// The old file is never parsed, so this also recovers from a corrupt
    /// document.
    pub fn reset(config: &Config) -> DatabaseResult<Self> {
        let persistence = DatabasePersistence::new(config.clone());
        if persistence.exists() {
            info!("Removing database at {:?}", config.database_path());
        }
        persistence.delete_all()?;

        let mut doc = CampDocument::new();
        persistence.save(&mut doc)?;
        info!("Database reset");
        Ok(Self::from_parts(doc, Some(persistence)))
    }

    fn lock(&self) -> DatabaseResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

impl Inner {
    fn snapshot(&self, query: &Query) -> ListenerEvent {
        match self.doc.query(query) {
            Ok(docs) => ListenerEvent::Snapshot(docs),
            Err(e) => ListenerEvent::Error(e.to_string()),
        }
    }

    /// Push fresh snapshots to every live listener, dropping closed ones
    fn notify(&mut self) {
        self.subscribers.retain(|s| !s.tx.is_closed());
        for subscriber in &self.subscribers {
            let event = self.snapshot(&subscriber.query);
            // Only fails when the receiver is gone, which the next retain handles
            let _ = subscriber.tx.send(event);
        }
    }
}

impl DocumentStore for LocalDatabase {
    fn get(
        &self,
        collection: &CollectionPath,
        id: &str,
    ) -> DatabaseResult<Option<Map<String, Value>>> {
        self.lock()?.doc.get(collection, id)
    }

    fn query(&self, query: &Query) -> DatabaseResult<Vec<RemoteDocument>> {
        self.lock()?.doc.query(query)
    }

    fn commit(&self, batch: WriteBatch) -> DatabaseResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut inner = self.lock()?;
        let count = batch.len();

        let mut staged = inner.doc.fork();
        for write in batch.writes() {
            staged.apply(write)?;
        }
        inner.doc.merge(&mut staged)?;

        let Inner {
            doc, persistence, ..
        } = &mut *inner;
        if let Some(persistence) = persistence {
            if let Err(e) = persistence.save(doc) {
                warn!("Commit applied but not persisted: {}", e);
                inner.notify();
                return Err(e);
            }
        }

        debug!("Committed batch of {} writes", count);
        inner.notify();
        Ok(())
    }

    fn listen(&self, query: Query) -> Listener {
        let (tx, listener) = Listener::channel(query.clone());
        match self.lock() {
            Ok(mut inner) => {
                let _ = tx.send(inner.snapshot(&query));
                debug!("Listening to {}", query);
                inner.subscribers.push(Subscriber { query, tx });
            }
            Err(e) => {
                let _ = tx.send(ListenerEvent::Error(e.to_string()));
            }
        }
        listener
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn snapshot_ids(event: Option<ListenerEvent>) -> Vec<String> {
        match event {
            Some(ListenerEvent::Snapshot(docs)) => docs.into_iter().map(|d| d.id).collect(),
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_listener_gets_initial_snapshot() {
        let db = LocalDatabase::in_memory();
        db.set(CollectionPath::camps(), "c1", &json!({"ownerId": "u1"}))
            .unwrap();

        let mut listener = db.listen(Query::all(CollectionPath::camps()));
        assert_eq!(snapshot_ids(listener.poll()), vec!["c1"]);
        assert_eq!(listener.poll(), None);
    }

    #[test]
    fn test_commit_fans_out_to_matching_listeners() {
        let db = LocalDatabase::in_memory();
        let mut mine = db.listen(Query::all(CollectionPath::camps()).where_eq("ownerId", "u1"));
        let mut theirs = db.listen(Query::all(CollectionPath::camps()).where_eq("ownerId", "u2"));
        mine.poll();
        theirs.poll();

        db.set(CollectionPath::camps(), "c1", &json!({"ownerId": "u1"}))
            .unwrap();

        assert_eq!(snapshot_ids(mine.poll()), vec!["c1"]);
        assert!(snapshot_ids(theirs.poll()).is_empty());
    }

    #[test]
    fn test_failed_batch_changes_nothing() {
        let db = LocalDatabase::in_memory();
        let mut batch = WriteBatch::new();
        batch
            .set(CollectionPath::groups(), "g1", &json!({"name": "Red"}))
            .unwrap();
        batch.update(CollectionPath::groups(), "missing", fields(json!({"name": "x"})));

        let err = db.commit(batch).unwrap_err();
        assert!(matches!(err, DatabaseError::DocumentNotFound { .. }));
        assert!(db.get(&CollectionPath::groups(), "g1").unwrap().is_none());
    }

    #[test]
    fn test_update_and_delete() {
        let db = LocalDatabase::in_memory();
        db.set(CollectionPath::groups(), "g1", &json!({"name": "Red", "color": "bg-red-500"}))
            .unwrap();
        db.update(CollectionPath::groups(), "g1", fields(json!({"name": "Crimson"})))
            .unwrap();

        let stored = db.get(&CollectionPath::groups(), "g1").unwrap().unwrap();
        assert_eq!(stored["name"], "Crimson");
        assert_eq!(stored["color"], "bg-red-500");

        db.delete(CollectionPath::groups(), "g1").unwrap();
        assert!(db.get(&CollectionPath::groups(), "g1").unwrap().is_none());
    }

    #[test]
    fn test_dropped_listeners_are_pruned() {
        let db = LocalDatabase::in_memory();
        let first = db.listen(Query::all(CollectionPath::camps()));
        let _second = db.listen(Query::all(CollectionPath::athletes()));
        assert_eq!(db.listener_count(), 2);

        drop(first);
        assert_eq!(db.listener_count(), 1);
    }

    #[test]
    fn test_open_persists_between_sessions() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };

        {
            let db = LocalDatabase::open(&config).unwrap();
            db.set(CollectionPath::camps(), "c1", &json!({"name": "Summer"}))
                .unwrap();
        }

        let db = LocalDatabase::open(&config).unwrap();
        assert_eq!(db.count(&CollectionPath::camps()).unwrap(), 1);
    }

    #[test]
    fn test_reset_empties_database() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        {
            let db = LocalDatabase::open(&config).unwrap();
            db.set(CollectionPath::camps(), "c1", &json!({"name": "Summer"}))
                .unwrap();
        }
        std::fs::write(config.current_camp_path(), "c1").unwrap();

        let db = LocalDatabase::reset(&config).unwrap();

        assert_eq!(db.count(&CollectionPath::camps()).unwrap(), 0);
        assert!(config.database_path().exists());
        assert!(!config.current_camp_path().exists());
        let reopened = LocalDatabase::open(&config).unwrap();
        assert_eq!(reopened.count(&CollectionPath::camps()).unwrap(), 0);
    }

    #[test]
    fn test_reset_recovers_corrupt_database() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        std::fs::write(config.database_path(), b"not an automerge document").unwrap();
        let err = LocalDatabase::open(&config).err().unwrap();
        assert!(matches!(err, DatabaseError::CorruptDocument { .. }));

        let db = LocalDatabase::reset(&config).unwrap();
        db.set(CollectionPath::camps(), "c1", &json!({"name": "Summer"}))
            .unwrap();

        let reopened = LocalDatabase::open(&config).unwrap();
        assert_eq!(reopened.count(&CollectionPath::camps()).unwrap(), 1);
    }
}
