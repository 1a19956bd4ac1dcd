//! Database wrapper that can be made to fail, for tests

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tokio::sync::watch;

use super::{
    DatabaseError, DatabaseResult, DocumentStore, Listener, ListenerEvent, LocalDatabase, Query,
    RemoteDocument, WriteBatch,
};
use crate::database::CollectionPath;

/// An in-memory database whose commits and listeners can be broken on demand
pub(crate) struct FaultyDatabase {
    inner: LocalDatabase,
    offline: AtomicBool,
    listeners: Mutex<Vec<(Query, watch::Sender<ListenerEvent>)>>,
}

impl FaultyDatabase {
    pub fn new() -> Self {
        Self {
            inner: LocalDatabase::in_memory(),
            offline: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Reject every commit until set back
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Send an error to every open listener
    pub fn break_listeners(&self, message: &str) {
        for (_, tx) in self.listeners.lock().unwrap().iter() {
            tx.send_replace(ListenerEvent::Error(message.to_string()));
        }
    }

    fn publish(&self) {
        let mut listeners = self.listeners.lock().unwrap();
        listeners.retain(|(_, tx)| !tx.is_closed());
        for (query, tx) in listeners.iter() {
            tx.send_replace(self.snapshot(query));
        }
    }

    fn snapshot(&self, query: &Query) -> ListenerEvent {
        match self.inner.query(query) {
            Ok(docs) => ListenerEvent::Snapshot(docs),
            Err(e) => ListenerEvent::Error(e.to_string()),
        }
    }
}

impl DocumentStore for FaultyDatabase {
    fn get(
        &self,
        collection: &CollectionPath,
        id: &str,
    ) -> DatabaseResult<Option<Map<String, Value>>> {
        self.inner.get(collection, id)
    }

    fn query(&self, query: &Query) -> DatabaseResult<Vec<RemoteDocument>> {
        self.inner.query(query)
    }

    fn commit(&self, batch: WriteBatch) -> DatabaseResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DatabaseError::from_io(
                io::Error::new(io::ErrorKind::Other, "database is offline"),
                PathBuf::from("faulty"),
            ));
        }
        self.inner.commit(batch)?;
        self.publish();
        Ok(())
    }

    fn listen(&self, query: Query) -> Listener {
        let (tx, listener) = Listener::channel(query.clone());
        tx.send_replace(self.snapshot(&query));
        self.listeners.lock().unwrap().push((query, tx));
        listener
    }
}
