//! Document database
//!
//! The camp store talks to a document database through the
//! [`DocumentStore`] trait: collections of JSON documents addressed by id,
//! filtered queries, atomic write batches and live listeners that push
//! full-collection snapshots.
//!
//! [`LocalDatabase`] implements the trait on a single Automerge document,
//! optionally persisted to disk.

mod batch;
mod document;
mod error;
#[cfg(test)]
pub(crate) mod faulty;
mod listener;
mod local;
mod persistence;
mod query;

pub use batch::{to_object, Write, WriteBatch};
pub use document::CampDocument;
pub use error::{DatabaseError, DatabaseResult};
pub use listener::{Listener, ListenerEvent};
pub use local::LocalDatabase;
pub use persistence::DatabasePersistence;
pub(crate) use persistence::atomic_write;
pub use query::{collections, CollectionPath, Filter, Query, RemoteDocument};

use serde::Serialize;
use serde_json::{Map, Value};

/// A shared document database
///
/// Implementations must be safe to share between sessions; concurrent
/// writes to the same document resolve last-write-wins.
pub trait DocumentStore: Send + Sync {
    /// Fetch one document body
    fn get(&self, collection: &CollectionPath, id: &str)
        -> DatabaseResult<Option<Map<String, Value>>>;

    /// Run a one-shot query
    fn query(&self, query: &Query) -> DatabaseResult<Vec<RemoteDocument>>;

    /// Apply every write in the batch, or none of them
    fn commit(&self, batch: WriteBatch) -> DatabaseResult<()>;

    /// Subscribe to a query; the listener receives a snapshot now and after
    /// every commit. Dropping the listener unsubscribes.
    fn listen(&self, query: Query) -> Listener;

    /// Create or replace a single document
    fn set<T: Serialize>(
        &self,
        collection: CollectionPath,
        id: &str,
        value: &T,
    ) -> DatabaseResult<()>
    where
        Self: Sized,
    {
        let mut batch = WriteBatch::new();
        batch.set(collection, id, value)?;
        self.commit(batch)
    }

    /// Merge fields into a single existing document
    fn update(
        &self,
        collection: CollectionPath,
        id: &str,
        fields: Map<String, Value>,
    ) -> DatabaseResult<()> {
        let mut batch = WriteBatch::new();
        batch.update(collection, id, fields);
        self.commit(batch)
    }

    /// Delete a single document
    fn delete(&self, collection: CollectionPath, id: &str) -> DatabaseResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(collection, id);
        self.commit(batch)
    }
}
