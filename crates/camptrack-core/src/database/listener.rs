//! Live query listeners
//!
//! A listener is the receiving half of a `tokio::sync::watch` channel. The
//! database publishes a full snapshot of the query result after every commit;
//! only the latest snapshot is kept, so a slow reader never sees a backlog.

use tokio::sync::watch;

use super::query::{Query, RemoteDocument};

/// What a listener can observe
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerEvent {
    /// No snapshot delivered yet
    Pending,
    /// Full result set of the query
    Snapshot(Vec<RemoteDocument>),
    /// The query could not be evaluated
    Error(String),
}

/// Subscription to a query
#[derive(Debug)]
pub struct Listener {
    query: Query,
    rx: watch::Receiver<ListenerEvent>,
}

impl Listener {
    /// Create a listener/publisher pair for a query
    pub fn channel(query: Query) -> (watch::Sender<ListenerEvent>, Self) {
        let (tx, rx) = watch::channel(ListenerEvent::Pending);
        (tx, Self { query, rx })
    }

    /// The query this listener follows
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Take the latest event if one arrived since the last poll
    ///
    /// Returns `None` when nothing changed or the database has gone away.
    pub fn poll(&mut self) -> Option<ListenerEvent> {
        match self.rx.has_changed() {
            Ok(true) => Some(self.rx.borrow_and_update().clone()),
            _ => None,
        }
    }
}
