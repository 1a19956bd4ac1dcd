//! Camp visibility
//!
//! Admins follow every camp. Everyone else follows two queries, camps they
//! own and camps shared with them, and sees the union of both. This decides
//! what is listed, it does not guard writes.

use std::collections::HashSet;

use tracing::debug;

use crate::database::{CollectionPath, DocumentStore, Listener, Query};
use crate::mirror::drain;
use crate::models::Camp;
use crate::session::Session;

/// Live camp list for a session
pub enum CampFeed {
    /// Every camp in the database
    All { listener: Listener, camps: Vec<Camp> },
    /// Owned and shared camps, kept apart until read
    Scoped {
        owned: Listener,
        shared: Listener,
        owned_camps: Vec<Camp>,
        shared_camps: Vec<Camp>,
    },
}

impl CampFeed {
    /// Subscribe to the camps this session may see
    pub fn subscribe(db: &dyn DocumentStore, session: &Session) -> Self {
        if session.is_admin() {
            debug!("Following all camps for admin {}", session.email);
            return CampFeed::All {
                listener: db.listen(Query::all(CollectionPath::camps())),
                camps: Vec::new(),
            };
        }

        let owned =
            Query::all(CollectionPath::camps()).where_eq("ownerId", session.user_id.as_str());
        let shared = Query::all(CollectionPath::camps())
            .where_array_contains("collaboratorIds", session.user_id.as_str());
        CampFeed::Scoped {
            owned: db.listen(owned),
            shared: db.listen(shared),
            owned_camps: Vec::new(),
            shared_camps: Vec::new(),
        }
    }

    /// Take pending snapshots; true if the camp list may have changed
    pub fn poll(&mut self) -> bool {
        match self {
            CampFeed::All { listener, camps } => drain(listener, camps),
            CampFeed::Scoped {
                owned,
                shared,
                owned_camps,
                shared_camps,
            } => {
                let owned_changed = drain(owned, owned_camps);
                let shared_changed = drain(shared, shared_camps);
                owned_changed || shared_changed
            }
        }
    }

    /// Visible camps, each once
    pub fn camps(&self) -> Vec<Camp> {
        match self {
            CampFeed::All { camps, .. } => camps.clone(),
            CampFeed::Scoped {
                owned_camps,
                shared_camps,
                ..
            } => merge_visible(owned_camps, shared_camps),
        }
    }
}

/// Union of owned and shared camps, de-duplicated by id
///
/// A camp the user both owns and collaborates on is listed once, from the
/// owned side.
pub fn merge_visible(owned: &[Camp], shared: &[Camp]) -> Vec<Camp> {
    let mut seen = HashSet::new();
    owned
        .iter()
        .chain(shared)
        .filter(|camp| seen.insert(camp.id))
        .cloned()
        .collect()
}

/// Whether a session would see a camp
pub fn can_see(session: &Session, camp: &Camp) -> bool {
    session.is_admin() || camp.is_member(&session.user_id)
}
