//! Write batches
//!
//! A batch groups set/update/delete operations that are committed together:
//! either every write lands or none does.

use serde::Serialize;
use serde_json::{Map, Value};

use super::error::{DatabaseError, DatabaseResult};
use super::query::CollectionPath;

/// A single document write
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create or replace the whole document
    Set {
        collection: CollectionPath,
        id: String,
        data: Map<String, Value>,
    },
    /// Merge fields into an existing document
    Update {
        collection: CollectionPath,
        id: String,
        fields: Map<String, Value>,
    },
    /// Remove the document (no-op if absent)
    Delete { collection: CollectionPath, id: String },
}

impl Write {
    pub fn collection(&self) -> &CollectionPath {
        match self {
            Write::Set { collection, .. }
            | Write::Update { collection, .. }
            | Write::Delete { collection, .. } => collection,
        }
    }
}

/// Ordered list of writes committed atomically
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a full-document write of a serializable value
    pub fn set<T: Serialize>(
        &mut self,
        collection: CollectionPath,
        id: impl Into<String>,
        value: &T,
    ) -> DatabaseResult<&mut Self> {
        let id = id.into();
        let data = to_object(&collection, &id, value)?;
        self.writes.push(Write::Set {
            collection,
            id,
            data,
        });
        Ok(self)
    }

    /// Queue a field merge
    pub fn update(
        &mut self,
        collection: CollectionPath,
        id: impl Into<String>,
        fields: Map<String, Value>,
    ) -> &mut Self {
        self.writes.push(Write::Update {
            collection,
            id: id.into(),
            fields,
        });
        self
    }

    /// Queue a single-field merge
    pub fn update_field(
        &mut self,
        collection: CollectionPath,
        id: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        let mut fields = Map::new();
        fields.insert(field.into(), value.into());
        self.update(collection, id, fields)
    }

    /// Queue a delete
    pub fn delete(&mut self, collection: CollectionPath, id: impl Into<String>) -> &mut Self {
        self.writes.push(Write::Delete {
            collection,
            id: id.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

/// Serialize a value into a document body
pub fn to_object<T: Serialize>(
    collection: &CollectionPath,
    id: &str,
    value: &T,
) -> DatabaseResult<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(DatabaseError::NotAnObject {
            collection: collection.to_string(),
            id: id.to_string(),
        }),
    }
}
