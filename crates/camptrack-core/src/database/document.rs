//! Automerge document handling
//!
//! The whole database lives in one Automerge document:
//!
//! ```text
//! ROOT
//! ├── schema_version
//! └── collections
//!     └── <collection path>
//!         └── <document id> → map of JSON-shaped fields
//! ```
//!
//! JSON objects become Automerge maps, arrays become lists and everything else
//! is stored as a scalar. Concurrent edits to the same field resolve
//! last-writer-wins inside Automerge.

use automerge::{transaction::Transactable, AutoCommit, ObjId, ObjType, ReadDoc, ScalarValue, ROOT};
use serde_json::{Map, Number, Value};

use super::batch::Write;
use super::error::{DatabaseError, DatabaseResult};
use super::query::{CollectionPath, Query, RemoteDocument};

/// Keys used in the Automerge document structure
mod keys {
    pub const COLLECTIONS: &str = "collections";
    pub const SCHEMA_VERSION: &str = "schema_version";
}

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: u64 = 1;

/// The camp database backed by Automerge
pub struct CampDocument {
    doc: AutoCommit,
}

impl CampDocument {
    /// Create a new empty database document
    pub fn new() -> Self {
        let mut doc = AutoCommit::new();
        let _ = doc.put(ROOT, keys::SCHEMA_VERSION, CURRENT_SCHEMA_VERSION);
        let _ = doc.put_object(ROOT, keys::COLLECTIONS, ObjType::Map);
        Self { doc }
    }

    /// Load a document from Automerge bytes
    pub fn load(bytes: &[u8]) -> DatabaseResult<Self> {
        let doc = AutoCommit::load(bytes)?;
        if doc.get(ROOT, keys::COLLECTIONS)?.is_none() {
            return Err(DatabaseError::MissingField(keys::COLLECTIONS.to_string()));
        }
        Ok(Self { doc })
    }

    /// Save the document to bytes
    pub fn save(&mut self) -> Vec<u8> {
        self.doc.save()
    }

    /// Fork the document (for staging a batch)
    pub fn fork(&mut self) -> Self {
        Self {
            doc: self.doc.fork(),
        }
    }

    /// Merge another document into this one
    pub fn merge(&mut self, other: &mut CampDocument) -> DatabaseResult<()> {
        self.doc.merge(&mut other.doc)?;
        Ok(())
    }

    // ==================== Reads ====================

    /// Get one document body
    pub fn get(
        &self,
        collection: &CollectionPath,
        id: &str,
    ) -> DatabaseResult<Option<Map<String, Value>>> {
        let Some(coll_id) = self.collection_id(collection)? else {
            return Ok(None);
        };
        match self.doc.get(&coll_id, id)? {
            Some((_, doc_id)) => Ok(Some(self.read_map(&doc_id)?)),
            None => Ok(None),
        }
    }

    /// Run a query against one collection
    pub fn query(&self, query: &Query) -> DatabaseResult<Vec<RemoteDocument>> {
        let Some(coll_id) = self.collection_id(&query.collection)? else {
            return Ok(Vec::new());
        };

        let mut docs = Vec::new();
        for key in self.doc.keys(&coll_id) {
            if let Some((_, doc_id)) = self.doc.get(&coll_id, &key)? {
                let data = self.read_map(&doc_id)?;
                if query.matches(&data) {
                    docs.push(RemoteDocument::new(key, data));
                }
            }
        }
        Ok(docs)
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &CollectionPath) -> DatabaseResult<usize> {
        Ok(match self.collection_id(collection)? {
            Some(coll_id) => self.doc.length(&coll_id),
            None => 0,
        })
    }

    // ==================== Writes ====================

    /// Apply a single write
    pub fn apply(&mut self, write: &Write) -> DatabaseResult<()> {
        match write {
            Write::Set {
                collection,
                id,
                data,
            } => {
                let coll_id = self.ensure_collection(collection)?;
                let doc_id = self.doc.put_object(&coll_id, id.as_str(), ObjType::Map)?;
                for (field, value) in data {
                    self.put_value(&doc_id, field, value)?;
                }
            }
            Write::Update {
                collection,
                id,
                fields,
            } => {
                let doc_id = self
                    .collection_id(collection)?
                    .and_then(|coll_id| self.doc.get(&coll_id, id.as_str()).ok().flatten())
                    .map(|(_, doc_id)| doc_id)
                    .ok_or_else(|| DatabaseError::DocumentNotFound {
                        collection: collection.to_string(),
                        id: id.clone(),
                    })?;
                for (field, value) in fields {
                    self.put_value(&doc_id, field, value)?;
                }
            }
            Write::Delete { collection, id } => {
                if let Some(coll_id) = self.collection_id(collection)? {
                    if self.doc.get(&coll_id, id.as_str())?.is_some() {
                        self.doc.delete(&coll_id, id.as_str())?;
                    }
                }
            }
        }
        Ok(())
    }

    // ==================== Private helpers ====================

    fn collections_id(&self) -> DatabaseResult<ObjId> {
        self.doc
            .get(ROOT, keys::COLLECTIONS)?
            .map(|(_, id)| id)
            .ok_or_else(|| DatabaseError::MissingField(keys::COLLECTIONS.to_string()))
    }

    fn collection_id(&self, collection: &CollectionPath) -> DatabaseResult<Option<ObjId>> {
        let root = self.collections_id()?;
        Ok(self
            .doc
            .get(&root, collection.as_str())?
            .map(|(_, id)| id))
    }

    fn ensure_collection(&mut self, collection: &CollectionPath) -> DatabaseResult<ObjId> {
        if let Some(id) = self.collection_id(collection)? {
            return Ok(id);
        }
        let root = self.collections_id()?;
        Ok(self
            .doc
            .put_object(&root, collection.as_str(), ObjType::Map)?)
    }

    fn put_value(&mut self, obj: &ObjId, key: &str, value: &Value) -> DatabaseResult<()> {
        match value {
            Value::Object(map) => {
                let child = self.doc.put_object(obj, key, ObjType::Map)?;
                for (k, v) in map {
                    self.put_value(&child, k, v)?;
                }
            }
            Value::Array(items) => {
                let child = self.doc.put_object(obj, key, ObjType::List)?;
                for (i, item) in items.iter().enumerate() {
                    self.insert_value(&child, i, item)?;
                }
            }
            scalar => self.doc.put(obj, key, to_scalar(scalar))?,
        }
        Ok(())
    }

    fn insert_value(&mut self, list: &ObjId, index: usize, value: &Value) -> DatabaseResult<()> {
        match value {
            Value::Object(map) => {
                let child = self.doc.insert_object(list, index, ObjType::Map)?;
                for (k, v) in map {
                    self.put_value(&child, k, v)?;
                }
            }
            Value::Array(items) => {
                let child = self.doc.insert_object(list, index, ObjType::List)?;
                for (i, item) in items.iter().enumerate() {
                    self.insert_value(&child, i, item)?;
                }
            }
            scalar => self.doc.insert(list, index, to_scalar(scalar))?,
        }
        Ok(())
    }

    fn read_map(&self, obj: &ObjId) -> DatabaseResult<Map<String, Value>> {
        let mut map = Map::new();
        for key in self.doc.keys(obj) {
            if let Some((value, child)) = self.doc.get(obj, &key)? {
                map.insert(key, self.read_value(value, &child)?);
            }
        }
        Ok(map)
    }

    fn read_list(&self, obj: &ObjId) -> DatabaseResult<Vec<Value>> {
        let mut items = Vec::new();
        for i in 0..self.doc.length(obj) {
            if let Some((value, child)) = self.doc.get(obj, i)? {
                items.push(self.read_value(value, &child)?);
            }
        }
        Ok(items)
    }

    fn read_value(&self, value: automerge::Value<'_>, id: &ObjId) -> DatabaseResult<Value> {
        Ok(match value {
            automerge::Value::Object(ObjType::List) => Value::Array(self.read_list(id)?),
            automerge::Value::Object(ObjType::Text) => Value::String(self.doc.text(id)?),
            automerge::Value::Object(_) => Value::Object(self.read_map(id)?),
            automerge::Value::Scalar(scalar) => from_scalar(&scalar),
        })
    }
}

impl Default for CampDocument {
    fn default() -> Self {
        Self::new()
    }
}

fn to_scalar(value: &Value) -> ScalarValue {
    match value {
        Value::Bool(b) => ScalarValue::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ScalarValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                ScalarValue::Uint(u)
            } else {
                ScalarValue::F64(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => ScalarValue::Str(s.as_str().into()),
        _ => ScalarValue::Null,
    }
}

fn from_scalar(scalar: &ScalarValue) -> Value {
    match scalar {
        ScalarValue::Str(s) => Value::String(s.to_string()),
        ScalarValue::Int(i) | ScalarValue::Timestamp(i) => Value::Number((*i).into()),
        ScalarValue::Uint(u) => Value::Number((*u).into()),
        ScalarValue::F64(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        ScalarValue::Boolean(b) => Value::Bool(*b),
        _ => Value::Null,
    }
}
