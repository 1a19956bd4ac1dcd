//! Collection paths, documents and queries

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::{DatabaseError, DatabaseResult};

/// Well-known collection names
pub mod collections {
    pub const CAMPS: &str = "camps";
    pub const ATHLETES: &str = "athletes";
    pub const GROUPS: &str = "groups";
    pub const ATTENDANCE: &str = "attendance";
    pub const GROUP_ASSIGNMENTS: &str = "group_assignments";
    pub const NOTES: &str = "notes";
    pub const USERS: &str = "users";
    pub const SAVED_DATES: &str = "saved_dates";
}

/// Path of a collection, e.g. `athletes` or `camps/<id>/saved_dates`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn camps() -> Self {
        Self::new(collections::CAMPS)
    }

    pub fn athletes() -> Self {
        Self::new(collections::ATHLETES)
    }

    pub fn groups() -> Self {
        Self::new(collections::GROUPS)
    }

    pub fn attendance() -> Self {
        Self::new(collections::ATTENDANCE)
    }

    pub fn group_assignments() -> Self {
        Self::new(collections::GROUP_ASSIGNMENTS)
    }

    pub fn notes() -> Self {
        Self::new(collections::NOTES)
    }

    pub fn users() -> Self {
        Self::new(collections::USERS)
    }

    /// Per-camp sub-collection of locked dates
    pub fn saved_dates(camp_id: Uuid) -> Self {
        Self(format!(
            "{}/{}/{}",
            collections::CAMPS,
            camp_id,
            collections::SAVED_DATES
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document as stored: its id and JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub data: Map<String, Value>,
}

impl RemoteDocument {
    pub fn new(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Decode the body into a model, filling `id` from the document id when absent
    pub fn decode<T: DeserializeOwned>(&self) -> DatabaseResult<T> {
        let mut data = self.data.clone();
        data.entry("id")
            .or_insert_with(|| Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(data)).map_err(DatabaseError::from)
    }
}

/// Field predicate applied on the database side
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the value
    Eq(String, Value),
    /// Field is an array containing the value
    ArrayContains(String, Value),
}

impl Filter {
    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        match self {
            Filter::Eq(field, value) => data.get(field) == Some(value),
            Filter::ArrayContains(field, value) => match data.get(field) {
                Some(Value::Array(items)) => items.contains(value),
                _ => false,
            },
        }
    }
}

/// Documents of one collection matching all filters
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: CollectionPath,
    pub filters: Vec<Filter>,
}

impl Query {
    /// Every document in the collection
    pub fn all(collection: CollectionPath) -> Self {
        Self {
            collection,
            filters: Vec::new(),
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.into(), value.into()));
        self
    }

    pub fn where_array_contains(
        mut self,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.filters
            .push(Filter::ArrayContains(field.into(), value.into()));
        self
    }

    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        self.filters.iter().all(|f| f.matches(data))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection)?;
        for filter in &self.filters {
            match filter {
                Filter::Eq(field, value) => write!(f, " [{} == {}]", field, value)?,
                Filter::ArrayContains(field, value) => {
                    write!(f, " [{} contains {}]", field, value)?
                }
            }
        }
        Ok(())
    }
}
