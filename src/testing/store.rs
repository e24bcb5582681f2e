//! In-memory record store
//!
//! Cases log what they submitted and which error scenarios they ran so later
//! cases and the final summary can look them up.

use serde_json::{Map, Value};

use crate::common::timestamp;

/// Record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Submissions,
    Attachments,
    Errors,
}

impl Collection {
    fn index(self) -> usize {
        match self {
            Collection::Submissions => 0,
            Collection::Attachments => 1,
            Collection::Errors => 2,
        }
    }
}

/// A stored record: arbitrary fields plus `id` and `timestamp`
pub type Record = Map<String, Value>;

#[derive(Debug, Default)]
pub struct RecordStore {
    collections: [Vec<Record>; 3],
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, assigning a 1-based id and the current timestamp
    ///
    /// Returns the assigned id. Non-object values are stored under `value`.
    pub fn insert(&mut self, collection: Collection, data: Value) -> u64 {
        let items = &mut self.collections[collection.index()];
        let mut record = match data {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        let id = items.len() as u64 + 1;
        record.insert("id".to_string(), Value::from(id));
        record.insert("timestamp".to_string(), Value::from(timestamp()));
        items.push(record);
        id
    }

    /// Records whose fields equal every field of `query`
    pub fn find(&self, collection: Collection, query: &Map<String, Value>) -> Vec<&Record> {
        self.collections[collection.index()]
            .iter()
            .filter(|record| query.iter().all(|(k, v)| record.get(k) == Some(v)))
            .collect()
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.collections[collection.index()].len()
    }

    pub fn clear(&mut self, collection: Collection) {
        self.collections[collection.index()].clear();
    }

    pub fn all(&self, collection: Collection) -> &[Record] {
        &self.collections[collection.index()]
    }
}
