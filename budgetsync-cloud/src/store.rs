//! Document store seam and an in-memory implementation.
//!
//! The store is Firestore-shaped: JSON documents addressed by
//! `(collection, id)`, where a collection may be a nested path such as
//! `budgets/<id>/chunks`.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Per-document size limit enforced by the store.
pub const MAX_DOCUMENT_BYTES: usize = 1024 * 1024;

/// Per-batch write limit enforced by the store.
pub const MAX_BATCH_WRITES: usize = 500;

pub type Document = Map<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub data: Option<Document>,
}

impl DocumentSnapshot {
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOp {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

impl QueryOp {
    pub fn matches(self, field: Option<&Value>, value: &Value) -> bool {
        match self {
            Self::Equal => field == Some(value),
            Self::NotEqual => field != Some(value),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum WriteOp {
    Set {
        collection: String,
        id: String,
        data: Document,
    },
    Delete {
        collection: String,
        id: String,
    },
}

/// Writes committed together.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteBatch {
    pub writes: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, collection: impl Into<String>, id: impl Into<String>, data: Document) -> &mut Self {
        self.writes.push(WriteOp::Set {
            collection: collection.into(),
            id: id.into(),
            data,
        });
        self
    }

    pub fn delete(&mut self, collection: impl Into<String>, id: impl Into<String>) -> &mut Self {
        self.writes.push(WriteOp::Delete {
            collection: collection.into(),
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
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Creates or replaces a document.
    async fn set_document(&self, collection: &str, id: &str, data: Document) -> StoreResult<()>;

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<DocumentSnapshot>;

    /// Existing documents in `collection` whose `field` satisfies `op value`.
    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: &Value,
    ) -> StoreResult<Vec<DocumentSnapshot>>;

    /// Applies every write or none.
    async fn commit_batch(&self, batch: WriteBatch) -> StoreResult<()>;
}

fn check_document_size(id: &str, data: &Document) -> StoreResult<()> {
    let size = serde_json::to_vec(data)?.len();
    if size > MAX_DOCUMENT_BYTES {
        return Err(StoreError::DocumentTooLarge {
            id: id.to_string(),
            size,
            limit: MAX_DOCUMENT_BYTES,
        });
    }
    Ok(())
}

type Collections = HashMap<String, BTreeMap<String, Document>>;

/// In-process store with the same limits as the hosted one. Clones share
/// contents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct read, bypassing the async interface.
    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.lock().get(collection).and_then(|docs| docs.get(id)).cloned()
    }

    /// Direct write with no limit checks.
    pub fn put_raw(&self, collection: &str, id: &str, data: Document) {
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
    }

    pub fn document_ids(&self, collection: &str) -> Vec<String> {
        self.lock()
            .get(collection)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn set_document(&self, collection: &str, id: &str, data: Document) -> StoreResult<()> {
        check_document_size(id, &data)?;
        self.put_raw(collection, id, data);
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<DocumentSnapshot> {
        Ok(DocumentSnapshot {
            id: id.to_string(),
            data: self.document(collection, id),
        })
    }

    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: &Value,
    ) -> StoreResult<Vec<DocumentSnapshot>> {
        let collections = self.lock();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(_, doc)| op.matches(doc.get(field), value))
            .map(|(id, doc)| DocumentSnapshot {
                id: id.clone(),
                data: Some(doc.clone()),
            })
            .collect())
    }

    async fn commit_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.len() > MAX_BATCH_WRITES {
            return Err(StoreError::BatchTooLarge {
                size: batch.len(),
                limit: MAX_BATCH_WRITES,
            });
        }
        for write in &batch.writes {
            if let WriteOp::Set { id, data, .. } = write {
                check_document_size(id, data)?;
            }
        }

        let mut collections = self.lock();
        let count = batch.len();
        for write in batch.writes {
            match write {
                WriteOp::Set { collection, id, data } => {
                    collections.entry(collection).or_default().insert(id, data);
                }
                WriteOp::Delete { collection, id } => {
                    if let Some(docs) = collections.get_mut(&collection) {
                        docs.remove(&id);
                    }
                }
            }
        }
        debug!("committed batch of {count} writes");
        Ok(())
    }
}
