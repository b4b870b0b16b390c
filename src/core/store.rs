//! Record store abstraction: versioned JSON documents with per-record
//! compare-and-swap and unconditional field patches.

use std::fmt;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::core::error::EngineError;
use crate::core::types::{DistressSignal, Report, Tip};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Reports,
    DistressSignals,
    Tips,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Reports => "reports",
            Collection::DistressSignals => "distress_signals",
            Collection::Tips => "tips",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDoc {
    pub id: String,
    pub parent_id: Option<String>,
    pub version: u64,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Applied { version: u64 },
    VersionMismatch { current: u64 },
    Missing,
}

/// Storage backend. Every method is atomic with respect to a single record;
/// `compare_and_swap` calls against the same record are linearized.
pub trait RecordStore: Send + Sync {
    /// Creates a record at version 1. Fails if the id is already taken.
    fn insert(
        &self,
        collection: Collection,
        id: &str,
        parent_id: Option<&str>,
        body: &str,
    ) -> Result<u64, EngineError>;

    fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredDoc>, EngineError>;

    /// Replaces the body only if the stored version still equals `expected`.
    fn compare_and_swap(
        &self,
        collection: Collection,
        id: &str,
        expected: u64,
        body: &str,
    ) -> Result<CasOutcome, EngineError>;

    /// Merges top-level fields into the stored document without a version check.
    fn patch(
        &self,
        collection: Collection,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<Option<StoredDoc>, EngineError>;

    /// Snapshot of a whole collection (or of one parent's children), in insertion order.
    fn list(
        &self,
        collection: Collection,
        parent_id: Option<&str>,
    ) -> Result<Vec<StoredDoc>, EngineError>;
}

pub trait Document: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    fn parent_id(&self) -> Option<&str> {
        None
    }
}

impl Document for Report {
    const COLLECTION: Collection = Collection::Reports;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for DistressSignal {
    const COLLECTION: Collection = Collection::DistressSignals;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for Tip {
    const COLLECTION: Collection = Collection::Tips;

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        Some(&self.report_id)
    }
}

#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub version: u64,
    pub doc: T,
}

pub fn insert_doc<T: Document>(store: &dyn RecordStore, doc: &T) -> Result<u64, EngineError> {
    let body = serde_json::to_string(doc)?;
    store.insert(T::COLLECTION, doc.id(), doc.parent_id(), &body)
}

pub fn load_doc<T: Document>(
    store: &dyn RecordStore,
    id: &str,
) -> Result<Option<Versioned<T>>, EngineError> {
    match store.get(T::COLLECTION, id)? {
        Some(stored) => Ok(Some(decode(stored)?)),
        None => Ok(None),
    }
}

pub fn require_doc<T: Document>(
    store: &dyn RecordStore,
    id: &str,
) -> Result<Versioned<T>, EngineError> {
    load_doc(store, id)?.ok_or_else(|| EngineError::not_found(T::COLLECTION, id))
}

pub fn list_docs<T: Document>(
    store: &dyn RecordStore,
    parent_id: Option<&str>,
) -> Result<Vec<T>, EngineError> {
    store
        .list(T::COLLECTION, parent_id)?
        .into_iter()
        .map(|stored| decode::<T>(stored).map(|v| v.doc))
        .collect()
}

pub fn patch_doc<T: Document>(
    store: &dyn RecordStore,
    id: &str,
    fields: &Map<String, Value>,
) -> Result<T, EngineError> {
    let stored = store
        .patch(T::COLLECTION, id, fields)?
        .ok_or_else(|| EngineError::not_found(T::COLLECTION, id))?;
    Ok(decode::<T>(stored)?.doc)
}

fn decode<T: Document>(stored: StoredDoc) -> Result<Versioned<T>, EngineError> {
    let doc: T = serde_json::from_str(&stored.body).map_err(|e| {
        EngineError::Corrupt(format!("{} {}: {}", T::COLLECTION, stored.id, e))
    })?;
    Ok(Versioned {
        version: stored.version,
        doc,
    })
}

/// Result of one mutation attempt inside [`update_with_retry`].
pub enum Mutation<R> {
    /// Persist the mutated document and return the value.
    Write(R),
    /// Nothing changed; return the value without writing.
    Unchanged(R),
}

/// One owning read-modify-write per attempt: load, mutate a private copy, swap
/// it in against the version that was read. A version mismatch re-reads and
/// re-runs `mutate` from scratch; an error from `mutate` aborts with no write.
pub fn update_with_retry<T, R, F>(
    store: &dyn RecordStore,
    id: &str,
    max_attempts: u32,
    mut mutate: F,
) -> Result<R, EngineError>
where
    T: Document,
    F: FnMut(&mut T) -> Result<Mutation<R>, EngineError>,
{
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        let current = require_doc::<T>(store, id)?;
        let mut doc = current.doc.clone();
        let value = match mutate(&mut doc)? {
            Mutation::Unchanged(value) => return Ok(value),
            Mutation::Write(value) => value,
        };
        let body = serde_json::to_string(&doc)?;
        match store.compare_and_swap(T::COLLECTION, id, current.version, &body)? {
            CasOutcome::Applied { .. } => return Ok(value),
            CasOutcome::VersionMismatch { current: seen } => {
                tracing::debug!(
                    "cas miss on {} {} (read v{}, now v{}), attempt {}/{}",
                    T::COLLECTION,
                    id,
                    current.version,
                    seen,
                    attempt,
                    attempts
                );
            }
            CasOutcome::Missing => return Err(EngineError::not_found(T::COLLECTION, id)),
        }
    }
    Err(EngineError::Conflict {
        id: id.to_string(),
        attempts,
    })
}

pub(crate) fn merge_fields(body: &str, fields: &Map<String, Value>) -> Result<String, EngineError> {
    let mut value: Value = serde_json::from_str(body)?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| EngineError::Corrupt("stored document is not an object".into()))?;
    for (k, v) in fields {
        obj.insert(k.clone(), v.clone());
    }
    Ok(serde_json::to_string(&value)?)
}
