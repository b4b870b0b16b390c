use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};

use crate::core::error::EngineError;
use crate::core::store::{merge_fields, CasOutcome, Collection, RecordStore, StoredDoc};

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    doc: StoredDoc,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    records: HashMap<(Collection, String), Entry>,
}

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, EngineError> {
        self.inner
            .lock()
            .map_err(|_| EngineError::Unavailable("memory store lock poisoned".into()))
    }
}

impl RecordStore for MemoryStore {
    fn insert(
        &self,
        collection: Collection,
        id: &str,
        parent_id: Option<&str>,
        body: &str,
    ) -> Result<u64, EngineError> {
        let mut inner = self.lock()?;
        let key = (collection, id.to_string());
        if inner.records.contains_key(&key) {
            return Err(EngineError::invalid(format!(
                "{} record already exists: {}",
                collection, id
            )));
        }
        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.records.insert(
            key,
            Entry {
                seq,
                doc: StoredDoc {
                    id: id.to_string(),
                    parent_id: parent_id.map(str::to_string),
                    version: 1,
                    body: body.to_string(),
                },
            },
        );
        Ok(1)
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredDoc>, EngineError> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .get(&(collection, id.to_string()))
            .map(|e| e.doc.clone()))
    }

    fn compare_and_swap(
        &self,
        collection: Collection,
        id: &str,
        expected: u64,
        body: &str,
    ) -> Result<CasOutcome, EngineError> {
        let mut inner = self.lock()?;
        let Some(entry) = inner.records.get_mut(&(collection, id.to_string())) else {
            return Ok(CasOutcome::Missing);
        };
        if entry.doc.version != expected {
            return Ok(CasOutcome::VersionMismatch {
                current: entry.doc.version,
            });
        }
        entry.doc.version += 1;
        entry.doc.body = body.to_string();
        Ok(CasOutcome::Applied {
            version: entry.doc.version,
        })
    }

    fn patch(
        &self,
        collection: Collection,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<Option<StoredDoc>, EngineError> {
        let mut inner = self.lock()?;
        let Some(entry) = inner.records.get_mut(&(collection, id.to_string())) else {
            return Ok(None);
        };
        entry.doc.body = merge_fields(&entry.doc.body, fields)?;
        entry.doc.version += 1;
        Ok(Some(entry.doc.clone()))
    }

    fn list(
        &self,
        collection: Collection,
        parent_id: Option<&str>,
    ) -> Result<Vec<StoredDoc>, EngineError> {
        let inner = self.lock()?;
        let mut entries: Vec<&Entry> = inner
            .records
            .iter()
            .filter(|((c, _), _)| *c == collection)
            .map(|(_, e)| e)
            .filter(|e| parent_id.map_or(true, |p| e.doc.parent_id.as_deref() == Some(p)))
            .collect();
        entries.sort_by_key(|e| e.seq);
        Ok(entries.into_iter().map(|e| e.doc.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cas_rejects_stale_version() {
        let store = MemoryStore::new();
        store
            .insert(Collection::Tips, "t1", Some("r1"), r#"{"n":0}"#)
            .unwrap();
        let first = store
            .compare_and_swap(Collection::Tips, "t1", 1, r#"{"n":1}"#)
            .unwrap();
        assert_eq!(first, CasOutcome::Applied { version: 2 });
        let stale = store
            .compare_and_swap(Collection::Tips, "t1", 1, r#"{"n":2}"#)
            .unwrap();
        assert_eq!(stale, CasOutcome::VersionMismatch { current: 2 });
        let missing = store
            .compare_and_swap(Collection::Tips, "nope", 1, "{}")
            .unwrap();
        assert_eq!(missing, CasOutcome::Missing);
    }

    #[test]
    fn list_scopes_by_parent_in_insertion_order() {
        let store = MemoryStore::new();
        store.insert(Collection::Tips, "b", Some("r1"), "{}").unwrap();
        store.insert(Collection::Tips, "a", Some("r2"), "{}").unwrap();
        store.insert(Collection::Tips, "c", Some("r1"), "{}").unwrap();
        let ids: Vec<String> = store
            .list(Collection::Tips, Some("r1"))
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(store.list(Collection::Tips, None).unwrap().len(), 3);
        assert!(store.list(Collection::Reports, None).unwrap().is_empty());
    }

    #[test]
    fn patch_merges_top_level_fields() {
        let store = MemoryStore::new();
        store
            .insert(Collection::Reports, "r1", None, r#"{"status":"Pending","x":1}"#)
            .unwrap();
        let mut fields = Map::new();
        fields.insert("status".into(), Value::from("Resolved"));
        let doc = store.patch(Collection::Reports, "r1", &fields).unwrap().unwrap();
        assert_eq!(doc.version, 2);
        let v: Value = serde_json::from_str(&doc.body).unwrap();
        assert_eq!(v["status"], "Resolved");
        assert_eq!(v["x"], 1);
        assert!(store.patch(Collection::Reports, "r2", &fields).unwrap().is_none());
    }
}
