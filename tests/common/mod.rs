#![allow(dead_code)]

use std::sync::Arc;

use nightwatch::config::AppConfig;
use nightwatch::core::engine::Engine;
use nightwatch::core::error::EngineError;
use nightwatch::core::memory_store::MemoryStore;
use nightwatch::core::sqlite_store::SqliteStore;
use nightwatch::core::store::{CasOutcome, Collection, RecordStore, StoredDoc};
use nightwatch::core::types::{Author, Category, Contact, Coordinate, NewReport, Principal};
use serde_json::{Map, Value};

/// One engine per backend, so every scenario runs against both.
pub fn engines() -> Vec<(&'static str, Engine)> {
    vec![
        ("memory", Engine::in_memory()),
        (
            "sqlite",
            Engine::new(
                Arc::new(SqliteStore::open_in_memory().unwrap()),
                AppConfig::default(),
            ),
        ),
    ]
}

pub fn principal(id: &str) -> Principal {
    Principal::new(id, Some(format!("{} name", id)))
}

pub fn dhaka() -> Coordinate {
    Coordinate::new(23.8103, 90.4125).unwrap()
}

pub fn new_report(reporter: &str) -> NewReport {
    NewReport {
        category: Category::Theft,
        description: "Bicycle stolen outside the market".into(),
        reporter: Author::resolve(&principal(reporter), false),
        location: Some(dhaka()),
        media_urls: vec![],
        diary: None,
    }
}

pub fn raise(engine: &Engine, who: &str) -> String {
    engine
        .create_distress_signal(
            &principal(who),
            Some(dhaka()),
            Contact::snapshot(Some(who), Some("+8801700000000"), None),
            None,
        )
        .unwrap()
}

/// Retries a ledger call that lost every CAS attempt; anything else is returned as-is.
pub fn until_applied<R>(mut op: impl FnMut() -> Result<R, EngineError>) -> Result<R, EngineError> {
    loop {
        match op() {
            Err(EngineError::Conflict { .. }) => std::thread::yield_now(),
            other => return other,
        }
    }
}

/// Delegates to a memory store but never lets a compare-and-swap land.
pub struct AlwaysStale {
    inner: MemoryStore,
}

impl AlwaysStale {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
        }
    }
}

impl RecordStore for AlwaysStale {
    fn insert(
        &self,
        collection: Collection,
        id: &str,
        parent_id: Option<&str>,
        body: &str,
    ) -> Result<u64, EngineError> {
        self.inner.insert(collection, id, parent_id, body)
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredDoc>, EngineError> {
        self.inner.get(collection, id)
    }

    fn compare_and_swap(
        &self,
        _collection: Collection,
        _id: &str,
        expected: u64,
        _body: &str,
    ) -> Result<CasOutcome, EngineError> {
        Ok(CasOutcome::VersionMismatch {
            current: expected + 1,
        })
    }

    fn patch(
        &self,
        collection: Collection,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<Option<StoredDoc>, EngineError> {
        self.inner.patch(collection, id, fields)
    }

    fn list(
        &self,
        collection: Collection,
        parent_id: Option<&str>,
    ) -> Result<Vec<StoredDoc>, EngineError> {
        self.inner.list(collection, parent_id)
    }
}
