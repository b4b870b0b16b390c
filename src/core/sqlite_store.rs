use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};

use crate::core::error::EngineError;
use crate::core::store::{merge_fields, CasOutcome, Collection, RecordStore, StoredDoc};
use crate::core::time::now_utc;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn default_path() -> PathBuf {
        PathBuf::from("data").join("nightwatch.db")
    }

    pub fn open(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, EngineError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, EngineError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, EngineError> {
        self.conn
            .lock()
            .map_err(|_| EngineError::Unavailable("sqlite connection lock poisoned".into()))
    }

    fn init_schema(&self) -> Result<(), EngineError> {
        self.lock()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS records (
              collection TEXT NOT NULL,
              id TEXT NOT NULL,
              parent_id TEXT,
              version INTEGER NOT NULL,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL,
              body_json TEXT NOT NULL,
              PRIMARY KEY (collection, id)
            );
            CREATE INDEX IF NOT EXISTS idx_records_parent ON records(collection, parent_id);
            ",
        )?;
        Ok(())
    }
}

fn read_doc(conn: &Connection, collection: Collection, id: &str) -> Result<Option<StoredDoc>, EngineError> {
    let doc = conn
        .query_row(
            "SELECT id, parent_id, version, body_json FROM records WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
            |row| {
                Ok(StoredDoc {
                    id: row.get(0)?,
                    parent_id: row.get(1)?,
                    version: row.get::<_, i64>(2)? as u64,
                    body: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(doc)
}

impl RecordStore for SqliteStore {
    fn insert(
        &self,
        collection: Collection,
        id: &str,
        parent_id: Option<&str>,
        body: &str,
    ) -> Result<u64, EngineError> {
        let conn = self.lock()?;
        let now = now_utc().to_rfc3339();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO records (collection, id, parent_id, version, created_at, updated_at, body_json)
             VALUES (?1, ?2, ?3, 1, ?4, ?4, ?5)",
            params![collection.as_str(), id, parent_id, now, body],
        )?;
        if inserted == 0 {
            return Err(EngineError::invalid(format!(
                "{} record already exists: {}",
                collection, id
            )));
        }
        Ok(1)
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredDoc>, EngineError> {
        let conn = self.lock()?;
        read_doc(&conn, collection, id)
    }

    fn compare_and_swap(
        &self,
        collection: Collection,
        id: &str,
        expected: u64,
        body: &str,
    ) -> Result<CasOutcome, EngineError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE records SET body_json = ?1, version = version + 1, updated_at = ?2
             WHERE collection = ?3 AND id = ?4 AND version = ?5",
            params![
                body,
                now_utc().to_rfc3339(),
                collection.as_str(),
                id,
                expected as i64
            ],
        )?;
        let outcome = if changed == 1 {
            CasOutcome::Applied {
                version: expected + 1,
            }
        } else {
            match read_doc(&tx, collection, id)? {
                Some(doc) => CasOutcome::VersionMismatch {
                    current: doc.version,
                },
                None => CasOutcome::Missing,
            }
        };
        tx.commit()?;
        Ok(outcome)
    }

    fn patch(
        &self,
        collection: Collection,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<Option<StoredDoc>, EngineError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let Some(mut doc) = read_doc(&tx, collection, id)? else {
            return Ok(None);
        };
        doc.body = merge_fields(&doc.body, fields)?;
        doc.version += 1;
        tx.execute(
            "UPDATE records SET body_json = ?1, version = ?2, updated_at = ?3
             WHERE collection = ?4 AND id = ?5",
            params![
                doc.body,
                doc.version as i64,
                now_utc().to_rfc3339(),
                collection.as_str(),
                id
            ],
        )?;
        tx.commit()?;
        Ok(Some(doc))
    }

    fn list(
        &self,
        collection: Collection,
        parent_id: Option<&str>,
    ) -> Result<Vec<StoredDoc>, EngineError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, parent_id, version, body_json FROM records
             WHERE collection = ?1 AND (?2 IS NULL OR parent_id = ?2)
             ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![collection.as_str(), parent_id], |row| {
            Ok(StoredDoc {
                id: row.get(0)?,
                parent_id: row.get(1)?,
                version: row.get::<_, i64>(2)? as u64,
                body: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cas_linearizes_on_version() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert(Collection::DistressSignals, "s1", None, r#"{"status":"Active"}"#)
            .unwrap();
        let a = store
            .compare_and_swap(Collection::DistressSignals, "s1", 1, r#"{"status":"Dispatched"}"#)
            .unwrap();
        let b = store
            .compare_and_swap(Collection::DistressSignals, "s1", 1, r#"{"status":"Responded"}"#)
            .unwrap();
        assert_eq!(a, CasOutcome::Applied { version: 2 });
        assert_eq!(b, CasOutcome::VersionMismatch { current: 2 });
        let doc = store.get(Collection::DistressSignals, "s1").unwrap().unwrap();
        assert_eq!(doc.body, r#"{"status":"Dispatched"}"#);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(Collection::Reports, "r1", None, "{}").unwrap();
        assert!(matches!(
            store.insert(Collection::Reports, "r1", None, "{}"),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn persists_across_reopen() {
        let dir = std::env::temp_dir().join(format!("nw_sqlite_{}", std::process::id()));
        let path = dir.join("reopen.db");
        let _ = std::fs::remove_file(&path);
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert(Collection::Tips, "t1", Some("r1"), "{}").unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let tips = store.list(Collection::Tips, Some("r1")).unwrap();
        assert_eq!(tips.len(), 1);
        assert_eq!(tips[0].parent_id.as_deref(), Some("r1"));
        let _ = std::fs::remove_file(&path);
    }
}
