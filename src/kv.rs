//! Key-value seam in front of the durable store.
//!
//! The read path of the public view must never crash, so the trait ops are
//! deliberately non-throwing: a failed read is "absent", a failed write is a
//! no-op. Only opening the sqlite backend can error.

use anyhow::Result;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::logging::{log, obj, v_str, Domain, Level};

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn del(&self, key: &str);
}

/// In-memory backend for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryKv {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut m) = self.map.lock() {
            m.insert(key.to_string(), value.to_string());
        }
    }

    fn del(&self, key: &str) {
        if let Ok(mut m) = self.map.lock() {
            m.remove(key);
        }
    }
}

/// Sqlite-backed store: one `kv` table, last write wins.
pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl KvStore for SqliteKv {
    fn get(&self, key: &str) -> Option<String> {
        let conn = self.conn.lock().ok()?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .ok()
    }

    fn set(&self, key: &str, value: &str) {
        let Ok(conn) = self.conn.lock() else { return };
        if let Err(err) = conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        ) {
            log(
                Level::Warn,
                Domain::Store,
                "kv_set_failed",
                obj(&[("key", v_str(key)), ("error", v_str(&err.to_string()))]),
            );
        }
    }

    fn del(&self, key: &str) {
        let Ok(conn) = self.conn.lock() else { return };
        if let Err(err) = conn.execute("DELETE FROM kv WHERE key = ?1", params![key]) {
            log(
                Level::Warn,
                Domain::Store,
                "kv_del_failed",
                obj(&[("key", v_str(key)), ("error", v_str(&err.to_string()))]),
            );
        }
    }
}
