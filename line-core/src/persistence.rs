//! SQLite save slots.
//!
//! Each slot holds one [`SessionSnapshot`] as JSON:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS save_slots (
//!     slot       TEXT PRIMARY KEY,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```
//!
//! A CRC-32 of the JSON is stored when `checksum_enabled` is set. A mismatch
//! on load is logged, and the snapshot is still returned if it decodes.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{LineError, Result};
use crate::session::SessionSnapshot;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS save_slots (
    slot       TEXT PRIMARY KEY,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// CRC-32 (ISO 3309), reflected polynomial.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SaveStore
// ---------------------------------------------------------------------------

/// Summary row for a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    /// Slot name.
    pub slot: String,
    /// RFC 3339 timestamp of the last save.
    pub updated_at: String,
}

/// Handle to an open save database.
///
/// ```no_run
/// # use line_core::persistence::SaveStore;
/// # use line_core::config::PersistenceConfig;
/// # use line_core::{Engine, GameConfig, Perspective};
/// let engine = Engine::builtin(GameConfig::default())?;
/// let session = engine.new_session(Perspective::Migrant, 7);
/// let store = SaveStore::open("the_line_saves.db", &PersistenceConfig::default())?;
/// store.save_snapshot("quick", &session.snapshot())?;
/// let back = store.load_snapshot("quick")?;
/// # Ok::<(), line_core::LineError>(())
/// ```
pub struct SaveStore {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SaveStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SaveStore {
    /// Open (or create) the save database at `path`.
    ///
    /// # Errors
    /// [`LineError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), checksum = config.checksum_enabled, "Save store opened");
        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// In-memory store, for tests.
    ///
    /// # Errors
    /// [`LineError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Save (upsert) a snapshot into `slot`.
    ///
    /// # Errors
    /// [`LineError::Serialization`] if encoding fails, [`LineError::Database`]
    /// on SQLite failures.
    pub fn save_snapshot(&self, slot: &str, snapshot: &SessionSnapshot) -> Result<()> {
        let start = Instant::now();
        let json = serde_json::to_vec(snapshot).map_err(|e| LineError::Serialization(e.to_string()))?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO save_slots (slot, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(slot) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![slot, json, now, checksum],
        )?;

        debug!(
            slot,
            session = %snapshot.id,
            turn = snapshot.turn,
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved session"
        );
        Ok(())
    }

    /// Load the snapshot in `slot`, or `None` if the slot is empty.
    ///
    /// # Errors
    /// [`LineError::Serialization`] if the stored JSON does not decode,
    /// [`LineError::Database`] on SQLite failures.
    pub fn load_snapshot(&self, slot: &str) -> Result<Option<SessionSnapshot>> {
        let start = Instant::now();
        let mut stmt = self
            .conn
            .prepare_cached("SELECT data, checksum FROM save_slots WHERE slot = ?1")?;
        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![slot], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((data, stored)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(slot, expected = %expected, actual = %actual, "Save checksum mismatch");
                }
            }
        }

        let snapshot: SessionSnapshot =
            serde_json::from_slice(&data).map_err(|e| LineError::Serialization(e.to_string()))?;
        debug!(
            slot,
            session = %snapshot.id,
            turn = snapshot.turn,
            elapsed_us = start.elapsed().as_micros(),
            "Loaded session"
        );
        Ok(Some(snapshot))
    }

    /// Delete a slot. Returns `true` if it existed.
    ///
    /// # Errors
    /// [`LineError::Database`] on SQLite failures.
    pub fn delete_slot(&self, slot: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM save_slots WHERE slot = ?1", params![slot])?;
        Ok(deleted > 0)
    }

    /// All slots, most recently saved first.
    ///
    /// # Errors
    /// [`LineError::Database`] on SQLite failures.
    pub fn list_slots(&self) -> Result<Vec<SlotInfo>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT slot, updated_at FROM save_slots ORDER BY updated_at DESC, slot")?;
        let rows = stmt.query_map([], |row| {
            Ok(SlotInfo {
                slot: row.get(0)?,
                updated_at: row.get(1)?,
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
    use crate::config::GameConfig;
    use crate::engine::Engine;
    use crate::types::Perspective;

    fn snapshot() -> SessionSnapshot {
        let engine = Engine::builtin(GameConfig::default()).expect("engine");
        let mut s = engine.new_session(Perspective::Migrant, 11);
        s.turn = 4;
        s.snapshot()
    }

    #[test]
    fn crc32_known_vector() {
        assert_eq!(crc32_hex(b"123456789"), "cbf43926");
    }

    #[test]
    fn save_load_delete() {
        let store = SaveStore::open_in_memory(&PersistenceConfig::default()).expect("store");
        assert!(store.load_snapshot("a").expect("load").is_none());

        let snap = snapshot();
        store.save_snapshot("a", &snap).expect("save");
        assert_eq!(store.load_snapshot("a").expect("load"), Some(snap.clone()));

        let mut newer = snap.clone();
        newer.turn = 9;
        store.save_snapshot("a", &newer).expect("overwrite");
        assert_eq!(store.load_snapshot("a").expect("load").map(|s| s.turn), Some(9));
        assert_eq!(store.list_slots().expect("list").len(), 1);

        assert!(store.delete_slot("a").expect("delete"));
        assert!(!store.delete_slot("a").expect("delete again"));
        assert!(store.list_slots().expect("list").is_empty());
    }

    #[test]
    fn corrupt_checksum_still_loads() {
        let store = SaveStore::open_in_memory(&PersistenceConfig::default()).expect("store");
        let snap = snapshot();
        store.save_snapshot("a", &snap).expect("save");
        store
            .conn
            .execute("UPDATE save_slots SET checksum = 'deadbeef'", [])
            .expect("tamper");
        assert_eq!(store.load_snapshot("a").expect("load"), Some(snap));
    }

    #[test]
    fn garbage_data_is_a_serialization_error() {
        let store = SaveStore::open_in_memory(&PersistenceConfig::default()).expect("store");
        store
            .conn
            .execute(
                "INSERT INTO save_slots (slot, data, updated_at) VALUES ('x', ?1, 'now')",
                params![b"not json".to_vec()],
            )
            .expect("insert");
        assert!(matches!(store.load_snapshot("x"), Err(LineError::Serialization(_))));
    }
}
