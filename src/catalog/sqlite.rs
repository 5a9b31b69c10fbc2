//! SQLite-backed catalog

use super::CatalogStore;
use crate::hash::path_key;
use crate::types::{CatalogEntry, EntryStatus, Fingerprint, FsakError};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS file_catalog (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    key         TEXT    NOT NULL UNIQUE,
    name        TEXT    NOT NULL,
    path        BLOB    NOT NULL,
    status      INTEGER NOT NULL DEFAULT 0,
    legacy_hash TEXT    NOT NULL,
    strong_hash TEXT    NOT NULL,
    size        INTEGER NOT NULL,
    tag         TEXT    NOT NULL DEFAULT '',
    modified    TEXT    NOT NULL,
    changed     TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_file_catalog_name ON file_catalog(name);
CREATE INDEX IF NOT EXISTS idx_file_catalog_path ON file_catalog(path);
CREATE INDEX IF NOT EXISTS idx_file_catalog_legacy ON file_catalog(legacy_hash);
CREATE INDEX IF NOT EXISTS idx_file_catalog_strong ON file_catalog(strong_hash);
";

const UPSERT: &str = "
INSERT INTO file_catalog
    (key, name, path, status, legacy_hash, strong_hash, size, tag, modified, changed)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
ON CONFLICT(key) DO UPDATE SET
    name = excluded.name,
    path = excluded.path,
    status = excluded.status,
    legacy_hash = excluded.legacy_hash,
    strong_hash = excluded.strong_hash,
    size = excluded.size,
    tag = excluded.tag,
    modified = excluded.modified,
    changed = excluded.changed
";

const SELECT_COLUMNS: &str =
    "SELECT key, name, path, status, legacy_hash, strong_hash, size, tag, modified, changed \
     FROM file_catalog";

/// Catalog persisted in a single SQLite file
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    pub fn open(path: &Path) -> Result<Self, FsakError> {
        let conn = Connection::open(path)?;
        let catalog = Self {
            conn: Mutex::new(conn),
        };
        catalog.configure(true)?;
        debug!("Opened catalog at {}", path.display());
        Ok(catalog)
    }

    pub fn open_in_memory() -> Result<Self, FsakError> {
        let conn = Connection::open_in_memory()?;
        let catalog = Self {
            conn: Mutex::new(conn),
        };
        catalog.configure(false)?;
        Ok(catalog)
    }

    fn configure(&self, on_disk: bool) -> Result<(), FsakError> {
        let conn = self.lock()?;
        if on_disk {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 30000;",
            )?;
        }
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, FsakError> {
        self.conn
            .lock()
            .map_err(|_| FsakError::Store("catalog connection lock poisoned".to_string()))
    }
}

fn upsert_on(conn: &Connection, entry: &CatalogEntry) -> Result<(), FsakError> {
    conn.execute(
        UPSERT,
        params![
            entry.key,
            entry.name,
            path_to_blob(&entry.path),
            entry.status.as_i64(),
            entry.fingerprint.legacy,
            entry.fingerprint.strong,
            entry.size as i64,
            entry.tag,
            entry.modified,
            entry.changed,
        ],
    )?;
    Ok(())
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<CatalogEntry> {
    // Rows written before paths were stored as raw bytes hold TEXT
    let path = match row.get_ref(2)? {
        ValueRef::Blob(bytes) | ValueRef::Text(bytes) => path_from_blob(bytes),
        other => {
            return Err(rusqlite::Error::InvalidColumnType(
                2,
                "path".to_string(),
                other.data_type(),
            ))
        }
    };
    let size: i64 = row.get(6)?;
    Ok(CatalogEntry {
        key: row.get(0)?,
        name: row.get(1)?,
        path,
        status: EntryStatus::from_i64(row.get(3)?),
        fingerprint: Fingerprint::new(row.get::<_, String>(4)?, row.get::<_, String>(5)?),
        size: size.max(0) as u64,
        tag: row.get(7)?,
        modified: row.get(8)?,
        changed: row.get(9)?,
    })
}

/// Paths are stored as their raw OS bytes so non-UTF-8 names survive
#[cfg(unix)]
fn path_to_blob(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(unix)]
fn path_from_blob(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_to_blob(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(not(unix))]
fn path_from_blob(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

impl CatalogStore for SqliteCatalog {
    fn get(&self, path: &Path) -> Result<Option<CatalogEntry>, FsakError> {
        let conn = self.lock()?;
        let entry = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE key = ?1"),
                params![path_key(path)],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn upsert(&self, entry: &CatalogEntry) -> Result<(), FsakError> {
        let conn = self.lock()?;
        upsert_on(&conn, entry)
    }

    fn upsert_batch(&self, entries: &[CatalogEntry]) -> Result<(), FsakError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for entry in entries {
            upsert_on(&tx, entry)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, FsakError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM file_catalog WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    fn all(&self) -> Result<Vec<CatalogEntry>, FsakError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
        let entries = stmt
            .query_map([], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn count(&self) -> Result<usize, FsakError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM file_catalog", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}
