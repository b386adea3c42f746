//! SQLite schema and row access.
//!
//! Functions here are blocking and run inside `spawn_blocking`.

// ============================================================================
// Imports
// ============================================================================

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::capture::CaptureKind;
use crate::error::{Error, Result};
use crate::identifiers::{RecordId, TabId, WindowId};

use super::record::{NewThumbnail, StoreStats, ThumbnailRecord};

// ============================================================================
// Constants
// ============================================================================

/// Current schema version, tracked in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

const SELECT_COLUMNS: &str = "id, tab_id, window_id, url, kind, image, mime_type, width, height, dpr, captured_at";

// ============================================================================
// Migrations
// ============================================================================

/// Brings the database to [`SCHEMA_VERSION`].
pub(crate) fn migrate(conn: &mut Connection) -> Result<()> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    match version {
        0 => {
            let tx = conn.transaction()?;
            tx.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS thumbnails (
                  id INTEGER PRIMARY KEY AUTOINCREMENT,
                  tab_id INTEGER NOT NULL,
                  window_id INTEGER NOT NULL,
                  url TEXT NOT NULL,
                  kind TEXT NOT NULL,
                  image BLOB NOT NULL,
                  mime_type TEXT NOT NULL,
                  width INTEGER NOT NULL,
                  height INTEGER NOT NULL,
                  dpr REAL NOT NULL DEFAULT 1.0,
                  captured_at INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_thumbnails_tab_url
                  ON thumbnails(tab_id, url);

                CREATE INDEX IF NOT EXISTS idx_thumbnails_captured_at
                  ON thumbnails(captured_at);
                "#,
            )?;
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            tx.commit()?;
            debug!(version = SCHEMA_VERSION, "Thumbnail schema created");
            Ok(())
        }
        SCHEMA_VERSION => Ok(()),
        other => Err(Error::storage(
            "migrate",
            format!("unsupported schema version {other} (expected {SCHEMA_VERSION})"),
        )),
    }
}

// ============================================================================
// Row Access
// ============================================================================

/// Inserts a record in its own transaction.
pub(crate) fn insert(conn: &mut Connection, new: &NewThumbnail) -> Result<RecordId> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO thumbnails (tab_id, window_id, url, kind, image, mime_type, width, height, dpr, captured_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            new.tab_id.as_u32(),
            new.window_id.as_i32(),
            new.url,
            new.kind.as_str(),
            new.image,
            new.mime_type,
            new.width,
            new.height,
            f64::from(new.dpr),
            new.captured_at,
        ],
    )?;
    let id = RecordId::new(tx.last_insert_rowid());
    tx.commit()?;
    Ok(id)
}

/// Returns up to `limit` newest records for `url`, any tab.
pub(crate) fn latest_by_url(
    conn: &Connection,
    url: &str,
    limit: usize,
) -> Result<Vec<ThumbnailRecord>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SELECT_COLUMNS} FROM thumbnails
         WHERE url = ?1
         ORDER BY captured_at DESC, id DESC
         LIMIT ?2"
    ))?;

    let rows = stmt.query_map(params![url, limit], read_row)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row??);
    }
    Ok(records)
}

/// Returns the capture time of the newest record for `(tab_id, url)`.
pub(crate) fn latest_captured_at(conn: &Connection, tab_id: TabId, url: &str) -> Result<Option<i64>> {
    let at = conn
        .query_row(
            "SELECT MAX(captured_at) FROM thumbnails WHERE tab_id = ?1 AND url = ?2",
            params![tab_id.as_u32(), url],
            |row| row.get::<_, Option<i64>>(0),
        )
        .optional()?
        .flatten();
    Ok(at)
}

/// Counts records.
pub(crate) fn count(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM thumbnails", [], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

/// Counts records and payload bytes.
pub(crate) fn stats(conn: &Connection) -> Result<StoreStats> {
    let (count, total_bytes): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(LENGTH(image)), 0) FROM thumbnails",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(StoreStats {
        count: count.max(0) as u64,
        total_bytes: total_bytes.max(0) as u64,
    })
}

/// Deletes every record.
pub(crate) fn clear(conn: &mut Connection) -> Result<usize> {
    let tx = conn.transaction()?;
    let removed = tx.execute("DELETE FROM thumbnails", [])?;
    tx.commit()?;
    Ok(removed)
}

/// Maps a row selected with [`SELECT_COLUMNS`].
///
/// The outer result carries SQLite errors, the inner one bad column values.
fn read_row(row: &Row<'_>) -> rusqlite::Result<Result<ThumbnailRecord>> {
    let tab_raw: i64 = row.get(1)?;
    let kind_raw: String = row.get(4)?;
    let dpr: f64 = row.get(9)?;

    let Some(tab_id) = TabId::from_raw(tab_raw) else {
        return Ok(Err(Error::storage("read", format!("invalid tab id {tab_raw}"))));
    };
    let Some(kind) = CaptureKind::parse(&kind_raw) else {
        return Ok(Err(Error::storage("read", format!("invalid kind {kind_raw:?}"))));
    };

    Ok(Ok(ThumbnailRecord {
        id: RecordId::new(row.get(0)?),
        tab_id,
        window_id: WindowId::from_raw(row.get(2)?),
        url: row.get(3)?,
        kind,
        image: row.get(5)?,
        mime_type: row.get(6)?,
        width: row.get(7)?,
        height: row.get(8)?,
        dpr: dpr as f32,
        captured_at: row.get(10)?,
    }))
}

// ============================================================================
// Tests
// ============================================================================
