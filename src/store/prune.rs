//! Retention policy and pruning stages.
//!
//! Each stage runs in its own transaction and returns the ids it deleted so
//! the caller can evict them from the cache.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rusqlite::{Connection, params};

use crate::error::{Error, Result};
use crate::identifiers::{RecordId, TabId};

// ============================================================================
// RetentionPolicy
// ============================================================================

/// Limits enforced around every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum record age.
    pub ttl: Duration,
    /// Maximum total record count.
    pub global_cap: usize,
    /// Maximum records per exact `(tab_id, url)`.
    pub per_key_cap: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RetentionPolicy {
    /// Default time to live (365 days).
    pub const DEFAULT_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    /// Default global cap.
    pub const DEFAULT_GLOBAL_CAP: usize = 600;

    /// Default per-key cap.
    pub const DEFAULT_PER_KEY_CAP: usize = 1;

    /// Creates the default policy.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ttl: Self::DEFAULT_TTL,
            global_cap: Self::DEFAULT_GLOBAL_CAP,
            per_key_cap: Self::DEFAULT_PER_KEY_CAP,
        }
    }

    /// Sets the time to live.
    #[inline]
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the global cap.
    #[inline]
    #[must_use]
    pub fn with_global_cap(mut self, cap: usize) -> Self {
        self.global_cap = cap;
        self
    }

    /// Sets the per-key cap.
    #[inline]
    #[must_use]
    pub fn with_per_key_cap(mut self, cap: usize) -> Self {
        self.per_key_cap = cap;
        self
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a cap or the TTL is zero, or if the
    /// per-key cap exceeds the global cap.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(Error::config("ttl must be non-zero"));
        }
        if self.global_cap == 0 || self.per_key_cap == 0 {
            return Err(Error::config("retention caps must be at least 1"));
        }
        if self.per_key_cap > self.global_cap {
            return Err(Error::config(format!(
                "per-key cap {} exceeds global cap {}",
                self.per_key_cap, self.global_cap
            )));
        }
        Ok(())
    }

    /// Returns the oldest capture time that survives at `now_ms`.
    #[must_use]
    pub fn cutoff(&self, now_ms: i64) -> i64 {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(ttl_ms)
    }
}

// ============================================================================
// Stages
// ============================================================================

/// Deletes records captured before `cutoff`.
pub(crate) fn prune_expired(conn: &mut Connection, cutoff: i64) -> Result<Vec<RecordId>> {
    delete_selected(
        conn,
        "SELECT id FROM thumbnails WHERE captured_at < ?1",
        params![cutoff],
    )
}

/// Keeps only the `keep` newest records of one `(tab_id, url)` key.
pub(crate) fn prune_per_key(
    conn: &mut Connection,
    tab_id: TabId,
    url: &str,
    keep: usize,
) -> Result<Vec<RecordId>> {
    delete_selected(
        conn,
        "SELECT id FROM thumbnails
         WHERE tab_id = ?1 AND url = ?2
         ORDER BY captured_at DESC, id DESC
         LIMIT -1 OFFSET ?3",
        params![tab_id.as_u32(), url, to_sql_count(keep)],
    )
}

/// Deletes the oldest records until at most `cap` remain.
pub(crate) fn enforce_global_cap(conn: &mut Connection, cap: usize) -> Result<Vec<RecordId>> {
    let tx = conn.transaction()?;
    let total: i64 = tx.query_row("SELECT COUNT(*) FROM thumbnails", [], |row| row.get(0))?;
    let excess = total - to_sql_count(cap);
    if excess <= 0 {
        return Ok(Vec::new());
    }

    let ids = {
        let mut stmt = tx.prepare(
            "SELECT id FROM thumbnails ORDER BY captured_at ASC, id ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![excess], |row| row.get::<_, i64>(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    delete_ids(&tx, &ids)?;
    tx.commit()?;
    Ok(ids.into_iter().map(RecordId::new).collect())
}

// ============================================================================
// Helpers
// ============================================================================

/// Selects ids with `select` and deletes them in one transaction.
fn delete_selected(
    conn: &mut Connection,
    select: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<RecordId>> {
    let tx = conn.transaction()?;
    let ids = {
        let mut stmt = tx.prepare(select)?;
        let rows = stmt.query_map(params, |row| row.get::<_, i64>(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    if ids.is_empty() {
        return Ok(Vec::new());
    }

    delete_ids(&tx, &ids)?;
    tx.commit()?;
    Ok(ids.into_iter().map(RecordId::new).collect())
}

fn delete_ids(conn: &Connection, ids: &[i64]) -> Result<()> {
    let mut stmt = conn.prepare_cached("DELETE FROM thumbnails WHERE id = ?1")?;
    for id in ids {
        stmt.execute(params![id])?;
    }
    Ok(())
}

fn to_sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::store::schema::tests::{new_thumbnail, open_memory};
    use crate::store::schema::{count, insert};

    const URL: &str = "https://example.com/a";

    #[test]
    fn test_policy_defaults_and_validation() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.ttl, Duration::from_secs(31_536_000));
        assert_eq!(policy.global_cap, 600);
        assert_eq!(policy.per_key_cap, 1);
        assert!(policy.validate().is_ok());

        assert!(policy.with_global_cap(0).validate().is_err());
        assert!(policy.with_per_key_cap(700).validate().is_err());
        assert!(policy.with_ttl(Duration::ZERO).validate().is_err());
    }

    #[test]
    fn test_cutoff() {
        let policy = RetentionPolicy::new().with_ttl(Duration::from_secs(10));
        assert_eq!(policy.cutoff(60_000), 50_000);
        assert_eq!(policy.cutoff(i64::MIN), i64::MIN);
    }

    #[test]
    fn test_prune_expired() {
        let mut conn = open_memory();
        let old = insert(&mut conn, &new_thumbnail(1, URL, 10)).expect("insert");
        insert(&mut conn, &new_thumbnail(2, URL, 100)).expect("insert");

        assert_eq!(prune_expired(&mut conn, 50).expect("prune"), vec![old]);
        assert_eq!(count(&conn).expect("count"), 1);
        assert!(prune_expired(&mut conn, 50).expect("prune").is_empty());
    }

    #[test]
    fn test_prune_per_key_keeps_newest() {
        let mut conn = open_memory();
        let a = insert(&mut conn, &new_thumbnail(7, URL, 100)).expect("insert");
        insert(&mut conn, &new_thumbnail(7, URL, 300)).expect("insert");
        let c = insert(&mut conn, &new_thumbnail(7, URL, 200)).expect("insert");
        insert(&mut conn, &new_thumbnail(8, URL, 50)).expect("insert");

        let mut removed = prune_per_key(&mut conn, TabId::new(7), URL, 1).expect("prune");
        removed.sort();
        let mut expected = vec![a, c];
        expected.sort();
        assert_eq!(removed, expected);

        // The other tab's record of the same URL is a different key.
        assert_eq!(count(&conn).expect("count"), 2);
    }

    #[test]
    fn test_global_cap_removes_oldest() {
        let mut conn = open_memory();
        let mut ids = Vec::new();
        for i in 0..5u32 {
            let url = format!("https://example.com/{i}");
            ids.push(insert(&mut conn, &new_thumbnail(i, &url, i64::from(i) * 10)).expect("insert"));
        }

        let removed = enforce_global_cap(&mut conn, 3).expect("cap");
        assert_eq!(removed, vec![ids[0], ids[1]]);
        assert_eq!(count(&conn).expect("count"), 3);
        assert!(enforce_global_cap(&mut conn, 3).expect("cap").is_empty());
    }
}
