mod schema;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::Connection;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::features::FeatureManager;
use crate::models::FeatureHistory;
use crate::relation::{Pair, RelationStore};

/// SQLite persistence for relations and runtime feature state.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Config("Database path has no parent directory".to_string()))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        tracing::debug!("Opened database at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "gemini")
            .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))?;
        let db_path = dirs.data_dir().join("gemini.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Relation operations
    // ============================================================

    pub fn count_pairs(&self, relation: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM relation_pairs WHERE relation = ?",
            [relation],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ============================================================
    // Feature state operations
    // ============================================================

    /// Persist a feature's own flag and append a history entry, in one
    /// transaction.
    pub fn save_feature_state(
        &self,
        key: &str,
        enabled: bool,
        source: &str,
    ) -> Result<FeatureHistory> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let id = Uuid::new_v4();
        let now = Utc::now();

        tx.execute(
            "INSERT INTO feature_states (key, enabled, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET enabled = excluded.enabled, updated_at = excluded.updated_at",
            (key, enabled, now.to_rfc3339()),
        )?;
        tx.execute(
            "INSERT INTO feature_history (id, key, enabled, source, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (id.to_string(), key, enabled, source, now.to_rfc3339()),
        )?;
        tx.commit()?;

        Ok(FeatureHistory {
            id,
            key: key.to_string(),
            enabled,
            source: source.to_string(),
            created_at: now,
        })
    }

    /// Every persisted flag, ordered by key.
    pub fn get_feature_states(&self) -> Result<Vec<(String, bool)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key, enabled FROM feature_states ORDER BY key")?;
        let states = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(states)
    }

    /// Apply persisted flags on top of `features`. Keys no longer declared
    /// are skipped. Returns the number applied.
    pub fn restore_feature_states(&self, features: &FeatureManager) -> Result<usize> {
        let mut applied = 0;
        for (key, enabled) in self.get_feature_states()? {
            if features.is_enabled(&key).is_none() {
                tracing::warn!("Skipping persisted state for undeclared feature: {}", key);
                continue;
            }
            if features.is_enabled(&key) != Some(enabled) {
                features.set(&key, enabled);
            }
            applied += 1;
        }
        Ok(applied)
    }

    /// History for one feature, newest first.
    pub fn get_feature_history(&self, key: &str) -> Result<Vec<FeatureHistory>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, key, enabled, source, created_at
             FROM feature_history WHERE key = ? ORDER BY created_at DESC, rowid DESC",
        )?;

        let history = stmt
            .query_map([key], |row| {
                Ok(FeatureHistory {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    key: row.get(1)?,
                    enabled: row.get(2)?,
                    source: row.get(3)?,
                    created_at: parse_datetime(row.get::<_, String>(4)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(history)
    }
}

impl RelationStore for Database {
    fn load(&self, relation: &str) -> Result<Vec<Pair>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT left_id, right_id FROM relation_pairs
             WHERE relation = ? ORDER BY left_id, right_id",
        )?;

        let pairs = stmt
            .query_map([relation], |row| Ok(Pair::new(row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(pairs)
    }

    fn insert(&self, relation: &str, pairs: &[Pair]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        insert_pairs(&tx, relation, pairs)?;
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, relation: &str, pairs: &[Pair]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        delete_pairs(&tx, relation, pairs)?;
        tx.commit()?;
        Ok(())
    }

    fn replace(&self, relation: &str, added: &[Pair], removed: &[Pair]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        delete_pairs(&tx, relation, removed)?;
        insert_pairs(&tx, relation, added)?;
        tx.commit()?;
        Ok(())
    }

    fn clear(&self, relation: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM relation_pairs WHERE relation = ?", [relation])?;
        Ok(())
    }
}

fn insert_pairs(conn: &Connection, relation: &str, pairs: &[Pair]) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO relation_pairs (relation, left_id, right_id, created_at)
         VALUES (?, ?, ?, ?)",
    )?;
    for pair in pairs {
        stmt.execute((relation, pair.left, pair.right, &now))?;
    }
    Ok(())
}

fn delete_pairs(conn: &Connection, relation: &str, pairs: &[Pair]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "DELETE FROM relation_pairs WHERE relation = ? AND left_id = ? AND right_id = ?",
    )?;
    for pair in pairs {
        stmt.execute((relation, pair.left, pair.right))?;
    }
    Ok(())
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
