use std::collections::BTreeSet;

use rusqlite::Connection;

use crate::error::{Error, Result};

/// Versioned SQL script, applied at most once per database.
struct Migration {
    version: &'static str,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001",
        name: "relation_pairs",
        sql: include_str!("migrations/001_initial.sql"),
    },
    Migration {
        version: "002",
        name: "feature_states",
        sql: include_str!("migrations/002_feature_states.sql"),
    },
];

const LEDGER: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
)";

/// Bring the schema up to date. Each pending migration runs in its own
/// transaction together with its ledger row.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(LEDGER)?;
    let applied = applied_versions(conn)?;

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(m.version))
        .collect();
    if pending.is_empty() {
        tracing::debug!("Schema is up to date ({} migrations)", applied.len());
        return Ok(());
    }

    for migration in pending {
        apply(conn, migration).map_err(|source| Error::Migration {
            version: migration.version,
            source,
        })?;
        tracing::info!("Applied migration {} ({})", migration.version, migration.name);
    }
    Ok(())
}

fn applied_versions(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<BTreeSet<String>, _>>()?;
    Ok(versions)
}

fn apply(conn: &Connection, migration: &Migration) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
        (
            migration.version,
            migration.name,
            chrono::Utc::now().to_rfc3339(),
        ),
    )?;
    tx.commit()
}
