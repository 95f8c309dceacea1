//! Embedded, checksummed schema migrations

use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{MangoDeskError, Result};

pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All migrations in application order
pub fn embedded_migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_initial_schema",
        sql: include_str!("../../migrations/001_initial_schema.sql"),
    }]
}

pub fn compute_checksum(sql: &str) -> String {
    format!("{:x}", Sha256::digest(sql.as_bytes()))
}

/// Apply all pending migrations
pub fn apply_migrations(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY,
            migration_id TEXT NOT NULL UNIQUE,
            checksum TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    for migration in embedded_migrations() {
        apply_migration(conn, &migration)?;
    }

    Ok(())
}

fn apply_migration(conn: &mut Connection, migration: &Migration) -> Result<()> {
    let checksum = compute_checksum(migration.sql);

    let recorded: Option<String> = conn
        .query_row(
            "SELECT checksum FROM schema_version WHERE migration_id = ?1",
            [migration.id],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(expected) = recorded {
        if expected != checksum {
            return Err(MangoDeskError::MigrationChecksum {
                id: migration.id.to_string(),
                expected,
                actual: checksum,
            });
        }
        return Ok(());
    }

    let tx = conn.transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT INTO schema_version (migration_id, checksum, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![migration.id, checksum, chrono::Utc::now()],
    )?;
    tx.commit()?;

    info!("Applied migration {}", migration.id);
    Ok(())
}
