//! Schema versioning for the object table.
//!
//! Each entry of [`MIGRATIONS`] moves the schema one version forward. The
//! applied versions are recorded in `schema_migrations`.

use rusqlite::{params, Connection};

use crate::error::{Result, StoreError};

/// Schema steps, in order. Entry `n` upgrades version `n` to `n + 1`.
const MIGRATIONS: &[&str] = &[
    // v1: one row per persisted object of any type.
    // `primary_key` is INTEGER or TEXT, NULL for keyless types.
    // `fields` is the CBOR-encoded record; timestamps are Unix ms.
    r#"
    CREATE TABLE objects (
        object_id   INTEGER PRIMARY KEY AUTOINCREMENT,
        type_name   TEXT NOT NULL,
        primary_key,
        fields      BLOB NOT NULL,
        created_at  INTEGER NOT NULL,
        updated_at  INTEGER NOT NULL,
        UNIQUE (type_name, primary_key)
    );
    CREATE INDEX idx_objects_type ON objects (type_name, object_id);
    "#,
];

/// Schema version this build reads and writes.
pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring the schema up to [`CURRENT_VERSION`]. Running it again is a no-op.
///
/// A database written by a newer build is rejected with
/// [`StoreError::Migration`] rather than opened.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
    )?;

    let from = current_version(conn)?;
    if from > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "schema version {from} is newer than supported version {CURRENT_VERSION}"
        )));
    }
    if from == CURRENT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (step, ddl) in MIGRATIONS.iter().enumerate().skip(from as usize) {
        tx.execute_batch(ddl)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![step as u32 + 1, crate::now_millis()],
        )?;
    }
    tx.commit()?;
    tracing::debug!(from, to = CURRENT_VERSION, "schema migrated");
    Ok(())
}

/// The recorded schema version; 0 for a database never migrated.
pub fn current_version(conn: &Connection) -> Result<u32> {
    let tracked: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations')",
        [],
        |row| row.get(0),
    )?;
    if !tracked {
        return Ok(0);
    }
    Ok(conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"objects".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        assert_eq!(current_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_unmigrated_version_is_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(current_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (99, 0)",
            [],
        )
        .unwrap();
        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }
}
