use rusqlite::Connection;

/// SQL schema for spaces and their files
const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- Spaces (one row per named codespace)
CREATE TABLE IF NOT EXISTS spaces (
    name TEXT PRIMARY KEY,
    is_public INTEGER NOT NULL DEFAULT 1,
    secret_hash TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Files (name is unique within a space; position keeps insertion order)
CREATE TABLE IF NOT EXISTS space_files (
    space_name TEXT NOT NULL REFERENCES spaces(name) ON DELETE CASCADE,
    name TEXT NOT NULL,
    language TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    position INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (space_name, name)
);

CREATE INDEX IF NOT EXISTS idx_space_files_position ON space_files(space_name, position);
"#;

/// Initialize the database with the codespace schema
pub fn init_database(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_database() {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();

        // Verify tables exist
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"spaces".to_string()));
        assert!(tables.contains(&"space_files".to_string()));
    }

    #[test]
    fn test_init_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();
        init_database(&conn).unwrap();
    }
}
