use chrono::{DateTime, Utc};
use codespace_core::{PrivacyUpdate, Space, SpaceFile, SpaceStatus};
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::{Arc, Mutex, MutexGuard};

/// Summary row for listing spaces
#[derive(Debug, Clone)]
pub struct SpaceInfo {
    pub name: String,
    pub is_public: bool,
    pub file_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Space repository for database operations.
///
/// Every mutation is a single statement (or a single transaction), so no
/// caller ever needs to read the file list, change it and write it back.
#[derive(Clone)]
pub struct SpaceRepo {
    conn: Arc<Mutex<Connection>>,
}

impl SpaceRepo {
    /// Create a new SpaceRepo with the given connection
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves SQLite itself consistent
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ===== Space operations =====

    /// Get a space with all of its files, in insertion order
    pub fn get_space(&self, name: &str) -> Result<Option<Space>, rusqlite::Error> {
        let conn = self.conn();
        load_space(&conn, name)
    }

    /// Get only the public/private flag of a space
    pub fn get_status(&self, name: &str) -> Result<Option<SpaceStatus>, rusqlite::Error> {
        let conn = self.conn();
        conn.query_row(
            "SELECT is_public FROM spaces WHERE name = ?",
            [name],
            |row| {
                Ok(SpaceStatus {
                    is_public: row.get::<_, i32>(0)? != 0,
                })
            },
        )
        .optional()
    }

    /// Create a space seeded with the default file
    pub fn create_space(&self, name: &str) -> Result<Space, rusqlite::Error> {
        let mut conn = self.conn();
        insert_space(&mut conn, name)
    }

    /// Get a space, creating it with defaults when absent (returns whether it was created)
    pub fn get_or_create_space(&self, name: &str) -> Result<(Space, bool), rusqlite::Error> {
        let mut conn = self.conn();

        // Try to get existing space
        if let Some(space) = load_space(&conn, name)? {
            return Ok((space, false));
        }

        // Create new space
        let space = insert_space(&mut conn, name)?;
        Ok((space, true))
    }

    /// List all spaces
    pub fn list_spaces(&self) -> Result<Vec<SpaceInfo>, rusqlite::Error> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.name, s.is_public, s.created_at, s.updated_at,
                    (SELECT COUNT(*) FROM space_files f WHERE f.space_name = s.name)
             FROM spaces s ORDER BY s.name",
        )?;

        let spaces = stmt
            .query_map([], |row| {
                Ok(SpaceInfo {
                    name: row.get(0)?,
                    is_public: row.get::<_, i32>(1)? != 0,
                    created_at: timestamp_to_datetime(row.get(2)?),
                    updated_at: timestamp_to_datetime(row.get(3)?),
                    file_count: row.get::<_, i64>(4)? as usize,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(spaces)
    }

    /// Update privacy flag and secret digest together (returns false if the space is missing)
    pub fn set_privacy(&self, name: &str, update: &PrivacyUpdate) -> Result<bool, rusqlite::Error> {
        let conn = self.conn();
        let now = Utc::now().timestamp();
        let updated = conn.execute(
            "UPDATE spaces SET is_public = ?, secret_hash = ?, updated_at = ? WHERE name = ?",
            params![update.is_public as i32, update.secret_hash, now, name],
        )?;
        Ok(updated > 0)
    }

    // ===== File operations =====

    /// Overwrite the content of one file (returns false if no such file)
    pub fn update_file_content(
        &self,
        space_name: &str,
        file_name: &str,
        content: &str,
    ) -> Result<bool, rusqlite::Error> {
        let conn = self.conn();
        let now = Utc::now().timestamp();
        let updated = conn.execute(
            "UPDATE space_files SET content = ?, updated_at = ? WHERE space_name = ? AND name = ?",
            params![content, now, space_name, file_name],
        )?;
        Ok(updated > 0)
    }

    /// Append a file at the end of a space's list.
    ///
    /// Returns `None` if the space does not exist. A duplicate name fails with a
    /// constraint violation from the primary key.
    pub fn append_file(
        &self,
        space_name: &str,
        file: &SpaceFile,
    ) -> Result<Option<Space>, rusqlite::Error> {
        let conn = self.conn();
        let now = Utc::now().timestamp();

        let inserted = conn.execute(
            "INSERT INTO space_files (space_name, name, language, content, position, updated_at)
             SELECT s.name, ?2, ?3, ?4,
                    COALESCE((SELECT MAX(position) FROM space_files WHERE space_name = s.name), -1) + 1,
                    ?5
             FROM spaces s WHERE s.name = ?1",
            params![space_name, file.name, file.language, file.content, now],
        )?;

        if inserted == 0 {
            return Ok(None);
        }

        load_space(&conn, space_name)
    }

    /// Remove every file with the given name. Removing an absent name is not an error.
    ///
    /// Returns `None` if the space does not exist.
    pub fn remove_file(
        &self,
        space_name: &str,
        file_name: &str,
    ) -> Result<Option<Space>, rusqlite::Error> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM space_files WHERE space_name = ? AND name = ?",
            params![space_name, file_name],
        )?;
        load_space(&conn, space_name)
    }
}

// ===== Helper functions =====

fn load_space(conn: &Connection, name: &str) -> Result<Option<Space>, rusqlite::Error> {
    let header = conn
        .query_row(
            "SELECT name, is_public, secret_hash FROM spaces WHERE name = ?",
            [name],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i32>(1)? != 0,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((name, is_public, secret_hash)) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT name, language, content FROM space_files
         WHERE space_name = ? ORDER BY position ASC",
    )?;
    let files = stmt
        .query_map([&name], |row| {
            Ok(SpaceFile {
                name: row.get(0)?,
                language: row.get(1)?,
                content: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Space {
        name,
        is_public,
        secret_hash,
        files,
    }))
}

fn insert_space(conn: &mut Connection, name: &str) -> Result<Space, rusqlite::Error> {
    let space = Space::with_defaults(name);
    let now = Utc::now().timestamp();

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO spaces (name, is_public, secret_hash, created_at, updated_at) VALUES (?, ?, NULL, ?, ?)",
        params![space.name, space.is_public as i32, now, now],
    )?;
    for (position, file) in space.files.iter().enumerate() {
        tx.execute(
            "INSERT INTO space_files (space_name, name, language, content, position, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![space.name, file.name, file.language, file.content, position as i64, now],
        )?;
    }
    tx.commit()?;

    Ok(space)
}

/// Convert Unix timestamp to DateTime<Utc>
fn timestamp_to_datetime(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now)
}
