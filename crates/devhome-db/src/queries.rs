use crate::models::{NewUser, ProfileChanges, UserRow};
use crate::{Database, now_timestamp};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

const USER_COLUMNS: &str =
    "id, email, password, first_name, last_name, age, gender, created_at, updated_at";

impl Database {
    // -- Users --

    /// Insert a user. Returns `false` if the email is already registered.
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<bool> {
        self.with_conn(|conn| {
            let now = now_timestamp();
            let inserted = conn.execute(
                "INSERT INTO users
                    (id, email, password, first_name, last_name, age, gender,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                 ON CONFLICT(email) DO NOTHING",
                rusqlite::params![
                    user.id,
                    user.email,
                    user.password_hash,
                    user.first_name,
                    user.last_name,
                    user.age,
                    user.gender,
                    now,
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Apply a partial profile update and return the new row, or `None` if no such user.
    pub fn update_profile(&self, id: &str, changes: &ProfileChanges) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET
                    first_name = COALESCE(?2, first_name),
                    last_name  = COALESCE(?3, last_name),
                    age        = COALESCE(?4, age),
                    gender     = COALESCE(?5, gender),
                    updated_at = ?6
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    changes.first_name,
                    changes.last_name,
                    changes.age,
                    changes.gender,
                    now_timestamp(),
                ],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_user(conn, "id", id)
        })
    }

    /// Every user except `exclude_id`, oldest account first.
    pub fn list_users_except(&self, exclude_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id != ?1 ORDER BY created_at, rowid"
            ))?;
            let rows = stmt
                .query_map([exclude_id], user_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET password = ?2, updated_at = ?3 WHERE id = ?1",
                (id, password_hash, now_timestamp()),
            )?;
            Ok(updated == 1)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt.query_row([value], user_from_row).optional()?;

    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        age: row.get(5)?,
        gender: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}
