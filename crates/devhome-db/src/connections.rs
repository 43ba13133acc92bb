//! SQLite-backed [`ConnectionRepository`] and [`UserDirectory`].
//!
//! Pair uniqueness is enforced by the `UNIQUE(pair_low, pair_high)` constraint,
//! so it holds across every handle opened on the same database file. A violation
//! is translated into `RepositoryError::DuplicateRelationship` here and never
//! escapes as a raw SQLite error.

use std::sync::MutexGuard;

use chrono::{DateTime, Utc};
use devhome_core::{
    Connection as Relationship, ConnectionRepository, ConnectionStatus, RepositoryError,
    UserDirectory, UserPair, UserSummary,
};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::ConnectionRow;
use crate::{Database, now_timestamp};

const CONNECTION_COLUMNS: &str = "id, from_user_id, to_user_id, status, created_at, updated_at";

impl Database {
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::Storage(format!("DB lock poisoned: {e}")))
    }
}

impl ConnectionRepository for Database {
    fn find_by_pair(&self, a: Uuid, b: Uuid) -> Result<Option<Relationship>, RepositoryError> {
        let Ok(pair) = UserPair::new(a, b) else {
            return Ok(None);
        };
        let conn = self.lock()?;
        query_by_pair(&conn, pair)
    }

    fn create(
        &self,
        from: Uuid,
        to: Uuid,
        status: ConnectionStatus,
    ) -> Result<Relationship, RepositoryError> {
        let pair = UserPair::new(from, to)?;
        let conn = self.lock()?;

        let now = now_timestamp();
        let row = ConnectionRow {
            id: Uuid::new_v4().to_string(),
            from_user_id: from.to_string(),
            to_user_id: to.to_string(),
            status: status.as_str().to_string(),
            created_at: now.clone(),
            updated_at: now,
        };

        let inserted = conn.execute(
            "INSERT INTO connections
                (id, from_user_id, to_user_id, pair_low, pair_high, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                row.id,
                row.from_user_id,
                row.to_user_id,
                pair.low().to_string(),
                pair.high().to_string(),
                row.status,
                row.created_at,
                row.updated_at,
            ],
        );

        match inserted {
            Ok(_) => {
                debug!(id = %row.id, "Inserted connection");
                row.into_domain()
            }
            Err(e) if is_unique_violation(&e) => {
                let existing = query_by_pair(&conn, pair)?.map(|c| c.status);
                warn!(%from, %to, ?existing, "Connection pair already taken");
                Err(RepositoryError::DuplicateRelationship { existing })
            }
            Err(e) => Err(storage(e)),
        }
    }

    fn update_status(
        &self,
        id: Uuid,
        status: ConnectionStatus,
    ) -> Result<Relationship, RepositoryError> {
        let conn = self.lock()?;
        let updated = conn
            .execute(
                "UPDATE connections SET status = ?2, updated_at = ?3 WHERE id = ?1",
                (id.to_string(), status.as_str(), now_timestamp()),
            )
            .map_err(storage)?;
        if updated == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        query_by_id(&conn, id)?.ok_or(RepositoryError::NotFound(id))
    }

    fn transition_status(
        &self,
        id: Uuid,
        expected: ConnectionStatus,
        status: ConnectionStatus,
    ) -> Result<Relationship, RepositoryError> {
        let conn = self.lock()?;
        // Single conditional UPDATE: of two concurrent writers only one sees
        // `expected` still in place.
        let updated = conn
            .execute(
                "UPDATE connections SET status = ?3, updated_at = ?4
                 WHERE id = ?1 AND status = ?2",
                (
                    id.to_string(),
                    expected.as_str(),
                    status.as_str(),
                    now_timestamp(),
                ),
            )
            .map_err(storage)?;

        let current = query_by_id(&conn, id)?.ok_or(RepositoryError::NotFound(id))?;
        if updated == 0 {
            return Err(RepositoryError::StatusConflict {
                current: current.status,
            });
        }
        Ok(current)
    }

    fn list_incoming(&self, user_id: Uuid) -> Result<Vec<Relationship>, RepositoryError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CONNECTION_COLUMNS} FROM connections
                 WHERE to_user_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))
            .map_err(storage)?;

        let rows = stmt
            .query_map([user_id.to_string()], connection_from_row)
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;

        rows.into_iter().map(ConnectionRow::into_domain).collect()
    }
}

impl UserDirectory for Database {
    fn find_user(&self, id: Uuid) -> Result<Option<UserSummary>, RepositoryError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, first_name, last_name FROM users WHERE id = ?1",
            [id.to_string()],
            summary_from_row,
        )
        .optional()
        .map_err(storage)
    }

    /// Batch-fetch display attributes for a set of user ids.
    fn find_users(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>, RepositoryError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let conn = self.lock()?;
        let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT id, first_name, last_name FROM users WHERE id IN ({})",
            placeholders.join(", ")
        );

        let mut stmt = conn.prepare(&sql).map_err(storage)?;
        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        let params: Vec<&dyn rusqlite::types::ToSql> = ids
            .iter()
            .map(|id| id as &dyn rusqlite::types::ToSql)
            .collect();

        let users = stmt
            .query_map(params.as_slice(), summary_from_row)
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;

        Ok(users)
    }
}

impl ConnectionRow {
    fn into_domain(self) -> Result<Relationship, RepositoryError> {
        let status = self.status.parse::<ConnectionStatus>().map_err(|e| {
            warn!("Corrupt status on connection '{}': {}", self.id, e);
            RepositoryError::Storage(e.to_string())
        })?;

        Ok(Relationship {
            id: parse_id(&self.id)?,
            from_user_id: parse_id(&self.from_user_id)?,
            to_user_id: parse_id(&self.to_user_id)?,
            status,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn query_by_pair(
    conn: &Connection,
    pair: UserPair,
) -> Result<Option<Relationship>, RepositoryError> {
    conn.query_row(
        &format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections WHERE pair_low = ?1 AND pair_high = ?2"
        ),
        [pair.low().to_string(), pair.high().to_string()],
        connection_from_row,
    )
    .optional()
    .map_err(storage)?
    .map(ConnectionRow::into_domain)
    .transpose()
}

fn query_by_id(conn: &Connection, id: Uuid) -> Result<Option<Relationship>, RepositoryError> {
    conn.query_row(
        &format!("SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = ?1"),
        [id.to_string()],
        connection_from_row,
    )
    .optional()
    .map_err(storage)?
    .map(ConnectionRow::into_domain)
    .transpose()
}

fn connection_from_row(row: &Row<'_>) -> rusqlite::Result<ConnectionRow> {
    Ok(ConnectionRow {
        id: row.get(0)?,
        from_user_id: row.get(1)?,
        to_user_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<UserSummary> {
    let id: String = row.get(0)?;
    let id = id.parse::<Uuid>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(UserSummary {
        id,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
    })
}

fn parse_id(raw: &str) -> Result<Uuid, RepositoryError> {
    raw.parse().map_err(|e| {
        warn!("Corrupt id '{}': {}", raw, e);
        RepositoryError::Storage(format!("corrupt id '{raw}'"))
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            RepositoryError::Storage(format!("corrupt timestamp '{raw}'"))
        })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn storage(err: rusqlite::Error) -> RepositoryError {
    RepositoryError::Storage(err.to_string())
}
