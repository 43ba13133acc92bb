//! Storage ports for the connection subsystem.
//!
//! Both traits are synchronous: the SQLite backend blocks, and async callers
//! drive it from `spawn_blocking`. Implementations must be shareable across
//! threads since every inbound request gets its own handle to the same store.

use uuid::Uuid;

use crate::error::RepositoryError;
use crate::model::{Connection, UserSummary};
use crate::status::ConnectionStatus;

/// Durable storage of connection records.
///
/// Implementations guarantee at most one record per unordered user pair. The
/// guarantee must hold across independent handles to the same store, so it has
/// to come from the storage layer itself rather than an in-process lock.
pub trait ConnectionRepository: Send + Sync {
    /// Find the record for `{a, b}`, whichever of the two sent it.
    fn find_by_pair(&self, a: Uuid, b: Uuid) -> Result<Option<Connection>, RepositoryError>;

    /// Insert a new record.
    ///
    /// Fails with `SelfRelationship` when `from == to` and with
    /// `DuplicateRelationship` when any record for the pair already exists.
    fn create(
        &self,
        from: Uuid,
        to: Uuid,
        status: ConnectionStatus,
    ) -> Result<Connection, RepositoryError>;

    /// Unconditionally set the status of record `id`.
    fn update_status(
        &self,
        id: Uuid,
        status: ConnectionStatus,
    ) -> Result<Connection, RepositoryError>;

    /// Set the status of record `id` only if it currently equals `expected`.
    ///
    /// Fails with `StatusConflict` carrying the stored status otherwise.
    fn transition_status(
        &self,
        id: Uuid,
        expected: ConnectionStatus,
        status: ConnectionStatus,
    ) -> Result<Connection, RepositoryError>;

    /// All records addressed to `user_id`, most recent first.
    fn list_incoming(&self, user_id: Uuid) -> Result<Vec<Connection>, RepositoryError>;
}

/// Read-only view of the user accounts.
pub trait UserDirectory: Send + Sync {
    fn find_user(&self, id: Uuid) -> Result<Option<UserSummary>, RepositoryError>;

    /// Batch lookup. Unknown ids are skipped.
    fn find_users(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>, RepositoryError>;
}
