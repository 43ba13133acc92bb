//! In-memory implementations of the storage ports.
//!
//! Everything is lost on drop. Used by tests and as a reference for the
//! contract the SQLite backend has to honour.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::model::{Connection, UserPair, UserSummary};
use crate::repository::{ConnectionRepository, UserDirectory};
use crate::status::ConnectionStatus;

struct Stored {
    seq: u64,
    connection: Connection,
}

#[derive(Default)]
struct Records {
    by_pair: HashMap<UserPair, Stored>,
    next_seq: u64,
}

impl Records {
    fn by_id_mut(&mut self, id: Uuid) -> Option<&mut Connection> {
        self.by_pair
            .values_mut()
            .map(|stored| &mut stored.connection)
            .find(|conn| conn.id == id)
    }
}

/// Connection records keyed by canonical pair.
///
/// Check-and-insert happens under one write lock, which is what makes the
/// pair uniqueness atomic here.
#[derive(Default)]
pub struct InMemoryConnections {
    records: RwLock<Records>,
}

impl InMemoryConnections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read(|records| records.by_pair.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read<T>(&self, f: impl FnOnce(&Records) -> T) -> Result<T, RepositoryError> {
        let guard = self.records.read().map_err(|e| poisoned(&e))?;
        Ok(f(&*guard))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut Records) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.records.write().map_err(|e| poisoned(&e))?;
        f(&mut *guard)
    }
}

fn poisoned(err: &dyn std::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(format!("lock poisoned: {err}"))
}

impl ConnectionRepository for InMemoryConnections {
    fn find_by_pair(&self, a: Uuid, b: Uuid) -> Result<Option<Connection>, RepositoryError> {
        let Ok(pair) = UserPair::new(a, b) else {
            return Ok(None);
        };
        self.read(|records| {
            records
                .by_pair
                .get(&pair)
                .map(|stored| stored.connection.clone())
        })
    }

    fn create(
        &self,
        from: Uuid,
        to: Uuid,
        status: ConnectionStatus,
    ) -> Result<Connection, RepositoryError> {
        let pair = UserPair::new(from, to)?;
        self.write(|records| {
            if let Some(existing) = records.by_pair.get(&pair) {
                return Err(RepositoryError::DuplicateRelationship {
                    existing: Some(existing.connection.status),
                });
            }

            let now = Utc::now();
            let connection = Connection {
                id: Uuid::new_v4(),
                from_user_id: from,
                to_user_id: to,
                status,
                created_at: now,
                updated_at: now,
            };
            let seq = records.next_seq;
            records.next_seq += 1;
            records.by_pair.insert(
                pair,
                Stored {
                    seq,
                    connection: connection.clone(),
                },
            );
            Ok(connection)
        })
    }

    fn update_status(
        &self,
        id: Uuid,
        status: ConnectionStatus,
    ) -> Result<Connection, RepositoryError> {
        self.write(|records| {
            let conn = records.by_id_mut(id).ok_or(RepositoryError::NotFound(id))?;
            conn.status = status;
            conn.updated_at = Utc::now();
            Ok(conn.clone())
        })
    }

    fn transition_status(
        &self,
        id: Uuid,
        expected: ConnectionStatus,
        status: ConnectionStatus,
    ) -> Result<Connection, RepositoryError> {
        self.write(|records| {
            let conn = records.by_id_mut(id).ok_or(RepositoryError::NotFound(id))?;
            if conn.status != expected {
                return Err(RepositoryError::StatusConflict {
                    current: conn.status,
                });
            }
            conn.status = status;
            conn.updated_at = Utc::now();
            Ok(conn.clone())
        })
    }

    fn list_incoming(&self, user_id: Uuid) -> Result<Vec<Connection>, RepositoryError> {
        self.read(|records| {
            let mut incoming: Vec<&Stored> = records
                .by_pair
                .values()
                .filter(|stored| stored.connection.to_user_id == user_id)
                .collect();
            incoming.sort_by(|a, b| {
                b.connection
                    .created_at
                    .cmp(&a.connection.created_at)
                    .then(b.seq.cmp(&a.seq))
            });
            incoming
                .into_iter()
                .map(|stored| stored.connection.clone())
                .collect()
        })
    }
}

/// Fixed set of users.
#[derive(Default)]
pub struct InMemoryUsers {
    users: RwLock<HashMap<Uuid, UserSummary>>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user and return its id.
    pub fn add(&self, first_name: &str, last_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        let user = UserSummary {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        if let Ok(mut users) = self.users.write() {
            users.insert(id, user);
        }
        id
    }
}

impl UserDirectory for InMemoryUsers {
    fn find_user(&self, id: Uuid) -> Result<Option<UserSummary>, RepositoryError> {
        let users = self.users.read().map_err(|e| poisoned(&e))?;
        Ok(users.get(&id).cloned())
    }

    fn find_users(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>, RepositoryError> {
        let users = self.users.read().map_err(|e| poisoned(&e))?;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn create_rejects_reverse_direction() {
        let repo = InMemoryConnections::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        repo.create(a, b, ConnectionStatus::Interested).unwrap();
        let err = repo.create(b, a, ConnectionStatus::Ignored).unwrap_err();

        assert_eq!(
            err,
            RepositoryError::DuplicateRelationship {
                existing: Some(ConnectionStatus::Interested)
            }
        );
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn create_rejects_self() {
        let repo = InMemoryConnections::new();
        let a = Uuid::new_v4();
        assert_eq!(
            repo.create(a, a, ConnectionStatus::Interested),
            Err(RepositoryError::SelfRelationship)
        );
        assert!(repo.is_empty());
    }

    #[test]
    fn find_by_pair_checks_both_orderings() {
        let repo = InMemoryConnections::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let created = repo.create(a, b, ConnectionStatus::Interested).unwrap();

        assert_eq!(repo.find_by_pair(a, b).unwrap(), Some(created.clone()));
        assert_eq!(repo.find_by_pair(b, a).unwrap(), Some(created));
        assert_eq!(repo.find_by_pair(a, Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn update_status_unknown_id_is_not_found() {
        let repo = InMemoryConnections::new();
        let id = Uuid::new_v4();
        assert_eq!(
            repo.update_status(id, ConnectionStatus::Accepted),
            Err(RepositoryError::NotFound(id))
        );
    }

    #[test]
    fn transition_requires_expected_status() {
        let repo = InMemoryConnections::new();
        let created = repo
            .create(Uuid::new_v4(), Uuid::new_v4(), ConnectionStatus::Interested)
            .unwrap();

        let accepted = repo
            .transition_status(created.id, ConnectionStatus::Interested, ConnectionStatus::Accepted)
            .unwrap();
        assert_eq!(accepted.status, ConnectionStatus::Accepted);
        assert!(accepted.updated_at >= created.updated_at);

        let err = repo
            .transition_status(created.id, ConnectionStatus::Interested, ConnectionStatus::Rejected)
            .unwrap_err();
        assert_eq!(
            err,
            RepositoryError::StatusConflict {
                current: ConnectionStatus::Accepted
            }
        );
    }

    #[test]
    fn list_incoming_is_most_recent_first() {
        let repo = InMemoryConnections::new();
        let target = Uuid::new_v4();
        let first = repo
            .create(Uuid::new_v4(), target, ConnectionStatus::Interested)
            .unwrap();
        let second = repo
            .create(Uuid::new_v4(), target, ConnectionStatus::Ignored)
            .unwrap();
        repo.create(target, Uuid::new_v4(), ConnectionStatus::Interested)
            .unwrap();

        let ids: Vec<Uuid> = repo
            .list_incoming(target)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn concurrent_opposite_inserts_leave_one_record() {
        let repo = Arc::new(InMemoryConnections::new());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [(a, b), (b, a)]
            .into_iter()
            .map(|(from, to)| {
                let repo = repo.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    repo.create(from, to, ConnectionStatus::Interested)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(repo.len(), 1);
    }
}
