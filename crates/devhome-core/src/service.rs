use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{RepositoryError, ServiceError};
use crate::model::{Connection, IncomingRequest, UserSummary};
use crate::repository::{ConnectionRepository, UserDirectory};
use crate::status::{self, ConnectionStatus};

/// Result of a successful send.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub message: String,
    pub connection: Connection,
}

/// Result of a successful review.
#[derive(Debug, Clone)]
pub struct ReviewedRequest {
    pub message: String,
    pub connection: Connection,
    pub requester: UserSummary,
}

/// Orchestrates the connection request operations over injected storage.
///
/// Holds no mutable state of its own; all coordination between concurrent
/// callers is left to the repository's uniqueness and compare-and-set guarantees.
#[derive(Clone)]
pub struct RequestService {
    connections: Arc<dyn ConnectionRepository>,
    users: Arc<dyn UserDirectory>,
}

impl RequestService {
    pub fn new(connections: Arc<dyn ConnectionRepository>, users: Arc<dyn UserDirectory>) -> Self {
        Self { connections, users }
    }

    /// `actor` expresses `status` (interested or ignored) towards `target`.
    pub fn send_request(
        &self,
        actor: Uuid,
        target: Uuid,
        status: &str,
    ) -> Result<SentRequest, ServiceError> {
        let status = status::parse_initial(status)?;
        if actor == target {
            return Err(ServiceError::SelfRelationship);
        }

        let target_user = self
            .users
            .find_user(target)?
            .ok_or(ServiceError::TargetNotFound(target))?;

        if let Some(existing) = self.connections.find_by_pair(actor, target)? {
            return Err(ServiceError::RequestAlreadyExists {
                status: Some(existing.status),
            });
        }

        let connection = match self.connections.create(actor, target, status) {
            Ok(connection) => connection,
            Err(RepositoryError::DuplicateRelationship { existing }) => {
                warn!(%actor, %target, "Lost race creating connection");
                let status = match existing {
                    Some(status) => Some(status),
                    None => self
                        .connections
                        .find_by_pair(actor, target)?
                        .map(|c| c.status),
                };
                return Err(ServiceError::RequestAlreadyExists { status });
            }
            Err(e) => return Err(e.into()),
        };

        info!(id = %connection.id, %actor, %target, %status, "Connection created");

        let message = match status {
            ConnectionStatus::Ignored => {
                let actor_name = self
                    .users
                    .find_user(actor)?
                    .map(|u| u.display_name())
                    .unwrap_or_else(|| actor.to_string());
                format!("Connection ignored by user {actor_name}")
            }
            _ => format!("Connection sent to user {}", target_user.display_name()),
        };

        Ok(SentRequest {
            message,
            connection,
        })
    }

    /// `actor` decides (accepted or rejected) on the interest `requester` sent them.
    pub fn review_request(
        &self,
        actor: Uuid,
        requester: Uuid,
        status: &str,
    ) -> Result<ReviewedRequest, ServiceError> {
        let decision = status::parse_review(status)?;

        let pending = self
            .connections
            .find_by_pair(requester, actor)?
            .filter(|c| {
                c.from_user_id == requester
                    && c.to_user_id == actor
                    && c.status == ConnectionStatus::Interested
            })
            .ok_or(ServiceError::NoPendingRequest)?;

        let next =
            status::review(pending.status, decision).map_err(|_| ServiceError::NoPendingRequest)?;

        let connection = self
            .connections
            .transition_status(pending.id, pending.status, next)
            .map_err(|e| {
                if let RepositoryError::StatusConflict { current } = e {
                    info!(id = %pending.id, %current, "Connection reviewed concurrently");
                }
                ServiceError::from(e)
            })?;

        info!(id = %connection.id, %actor, %requester, status = %next, "Connection reviewed");

        let requester = self
            .users
            .find_user(requester)?
            .unwrap_or_else(|| unknown_user(requester));

        let message = match next {
            ConnectionStatus::Accepted => "Connection request accepted",
            ConnectionStatus::Rejected => "Connection request rejected",
            _ => "Connection request updated",
        };

        Ok(ReviewedRequest {
            message: message.to_string(),
            connection,
            requester,
        })
    }

    /// Connections addressed to `actor`, most recent first, with requester names.
    pub fn list_incoming(&self, actor: Uuid) -> Result<Vec<IncomingRequest>, ServiceError> {
        let incoming = self.connections.list_incoming(actor)?;

        let mut requester_ids: Vec<Uuid> = incoming.iter().map(|c| c.from_user_id).collect();
        requester_ids.sort_unstable();
        requester_ids.dedup();

        let requesters: HashMap<Uuid, UserSummary> = self
            .users
            .find_users(&requester_ids)?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(incoming
            .into_iter()
            .map(|connection| {
                let requester = requesters
                    .get(&connection.from_user_id)
                    .cloned()
                    .unwrap_or_else(|| unknown_user(connection.from_user_id));
                IncomingRequest {
                    connection,
                    requester,
                }
            })
            .collect())
    }
}

fn unknown_user(id: Uuid) -> UserSummary {
    UserSummary {
        id,
        first_name: "unknown".to_string(),
        last_name: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryConnections, InMemoryUsers};
    use std::sync::Barrier;
    use std::thread;

    struct Fixture {
        service: RequestService,
        connections: Arc<InMemoryConnections>,
        alice: Uuid,
        bob: Uuid,
        carol: Uuid,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(InMemoryUsers::new());
        let alice = users.add("Alice", "Archer");
        let bob = users.add("Bob", "Baker");
        let carol = users.add("Carol", "Cooper");
        let connections = Arc::new(InMemoryConnections::new());
        Fixture {
            service: RequestService::new(connections.clone(), users),
            connections,
            alice,
            bob,
            carol,
        }
    }

    #[test]
    fn send_interested_creates_record() {
        let f = fixture();
        let sent = f.service.send_request(f.alice, f.bob, "Interested").unwrap();

        assert_eq!(sent.connection.from_user_id, f.alice);
        assert_eq!(sent.connection.to_user_id, f.bob);
        assert_eq!(sent.connection.status, ConnectionStatus::Interested);
        assert_eq!(sent.message, "Connection sent to user Bob Baker");
    }

    #[test]
    fn send_ignored_names_the_actor() {
        let f = fixture();
        let sent = f.service.send_request(f.alice, f.bob, "ignored").unwrap();
        assert_eq!(sent.connection.status, ConnectionStatus::Ignored);
        assert_eq!(sent.message, "Connection ignored by user Alice Archer");
    }

    #[test]
    fn uniqueness_is_symmetric() {
        let f = fixture();
        f.service.send_request(f.alice, f.bob, "interested").unwrap();

        for status in ["interested", "ignored"] {
            assert_eq!(
                f.service.send_request(f.bob, f.alice, status).unwrap_err(),
                ServiceError::RequestAlreadyExists {
                    status: Some(ConnectionStatus::Interested)
                }
            );
            assert_eq!(
                f.service.send_request(f.alice, f.bob, status).unwrap_err(),
                ServiceError::RequestAlreadyExists {
                    status: Some(ConnectionStatus::Interested)
                }
            );
        }
        assert_eq!(f.connections.len(), 1);
    }

    #[test]
    fn send_to_self_fails() {
        let f = fixture();
        for status in ["interested", "ignored"] {
            assert_eq!(
                f.service.send_request(f.alice, f.alice, status).unwrap_err(),
                ServiceError::SelfRelationship
            );
        }
        assert!(f.connections.is_empty());
    }

    #[test]
    fn send_with_review_status_is_invalid() {
        let f = fixture();
        let err = f.service.send_request(f.alice, f.bob, "ACCEPTED").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidStatus { ref sent, .. } if sent == "accepted"));
        assert!(f.connections.is_empty());
    }

    #[test]
    fn status_is_validated_before_target() {
        let f = fixture();
        let err = f
            .service
            .send_request(f.alice, Uuid::new_v4(), "pending")
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidStatus { .. }));
    }

    #[test]
    fn send_to_unknown_user_fails() {
        let f = fixture();
        let ghost = Uuid::new_v4();
        assert_eq!(
            f.service.send_request(f.alice, ghost, "interested").unwrap_err(),
            ServiceError::TargetNotFound(ghost)
        );
    }

    #[test]
    fn review_succeeds_once() {
        let f = fixture();
        f.service.send_request(f.alice, f.bob, "interested").unwrap();

        let reviewed = f.service.review_request(f.bob, f.alice, "accepted").unwrap();
        assert_eq!(reviewed.connection.status, ConnectionStatus::Accepted);
        assert_eq!(reviewed.message, "Connection request accepted");
        assert_eq!(reviewed.requester.display_name(), "Alice Archer");

        assert_eq!(
            f.service.review_request(f.bob, f.alice, "accepted").unwrap_err(),
            ServiceError::NoPendingRequest
        );
        assert_eq!(
            f.service.review_request(f.bob, f.alice, "rejected").unwrap_err(),
            ServiceError::NoPendingRequest
        );
    }

    #[test]
    fn review_by_non_target_fails() {
        let f = fixture();
        f.service.send_request(f.alice, f.bob, "interested").unwrap();

        assert_eq!(
            f.service.review_request(f.carol, f.alice, "accepted").unwrap_err(),
            ServiceError::NoPendingRequest
        );
        // The sender cannot review their own request either.
        assert_eq!(
            f.service.review_request(f.alice, f.bob, "accepted").unwrap_err(),
            ServiceError::NoPendingRequest
        );
    }

    #[test]
    fn ignored_cannot_be_reviewed() {
        let f = fixture();
        f.service.send_request(f.alice, f.bob, "ignored").unwrap();
        assert_eq!(
            f.service.review_request(f.bob, f.alice, "accepted").unwrap_err(),
            ServiceError::NoPendingRequest
        );
    }

    #[test]
    fn review_rejects_initial_statuses() {
        let f = fixture();
        f.service.send_request(f.alice, f.bob, "interested").unwrap();
        let err = f
            .service
            .review_request(f.bob, f.alice, "interested")
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidStatus { .. }));
    }

    #[test]
    fn incoming_then_accept_scenario() {
        let f = fixture();
        f.service.send_request(f.alice, f.bob, "interested").unwrap();

        let incoming = f.service.list_incoming(f.bob).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].requester.display_name(), "Alice Archer");
        assert_eq!(incoming[0].connection.status, ConnectionStatus::Interested);
        assert!(f.service.list_incoming(f.alice).unwrap().is_empty());

        let reviewed = f.service.review_request(f.bob, f.alice, "ACCEPTED").unwrap();
        assert_eq!(reviewed.connection.id, incoming[0].connection.id);
        assert_eq!(
            f.service.review_request(f.bob, f.alice, "accepted").unwrap_err(),
            ServiceError::NoPendingRequest
        );
    }

    #[test]
    fn concurrent_sends_persist_one_record() {
        let f = fixture();
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [(f.alice, f.bob), (f.alice, f.bob)]
            .into_iter()
            .map(|(actor, target)| {
                let service = f.service.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    service.send_request(actor, target, "interested")
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(ServiceError::RequestAlreadyExists { .. })
        )));
        assert_eq!(f.connections.len(), 1);
    }

    /// Storage that always loses the race: the pre-check sees nothing and
    /// every write collides with another writer.
    struct RacingConnections {
        pending: Option<Connection>,
        winner: Option<ConnectionStatus>,
    }

    impl ConnectionRepository for RacingConnections {
        fn find_by_pair(&self, _: Uuid, _: Uuid) -> Result<Option<Connection>, RepositoryError> {
            Ok(self.pending.clone())
        }

        fn create(
            &self,
            _: Uuid,
            _: Uuid,
            _: ConnectionStatus,
        ) -> Result<Connection, RepositoryError> {
            Err(RepositoryError::DuplicateRelationship { existing: None })
        }

        fn update_status(
            &self,
            id: Uuid,
            _: ConnectionStatus,
        ) -> Result<Connection, RepositoryError> {
            Err(RepositoryError::NotFound(id))
        }

        fn transition_status(
            &self,
            _: Uuid,
            _: ConnectionStatus,
            _: ConnectionStatus,
        ) -> Result<Connection, RepositoryError> {
            Err(RepositoryError::StatusConflict {
                current: self.winner.unwrap_or(ConnectionStatus::Accepted),
            })
        }

        fn list_incoming(&self, _: Uuid) -> Result<Vec<Connection>, RepositoryError> {
            Ok(vec![])
        }
    }

    #[test]
    fn lost_insert_race_is_already_exists() {
        let users = Arc::new(InMemoryUsers::new());
        let alice = users.add("Alice", "Archer");
        let bob = users.add("Bob", "Baker");
        let connections = Arc::new(RacingConnections {
            pending: None,
            winner: None,
        });
        let service = RequestService::new(connections, users);

        assert_eq!(
            service.send_request(alice, bob, "interested").unwrap_err(),
            ServiceError::RequestAlreadyExists { status: None }
        );
    }

    #[test]
    fn lost_review_race_is_no_pending_request() {
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let now = chrono::Utc::now();
        let pending = Connection {
            id: Uuid::new_v4(),
            from_user_id: alice,
            to_user_id: bob,
            status: ConnectionStatus::Interested,
            created_at: now,
            updated_at: now,
        };
        let users = Arc::new(InMemoryUsers::new());
        let connections = Arc::new(RacingConnections {
            pending: Some(pending),
            winner: Some(ConnectionStatus::Rejected),
        });
        let service = RequestService::new(connections, users);

        assert_eq!(
            service.review_request(bob, alice, "accepted").unwrap_err(),
            ServiceError::NoPendingRequest
        );
    }

    #[test]
    fn concurrent_opposite_sends_persist_one_record() {
        let f = fixture();
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [(f.alice, f.bob, "interested"), (f.bob, f.alice, "ignored")]
            .into_iter()
            .map(|(actor, target, status)| {
                let service = f.service.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    service.send_request(actor, target, status)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winner = results.iter().find_map(|r| r.as_ref().ok()).unwrap();
        assert!(results.iter().any(|r| matches!(
            r,
            Err(ServiceError::RequestAlreadyExists { status: Some(status) })
                if *status == winner.connection.status
        )));
        assert_eq!(f.connections.len(), 1);
    }

    #[test]
    fn concurrent_reviews_have_one_winner() {
        let f = fixture();
        f.service.send_request(f.alice, f.bob, "interested").unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = ["accepted", "rejected"]
            .into_iter()
            .map(|decision| {
                let service = f.service.clone();
                let barrier = barrier.clone();
                let (bob, alice) = (f.bob, f.alice);
                thread::spawn(move || {
                    barrier.wait();
                    service.review_request(bob, alice, decision)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(ServiceError::NoPendingRequest))));
    }
}
