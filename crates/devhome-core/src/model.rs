use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::status::ConnectionStatus;

/// A relationship record between two users. `from_user_id` is the original requester;
/// uniqueness is over the unordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canonical, order-independent key for two distinct users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserPair {
    low: Uuid,
    high: Uuid,
}

impl UserPair {
    pub fn new(a: Uuid, b: Uuid) -> Result<Self, RepositoryError> {
        if a == b {
            return Err(RepositoryError::SelfRelationship);
        }
        Ok(Self {
            low: a.min(b),
            high: a.max(b),
        })
    }

    pub fn low(&self) -> Uuid {
        self.low
    }

    pub fn high(&self) -> Uuid {
        self.high
    }
}

/// Display attributes of a user, as supplied by the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

impl UserSummary {
    pub fn display_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

/// An incoming connection enriched with the requester's display attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingRequest {
    #[serde(flatten)]
    pub connection: Connection,
    pub requester: UserSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(UserPair::new(a, b).unwrap(), UserPair::new(b, a).unwrap());
    }

    #[test]
    fn pair_rejects_self() {
        let a = Uuid::new_v4();
        assert_eq!(UserPair::new(a, a), Err(RepositoryError::SelfRelationship));
    }

    #[test]
    fn display_name_skips_missing_last_name() {
        let user = UserSummary {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: String::new(),
        };
        assert_eq!(user.display_name(), "Ada");
    }
}
