use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Status of a connection between two users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Reserved. Part of the stored enumeration but never produced or consumed by
    /// any operation: not a valid initial status and not reviewable.
    Pending,
    Interested,
    Ignored,
    Accepted,
    Rejected,
}

/// Statuses a connection may be created with.
pub const VALID_INITIAL: [ConnectionStatus; 2] =
    [ConnectionStatus::Interested, ConnectionStatus::Ignored];

/// Statuses a review may move a connection into.
pub const VALID_REVIEW: [ConnectionStatus; 2] =
    [ConnectionStatus::Accepted, ConnectionStatus::Rejected];

impl ConnectionStatus {
    pub const ALL: [ConnectionStatus; 5] = [
        Self::Pending,
        Self::Interested,
        Self::Ignored,
        Self::Accepted,
        Self::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Interested => "interested",
            Self::Ignored => "ignored",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Only `interested` can still be reviewed.
    pub fn can_review(self) -> bool {
        match self {
            Self::Interested => true,
            Self::Pending | Self::Ignored | Self::Accepted | Self::Rejected => false,
        }
    }

    /// `pending` has no outgoing transition either, but it is reserved rather than terminal.
    pub fn is_terminal(self) -> bool {
        match self {
            Self::Ignored | Self::Accepted | Self::Rejected => true,
            Self::Pending | Self::Interested => false,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown connection status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ConnectionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or(UnknownStatus(normalized))
    }
}

/// Illegal transition attempted on an existing connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move connection from {from} to {to}")]
pub struct TransitionError {
    pub from: ConnectionStatus,
    pub to: ConnectionStatus,
}

/// Parse a caller-supplied status for a new connection.
pub fn parse_initial(raw: &str) -> Result<ConnectionStatus, ServiceError> {
    parse_within(raw, &VALID_INITIAL)
}

/// Parse a caller-supplied status for a review.
pub fn parse_review(raw: &str) -> Result<ConnectionStatus, ServiceError> {
    parse_within(raw, &VALID_REVIEW)
}

fn parse_within(
    raw: &str,
    allowed: &'static [ConnectionStatus],
) -> Result<ConnectionStatus, ServiceError> {
    let invalid = || ServiceError::InvalidStatus {
        sent: raw.trim().to_ascii_lowercase(),
        allowed,
    };

    let status: ConnectionStatus = raw.parse().map_err(|_| invalid())?;
    if allowed.contains(&status) {
        Ok(status)
    } else {
        Err(invalid())
    }
}

/// Apply a review decision to the current status.
pub fn review(
    current: ConnectionStatus,
    requested: ConnectionStatus,
) -> Result<ConnectionStatus, TransitionError> {
    let err = TransitionError {
        from: current,
        to: requested,
    };

    match (current, requested) {
        (ConnectionStatus::Interested, ConnectionStatus::Accepted | ConnectionStatus::Rejected) => {
            Ok(requested)
        }
        (
            ConnectionStatus::Interested,
            ConnectionStatus::Pending | ConnectionStatus::Interested | ConnectionStatus::Ignored,
        ) => Err(err),
        (
            ConnectionStatus::Pending
            | ConnectionStatus::Ignored
            | ConnectionStatus::Accepted
            | ConnectionStatus::Rejected,
            _,
        ) => Err(err),
    }
}
