use devhome_core::{Connection, ConnectionStatus, IncomingRequest};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::User;

// -- JWT Claims --

/// Claims carried by the bearer token issued at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email_id: String,
    pub password: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub email_id: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: User,
    pub token: String,
}

// -- Profile --

/// Fields a user may change on their own profile.
pub const EDITABLE_PROFILE_FIELDS: [&str; 4] = ["firstName", "lastName", "age", "gender"];

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// -- Connection requests --

#[derive(Debug, Serialize)]
pub struct SendRequestResponse {
    pub message: String,
    pub connection: Connection,
}

/// The reviewed connection is returned with the requester's display attributes.
#[derive(Debug, Serialize)]
pub struct ReviewRequestResponse {
    pub message: String,
    pub connection: IncomingRequest,
}

#[derive(Debug, Serialize)]
pub struct IncomingRequestsResponse {
    pub count: usize,
    pub requests: Vec<IncomingRequest>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    /// Status of the relationship that blocked the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ConnectionStatus>,
    /// The rejected status value as the caller sent it, normalized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_status: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: None,
            sent_status: None,
        }
    }
}
