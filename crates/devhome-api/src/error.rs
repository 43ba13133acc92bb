use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use devhome_core::{ServiceError, status::VALID_REVIEW};
use devhome_types::api::ErrorBody;
use thiserror::Error;
use tracing::error;

/// Every failure a handler can return. Rendered as `{error, status?, sentStatus?}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Request(#[from] ServiceError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, body) = match self {
            Self::Request(err) => return request_error(err),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new(msg)),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorBody::new(msg)),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::new(msg)),
            Self::Conflict(msg) => (StatusCode::CONFLICT, ErrorBody::new(msg)),
            Self::Internal(err) => {
                error!("Internal error: {:#}", err);
                internal()
            }
        };
        (code, Json(body)).into_response()
    }
}

fn request_error(err: ServiceError) -> Response {
    let (code, body) = match err {
        ServiceError::InvalidStatus { sent, allowed } => {
            let error = if allowed == VALID_REVIEW.as_slice() {
                "Invalid review status"
            } else {
                "Invalid status"
            };
            (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    sent_status: Some(sent),
                    ..ErrorBody::new(error)
                },
            )
        }
        ServiceError::SelfRelationship => (
            StatusCode::BAD_REQUEST,
            ErrorBody::new("Cannot send request to self"),
        ),
        ServiceError::TargetNotFound(_) => {
            (StatusCode::NOT_FOUND, ErrorBody::new("Target user not found"))
        }
        ServiceError::RequestAlreadyExists { status } => (
            StatusCode::CONFLICT,
            ErrorBody {
                status,
                ..ErrorBody::new("Request already exists")
            },
        ),
        ServiceError::NoPendingRequest => (
            StatusCode::NOT_FOUND,
            ErrorBody::new("No pending request found for this user"),
        ),
        ServiceError::Storage(msg) => {
            error!("Storage failure: {}", msg);
            internal()
        }
    };
    (code, Json(body)).into_response()
}

fn internal() -> (StatusCode, ErrorBody) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorBody::new("Internal server error"),
    )
}
