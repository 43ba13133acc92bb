use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use devhome_core::status::{parse_initial, parse_review};
use devhome_core::{IncomingRequest, ServiceError};
use devhome_types::api::{
    Claims, IncomingRequestsResponse, ReviewRequestResponse, SendRequestResponse,
};

use crate::error::ApiError;
use crate::{AppState, blocking};

/// `POST /request/send/{status}/{user_id}`: express interest in, or ignore, another user.
pub async fn send(
    State(state): State<AppState>,
    Path((status, target)): Path<(String, String)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let target = user_id(&target, || parse_initial(&status))?;
    let sent =
        blocking(move || Ok(state.requests.send_request(claims.sub, target, &status)?)).await?;

    Ok((
        StatusCode::CREATED,
        Json(SendRequestResponse {
            message: sent.message,
            connection: sent.connection,
        }),
    ))
}

/// `POST /request/review/{status}/{user_id}`: accept or reject a request `user_id` sent.
pub async fn review(
    State(state): State<AppState>,
    Path((status, requester)): Path<(String, String)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let requester = user_id(&requester, || parse_review(&status))?;
    let reviewed =
        blocking(move || Ok(state.requests.review_request(claims.sub, requester, &status)?))
            .await?;

    Ok(Json(ReviewRequestResponse {
        message: reviewed.message,
        connection: IncomingRequest {
            connection: reviewed.connection,
            requester: reviewed.requester,
        },
    }))
}

/// `GET /user/requests/received`
pub async fn incoming(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let requests = blocking(move || Ok(state.requests.list_incoming(claims.sub)?)).await?;

    Ok(Json(IncomingRequestsResponse {
        count: requests.len(),
        requests,
    }))
}

/// Parse the `{user_id}` path segment. A bad status still wins over a bad id.
fn user_id<T>(
    raw: &str,
    check_status: impl FnOnce() -> Result<T, ServiceError>,
) -> Result<Uuid, ApiError> {
    match raw.parse() {
        Ok(id) => Ok(id),
        Err(_) => {
            check_status()?;
            Err(ApiError::bad_request("Invalid user id"))
        }
    }
}
