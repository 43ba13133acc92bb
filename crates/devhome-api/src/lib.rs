pub mod auth;
pub mod error;
pub mod middleware;
pub mod profile;
pub mod requests;
pub mod validation;


use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
};
use devhome_core::RequestService;
use devhome_db::Database;
use tracing::error;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub requests: RequestService,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

impl AppStateInner {
    /// The database backs both the account queries and the connection service.
    pub fn new(db: Arc<Database>, jwt_secret: String, token_ttl: chrono::Duration) -> AppState {
        let requests = RequestService::new(db.clone(), db.clone());
        Arc::new(Self {
            db,
            requests,
            jwt_secret,
            token_ttl,
        })
    }
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(health))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/feed", get(profile::feed))
        .route("/profile/view", get(profile::view))
        .route("/profile/edit", patch(profile::edit))
        .route("/profile/password", post(profile::change_password))
        .route("/request/send/{status}/{user_id}", post(requests::send))
        .route("/request/review/{status}/{user_id}", post(requests::review))
        .route("/user/requests/received", get(requests::incoming))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> &'static str {
    "API is running..."
}

/// Run blocking work (SQLite, password hashing) off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed"))
    })?
}
