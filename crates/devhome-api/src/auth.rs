use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use devhome_db::models::{NewUser, UserRow};
use devhome_types::api::{Claims, LoginRequest, LoginResponse, SignupRequest, UserResponse};
use devhome_types::models::User;

use crate::error::ApiError;
use crate::validation::{normalize_email, normalize_gender, validate_signup};
use crate::{AppState, blocking};

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_signup(&req)?;

    let user = blocking(move || {
        let email = normalize_email(&req.email_id);
        if state.db.get_user_by_email(&email)?.is_some() {
            return Err(ApiError::Conflict("Email already registered"));
        }

        let password_hash = hash_password(&req.password)?;
        let gender = req.gender.as_deref().map(normalize_gender).transpose()?;
        let user_id = Uuid::new_v4().to_string();

        let created = state.db.create_user(&NewUser {
            id: &user_id,
            email: &email,
            password_hash: &password_hash,
            first_name: req.first_name.trim(),
            last_name: req.last_name.trim(),
            age: req.age,
            gender: gender.as_deref(),
        })?;
        if !created {
            return Err(ApiError::Conflict("Email already registered"));
        }

        info!(%user_id, "User registered");
        let row = state
            .db
            .get_user_by_id(&user_id)?
            .ok_or_else(|| anyhow::anyhow!("user {user_id} vanished after insert"))?;
        Ok(user_view(row)?)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User registered successfully".to_string(),
            user,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid credentials");

    let (user, token) = blocking(move || {
        let row = state
            .db
            .get_user_by_email(&normalize_email(&req.email_id))?
            .ok_or_else(invalid)?;

        if !verify_password(&req.password, &row.password)? {
            warn!(user_id = %row.id, "Failed login attempt");
            return Err(invalid());
        }

        let user = user_view(row)?;
        let token = create_token(&state.jwt_secret, state.token_ttl, user.id, &user.email_id)?;
        Ok((user, token))
    })
    .await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user,
        token,
    }))
}

pub(crate) fn hash_password(password: &str) -> anyhow::Result<String> {
    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

pub(crate) fn verify_password(password: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| anyhow::anyhow!("corrupt password hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub(crate) fn create_token(
    secret: &str,
    ttl: chrono::Duration,
    user_id: Uuid,
    email: &str,
) -> anyhow::Result<String> {
    let expires = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| anyhow::anyhow!("token lifetime {ttl} overflows"))?;
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: expires.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Convert a stored row to its public form, dropping the password hash.
pub(crate) fn user_view(row: UserRow) -> anyhow::Result<User> {
    Ok(User {
        id: row
            .id
            .parse()
            .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", row.id, e))?,
        first_name: row.first_name,
        last_name: row.last_name,
        email_id: row.email,
        age: row.age,
        gender: row.gender,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| anyhow::anyhow!("corrupt timestamp '{raw}': {e}"))?
        .with_timezone(&Utc))
}
