use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;

use super::auth::stored_password;
use super::error::ApiError;
use super::validation::{check_registration, parse_json_body, EMAIL_TAKEN};
use super::MessageResponse;
use crate::db::{DbError, User};
use crate::AppState;

/// Register a new user
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let data = parse_json_body(&body)?;
    let (request, mut errors) = check_registration(&data)?;
    if !request.email.is_empty() && User::email_exists(&state.db, &request.email).await? {
        errors.add("email", EMAIL_TAKEN);
    }
    errors.finish()?;

    let password = stored_password(&request.password, state.config.auth.hash_passwords)
        .map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            ApiError::internal("Failed to store credentials")
        })?;

    match User::create(&state.db, &request.name, &request.email, &password).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, "User registered: {}", user.email);
            Ok(Json(MessageResponse::new("User registered")))
        }
        // Lost a race with a concurrent registration of the same email
        Err(DbError::Conflict(_)) => Err(ApiError::validation_field("email", EMAIL_TAKEN)),
        Err(e) => Err(e.into()),
    }
}
