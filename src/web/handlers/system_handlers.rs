// src/web/handlers/system_handlers.rs
use crate::auth::{AuthenticatedUser, OptionalAuth};
use crate::database::profile_path;
use crate::error::ApiError;
use crate::types::UserProfile;
use crate::web::types::*;
use anyhow::Context;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info};

pub async fn get_current_user_handler(auth: AuthenticatedUser) -> Json<AuthResponse> {
    let user = auth.user();

    Json(AuthResponse {
        success: true,
        user: Some(UserInfo {
            uid: user.uid.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            picture: user.picture.clone(),
        }),
        message: "User authenticated successfully".to_string(),
    })
}

/// Create or replace the caller's profile document.
pub async fn save_profile_handler(
    request: Option<Json<ProfileRequest>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<TextResponse>, ApiError> {
    let request = request.map(Json::into_inner).unwrap_or_default();
    let user = auth.user();

    let profile = UserProfile {
        uid: user.uid.clone(),
        email: user.email.clone(),
        name: required_text(request.name.as_ref())
            .map(str::to_string)
            .or_else(|| user.name.clone()),
        created_at: chrono::Utc::now(),
    };
    let body = serde_json::to_value(&profile).context("Failed to serialize profile")?;

    state
        .store
        .set_document(&profile_path(&user.uid), &body)
        .await
        .map_err(|e| {
            error!("Failed to save profile for {}: {:#}", user.uid, e);
            ApiError::PersistenceFailure(e.to_string())
        })?;

    info!("Profile saved for {}", user.uid);
    Ok(Json(TextResponse::success("Profile saved".to_string())))
}

pub async fn health_handler(auth: OptionalAuth) -> Json<TextResponse> {
    match auth.user {
        Some(user) => info!("Health check by authenticated user: {}", user.uid()),
        None => info!("Health check by anonymous user"),
    }
    Json(TextResponse::success("OK".to_string()))
}
