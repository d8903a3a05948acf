// src/web/handlers/career_handlers.rs
use crate::ai::{self, prompts};
use crate::auth::AuthenticatedUser;
use crate::database::roadmap_path;
use crate::error::ApiError;
use crate::types::{CareerPathsResponse, Roadmap, StoredRoadmap};
use crate::web::types::*;
use anyhow::Context;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info};

pub async fn career_paths_handler(
    request: Json<CareerPathsRequest>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<CareerPathsResponse>, ApiError> {
    let request = request.into_inner();
    let (strengths, gaps) = match (request.strengths, request.gaps) {
        (Some(strengths), Some(gaps)) => (strengths, gaps),
        _ => return Err(ApiError::bad_request("Strengths and gaps are required.")),
    };

    info!(
        "Career paths requested by {} ({} strengths, {} gaps)",
        auth.uid(),
        strengths.len(),
        gaps.len()
    );

    let prompt = prompts::career_paths_prompt(&strengths, &gaps);
    let response: CareerPathsResponse =
        ai::generate_validated(state.model.as_ref(), &prompt).await?;

    info!(
        "Generated {} career paths for {}",
        response.career_paths.len(),
        auth.uid()
    );
    Ok(Json(response))
}

pub async fn roadmap_handler(
    request: Json<RoadmapRequest>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<Roadmap>, ApiError> {
    let request = request.into_inner();
    let career_title = required_text(request.career_title.as_ref())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("Career title, strengths, and gaps are required."))?;
    let (strengths, gaps) = match (request.strengths, request.gaps) {
        (Some(strengths), Some(gaps)) => (strengths, gaps),
        _ => {
            return Err(ApiError::bad_request(
                "Career title, strengths, and gaps are required.",
            ))
        }
    };

    let roadmap = generate_roadmap(state, auth.uid(), &career_title, &strengths, &gaps).await?;
    Ok(Json(roadmap))
}

/// Generate a roadmap and store it under the career title, replacing any
/// earlier roadmap for the same title.
pub async fn generate_roadmap(
    state: &AppState,
    uid: &str,
    career_title: &str,
    strengths: &[String],
    gaps: &[String],
) -> Result<Roadmap, ApiError> {
    info!("Roadmap requested by {} for \"{}\"", uid, career_title);

    let prompt = prompts::roadmap_prompt(career_title, strengths, gaps);
    let roadmap: Roadmap = ai::generate_validated(state.model.as_ref(), &prompt).await?;

    let stored = StoredRoadmap {
        roadmap: roadmap.clone(),
        created_at: chrono::Utc::now(),
    };
    let body = serde_json::to_value(&stored).context("Failed to serialize roadmap")?;

    state
        .store
        .set_document(&roadmap_path(uid, career_title), &body)
        .await
        .map_err(|e| {
            error!("Failed to persist roadmap for {}: {:#}", uid, e);
            ApiError::PersistenceFailure(e.to_string())
        })?;

    info!(
        "Roadmap with {} sections stored for {}",
        roadmap.roadmap.len(),
        uid
    );
    Ok(roadmap)
}
