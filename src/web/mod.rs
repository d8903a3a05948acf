// src/web/mod.rs

pub mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;

use crate::ai::{GeminiClient, GoogleLanguageClient};
use crate::auth::{AuthFailure, AuthenticatedUser, FirebaseTokenVerifier, OptionalAuth};
use crate::database::SqliteDocumentStore;
use crate::environment::{self, EnvironmentConfig};
use crate::error::{ApiError, ErrorKind};
use crate::types::{AnalysisResult, AnswerAnalysis, CareerPathsResponse, FeedbackReport, Roadmap};
use anyhow::Result;
use rocket::data::{Limits, ToByteUnit};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::form::Form;
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};
use std::sync::Arc;
use tracing::{error, info};

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

#[post("/analyze-resume", data = "<upload>")]
pub async fn analyze_resume(
    upload: Form<ResumeUploadForm<'_>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<AnalysisResult>, ApiError> {
    handlers::analyze_resume_handler(upload, auth, state).await
}

#[post("/career-paths", data = "<request>")]
pub async fn career_paths(
    request: Json<CareerPathsRequest>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<CareerPathsResponse>, ApiError> {
    handlers::career_paths_handler(request, auth, state).await
}

#[post("/roadmap", data = "<request>")]
pub async fn roadmap(
    request: Json<RoadmapRequest>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<Roadmap>, ApiError> {
    handlers::roadmap_handler(request, auth, state).await
}

#[post("/interview/chat", data = "<request>")]
pub async fn interview_chat(
    request: Json<ChatRequest>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<ChatStream, ApiError> {
    handlers::interview_chat_handler(request, auth, state).await
}

#[post("/interview/analyze-answer", data = "<request>")]
pub async fn analyze_answer(
    request: Json<AnalyzeAnswerRequest>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<AnswerAnalysis>, ApiError> {
    handlers::analyze_answer_handler(request, auth, state).await
}

#[post("/interview/feedback", data = "<request>")]
pub async fn interview_feedback(
    request: Json<FeedbackRequest>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<FeedbackReport>, ApiError> {
    handlers::interview_feedback_handler(request, auth, state).await
}

#[post("/profile", data = "<request>")]
pub async fn save_profile(
    request: Option<Json<ProfileRequest>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<TextResponse>, ApiError> {
    handlers::save_profile_handler(request, auth, state).await
}

#[get("/me")]
pub async fn get_current_user(auth: AuthenticatedUser) -> Json<AuthResponse> {
    handlers::get_current_user_handler(auth).await
}

#[get("/health")]
pub async fn health(auth: OptionalAuth) -> Json<TextResponse> {
    handlers::health_handler(auth).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

fn error_body(kind: ErrorKind, message: &str) -> (Status, Json<StandardErrorResponse>) {
    (
        kind.status(),
        Json(StandardErrorResponse::new(
            message.to_string(),
            kind.code().to_string(),
            kind.suggestions(),
        )),
    )
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> (Status, Json<StandardErrorResponse>) {
    error_body(ErrorKind::BadRequest, "Invalid request format")
}

#[rocket::catch(401)]
pub fn unauthorized(req: &Request<'_>) -> (Status, Json<StandardErrorResponse>) {
    let kind = req
        .local_cache(AuthFailure::default)
        .0
        .unwrap_or(ErrorKind::Unauthenticated);
    let error = match kind {
        ErrorKind::SessionExpired => ApiError::SessionExpired,
        _ => ApiError::Unauthenticated,
    };
    error_body(error.kind(), &error.public_message())
}

#[rocket::catch(404)]
pub fn not_found(req: &Request<'_>) -> (Status, Json<StandardErrorResponse>) {
    (
        Status::NotFound,
        Json(StandardErrorResponse::new(
            format!("No route for {} {}", req.method(), req.uri()),
            "NOT_FOUND".to_string(),
            vec!["Check the endpoint path".to_string()],
        )),
    )
}

/// Malformed JSON bodies fail in the data guard with 422; report them as 400.
#[rocket::catch(422)]
pub fn unprocessable_entity() -> (Status, Json<StandardErrorResponse>) {
    error_body(
        ErrorKind::BadRequest,
        "Invalid request body: check field names and types",
    )
}

#[rocket::catch(500)]
pub fn internal_error() -> (Status, Json<StandardErrorResponse>) {
    error_body(ErrorKind::InternalError, "Internal server error")
}

/// Assemble the API with its routes, catchers and CORS fairing.
pub fn build_rocket(state: AppState, config: &ServerConfig) -> Rocket<Build> {
    let limits = Limits::default()
        .limit("file", config.max_upload_mb.mebibytes())
        .limit("data-form", (config.max_upload_mb + 1).mebibytes());

    let figment = rocket::Config::figment()
        .merge(("address", "0.0.0.0"))
        .merge(("port", config.port))
        .merge(("limits", limits));

    rocket::custom(figment)
        .attach(Cors)
        .manage(state)
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                not_found,
                unprocessable_entity,
                internal_error
            ],
        )
        .mount(
            "/api",
            routes![
                analyze_resume,
                career_paths,
                roadmap,
                interview_chat,
                analyze_answer,
                interview_feedback,
                save_profile,
                get_current_user,
                health,
                options,
            ],
        )
}

// Main server start function
pub async fn start_web_server(config: EnvironmentConfig, port: u16) -> Result<()> {
    let verifier = FirebaseTokenVerifier::new(config.firebase_project_id.clone())?;
    if let Err(e) = verifier.update_firebase_keys().await {
        error!("Failed to fetch Firebase keys: {}", e);
        return Err(e);
    }

    let model = GeminiClient::new(
        environment::gemini_api_key()?,
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
        config.request_timeout(),
    )?;
    let language = GoogleLanguageClient::new(
        environment::language_api_key()?,
        config.language_api_url.clone(),
        config.request_timeout(),
    )?;

    let store = match SqliteDocumentStore::open(&config.database_path).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e);
        }
    };

    let state = AppState {
        verifier: Arc::new(verifier),
        model: Arc::new(model),
        language: Arc::new(language),
        store: Arc::new(store),
    };

    info!("Starting CareerTwin API server on port {}", port);
    info!("Firebase project: {}", config.firebase_project_id);
    info!("Database: {}", config.database_path.display());
    info!("Model: {}", config.gemini_model);

    let server_config = ServerConfig {
        port,
        max_upload_mb: config.max_upload_mb,
    };

    build_rocket(state, &server_config)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket server failed: {}", e))?;

    Ok(())
}
