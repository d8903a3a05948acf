// src/web/handlers/analysis_handlers.rs
use crate::ai::{self, prompts};
use crate::auth::AuthenticatedUser;
use crate::database::analysis_path;
use crate::error::ApiError;
use crate::types::{AnalysisResult, StoredAnalysis};
use crate::utils::{extract_pdf_text, summarize_job_description};
use crate::web::types::*;
use anyhow::Context;
use rocket::form::Form;
use rocket::fs::{FileName, TempFile};
use rocket::serde::json::Json;
use rocket::State;
use tokio::io::AsyncReadExt;
use tracing::{error, info, warn};

pub async fn analyze_resume_handler(
    upload: Form<ResumeUploadForm<'_>>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let (file, job_description) = match (
        upload.resume_file.as_ref(),
        required_text(upload.job_description_text.as_ref()),
    ) {
        (Some(file), Some(job_description)) => (file, job_description),
        _ => {
            warn!("analyze-resume by {} missing file or job description", auth.uid());
            return Err(ApiError::bad_request(
                "Resume file and job description are required.",
            ));
        }
    };

    let file_name = stored_file_name(file.raw_name());

    info!(
        "Resume analysis requested by {} (file: {}, {} bytes)",
        auth.uid(),
        file_name,
        file.len()
    );

    let bytes = read_upload(file).await?;
    let resume_text = extract_pdf_text(bytes).await.map_err(|e| {
        warn!("PDF extraction failed for {}: {:#}", auth.uid(), e);
        ApiError::bad_request("Could not extract text from the provided PDF.")
    })?;

    let result =
        analyze_resume_text(state, auth.uid(), &file_name, &resume_text, job_description).await?;
    Ok(Json(result))
}

/// Name recorded with the analysis: the upload's name as the browser sent it.
///
/// Only stored and echoed back, never used to touch the filesystem.
fn stored_file_name(name: Option<&FileName>) -> String {
    name.map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "resume.pdf".to_string())
}

async fn read_upload(file: &TempFile<'_>) -> Result<Vec<u8>, ApiError> {
    let reader = file.open().await.context("Failed to open uploaded file")?;
    let mut reader = Box::pin(reader);
    let mut bytes = Vec::with_capacity(file.len() as usize);
    reader
        .read_to_end(&mut bytes)
        .await
        .context("Failed to read uploaded file")?;
    Ok(bytes)
}

/// Analyze extracted resume text and persist the validated result.
///
/// Nothing is written unless the model output passed validation.
pub async fn analyze_resume_text(
    state: &AppState,
    uid: &str,
    file_name: &str,
    resume_text: &str,
    job_description: &str,
) -> Result<AnalysisResult, ApiError> {
    let prompt = prompts::analysis_prompt(job_description, resume_text);
    let result: AnalysisResult = ai::generate_validated(state.model.as_ref(), &prompt).await?;

    let created_at = chrono::Utc::now();
    let stored = StoredAnalysis {
        job_description: summarize_job_description(job_description),
        file_name: file_name.to_string(),
        result: result.clone(),
        created_at,
    };
    let body = serde_json::to_value(&stored).context("Failed to serialize analysis")?;

    state
        .store
        .set_document(&analysis_path(uid, created_at), &body)
        .await
        .map_err(|e| {
            error!("Failed to persist analysis for {}: {:#}", uid, e);
            ApiError::PersistenceFailure(e.to_string())
        })?;

    info!("Analysis stored for {} (ATS score {})", uid, result.ats_score);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_file_name_keeps_upload_name() {
        assert_eq!(stored_file_name(Some(FileName::new("CV (final).pdf"))), "CV (final).pdf");
        assert_eq!(stored_file_name(Some(FileName::new("résumé 2025.pdf"))), "résumé 2025.pdf");
        assert_eq!(stored_file_name(Some(FileName::new("  "))), "resume.pdf");
        assert_eq!(stored_file_name(None), "resume.pdf");
    }
}
