// src/utils.rs
use anyhow::{Context, Result};

const JOB_DESCRIPTION_PREVIEW_CHARS: usize = 150;

/// Get file extension in lowercase
pub fn get_file_extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Validate file extension against allowed types
pub fn validate_file_extension(filename: &str, allowed: &[&str]) -> Result<()> {
    let ext = get_file_extension(filename)
        .ok_or_else(|| anyhow::anyhow!("File has no extension: {}", filename))?;

    if !allowed.contains(&ext.as_str()) {
        anyhow::bail!(
            "Unsupported file extension: {}. Allowed: {:?}",
            ext,
            allowed
        );
    }

    Ok(())
}

/// Extract the plain text of a PDF document.
///
/// Runs on the blocking pool; the parser is CPU bound and may panic on
/// malformed input, which is reported as an error here.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .context("PDF parser aborted")?
        .context("Could not read PDF")?;

    let text = text.trim().to_string();
    if text.is_empty() {
        anyhow::bail!("PDF contains no extractable text");
    }
    Ok(text)
}

/// Short preview stored alongside an analysis.
pub fn summarize_job_description(job_description: &str) -> String {
    let preview: String = job_description
        .chars()
        .take(JOB_DESCRIPTION_PREVIEW_CHARS)
        .collect();
    format!("{}...", preview)
}
