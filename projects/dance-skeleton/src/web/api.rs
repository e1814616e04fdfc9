use crate::error::{ApiError, PipelineError};
use crate::pipeline::detection::lock_detector;
use crate::pipeline::types::ProcessingResult;
use crate::run_context::{JobContext, OutputFile, TempFile};
use crate::video::processor::process_video;
use crate::web::server::AppState;
use axum::{
    extract::{multipart::Field, Multipart, State},
    Json,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

#[derive(Serialize, Debug)]
pub struct ProcessResponse {
    pub output_path: String,
    pub info: ProcessingResult,
}

/// `{"status": "healthy", "<detector>_available": bool}`
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut body = serde_json::Map::new();
    body.insert("status".to_string(), "healthy".into());
    body.insert(
        format!("{}_available", state.detector.name()),
        state.detector.is_available().into(),
    );
    Json(serde_json::Value::Object(body))
}

/// Accepts a multipart upload in the `file` field and returns the side-by-side video path.
pub async fn process_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        return process_upload(&state, field).await.map(Json);
    }
    Err(ApiError::MissingFile)
}

async fn process_upload(state: &AppState, field: Field<'_>) -> Result<ProcessResponse, ApiError> {
    let content_type = field.content_type().unwrap_or_default().to_string();
    if !content_type.starts_with("video/") {
        return Err(ApiError::UploadValidation(content_type));
    }

    let detector = state.detector.shared()?;

    let job = JobContext::new(
        Path::new(&state.args.upload_dir),
        Path::new(&state.args.processed_dir),
        field.file_name(),
    );
    tracing::info!(
        "Job {}: receiving {:?} ({})",
        job.job_id,
        field.file_name().unwrap_or("upload"),
        content_type
    );

    let input = TempFile::new(job.input_path.clone());
    save_upload(field, input.path()).await?;

    let output = OutputFile::new(job.output_path.clone());
    let codec = state.args.codec;
    let job_id = job.job_id.clone();

    // Guards move with the work so cleanup happens when processing really ends
    let info = tokio::task::spawn_blocking(move || {
        let mut guard = lock_detector(&detector);
        let result = process_video(
            &input.path().to_string_lossy(),
            &output.path().to_string_lossy(),
            codec,
            &mut **guard,
        );
        drop(input);
        if result.is_ok() {
            output.keep();
        }
        result
    })
    .await
    .map_err(PipelineError::processing)??;

    tracing::info!(
        "Job {}: done, {} frames ({} with a pose)",
        job_id,
        info.frame_count,
        info.processed_frame_count
    );

    Ok(ProcessResponse {
        output_path: job.public_output_path(),
        info,
    })
}

async fn save_upload(mut field: Field<'_>, path: &Path) -> Result<(), ApiError> {
    let upload_err = |e: std::io::Error| ApiError::Upload(e.to_string());

    let mut file = tokio::fs::File::create(path).await.map_err(upload_err)?;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await.map_err(upload_err)?;
    }
    file.flush().await.map_err(upload_err)?;
    Ok(())
}
