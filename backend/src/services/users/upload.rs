use crate::auth::extractor::UserManager;
use crate::error::ApiError;
use crate::ingest::job::{Submitter, Upload};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use common::model::upload::UploadJob;
use common::requests::SubmitResponse;
use futures_util::StreamExt;
use log::info;

/// Accepts the `file` part of a multipart upload and processes it to the end
/// before answering.
pub async fn process(
    UserManager(admin): UserManager,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = read_file_part(payload, state.max_upload_bytes).await?;
    info!(
        "{} uploaded {} ({} bytes)",
        admin.email,
        upload.file_name,
        upload.bytes.len()
    );

    let submitter = Submitter {
        id: admin.id,
        email: admin.email,
    };
    let job = web::block(move || -> Result<UploadJob, ApiError> {
        let store = state.open_store()?;
        Ok(state.ingestor(&store).submit(&upload, &submitter)?)
    })
    .await??;

    info!(
        "Upload {} finished: {}/{} rows accepted",
        job.id, job.valid_count, job.total_rows
    );
    Ok(HttpResponse::Ok().json(SubmitResponse { success: true }))
}

/// Collects the `file` field into memory. Other fields are drained and ignored.
async fn read_file_part(mut payload: Multipart, limit: usize) -> Result<Upload, ApiError> {
    let mut upload: Option<Upload> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::BadRequest(e.to_string()))?;
            if bytes.len() + chunk.len() > limit {
                return Err(ApiError::BadRequest(format!(
                    "File exceeds the {} byte upload limit",
                    limit
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        if name.as_deref() == Some("file") {
            let file_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
                .unwrap_or_default();
            upload = Some(Upload { file_name, bytes });
        }
    }

    upload.ok_or_else(|| ApiError::BadRequest("No file was submitted".to_string()))
}
