use crate::auth::extractor::UserManager;
use crate::error::ApiError;
use crate::ingest::job;
use crate::state::AppState;
use actix_files::NamedFile;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::upload::UploadJob;

async fn load(state: web::Data<AppState>, id: String) -> Result<UploadJob, ApiError> {
    web::block(move || -> Result<UploadJob, ApiError> {
        let store = state.open_store()?;
        job::find_job(store.conn(), &id)?
            .ok_or_else(|| ApiError::NotFound(format!("Upload {}", id)))
    })
    .await?
}

pub async fn job(
    _manager: UserManager,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let upload = load(state, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(upload))
}

pub async fn error_file(
    _manager: UserManager,
    req: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let upload = load(state.clone(), id.into_inner()).await?;
    let reference = upload
        .error_file
        .ok_or_else(|| ApiError::NotFound(format!("Error file for upload {}", upload.id)))?;

    let path = state.artifacts.resolve(&reference);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| reference.clone());
    let file = NamedFile::open_async(&path)
        .await
        .map_err(|_| ApiError::NotFound(format!("Error file {}", reference)))?
        .set_content_type(actix_web::mime::TEXT_CSV)
        .set_content_disposition(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file_name)],
        });
    Ok(file.into_response(&req))
}
