use crate::auth;
use crate::error::ApiError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::requests::{TokenRequest, TokenResponse};
use log::info;

pub async fn process(
    state: web::Data<AppState>,
    payload: web::Json<TokenRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = payload.into_inner();
    let response = web::block(move || -> Result<TokenResponse, ApiError> {
        let store = state.open_store()?;
        auth::login(
            &store,
            &state.hasher,
            &state.tokens,
            &request.email,
            &request.password,
        )
    })
    .await??;

    info!("Issued {} token", response.role);
    Ok(HttpResponse::Ok().json(response))
}
