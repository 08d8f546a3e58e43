use crate::auth::extractor::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::model::user::UserSummary;
use common::requests::UserQuery;

pub async fn process(
    _user: AuthenticatedUser,
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let users = web::block(move || -> Result<Vec<UserSummary>, ApiError> {
        let store = state.open_store()?;
        Ok(store.list_users(&query)?)
    })
    .await??;
    Ok(HttpResponse::Ok().json(users))
}
