use crate::db::access_log::queries;
use crate::rest::error::{RestApiError, RestResult as Res};
use actix_web::post;
use actix_web::web::{Data, Json};
use deadpool_sqlite::Pool;
use serde::Serialize;

#[derive(Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
    pub cleared_count: i64,
}

/// Irreversible: drops every row, resets the id sequence and compacts the
/// database file.
#[post("")]
pub async fn post(pool: Data<Pool>) -> Res<ClearResponse> {
    let cleared_count = queries::delete_all(&pool)
        .await
        .map_err(|e| RestApiError::database(format!("Database error: {e}")))?;
    Ok(Json(ClearResponse {
        success: true,
        message: format!("Cleared {cleared_count} access log records"),
        cleared_count,
    }))
}

// Catches every non-POST method on the clear path
pub async fn method_not_allowed() -> Result<actix_web::HttpResponse, RestApiError> {
    Err(RestApiError::method_not_allowed())
}
