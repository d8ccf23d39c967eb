use crate::db;
use crate::db::access_log::schema::NewAccessLog;
use crate::rest::error::RestApiError;
use crate::service::client_info;
use crate::service::geo::GeoResolver;
use crate::service::manifest::{self, ManifestConf};
use crate::Error;
use actix_web::http::Method;
use actix_web::route;
use actix_web::web::Data;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use deadpool_sqlite::Pool;
use serde_json::json;
use std::time::Instant;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

static PRECISE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]");

/// The ingestion pipeline: extract client identity, enrich with
/// geolocation, persist one row, then answer with the version manifest
/// plus bookkeeping fields.
#[route(
    "/",
    method = "GET",
    method = "POST",
    method = "PUT",
    method = "DELETE",
    method = "PATCH",
    method = "HEAD",
    method = "OPTIONS"
)]
pub async fn handle(
    req: HttpRequest,
    pool: Data<Pool>,
    resolver: Data<GeoResolver>,
    conf: Data<ManifestConf>,
) -> Result<HttpResponse, RestApiError> {
    // CORS preflights aren't visits, answer them without logging
    if req.method() == Method::OPTIONS {
        return Ok(HttpResponse::NoContent().finish());
    }

    let started_at = Instant::now();
    let info = client_info::extract(&req);
    let geo = resolver.resolve(&info.ip_address).await;
    let response_time = started_at.elapsed().as_millis() as i64;

    let new = NewAccessLog {
        ip_address: info.ip_address,
        user_agent: info.user_agent,
        device_type: info.device_type,
        platform: info.platform,
        app_version: info.app_version,
        device_model: info.device_model,
        request_method: info.request_method,
        request_uri: info.request_uri,
        country: geo.country,
        city: geo.city,
        isp: geo.isp,
        response_time,
        // Logged before the manifest is consulted, so the stored code
        // stays 200 even when the tail of this handler answers 404/500
        status_code: 200,
        request_headers: info.request_headers,
        additional_info: json!({ "timestamp": precise_now()? }).to_string(),
    };
    let log = db::access_log::queries::insert(new, &pool)
        .await
        .map_err(|e| RestApiError::database(format!("Failed to log access: {e}")))?;

    // The log row above stays written no matter how manifest loading goes
    let mut manifest = match manifest::load(&conf.path) {
        Ok(Some(manifest)) => manifest,
        Ok(None) => return Err(RestApiError::not_found("Version file not found")),
        Err(Error::SerdeJson(_)) => {
            return Err(RestApiError::internal("Invalid version file format"))
        }
        Err(e) => return Err(RestApiError::internal(e.to_string())),
    };
    manifest.insert("_access_log_id".into(), json!(log.id));
    manifest.insert("_server_time".into(), json!(precise_now()?));
    manifest.insert("_response_time_ms".into(), json!(log.response_time));

    let body = serde_json::to_string_pretty(&manifest)
        .map_err(|e| RestApiError::internal(e.to_string()))?;
    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

fn precise_now() -> Result<String, RestApiError> {
    OffsetDateTime::now_utc()
        .format(PRECISE_TIME_FORMAT)
        .map_err(|e| RestApiError::internal(e.to_string()))
}
