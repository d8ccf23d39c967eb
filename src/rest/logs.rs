use crate::db::access_log::queries;
use crate::db::access_log::schema::{AccessLog, CountryCount, DeviceTypeCount, HourlyCount};
use crate::rest::error::{RestApiError, RestResult as Res};
use crate::service::user_agent::{self, ParsedUserAgent};
use actix_web::get;
use actix_web::web::{Data, Json, Query};
use deadpool_sqlite::Pool;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const DEFAULT_LIMIT: i64 = 100;
const TOP_COUNTRIES: i64 = 10;

static DISPLAY_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Deserialize)]
pub struct GetArgs {
    limit: Option<i64>,
    offset: Option<i64>,
    order: Option<String>,
}

#[derive(Serialize)]
pub struct GetResponse {
    pub success: bool,
    pub stats: Stats,
    pub logs: Vec<LogEntry>,
    pub trends: Trends,
    pub pagination: Pagination,
}

#[derive(Serialize)]
pub struct Stats {
    pub total: i64,
    pub today: i64,
    pub unique_ips: i64,
    pub avg_response_time: i64,
}

#[derive(Serialize)]
pub struct Trends {
    pub hourly: Vec<HourlyCount>,
    pub devices: Vec<DeviceTypeCount>,
    pub locations: Vec<CountryCount>,
}

#[derive(Serialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
}

/// One stored row plus the read-side derivations the dashboard wants.
#[derive(Serialize)]
pub struct LogEntry {
    #[serde(flatten)]
    pub log: AccessLog,
    pub parsed_ua: ParsedUserAgent,
    pub formatted_time: String,
    pub headers: Option<Value>,
}

impl From<AccessLog> for LogEntry {
    fn from(log: AccessLog) -> Self {
        let parsed_ua = user_agent::parse(&log.user_agent);
        let formatted_time = format_timestamp(&log.timestamp);
        let headers = serde_json::from_str(&log.request_headers).ok();
        LogEntry {
            log,
            parsed_ua,
            formatted_time,
            headers,
        }
    }
}

#[get("")]
pub async fn get(args: Query<GetArgs>, pool: Data<Pool>) -> Res<GetResponse> {
    let limit = args.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = args.offset.unwrap_or(0);
    let ascending = args.order.as_deref() == Some("asc");

    let stats = Stats {
        total: queries::count_total(&pool).await.map_err(db_error)?,
        today: queries::count_today(&pool).await.map_err(db_error)?,
        unique_ips: queries::count_distinct_ips(&pool).await.map_err(db_error)?,
        avg_response_time: queries::avg_response_time(&pool).await.map_err(db_error)?,
    };
    let logs = queries::select_page(limit, offset, ascending, &pool)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(LogEntry::from)
        .collect();
    let trends = Trends {
        hourly: queries::hourly_trend(&pool).await.map_err(db_error)?,
        devices: queries::count_by_device_type(&pool)
            .await
            .map_err(db_error)?,
        locations: queries::top_countries(TOP_COUNTRIES, &pool)
            .await
            .map_err(db_error)?,
    };

    let pagination = Pagination {
        limit,
        offset,
        total: stats.total,
    };

    Ok(Json(GetResponse {
        success: true,
        stats,
        logs,
        trends,
        pagination,
    }))
}

fn db_error(e: crate::Error) -> RestApiError {
    RestApiError::database(format!("Database error: {e}"))
}

fn format_timestamp(raw: &str) -> String {
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .and_then(|date| date.format(DISPLAY_TIME_FORMAT).ok())
        .unwrap_or_else(|| raw.to_owned())
}
