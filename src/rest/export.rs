use crate::db::access_log::queries;
use crate::db::access_log::schema::AccessLog;
use crate::rest::error::RestApiError;
use actix_web::get;
use actix_web::web::Data;
use actix_web::HttpResponse;
use deadpool_sqlite::Pool;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

static FILENAME_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");

// Localized for the dashboard operators, hence the BOM below so
// spreadsheet tools pick up the encoding
const CSV_HEADER: &str = "访问时间,IP地址,User Agent,设备类型,平台,应用版本,设备型号,请求方法,请求URI,国家,城市,ISP,响应时间(ms),状态码";

#[get("export")]
pub async fn get(pool: Data<Pool>) -> Result<HttpResponse, RestApiError> {
    let logs = queries::select_all_newest_first(&pool)
        .await
        .map_err(|e| RestApiError::database(format!("Database error: {e}")))?;

    let mut csv = String::from("\u{feff}");
    csv.push_str(CSV_HEADER);
    csv.push('\n');
    for log in &logs {
        csv.push_str(&row(log));
        csv.push('\n');
    }

    let stamp = OffsetDateTime::now_utc()
        .format(FILENAME_TIME_FORMAT)
        .map_err(|e| RestApiError::internal(e.to_string()))?;
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"access_logs_{stamp}.csv\""),
        ))
        .body(csv))
}

fn row(log: &AccessLog) -> String {
    [
        log.timestamp.as_str(),
        log.ip_address.as_str(),
        log.user_agent.as_str(),
        log.device_type.as_str(),
        log.platform.as_str(),
        log.app_version.as_str(),
        log.device_model.as_str(),
        log.request_method.as_str(),
        log.request_uri.as_str(),
        log.country.as_str(),
        log.city.as_str(),
        log.isp.as_str(),
        &log.response_time.to_string(),
        &log.status_code.to_string(),
    ]
    .map(field)
    .join(",")
}

fn field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

#[cfg(test)]
mod test {
    use crate::db;
    use crate::db::test::pool;
    use crate::test::mock_new_log;
    use crate::Result;
    use actix_web::test::TestRequest;
    use actix_web::web::{scope, Data};
    use actix_web::{test, App};

    #[actix_web::test]
    async fn fields_with_separators_are_quoted() {
        assert_eq!("plain", super::field("plain"));
        assert_eq!("\"a,b\"", super::field("a,b"));
        assert_eq!("\"say \"\"hi\"\"\"", super::field("say \"hi\""));
    }

    #[actix_web::test]
    async fn export_streams_all_rows_newest_first() -> Result<()> {
        let pool = pool();
        let mut new = mock_new_log();
        new.user_agent = "curl/8.0, definitely".into();
        db::access_log::queries::insert(new, &pool).await?;
        db::access_log::queries::insert(mock_new_log(), &pool).await?;

        let app = test::init_service(
            App::new()
                .app_data(Data::new(pool))
                .service(scope("/logs").service(super::get)),
        )
        .await;
        let req = TestRequest::get().uri("/logs/export").to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.status().is_success());
        let disposition = res
            .headers()
            .get("Content-Disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned();
        assert!(disposition.starts_with("attachment; filename=\"access_logs_"));

        let body = test::read_body(res).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with('\u{feff}'));
        // header + two data rows
        assert_eq!(3, text.trim_end().lines().count());
        assert!(text.contains("\"curl/8.0, definitely\""));
        Ok(())
    }
}
