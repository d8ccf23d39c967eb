use super::schema::{self, AccessLog, Columns, CountryCount, DeviceTypeCount, HourlyCount, NewAccessLog};
use crate::Result;
use rusqlite::{named_params, params, Connection};

pub fn insert(new: &NewAccessLog, conn: &Connection) -> Result<AccessLog> {
    let sql = format!(
        r#"
            INSERT INTO {table} (
                {ip_address},
                {user_agent},
                {device_type},
                {platform},
                {app_version},
                {device_model},
                {request_method},
                {request_uri},
                {country},
                {city},
                {isp},
                {response_time},
                {status_code},
                {request_headers},
                {additional_info}
            ) VALUES (
                :ip_address,
                :user_agent,
                :device_type,
                :platform,
                :app_version,
                :device_model,
                :request_method,
                :request_uri,
                :country,
                :city,
                :isp,
                :response_time,
                :status_code,
                :request_headers,
                :additional_info
            )
            RETURNING {projection}
        "#,
        table = schema::TABLE_NAME,
        ip_address = Columns::IpAddress.as_str(),
        user_agent = Columns::UserAgent.as_str(),
        device_type = Columns::DeviceType.as_str(),
        platform = Columns::Platform.as_str(),
        app_version = Columns::AppVersion.as_str(),
        device_model = Columns::DeviceModel.as_str(),
        request_method = Columns::RequestMethod.as_str(),
        request_uri = Columns::RequestUri.as_str(),
        country = Columns::Country.as_str(),
        city = Columns::City.as_str(),
        isp = Columns::Isp.as_str(),
        response_time = Columns::ResponseTime.as_str(),
        status_code = Columns::StatusCode.as_str(),
        request_headers = Columns::RequestHeaders.as_str(),
        additional_info = Columns::AdditionalInfo.as_str(),
        projection = AccessLog::projection(),
    );
    let params = named_params! {
        ":ip_address": new.ip_address,
        ":user_agent": new.user_agent,
        ":device_type": new.device_type,
        ":platform": new.platform,
        ":app_version": new.app_version,
        ":device_model": new.device_model,
        ":request_method": new.request_method,
        ":request_uri": new.request_uri,
        ":country": new.country,
        ":city": new.city,
        ":isp": new.isp,
        ":response_time": new.response_time,
        ":status_code": new.status_code,
        ":request_headers": new.request_headers,
        ":additional_info": new.additional_info,
    };
    conn.query_row(&sql, params, AccessLog::mapper())
        .map_err(Into::into)
}

pub fn select_page(
    limit: i64,
    offset: i64,
    ascending: bool,
    conn: &Connection,
) -> Result<Vec<AccessLog>> {
    let order = if ascending { "ASC" } else { "DESC" };
    let sql = format!(
        r#"
            SELECT {projection}
            FROM {table}
            ORDER BY {timestamp} {order}, {id} {order}
            LIMIT :limit OFFSET :offset
        "#,
        projection = AccessLog::projection(),
        table = schema::TABLE_NAME,
        timestamp = Columns::Timestamp.as_str(),
        id = Columns::Id.as_str(),
    );
    conn.prepare(&sql)?
        .query_map(
            named_params! { ":limit": limit, ":offset": offset },
            AccessLog::mapper(),
        )?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

pub fn select_all_newest_first(conn: &Connection) -> Result<Vec<AccessLog>> {
    let sql = format!(
        r#"
            SELECT {projection}
            FROM {table}
            ORDER BY {timestamp} DESC, {id} DESC
        "#,
        projection = AccessLog::projection(),
        table = schema::TABLE_NAME,
        timestamp = Columns::Timestamp.as_str(),
        id = Columns::Id.as_str(),
    );
    conn.prepare(&sql)?
        .query_map([], AccessLog::mapper())?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

pub fn count_total(conn: &Connection) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", schema::TABLE_NAME);
    conn.query_row(&sql, [], |row| row.get(0)).map_err(Into::into)
}

pub fn count_today(conn: &Connection) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {table} WHERE DATE({timestamp}) = DATE('now')",
        table = schema::TABLE_NAME,
        timestamp = Columns::Timestamp.as_str(),
    );
    conn.query_row(&sql, [], |row| row.get(0)).map_err(Into::into)
}

pub fn count_distinct_ips(conn: &Connection) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(DISTINCT {ip_address}) FROM {table}",
        ip_address = Columns::IpAddress.as_str(),
        table = schema::TABLE_NAME,
    );
    conn.query_row(&sql, [], |row| row.get(0)).map_err(Into::into)
}

/// Average over rows that actually measured something, zero when there are
/// no such rows.
pub fn avg_response_time(conn: &Connection) -> Result<i64> {
    let sql = format!(
        "SELECT COALESCE(CAST(ROUND(AVG({response_time})) AS INTEGER), 0) FROM {table} WHERE {response_time} > 0",
        response_time = Columns::ResponseTime.as_str(),
        table = schema::TABLE_NAME,
    );
    conn.query_row(&sql, [], |row| row.get(0)).map_err(Into::into)
}

pub fn hourly_trend(conn: &Connection) -> Result<Vec<HourlyCount>> {
    // The cutoff must be rendered in the stored timestamp format, the
    // comparison below is textual.
    let sql = format!(
        r#"
            SELECT strftime('%H', {timestamp}) AS hour, COUNT(*) AS count
            FROM {table}
            WHERE {timestamp} >= strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-24 hours')
            GROUP BY strftime('%H', {timestamp})
            ORDER BY hour
        "#,
        timestamp = Columns::Timestamp.as_str(),
        table = schema::TABLE_NAME,
    );
    conn.prepare(&sql)?
        .query_map([], |row| {
            Ok(HourlyCount {
                hour: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

pub fn count_by_device_type(conn: &Connection) -> Result<Vec<DeviceTypeCount>> {
    let sql = format!(
        r#"
            SELECT {device_type}, COUNT(*) AS count
            FROM {table}
            GROUP BY {device_type}
            ORDER BY count DESC
        "#,
        device_type = Columns::DeviceType.as_str(),
        table = schema::TABLE_NAME,
    );
    conn.prepare(&sql)?
        .query_map([], |row| {
            Ok(DeviceTypeCount {
                device_type: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

pub fn top_countries(limit: i64, conn: &Connection) -> Result<Vec<CountryCount>> {
    let sql = format!(
        r#"
            SELECT {country}, COUNT(*) AS count
            FROM {table}
            GROUP BY {country}
            ORDER BY count DESC
            LIMIT ?1
        "#,
        country = Columns::Country.as_str(),
        table = schema::TABLE_NAME,
    );
    conn.prepare(&sql)?
        .query_map(params![limit], |row| {
            Ok(CountryCount {
                country: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

/// Deletes every row, resets the id sequence so the next insert gets id 1
/// and compacts the file. Returns the number of rows removed.
pub fn delete_all(conn: &Connection) -> Result<i64> {
    let cleared = count_total(conn)?;
    conn.execute(&format!("DELETE FROM {}", schema::TABLE_NAME), [])?;
    conn.execute(
        "DELETE FROM sqlite_sequence WHERE name = ?1",
        params![schema::TABLE_NAME],
    )?;
    conn.execute_batch("VACUUM")?;
    Ok(cleared)
}
