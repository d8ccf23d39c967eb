use super::schema::{self, Columns};
use crate::Result;
use rusqlite::Connection;

pub fn migrate(conn: &Connection) -> Result<()> {
    v0_to_v1(conn)
}

pub fn v0_to_v1(conn: &Connection) -> Result<()> {
    let schema_ver: i16 =
        conn.query_row("SELECT user_version FROM pragma_user_version", [], |row| {
            row.get(0)
        })?;

    if schema_ver != 0 {
        return Ok(());
    }

    // AUTOINCREMENT keeps assigned ids strictly increasing and gives us a
    // sqlite_sequence row to reset when the table is cleared.
    let query = format!(
        r#"
            CREATE TABLE IF NOT EXISTS {table} (
                {col_id} INTEGER PRIMARY KEY AUTOINCREMENT,
                {col_timestamp} TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ')),
                {col_ip_address} TEXT NOT NULL DEFAULT 'Unknown',
                {col_user_agent} TEXT NOT NULL DEFAULT 'Unknown',
                {col_device_type} TEXT NOT NULL DEFAULT 'Unknown',
                {col_platform} TEXT NOT NULL DEFAULT 'Unknown',
                {col_app_version} TEXT NOT NULL DEFAULT 'Unknown',
                {col_device_model} TEXT NOT NULL DEFAULT 'Unknown',
                {col_request_method} TEXT NOT NULL DEFAULT 'Unknown',
                {col_request_uri} TEXT NOT NULL DEFAULT 'Unknown',
                {col_country} TEXT NOT NULL DEFAULT 'Unknown',
                {col_city} TEXT NOT NULL DEFAULT 'Unknown',
                {col_isp} TEXT NOT NULL DEFAULT 'Unknown',
                {col_response_time} INTEGER NOT NULL DEFAULT 0,
                {col_status_code} INTEGER NOT NULL DEFAULT 200,
                {col_request_headers} TEXT NOT NULL DEFAULT '{{}}',
                {col_additional_info} TEXT NOT NULL DEFAULT '{{}}'
            ) STRICT;
        "#,
        table = schema::TABLE_NAME,
        col_id = Columns::Id.as_str(),
        col_timestamp = Columns::Timestamp.as_str(),
        col_ip_address = Columns::IpAddress.as_str(),
        col_user_agent = Columns::UserAgent.as_str(),
        col_device_type = Columns::DeviceType.as_str(),
        col_platform = Columns::Platform.as_str(),
        col_app_version = Columns::AppVersion.as_str(),
        col_device_model = Columns::DeviceModel.as_str(),
        col_request_method = Columns::RequestMethod.as_str(),
        col_request_uri = Columns::RequestUri.as_str(),
        col_country = Columns::Country.as_str(),
        col_city = Columns::City.as_str(),
        col_isp = Columns::Isp.as_str(),
        col_response_time = Columns::ResponseTime.as_str(),
        col_status_code = Columns::StatusCode.as_str(),
        col_request_headers = Columns::RequestHeaders.as_str(),
        col_additional_info = Columns::AdditionalInfo.as_str(),
    );
    conn.execute_batch(&query)?;
    conn.pragma_update(None, "user_version", 1)?;
    Ok(())
}
