use serde::Serialize;

pub const TABLE_NAME: &str = "access_logs";

pub enum Columns {
    Id,
    Timestamp,
    IpAddress,
    UserAgent,
    DeviceType,
    Platform,
    AppVersion,
    DeviceModel,
    RequestMethod,
    RequestUri,
    Country,
    City,
    Isp,
    ResponseTime,
    StatusCode,
    RequestHeaders,
    AdditionalInfo,
}

impl Columns {
    pub fn as_str(&self) -> &'static str {
        match self {
            Columns::Id => "id",
            Columns::Timestamp => "timestamp",
            Columns::IpAddress => "ip_address",
            Columns::UserAgent => "user_agent",
            Columns::DeviceType => "device_type",
            Columns::Platform => "platform",
            Columns::AppVersion => "app_version",
            Columns::DeviceModel => "device_model",
            Columns::RequestMethod => "request_method",
            Columns::RequestUri => "request_uri",
            Columns::Country => "country",
            Columns::City => "city",
            Columns::Isp => "isp",
            Columns::ResponseTime => "response_time",
            Columns::StatusCode => "status_code",
            Columns::RequestHeaders => "request_headers",
            Columns::AdditionalInfo => "additional_info",
        }
    }
}

/// One row per ingested request. The timestamp is kept as the text the
/// database assigned (`strftime('%Y-%m-%dT%H:%M:%fZ')`), parsing it back
/// into a date is a read-side concern.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct AccessLog {
    pub id: i64,
    pub timestamp: String,
    pub ip_address: String,
    pub user_agent: String,
    pub device_type: String,
    pub platform: String,
    pub app_version: String,
    pub device_model: String,
    pub request_method: String,
    pub request_uri: String,
    pub country: String,
    pub city: String,
    pub isp: String,
    pub response_time: i64,
    pub status_code: i64,
    pub request_headers: String,
    pub additional_info: String,
}

impl AccessLog {
    pub fn projection() -> &'static str {
        "id, timestamp, ip_address, user_agent, device_type, platform, app_version, device_model, request_method, request_uri, country, city, isp, response_time, status_code, request_headers, additional_info"
    }

    pub const fn mapper() -> fn(&rusqlite::Row) -> rusqlite::Result<Self> {
        |row: &rusqlite::Row| -> rusqlite::Result<Self> {
            Ok(AccessLog {
                id: row.get(Columns::Id.as_str())?,
                timestamp: row.get(Columns::Timestamp.as_str())?,
                ip_address: row.get(Columns::IpAddress.as_str())?,
                user_agent: row.get(Columns::UserAgent.as_str())?,
                device_type: row.get(Columns::DeviceType.as_str())?,
                platform: row.get(Columns::Platform.as_str())?,
                app_version: row.get(Columns::AppVersion.as_str())?,
                device_model: row.get(Columns::DeviceModel.as_str())?,
                request_method: row.get(Columns::RequestMethod.as_str())?,
                request_uri: row.get(Columns::RequestUri.as_str())?,
                country: row.get(Columns::Country.as_str())?,
                city: row.get(Columns::City.as_str())?,
                isp: row.get(Columns::Isp.as_str())?,
                response_time: row.get(Columns::ResponseTime.as_str())?,
                status_code: row.get(Columns::StatusCode.as_str())?,
                request_headers: row.get(Columns::RequestHeaders.as_str())?,
                additional_info: row.get(Columns::AdditionalInfo.as_str())?,
            })
        }
    }
}

/// Insert draft, everything except the columns the database assigns.
#[derive(Debug, Clone)]
pub struct NewAccessLog {
    pub ip_address: String,
    pub user_agent: String,
    pub device_type: String,
    pub platform: String,
    pub app_version: String,
    pub device_model: String,
    pub request_method: String,
    pub request_uri: String,
    pub country: String,
    pub city: String,
    pub isp: String,
    pub response_time: i64,
    pub status_code: i64,
    pub request_headers: String,
    pub additional_info: String,
}

#[derive(Debug, Serialize)]
pub struct HourlyCount {
    pub hour: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DeviceTypeCount {
    pub device_type: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct CountryCount {
    pub country: String,
    pub count: i64,
}
