use super::{ip, UNKNOWN};
use actix_web::HttpRequest;
use serde_json::{Map, Value};

/// Everything the ingest pipeline learns about the caller from request
/// metadata alone. Building it never touches the network or the database.
#[derive(Debug)]
pub struct ClientInfo {
    pub ip_address: String,
    pub user_agent: String,
    pub app_version: String,
    pub platform: String,
    pub device_model: String,
    pub device_type: String,
    pub request_method: String,
    pub request_uri: String,
    pub request_headers: String,
}

// Proxies and CDNs put the original client address in forwarding headers,
// which beat the socket peer when they hold a public address. They're also
// attacker-controllable, hence the public-range filter in ip::parse_public.
const FORWARDING_HEADERS: &[&str] = &["x-forwarded-for", "x-real-ip", "x-client-ip"];

pub fn extract(req: &HttpRequest) -> ClientInfo {
    ClientInfo {
        ip_address: client_ip(req),
        user_agent: header_or_unknown(req, "user-agent"),
        app_version: header_or_unknown(req, "x-app-version"),
        platform: header_or_unknown(req, "x-platform"),
        device_model: header_or_unknown(req, "x-device-model"),
        device_type: header_or_unknown(req, "x-device-type"),
        request_method: req.method().as_str().to_owned(),
        request_uri: req.uri().to_string(),
        request_headers: headers_json(req),
    }
}

fn client_ip(req: &HttpRequest) -> String {
    for name in FORWARDING_HEADERS {
        let Some(value) = header_value(req, name) else {
            continue;
        };
        // X-Forwarded-For may chain addresses, the leftmost is the client
        let first = value.split(',').next().unwrap_or_default();
        if let Some(addr) = ip::parse_public(first) {
            return addr.to_string();
        }
    }
    // No qualifying forwarded candidate, fall back to the raw peer address
    match req.peer_addr() {
        Some(peer) => peer.ip().to_string(),
        None => UNKNOWN.to_owned(),
    }
}

fn header_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

fn header_or_unknown(req: &HttpRequest, name: &str) -> String {
    header_value(req, name).unwrap_or_else(|| UNKNOWN.to_owned())
}

/// Snapshot of every request header as one JSON object, names normalized
/// to the conventional Dashed-Title-Case.
fn headers_json(req: &HttpRequest) -> String {
    let mut headers = Map::new();
    for (name, value) in req.headers() {
        headers.insert(
            canonical_name(name.as_str()),
            Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
        );
    }
    serde_json::to_string(&headers).unwrap_or_else(|_| "{}".to_owned())
}

fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod test {
    use super::extract;
    use actix_web::test::TestRequest;
    use serde_json::Value;

    #[test]
    fn forwarded_for_first_public_candidate_wins() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "8.8.8.8, 10.0.0.1"))
            .to_http_request();
        assert_eq!("8.8.8.8", extract(&req).ip_address);
    }

    #[test]
    fn private_forwarded_for_falls_through_to_real_ip() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "192.168.0.7"))
            .insert_header(("X-Real-IP", "1.1.1.1"))
            .to_http_request();
        assert_eq!("1.1.1.1", extract(&req).ip_address);
    }

    #[test]
    fn client_ip_header_is_consulted() {
        let req = TestRequest::default()
            .insert_header(("X-Client-IP", "9.9.9.9"))
            .to_http_request();
        assert_eq!("9.9.9.9", extract(&req).ip_address);
    }

    #[test]
    fn raw_peer_is_the_last_resort_even_when_private() {
        let req = TestRequest::default()
            .peer_addr("127.0.0.1:51234".parse().unwrap())
            .to_http_request();
        assert_eq!("127.0.0.1", extract(&req).ip_address);
    }

    #[test]
    fn no_candidates_at_all_yields_unknown() {
        let req = TestRequest::default().to_http_request();
        assert_eq!("Unknown", extract(&req).ip_address);
    }

    #[test]
    fn custom_headers_default_to_unknown() {
        let req = TestRequest::default().to_http_request();
        let info = extract(&req);
        assert_eq!("Unknown", info.user_agent);
        assert_eq!("Unknown", info.app_version);
        assert_eq!("Unknown", info.platform);
        assert_eq!("Unknown", info.device_model);
        assert_eq!("Unknown", info.device_type);
    }

    #[test]
    fn custom_headers_are_read() {
        let req = TestRequest::default()
            .insert_header(("X-App-Version", "2.4.1"))
            .insert_header(("X-Platform", "ios"))
            .insert_header(("X-Device-Model", "iPhone15,2"))
            .insert_header(("X-Device-Type", "mobile"))
            .to_http_request();
        let info = extract(&req);
        assert_eq!("2.4.1", info.app_version);
        assert_eq!("ios", info.platform);
        assert_eq!("iPhone15,2", info.device_model);
        assert_eq!("mobile", info.device_type);
    }

    #[test]
    fn header_snapshot_round_trips() {
        let req = TestRequest::default()
            .insert_header(("User-Agent", "curl/8.0"))
            .insert_header(("X-Platform", "android"))
            .to_http_request();
        let info = extract(&req);
        let headers: Value = serde_json::from_str(&info.request_headers).unwrap();
        assert_eq!("curl/8.0", headers["User-Agent"]);
        assert_eq!("android", headers["X-Platform"]);
    }
}
