use super::{ip, UNKNOWN};
use crate::Result;
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

const CLIENT_USER_AGENT: &str = "access-log-api/1.0";
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(3);

/// Transient enrichment value, folded into the log row and never persisted
/// on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoResult {
    pub country: String,
    pub city: String,
    pub isp: String,
}

impl Default for GeoResult {
    fn default() -> Self {
        GeoResult {
            country: UNKNOWN.into(),
            city: UNKNOWN.into(),
            isp: UNKNOWN.into(),
        }
    }
}

/// One external geolocation API. Each provider returns its own JSON shape,
/// `parse` answers None when the body doesn't carry that shape (or flags a
/// failed lookup).
pub struct GeoProvider {
    pub name: &'static str,
    pub url: fn(&str) -> String,
    pub parse: fn(&Value) -> Option<GeoResult>,
}

// Fixed priority order, first parsable success wins.
pub static PROVIDERS: &[GeoProvider] = &[
    GeoProvider {
        name: "ip-api.com",
        url: |ip| format!("http://ip-api.com/json/{ip}?fields=status,country,city,isp"),
        parse: parse_ip_api,
    },
    GeoProvider {
        name: "ipapi.co",
        url: |ip| format!("https://ipapi.co/{ip}/json/"),
        parse: parse_ipapi_co,
    },
    GeoProvider {
        name: "geoplugin.net",
        url: |ip| format!("http://www.geoplugin.net/json.gp?ip={ip}"),
        parse: parse_geoplugin,
    },
];

#[derive(Clone)]
pub struct GeoResolver {
    client: reqwest::Client,
    providers: &'static [GeoProvider],
}

impl GeoResolver {
    pub fn new() -> Self {
        Self::with_providers(PROVIDERS)
    }

    pub fn with_providers(providers: &'static [GeoProvider]) -> Self {
        GeoResolver {
            client: reqwest::Client::new(),
            providers,
        }
    }

    /// Best effort, never an error. Anything that isn't a public IPv4
    /// address short-circuits to all-Unknown without a network call, and
    /// a provider failure of any kind just moves on to the next one.
    pub async fn resolve(&self, ip: &str) -> GeoResult {
        if !eligible(ip) {
            return GeoResult::default();
        }
        for provider in self.providers {
            match self.attempt(provider, ip).await {
                Ok(Some(geo)) => return geo,
                Ok(None) => {
                    debug!(provider = provider.name, ip, "Unrecognized geolocation response")
                }
                Err(e) => debug!(
                    provider = provider.name,
                    ip,
                    error = e.to_string(),
                    "Geolocation provider failed",
                ),
            }
        }
        GeoResult::default()
    }

    async fn attempt(&self, provider: &GeoProvider, ip: &str) -> Result<Option<GeoResult>> {
        let response = self
            .client
            .get((provider.url)(ip))
            .timeout(PROVIDER_TIMEOUT)
            .header(reqwest::header::USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        Ok((provider.parse)(&body))
    }
}

impl Default for GeoResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn eligible(ip: &str) -> bool {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => ip::is_public_v4(&v4),
        _ => false,
    }
}

fn parse_ip_api(body: &Value) -> Option<GeoResult> {
    if body.get("status")?.as_str()? != "success" {
        return None;
    }
    Some(GeoResult {
        country: field_or_unknown(body, "country"),
        city: field_or_unknown(body, "city"),
        isp: field_or_unknown(body, "isp"),
    })
}

fn parse_ipapi_co(body: &Value) -> Option<GeoResult> {
    body.get("country_name")?;
    Some(GeoResult {
        country: field_or_unknown(body, "country_name"),
        city: field_or_unknown(body, "city"),
        isp: field_or_unknown(body, "org"),
    })
}

fn parse_geoplugin(body: &Value) -> Option<GeoResult> {
    body.get("geoplugin_countryName")?;
    Some(GeoResult {
        country: field_or_unknown(body, "geoplugin_countryName"),
        city: field_or_unknown(body, "geoplugin_city"),
        isp: field_or_unknown(body, "geoplugin_isp"),
    })
}

fn field_or_unknown(body: &Value, key: &str) -> String {
    match body.get(key).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => value.to_owned(),
        _ => UNKNOWN.to_owned(),
    }
}

#[cfg(test)]
mod test {
    use super::{GeoProvider, GeoResolver, GeoResult, PROVIDERS};
    use serde_json::json;
    use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};

    // The url functions panic, so any provider contact fails the test.
    static PANICKING_PROVIDERS: &[GeoProvider] = &[GeoProvider {
        name: "panicking",
        url: |_| unreachable!("provider contacted for an ineligible address"),
        parse: |_| None,
    }];

    // The url field is a plain fn, so the locally bound port travels
    // through a static instead of a capture.
    static LOCAL_PORT: AtomicU16 = AtomicU16::new(0);
    static FIRST_PROVIDER_CALLS: AtomicUsize = AtomicUsize::new(0);

    static CHAIN_PROVIDERS: &[GeoProvider] = &[
        GeoProvider {
            name: "local-success",
            url: |ip| {
                FIRST_PROVIDER_CALLS.fetch_add(1, Ordering::Relaxed);
                format!("http://127.0.0.1:{}/{ip}", LOCAL_PORT.load(Ordering::Relaxed))
            },
            parse: super::parse_ip_api,
        },
        GeoProvider {
            name: "never-reached",
            url: |_| unreachable!("lower priority provider contacted after a success"),
            parse: |_| None,
        },
    ];

    #[actix_web::test]
    async fn ineligible_addresses_skip_the_network() {
        let resolver = GeoResolver::with_providers(PANICKING_PROVIDERS);
        for ip in [
            "Unknown",
            "",
            "not-an-ip",
            "10.0.0.1",
            "192.168.1.1",
            "127.0.0.1",
            "2001:4860:4860::8888",
        ] {
            assert_eq!(GeoResult::default(), resolver.resolve(ip).await);
        }
    }

    #[actix_web::test]
    async fn success_stops_the_provider_chain() {
        use actix_web::{web, App, HttpResponse, HttpServer};
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        LOCAL_PORT.store(listener.local_addr().unwrap().port(), Ordering::Relaxed);
        let server = HttpServer::new(|| {
            App::new().default_service(web::route().to(|| async {
                HttpResponse::Ok().json(json!({
                    "status": "success",
                    "country": "Germany",
                    "city": "Berlin",
                    "isp": "Example AG"
                }))
            }))
        })
        .workers(1)
        .listen(listener)
        .unwrap()
        .run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        let resolver = GeoResolver::with_providers(CHAIN_PROVIDERS);
        let geo = resolver.resolve("8.8.8.8").await;
        assert_eq!("Germany", geo.country);
        assert_eq!("Berlin", geo.city);
        assert_eq!(1, FIRST_PROVIDER_CALLS.load(Ordering::Relaxed));
        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn all_providers_failing_yields_unknown() {
        let resolver = GeoResolver::with_providers(crate::test::FAILING_PROVIDERS);
        assert_eq!(GeoResult::default(), resolver.resolve("8.8.8.8").await);
    }

    #[test]
    fn ip_api_shape() {
        let body = json!({"status": "success", "country": "Germany", "city": "Berlin", "isp": "Example AG"});
        let geo = (PROVIDERS[0].parse)(&body).unwrap();
        assert_eq!("Germany", geo.country);
        assert_eq!("Berlin", geo.city);
        assert_eq!("Example AG", geo.isp);
    }

    #[test]
    fn ip_api_failed_status_is_not_a_result() {
        let body = json!({"status": "fail", "message": "private range"});
        assert!((PROVIDERS[0].parse)(&body).is_none());
    }

    #[test]
    fn ipapi_co_shape() {
        let body = json!({"country_name": "France", "city": "Paris", "org": "Example SA"});
        let geo = (PROVIDERS[1].parse)(&body).unwrap();
        assert_eq!("France", geo.country);
        assert_eq!("Paris", geo.city);
        assert_eq!("Example SA", geo.isp);
    }

    #[test]
    fn geoplugin_shape() {
        let body = json!({
            "geoplugin_countryName": "Japan",
            "geoplugin_city": "Tokyo",
            "geoplugin_isp": "Example KK"
        });
        let geo = (PROVIDERS[2].parse)(&body).unwrap();
        assert_eq!("Japan", geo.country);
        assert_eq!("Tokyo", geo.city);
        assert_eq!("Example KK", geo.isp);
    }

    #[test]
    fn missing_fields_default_to_unknown() {
        let body = json!({"status": "success", "country": "Germany"});
        let geo = (PROVIDERS[0].parse)(&body).unwrap();
        assert_eq!("Germany", geo.country);
        assert_eq!("Unknown", geo.city);
        assert_eq!("Unknown", geo.isp);
    }

    #[test]
    fn parsers_reject_foreign_shapes() {
        let ip_api_body = json!({"status": "success", "country": "Germany"});
        assert!((PROVIDERS[1].parse)(&ip_api_body).is_none());
        assert!((PROVIDERS[2].parse)(&ip_api_body).is_none());
        let ipapi_co_body = json!({"country_name": "France"});
        assert!((PROVIDERS[0].parse)(&ipapi_co_body).is_none());
    }

    #[test]
    fn first_matching_shape_wins() {
        // A body satisfying several shapes resolves through the highest
        // priority parser.
        let body = json!({
            "status": "success",
            "country": "Germany",
            "country_name": "NOT THIS ONE",
            "geoplugin_countryName": "NOT THIS ONE EITHER"
        });
        let geo = PROVIDERS
            .iter()
            .find_map(|provider| (provider.parse)(&body))
            .unwrap();
        assert_eq!("Germany", geo.country);
    }
}
