use crate::db;
use crate::rest;
use crate::service::geo::GeoResolver;
use crate::service::manifest::ManifestConf;
use crate::Result;
use actix_web::dev::Service;
use actix_web::middleware::{Compress, DefaultHeaders, NormalizePath};
use actix_web::web::{route, scope, Data};
use actix_web::{App, HttpServer};
use futures_util::future::FutureExt;
use time::OffsetDateTime;
use tracing::info;

pub async fn run() -> Result<()> {
    // All the worker threads are sharing a single connection pool
    let pool = db::pool()?;
    let resolver = GeoResolver::new();
    let manifest_conf = ManifestConf::from_env();

    info!("Starting HTTP server");

    HttpServer::new(move || {
        App::new()
            .wrap_fn(|req, srv| {
                let req_query_string = req.query_string().to_string();
                let req_method = req.method().as_str().to_string();
                let req_path = req.path().to_string();
                let req_version = format!("{:?}", req.version());
                let req_time = OffsetDateTime::now_utc();
                let req_ip = req
                    .connection_info()
                    .peer_addr()
                    .unwrap_or_default()
                    .to_string();
                let req_real_ip = req
                    .connection_info()
                    .realip_remote_addr()
                    .unwrap_or_default()
                    .to_string();
                srv.call(req).map(move |res| {
                    if let Ok(res) = res.as_ref() {
                        let res_status = res.status().as_u16();
                        info!(
                            req_query_string,
                            req_method,
                            req_path,
                            req_version,
                            req_ip,
                            req_real_ip,
                            res_status,
                            res_time_sec = (OffsetDateTime::now_utc() - req_time).as_seconds_f64(),
                        );
                    }

                    res
                })
            })
            .wrap(NormalizePath::trim())
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
                    .add((
                        "Access-Control-Allow-Headers",
                        "Content-Type, User-Agent, X-Requested-With, X-App-Version, X-Platform, X-Device-Model, X-Device-Type",
                    )),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(resolver.clone()))
            .app_data(Data::new(manifest_conf.clone()))
            .service(
                scope("logs")
                    .service(rest::logs::get)
                    .service(rest::export::get)
                    .service(
                        scope("clear")
                            .service(rest::clear::post)
                            .default_service(route().to(rest::clear::method_not_allowed)),
                    ),
            )
            .service(rest::ingest::handle)
    })
    .bind(("127.0.0.1", 8000))?
    .run()
    .await?;

    Ok(())
}
