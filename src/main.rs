mod auth;
mod config;
mod db;
mod errors;
mod models;
mod render;
mod routes;
mod store;
mod utils;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::http::header;
use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use env_logger::Env;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::db::Db;

/// Periodically removes rendered resumes older than `retention`.
async fn sweep_resumes(dir: PathBuf, retention: Duration, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        match render::sweep_expired(&dir, retention).await {
            Ok(0) => {}
            Ok(n) => log::info!("removed {n} expired resume(s) from {}", dir.display()),
            Err(e) => log::warn!("resume sweep over {} failed: {e}", dir.display()),
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // info by default, RUST_LOG overrides
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cfg = Config::from_env_config()?;

    let db = Db::connect_and_migrate(&cfg.database_path)
        .await
        .context("database init failed")?;
    let rewritten = store::profiles::rewrite_legacy_education_keys(&db)
        .await
        .context("rewriting legacy education keys")?;
    if rewritten > 0 {
        log::info!("rewrote {rewritten} education entries to the fieldOfStudy key");
    }

    actix_web::rt::spawn(sweep_resumes(
        cfg.uploads_path(),
        cfg.resume_retention(),
        cfg.resume_sweep_interval(),
    ));

    log::info!("Starting server at {}", cfg.listen);
    let listen_addr = cfg.listen.clone();
    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600);
        if cfg.allowed_origins.iter().any(|o| o == "*") {
            cors = cors.allow_any_origin();
        } else {
            for origin in &cfg.allowed_origins {
                cors = cors.allowed_origin(origin);
            }
        }

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(Data::new(cfg.clone()))
            .app_data(Data::new(db.clone()))
            .configure(routes::configure)
            // uploads and rendered resumes; must stay last
            .service(Files::new("/", cfg.uploads_path()))
    })
    .bind(listen_addr)?
    .run()
    .await?;
    Ok(())
}
