pub mod auth;
pub mod db;
pub mod filters;
pub mod models;
pub mod routes;
pub mod state;
pub mod templates;
pub mod uploads;

use std::path::PathBuf;
use std::str::FromStr;
use std::{env, fs};

use actix_files::Files;
use actix_web::{middleware, web, App, HttpServer};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::state::AppState;

/// Mounts every route group. Shared between the server and the tests so both
/// exercise the same router.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    routes::public::configure(cfg);
    routes::admin::configure(cfg);
    routes::professional::configure(cfg);
    routes::customer::configure(cfg);
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let db_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./data/homecall.db".to_string());
    db::ensure_sqlite_dir(&db_url)?;

    let connect_options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;

    db::run_migrations(&pool).await?;
    db::seed_admin(&pool).await?;

    let secret = env::var("SECRET_KEY").unwrap_or_else(|_| auth::DEFAULT_SECRET_KEY.to_string());
    if secret == auth::DEFAULT_SECRET_KEY {
        log::warn!("SECRET_KEY not set. Sessions are signed with the built-in development key.");
    }

    let uploads_dir = PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()));
    fs::create_dir_all(&uploads_dir)?;

    let state = AppState {
        db: pool.clone(),
        session_key: auth::session_key_from_secret(&secret),
        uploads_dir,
    };

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8080);

    let address = format!("0.0.0.0:{port}");
    log::info!("Starting HomeCall on http://{address}");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", "./static").prefer_utf8(true))
            .configure(configure_app)
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
