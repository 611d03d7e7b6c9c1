use std::path::PathBuf;

use actix_web::cookie::Key;
use sqlx::SqlitePool;

/// Application context built once at startup and handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Signs the session cookie. Derived from SECRET_KEY.
    pub session_key: Key,
    /// Where professional verification documents land.
    pub uploads_dir: PathBuf,
}
