use std::{env, fs, path::Path};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::{hash_password, new_id},
    models::{CustomerRow, ProfessionalRow, Role, ServiceRequestRow},
};

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Creates the directory a sqlite:// URL points into, so a fresh checkout can
/// boot without a manual mkdir.
pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))
        .map(|path| path.split('?').next().unwrap_or(path))
        .map(|path| path.strip_prefix("file:").unwrap_or(path));

    match path {
        Some(path) if path != ":memory:" && !path.is_empty() => {
            if let Some(parent) = Path::new(path).parent() {
                fs::create_dir_all(parent)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// There is no admin signup route; the admin account comes from the
/// environment on first boot.
pub async fn seed_admin(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE role = ? LIMIT 1")
        .bind(Role::Admin)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    let email = env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@homecall.local".to_string());
    let password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());

    if password == "admin" {
        log::warn!("ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD in production.");
    }

    let password_hash =
        hash_password(&password).map_err(|_| sqlx::Error::Protocol("password hash failed".into()))?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO users (id, email, password_hash, role, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(email)
    .bind(password_hash)
    .bind(Role::Admin)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Best-effort audit feed shown on the admin dashboard. Failures are ignored.
pub async fn log_activity(pool: &SqlitePool, kind: &str, message: &str, user_id: Option<&str>) {
    let _ = sqlx::query(
        r#"INSERT INTO activities (id, kind, message, created_at, user_id)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(kind)
    .bind(message)
    .bind(Utc::now().to_rfc3339())
    .bind(user_id)
    .execute(pool)
    .await;
}

pub async fn fetch_request(pool: &SqlitePool, request_id: &str) -> Option<ServiceRequestRow> {
    sqlx::query_as::<_, ServiceRequestRow>(
        r#"SELECT r.id, r.customer_id, r.service_id, r.professional_id, r.requested_at, r.status,
                  c.fullname AS customer_name,
                  s.name AS service_name,
                  p.fullname AS professional_name
           FROM service_requests r
           LEFT JOIN customers c ON r.customer_id = c.id
           LEFT JOIN services s ON r.service_id = s.id
           LEFT JOIN professionals p ON r.professional_id = p.id
           WHERE r.id = ?
           LIMIT 1"#,
    )
    .bind(request_id)
    .fetch_optional(pool)
    .await
    .unwrap_or(None)
}

pub async fn fetch_customer_by_user(pool: &SqlitePool, user_id: &str) -> Option<CustomerRow> {
    sqlx::query_as::<_, CustomerRow>(
        r#"SELECT id, user_id, fullname, address, pincode
           FROM customers
           WHERE user_id = ?
           LIMIT 1"#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .unwrap_or(None)
}

pub async fn fetch_professional_by_user(pool: &SqlitePool, user_id: &str) -> Option<ProfessionalRow> {
    sqlx::query_as::<_, ProfessionalRow>(
        r#"SELECT id, user_id, fullname, service_name, experience_years, document_path,
                  address, pincode, is_approved
           FROM professionals
           WHERE user_id = ?
           LIMIT 1"#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .unwrap_or(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_dir_handles_url_shapes() {
        // Memory and bare URLs need no directory.
        ensure_sqlite_dir("sqlite::memory:").unwrap();
        ensure_sqlite_dir("postgres://elsewhere/db").unwrap();

        let dir = std::env::temp_dir().join(format!("homecall-dbdir-{}", new_id()));
        let url = format!("sqlite://{}/app.db?mode=rwc", dir.display());
        ensure_sqlite_dir(&url).unwrap();
        assert!(dir.is_dir());
        let _ = fs::remove_dir_all(dir);
    }
}
