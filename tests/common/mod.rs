#![allow(dead_code)]

use actix_web::{body::MessageBody, cookie::Cookie, dev::ServiceResponse, web};
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use homecall::{auth, db, state::AppState};

/// Fresh in-memory database plus a scratch uploads directory.
pub async fn test_state() -> web::Data<AppState> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("sqlite pool");
    db::run_migrations(&pool).await.expect("migrations");

    let uploads_dir = std::env::temp_dir().join(format!("homecall-test-{}", auth::new_id()));
    std::fs::create_dir_all(&uploads_dir).expect("uploads dir");

    web::Data::new(AppState {
        db: pool,
        session_key: auth::session_key_from_secret("a-test-secret"),
        uploads_dir,
    })
}

/// Pulls the session cookie off a login response.
pub fn session_cookie<B: MessageBody>(resp: &ServiceResponse<B>) -> Cookie<'static> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == auth::SESSION_COOKIE)
        .expect("session cookie set")
        .into_owned()
}

/// Builds a multipart/form-data payload for the professional signup form.
/// Returns the content-type header value and the body.
pub fn multipart_body(
    fields: &[(&str, &str)],
    document: Option<(&str, &[u8])>,
) -> (String, Vec<u8>) {
    let boundary = "----homecall-test-boundary";
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }

    if let Some((filename, bytes)) = document {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"document\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

pub async fn create_customer(
    pool: &SqlitePool,
    email: &str,
    password: &str,
    fullname: &str,
) -> (String, String) {
    let user_id = auth::new_id();
    let customer_id = auth::new_id();
    let password_hash = auth::hash_password(password).expect("hash");

    sqlx::query(
        "INSERT INTO users (id, email, password_hash, role, created_at) VALUES (?, ?, ?, 'customer', ?)",
    )
    .bind(&user_id)
    .bind(email)
    .bind(password_hash)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .expect("user row");

    sqlx::query(
        "INSERT INTO customers (id, user_id, fullname, address, pincode) VALUES (?, ?, ?, '12 Lake Road', '560001')",
    )
    .bind(&customer_id)
    .bind(&user_id)
    .bind(fullname)
    .execute(pool)
    .await
    .expect("customer row");

    (user_id, customer_id)
}

pub async fn create_professional(
    pool: &SqlitePool,
    email: &str,
    password: &str,
    fullname: &str,
    approved: bool,
) -> (String, String) {
    let user_id = auth::new_id();
    let professional_id = auth::new_id();
    let password_hash = auth::hash_password(password).expect("hash");

    sqlx::query(
        "INSERT INTO users (id, email, password_hash, role, created_at) VALUES (?, ?, ?, 'professional', ?)",
    )
    .bind(&user_id)
    .bind(email)
    .bind(password_hash)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .expect("user row");

    sqlx::query(
        r#"INSERT INTO professionals
           (id, user_id, fullname, service_name, experience_years, document_path, address, pincode, is_approved)
           VALUES (?, ?, ?, 'Plumbing', 4, 'uploads/licence.pdf', '8 Hill Street', '560002', ?)"#,
    )
    .bind(&professional_id)
    .bind(&user_id)
    .bind(fullname)
    .bind(if approved { 1i64 } else { 0i64 })
    .execute(pool)
    .await
    .expect("professional row");

    (user_id, professional_id)
}

pub async fn create_service(pool: &SqlitePool, name: &str, base_price: f64) -> String {
    let service_id = auth::new_id();
    sqlx::query("INSERT INTO services (id, name, description, base_price) VALUES (?, ?, NULL, ?)")
        .bind(&service_id)
        .bind(name)
        .bind(base_price)
        .execute(pool)
        .await
        .expect("service row");
    service_id
}

pub async fn create_request(
    pool: &SqlitePool,
    customer_id: &str,
    service_id: &str,
    professional_id: Option<&str>,
    status: &str,
) -> String {
    let request_id = auth::new_id();
    sqlx::query(
        r#"INSERT INTO service_requests (id, customer_id, service_id, professional_id, requested_at, status)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&request_id)
    .bind(customer_id)
    .bind(service_id)
    .bind(professional_id)
    .bind(Utc::now().to_rfc3339())
    .bind(status)
    .execute(pool)
    .await
    .expect("request row");
    request_id
}
