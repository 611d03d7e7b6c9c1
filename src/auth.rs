use actix_web::{
    body::{BoxBody, MessageBody},
    cookie::{time::Duration, Cookie, CookieJar, Key, SameSite},
    dev::{ServiceRequest, ServiceResponse},
    http::header,
    middleware::Next,
    web, Error, HttpMessage, HttpRequest, HttpResponse,
};
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use uuid::Uuid;

use crate::{
    models::{Role, UserRow},
    state::AppState,
};

pub const SESSION_COOKIE: &str = "hc_session";
const FLASH_COOKIE: &str = "hc_flash";

pub const DEFAULT_SECRET_KEY: &str = "default_secret_key";

/// The authenticated identity a role guard inserts into request extensions.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed_hash = PasswordHash::new(password_hash);
    match parsed_hash {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Derives the cookie-signing key from SECRET_KEY. `Key::derive_from` needs
/// at least 64 bytes of material, so short secrets are stretched by
/// repetition first.
pub fn session_key_from_secret(secret: &str) -> Key {
    let secret = if secret.is_empty() { DEFAULT_SECRET_KEY } else { secret };
    let mut material = secret.as_bytes().to_vec();
    while material.len() < 64 {
        material.extend_from_slice(secret.as_bytes());
    }
    Key::derive_from(&material)
}

pub fn session_cookie(key: &Key, user_id: &str, req: &HttpRequest) -> Cookie<'static> {
    let mut builder = Cookie::build(SESSION_COOKIE, user_id.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    let mut jar = CookieJar::new();
    jar.signed_mut(key).add(builder.finish());
    jar.get(SESSION_COOKIE)
        .cloned()
        .unwrap_or_else(|| Cookie::new(SESSION_COOKIE, ""))
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(0))
        .finish()
}

/// Returns the user id carried by a validly signed session cookie.
pub fn session_user_id(key: &Key, req: &HttpRequest) -> Option<String> {
    let cookie = req.cookie(SESSION_COOKIE)?;
    let mut jar = CookieJar::new();
    jar.add_original(cookie);
    jar.signed(key)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// Loads the user the current session points at, if any.
pub async fn session_user(state: &AppState, req: &HttpRequest) -> Option<UserRow> {
    let user_id = session_user_id(&state.session_key, req)?;
    sqlx::query_as::<_, UserRow>(
        r#"SELECT id, email, password_hash, role, created_at
           FROM users
           WHERE id = ?
           LIMIT 1"#,
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await
    .ok()?
}

pub async fn authenticate_credentials(
    state: &AppState,
    email: &str,
    password: &str,
) -> Option<UserRow> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"SELECT id, email, password_hash, role, created_at
           FROM users
           WHERE email = ?
           LIMIT 1"#,
    )
    .bind(email)
    .fetch_optional(&state.db)
    .await
    .ok()??;

    if !verify_password(password, &user.password_hash) {
        return None;
    }

    Some(user)
}

/// Authorization failures redirect to the login page rather than answering
/// with a 403.
pub fn redirect_to_login() -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, "/login"))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

pub async fn admin_guard<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: MessageBody + 'static,
{
    require_role(req, next, Role::Admin).await
}

pub async fn professional_guard<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: MessageBody + 'static,
{
    require_role(req, next, Role::Professional).await
}

pub async fn customer_guard<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: MessageBody + 'static,
{
    require_role(req, next, Role::Customer).await
}

async fn require_role<B>(
    req: ServiceRequest,
    next: Next<B>,
    required: Role,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: MessageBody + 'static,
{
    let state = match req.app_data::<web::Data<AppState>>().cloned() {
        Some(state) => state,
        None => return Ok(req.into_response(redirect_to_login())),
    };

    let user = match session_user(&state, req.request()).await {
        Some(user) if user.role == required => user,
        _ => return Ok(req.into_response(redirect_to_login())),
    };

    req.extensions_mut().insert(AuthUser {
        id: user.id,
        email: user.email,
        role: user.role,
    });

    let res = next.call(req).await?;
    Ok(res.map_into_boxed_body())
}

/// One-shot notices surviving a redirect, carried in a short-lived cookie as
/// a fixed token and expanded to text when the next page renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flash {
    AccountCreated,
    AwaitingApproval,
    ServiceAdded,
    ProfessionalApproved,
    RequestPlaced,
    RequestAccepted,
    RequestClosed,
    RatingSaved,
    ApprovalPending,
}

impl Flash {
    const ALL: [Flash; 9] = [
        Flash::AccountCreated,
        Flash::AwaitingApproval,
        Flash::ServiceAdded,
        Flash::ProfessionalApproved,
        Flash::RequestPlaced,
        Flash::RequestAccepted,
        Flash::RequestClosed,
        Flash::RatingSaved,
        Flash::ApprovalPending,
    ];

    fn token(self) -> &'static str {
        match self {
            Flash::AccountCreated => "account_created",
            Flash::AwaitingApproval => "awaiting_approval",
            Flash::ServiceAdded => "service_added",
            Flash::ProfessionalApproved => "professional_approved",
            Flash::RequestPlaced => "request_placed",
            Flash::RequestAccepted => "request_accepted",
            Flash::RequestClosed => "request_closed",
            Flash::RatingSaved => "rating_saved",
            Flash::ApprovalPending => "approval_pending",
        }
    }

    fn from_token(token: &str) -> Option<Flash> {
        Flash::ALL.into_iter().find(|flash| flash.token() == token)
    }

    pub fn message(self) -> &'static str {
        match self {
            Flash::AccountCreated => "Account created successfully!",
            Flash::AwaitingApproval => "Registration successful! Wait for admin approval.",
            Flash::ServiceAdded => "Service added successfully.",
            Flash::ProfessionalApproved => "Professional approved.",
            Flash::RequestPlaced => "Service request placed.",
            Flash::RequestAccepted => "Request accepted.",
            Flash::RequestClosed => "Request closed.",
            Flash::RatingSaved => "Rating submitted successfully.",
            Flash::ApprovalPending => "Your account is pending admin approval.",
        }
    }

    pub fn category(self) -> &'static str {
        match self {
            Flash::ApprovalPending => "danger",
            _ => "success",
        }
    }
}

pub fn flash_cookie(flash: Flash) -> Cookie<'static> {
    Cookie::build(FLASH_COOKIE, flash.token())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

pub fn take_flash(req: &HttpRequest) -> Option<Flash> {
    req.cookie(FLASH_COOKIE)
        .and_then(|cookie| Flash::from_token(cookie.value()))
}

pub fn clear_flash_cookie() -> Cookie<'static> {
    Cookie::build(FLASH_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(0))
        .finish()
}
