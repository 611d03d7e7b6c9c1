use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpRequest, HttpResponse, Result};
use askama::Template;
use chrono::Utc;
use serde::Deserialize;

use crate::{
    auth::{
        authenticate_credentials, clear_session_cookie, flash_cookie, hash_password, new_id,
        redirect_to_login, session_cookie, session_user_id, Flash,
    },
    db::log_activity,
    models::Role,
    state::AppState,
    templates::{pop_flash, render, render_with_flash, FlashView},
    uploads::{read_professional_signup, store_document},
};

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    email: String,
    error: String,
    has_error: bool,
    flash: FlashView,
}

#[derive(Clone, Debug, Default)]
struct CustomerSignupView {
    email: String,
    fullname: String,
    address: String,
    pincode: String,
}

#[derive(Template)]
#[template(path = "customer_signup.html")]
struct CustomerSignupTemplate {
    form: CustomerSignupView,
    errors: Vec<String>,
}

#[derive(Clone, Debug, Default)]
struct ProfessionalSignupView {
    email: String,
    fullname: String,
    service_name: String,
    experience: String,
    address: String,
    pincode: String,
}

impl ProfessionalSignupView {
    fn from_form(form: &crate::uploads::ProfessionalSignupForm) -> Self {
        ProfessionalSignupView {
            email: form.email.clone(),
            fullname: form.fullname.clone(),
            service_name: form.service_name.clone(),
            experience: form.experience.clone(),
            address: form.address.clone(),
            pincode: form.pincode.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "professional_signup.html")]
struct ProfessionalSignupTemplate {
    form: ProfessionalSignupView,
    errors: Vec<String>,
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct CustomerSignupForm {
    email: String,
    password: String,
    fullname: String,
    address: String,
    pincode: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(
            web::resource("/login")
                .route(web::get().to(show_login))
                .route(web::post().to(login)),
        )
        .service(web::resource("/logout").route(web::get().to(logout)))
        .service(
            web::resource("/customer/signup")
                .route(web::get().to(show_customer_signup))
                .route(web::post().to(customer_signup)),
        )
        .service(
            web::resource("/professional/signup")
                .route(web::get().to(show_professional_signup))
                .route(web::post().to(professional_signup)),
        )
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn index() -> HttpResponse {
    redirect_to_login()
}

async fn show_login(req: HttpRequest) -> HttpResponse {
    let flash = pop_flash(&req);
    render_with_flash(
        LoginTemplate {
            email: String::new(),
            error: String::new(),
            has_error: false,
            flash: flash.clone(),
        },
        &flash,
    )
}

async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();

    let user = match authenticate_credentials(&state, form.email.trim(), &form.password).await {
        Some(user) => user,
        None => {
            return Ok(render(LoginTemplate {
                email: form.email,
                error: "Invalid credentials!".to_string(),
                has_error: true,
                flash: FlashView::none(),
            }));
        }
    };

    let target = match user.role {
        Role::Admin => "/admin/dashboard",
        Role::Professional => "/professional/dashboard",
        Role::Customer => "/customer/dashboard",
    };

    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, target))
        .cookie(session_cookie(&state.session_key, &user.id, &req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish())
}

async fn logout(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    if session_user_id(&state.session_key, &req).is_none() {
        return redirect_to_login();
    }

    HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/login"))
        .cookie(clear_session_cookie())
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

async fn show_customer_signup() -> HttpResponse {
    render(CustomerSignupTemplate {
        form: CustomerSignupView::default(),
        errors: Vec::new(),
    })
}

async fn customer_signup(
    state: web::Data<AppState>,
    form: web::Form<CustomerSignupForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let email = form.email.trim().to_string();

    let mut errors = Vec::new();
    if email.is_empty() {
        errors.push("Email is required.".to_string());
    }
    if form.password.is_empty() {
        errors.push("Password is required.".to_string());
    }
    if form.fullname.trim().is_empty() {
        errors.push("Full name is required.".to_string());
    }
    if form.address.trim().is_empty() {
        errors.push("Address is required.".to_string());
    }
    if form.pincode.trim().is_empty() {
        errors.push("Pincode is required.".to_string());
    }

    if errors.is_empty() && email_taken(&state, &email).await {
        errors.push("Email is already registered.".to_string());
    }

    if !errors.is_empty() {
        return Ok(render(CustomerSignupTemplate {
            form: CustomerSignupView {
                email: form.email,
                fullname: form.fullname,
                address: form.address,
                pincode: form.pincode,
            },
            errors,
        }));
    }

    let password_hash = hash_password(&form.password)
        .map_err(|_| actix_web::error::ErrorInternalServerError("hash failure"))?;
    let user_id = new_id();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO users (id, email, password_hash, role, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(&user_id)
    .bind(&email)
    .bind(&password_hash)
    .bind(Role::Customer)
    .bind(&now)
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    sqlx::query(
        r#"INSERT INTO customers (id, user_id, fullname, address, pincode)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(&user_id)
    .bind(form.fullname.trim())
    .bind(form.address.trim())
    .bind(form.pincode.trim())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    log_activity(
        &state.db,
        "customer_signup",
        &format!("{} registered as a customer.", form.fullname.trim()),
        Some(&user_id),
    )
    .await;

    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/login"))
        .cookie(flash_cookie(Flash::AccountCreated))
        .finish())
}

async fn show_professional_signup() -> HttpResponse {
    render(ProfessionalSignupTemplate {
        form: ProfessionalSignupView::default(),
        errors: Vec::new(),
    })
}

async fn professional_signup(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = read_professional_signup(payload).await?;
    let email = form.email.clone();

    let mut errors = Vec::new();
    if email.is_empty() {
        errors.push("Email is required.".to_string());
    }
    if form.password.is_empty() {
        errors.push("Password is required.".to_string());
    }
    if form.fullname.is_empty() {
        errors.push("Full name is required.".to_string());
    }
    if form.service_name.is_empty() {
        errors.push("Please name the service you provide.".to_string());
    }
    let experience_years: Option<i64> = form.experience.parse().ok();
    if experience_years.is_none() {
        errors.push("Experience must be a number of years.".to_string());
    }
    if form.address.is_empty() {
        errors.push("Address is required.".to_string());
    }
    if form.pincode.is_empty() {
        errors.push("Pincode is required.".to_string());
    }
    if form.document.is_none() {
        errors.push("A verification document is required.".to_string());
    }

    if errors.is_empty() && email_taken(&state, &email).await {
        errors.push("Email is already registered.".to_string());
    }

    let view = ProfessionalSignupView::from_form(&form);
    let (Some(experience_years), Some(document)) = (experience_years, form.document) else {
        return Ok(render(ProfessionalSignupTemplate { form: view, errors }));
    };

    if !errors.is_empty() {
        return Ok(render(ProfessionalSignupTemplate { form: view, errors }));
    }

    let document_path = store_document(&state.uploads_dir, &document.filename, document.bytes)
        .await?
        .to_string_lossy()
        .into_owned();

    let password_hash = hash_password(&form.password)
        .map_err(|_| actix_web::error::ErrorInternalServerError("hash failure"))?;
    let user_id = new_id();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO users (id, email, password_hash, role, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(&user_id)
    .bind(&email)
    .bind(&password_hash)
    .bind(Role::Professional)
    .bind(&now)
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    sqlx::query(
        r#"INSERT INTO professionals
           (id, user_id, fullname, service_name, experience_years, document_path, address, pincode)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(&user_id)
    .bind(&form.fullname)
    .bind(&form.service_name)
    .bind(experience_years)
    .bind(&document_path)
    .bind(&form.address)
    .bind(&form.pincode)
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    log_activity(
        &state.db,
        "professional_signup",
        &format!(
            "{} registered as a professional for {}.",
            form.fullname, form.service_name
        ),
        Some(&user_id),
    )
    .await;

    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/login"))
        .cookie(flash_cookie(Flash::AwaitingApproval))
        .finish())
}

async fn email_taken(state: &web::Data<AppState>, email: &str) -> bool {
    sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE email = ? LIMIT 1")
        .bind(email)
        .fetch_optional(&state.db)
        .await
        .unwrap_or(None)
        .is_some()
}
