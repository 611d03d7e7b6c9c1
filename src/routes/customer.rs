use actix_web::{http::header, middleware::from_fn, web, HttpRequest, HttpResponse, Result};
use askama::Template;
use chrono::Utc;
use serde::Deserialize;

use crate::{
    auth::{customer_guard, flash_cookie, new_id, AuthUser, Flash},
    db::{fetch_customer_by_user, fetch_request, log_activity},
    filters,
    models::{RequestStatus, ServiceRequestRow, ServiceRow},
    state::AppState,
    templates::{pop_flash, render_with_flash, FlashView},
};

#[derive(Clone, Debug)]
struct ServiceView {
    id: String,
    name: String,
    description: String,
    has_description: bool,
    base_price: f64,
}

#[derive(Clone, Debug)]
struct HistoryView {
    id: String,
    service_name: String,
    professional_name: String,
    requested_at: String,
    status: String,
    can_rate: bool,
}

#[derive(Template)]
#[template(path = "customer_dashboard.html")]
struct CustomerDashboardTemplate {
    customer_name: String,
    services: Vec<ServiceView>,
    history: Vec<HistoryView>,
    flash: FlashView,
}

#[derive(Deserialize)]
struct BookForm {
    service_id: String,
}

#[derive(Deserialize)]
struct RateForm {
    service_request_id: String,
    rating: i64,
    comments: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/customer")
            .wrap(from_fn(customer_guard))
            .service(web::resource("").route(web::get().to(index)))
            .service(web::resource("/").route(web::get().to(index)))
            .service(web::resource("/dashboard").route(web::get().to(dashboard)))
            .service(web::resource("/book").route(web::post().to(book_service)))
            .service(web::resource("/rate").route(web::post().to(submit_rating))),
    );
}

async fn index() -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, "/customer/dashboard"))
        .finish()
}

async fn dashboard(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let Some(customer) = fetch_customer_by_user(&state.db, &auth.id).await else {
        return Ok(HttpResponse::NotFound().body("Customer profile not found"));
    };

    let services = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, description, base_price FROM services ORDER BY name",
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default()
    .into_iter()
    .map(|row| {
        let description = row.description.unwrap_or_default();
        ServiceView {
            id: row.id,
            name: row.name,
            description: description.clone(),
            has_description: !description.trim().is_empty(),
            base_price: row.base_price,
        }
    })
    .collect();

    let history = sqlx::query_as::<_, ServiceRequestRow>(
        r#"SELECT r.id, r.customer_id, r.service_id, r.professional_id, r.requested_at, r.status,
                  NULL AS customer_name,
                  s.name AS service_name,
                  p.fullname AS professional_name
           FROM service_requests r
           LEFT JOIN services s ON r.service_id = s.id
           LEFT JOIN professionals p ON r.professional_id = p.id
           WHERE r.customer_id = ?
           ORDER BY r.requested_at DESC"#,
    )
    .bind(&customer.id)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default()
    .into_iter()
    .map(|row| HistoryView {
        id: row.id,
        service_name: row.service_name.unwrap_or_default(),
        professional_name: row
            .professional_name
            .unwrap_or_else(|| "Unassigned".to_string()),
        requested_at: row.requested_at,
        status: row.status.as_str().to_string(),
        can_rate: row.professional_id.is_some(),
    })
    .collect();

    let flash = pop_flash(&req);
    Ok(render_with_flash(
        CustomerDashboardTemplate {
            customer_name: customer.fullname,
            services,
            history,
            flash: flash.clone(),
        },
        &flash,
    ))
}

async fn book_service(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    form: web::Form<BookForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();

    let Some(customer) = fetch_customer_by_user(&state.db, &auth.id).await else {
        return Ok(HttpResponse::NotFound().body("Customer profile not found"));
    };

    let service = sqlx::query_as::<_, (String, String)>(
        "SELECT id, name FROM services WHERE id = ? LIMIT 1",
    )
    .bind(&form.service_id)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None);

    let Some((service_id, service_name)) = service else {
        return Ok(HttpResponse::NotFound().body("Service not found"));
    };

    let request_id = new_id();
    sqlx::query(
        r#"INSERT INTO service_requests (id, customer_id, service_id, professional_id, requested_at, status)
           VALUES (?, ?, ?, NULL, ?, ?)"#,
    )
    .bind(&request_id)
    .bind(&customer.id)
    .bind(&service_id)
    .bind(Utc::now().to_rfc3339())
    .bind(RequestStatus::Requested)
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    log_activity(
        &state.db,
        "request_placed",
        &format!("{} requested {}.", customer.fullname, service_name),
        Some(&auth.id),
    )
    .await;

    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/customer/dashboard"))
        .cookie(flash_cookie(Flash::RequestPlaced))
        .finish())
}

async fn submit_rating(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    form: web::Form<RateForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();

    if !(1..=5).contains(&form.rating) {
        return Ok(HttpResponse::BadRequest().body("Invalid rating"));
    }

    let Some(customer) = fetch_customer_by_user(&state.db, &auth.id).await else {
        return Ok(HttpResponse::NotFound().body("Customer profile not found"));
    };

    let Some(request) = fetch_request(&state.db, &form.service_request_id).await else {
        return Ok(HttpResponse::NotFound().body("Service request not found"));
    };

    // The professional is taken from the request row, never from the form.
    let comments = form.comments.trim();
    sqlx::query(
        r#"INSERT INTO reviews (id, service_request_id, professional_id, customer_id, rating, comments)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(&request.id)
    .bind(&request.professional_id)
    .bind(&customer.id)
    .bind(form.rating)
    .bind(if comments.is_empty() { None } else { Some(comments) })
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    log_activity(
        &state.db,
        "rating_submitted",
        &format!(
            "{} rated request {} with {} stars.",
            customer.fullname, request.id, form.rating
        ),
        Some(&auth.id),
    )
    .await;

    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/customer/dashboard"))
        .cookie(flash_cookie(Flash::RatingSaved))
        .finish())
}
