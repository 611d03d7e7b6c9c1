use actix_files::NamedFile;
use actix_web::{http::header, middleware::from_fn, web, HttpRequest, HttpResponse, Result};
use askama::Template;
use serde::Deserialize;

use crate::{
    auth::{admin_guard, flash_cookie, new_id, AuthUser, Flash},
    db::log_activity,
    filters,
    models::{ActivityRow, ServiceRequestRow, ServiceRow},
    state::AppState,
    templates::{pop_flash, render, render_with_flash, FlashView},
};

#[derive(Clone, Debug)]
struct StatCard {
    label: String,
    value: i64,
}

#[derive(Clone, Debug)]
struct ServiceView {
    name: String,
    description: String,
    has_description: bool,
    base_price: f64,
}

#[derive(Clone, Debug)]
struct ProfessionalView {
    id: String,
    fullname: String,
    service_name: String,
    experience_years: i64,
    pincode: String,
    email: String,
    approved: bool,
    rating: String,
    review_count: i64,
}

#[derive(Clone, Debug)]
struct RequestView {
    id: String,
    customer_name: String,
    service_name: String,
    professional_name: String,
    requested_at: String,
    status: String,
}

#[derive(Clone, Debug)]
struct ActivityView {
    message: String,
    created_at: String,
}

#[derive(Template)]
#[template(path = "admin_dashboard.html")]
struct AdminDashboardTemplate {
    admin_email: String,
    stats: Vec<StatCard>,
    services: Vec<ServiceView>,
    professionals: Vec<ProfessionalView>,
    requests: Vec<RequestView>,
    activities: Vec<ActivityView>,
    flash: FlashView,
}

#[derive(Clone, Debug, Default)]
struct ServiceFormView {
    name: String,
    description: String,
    base_price: String,
}

#[derive(Template)]
#[template(path = "new_service.html")]
struct NewServiceTemplate {
    form: ServiceFormView,
    errors: Vec<String>,
}

#[derive(Deserialize)]
struct ServiceForm {
    name: String,
    description: String,
    base_price: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ProfessionalListRow {
    id: String,
    fullname: String,
    service_name: String,
    experience_years: i64,
    pincode: String,
    is_approved: i64,
    email: Option<String>,
    avg_rating: Option<f64>,
    review_count: i64,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .wrap(from_fn(admin_guard))
            .service(web::resource("").route(web::get().to(index)))
            .service(web::resource("/").route(web::get().to(index)))
            .service(web::resource("/dashboard").route(web::get().to(dashboard)))
            .service(
                web::resource("/service/new")
                    .route(web::get().to(show_new_service))
                    .route(web::post().to(create_service)),
            )
            .service(
                web::resource("/professionals/{id}/approve")
                    .route(web::post().to(approve_professional)),
            )
            .service(
                web::resource("/professionals/{id}/document")
                    .route(web::get().to(professional_document)),
            ),
    );
}

async fn index() -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, "/admin/dashboard"))
        .finish()
}

async fn dashboard(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let total = count("SELECT COUNT(*) FROM service_requests", &state).run().await;
    let requested = count(
        "SELECT COUNT(*) FROM service_requests WHERE status = 'requested'",
        &state,
    )
    .run()
    .await;
    let accepted = count(
        "SELECT COUNT(*) FROM service_requests WHERE status = 'accepted'",
        &state,
    )
    .run()
    .await;
    let closed = count(
        "SELECT COUNT(*) FROM service_requests WHERE status = 'closed'",
        &state,
    )
    .run()
    .await;

    let stats = vec![
        StatCard {
            label: "Total requests".to_string(),
            value: total,
        },
        StatCard {
            label: "Awaiting assignment".to_string(),
            value: requested,
        },
        StatCard {
            label: "In progress".to_string(),
            value: accepted,
        },
        StatCard {
            label: "Closed".to_string(),
            value: closed,
        },
    ];

    let services = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, description, base_price FROM services ORDER BY name",
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default()
    .into_iter()
    .map(to_service_view)
    .collect();

    let professionals = sqlx::query_as::<_, ProfessionalListRow>(
        r#"SELECT p.id, p.fullname, p.service_name, p.experience_years, p.pincode, p.is_approved,
                  u.email AS email,
                  AVG(rv.rating) AS avg_rating,
                  COUNT(rv.id) AS review_count
           FROM professionals p
           LEFT JOIN users u ON p.user_id = u.id
           LEFT JOIN reviews rv ON rv.professional_id = p.id
           GROUP BY p.id
           ORDER BY p.fullname"#,
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default()
    .into_iter()
    .map(|row| ProfessionalView {
        id: row.id,
        fullname: row.fullname,
        service_name: row.service_name,
        experience_years: row.experience_years,
        pincode: row.pincode,
        email: row.email.unwrap_or_default(),
        approved: row.is_approved == 1,
        rating: match row.avg_rating {
            Some(avg) => format!("{avg:.1}"),
            None => "—".to_string(),
        },
        review_count: row.review_count,
    })
    .collect();

    let requests = sqlx::query_as::<_, ServiceRequestRow>(
        r#"SELECT r.id, r.customer_id, r.service_id, r.professional_id, r.requested_at, r.status,
                  c.fullname AS customer_name,
                  s.name AS service_name,
                  p.fullname AS professional_name
           FROM service_requests r
           LEFT JOIN customers c ON r.customer_id = c.id
           LEFT JOIN services s ON r.service_id = s.id
           LEFT JOIN professionals p ON r.professional_id = p.id
           ORDER BY r.requested_at DESC"#,
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default()
    .into_iter()
    .map(to_request_view)
    .collect();

    let activities = sqlx::query_as::<_, ActivityRow>(
        "SELECT message, created_at FROM activities ORDER BY created_at DESC LIMIT 10",
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default()
    .into_iter()
    .map(|row| ActivityView {
        message: row.message,
        created_at: row.created_at,
    })
    .collect();

    let flash = pop_flash(&req);
    Ok(render_with_flash(
        AdminDashboardTemplate {
            admin_email: auth.email.clone(),
            stats,
            services,
            professionals,
            requests,
            activities,
            flash: flash.clone(),
        },
        &flash,
    ))
}

async fn show_new_service() -> HttpResponse {
    render(NewServiceTemplate {
        form: ServiceFormView::default(),
        errors: Vec::new(),
    })
}

async fn create_service(
    state: web::Data<AppState>,
    form: web::Form<ServiceForm>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let mut errors = Vec::new();
    if form.name.trim().is_empty() {
        errors.push("Service name is required.".to_string());
    }
    let base_price: Option<f64> = form.base_price.trim().parse().ok();
    match base_price {
        Some(price) if price >= 0.0 => {}
        _ => errors.push("Base price must be a non-negative number.".to_string()),
    }

    if !errors.is_empty() {
        return Ok(render(NewServiceTemplate {
            form: ServiceFormView {
                name: form.name,
                description: form.description,
                base_price: form.base_price,
            },
            errors,
        }));
    }

    let description = form.description.trim();
    let result = sqlx::query(
        r#"INSERT INTO services (id, name, description, base_price)
           VALUES (?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(form.name.trim())
    .bind(if description.is_empty() { None } else { Some(description) })
    .bind(base_price.unwrap_or_default())
    .execute(&state.db)
    .await;

    if let Err(err) = result {
        return Ok(render(NewServiceTemplate {
            form: ServiceFormView {
                name: form.name,
                description: form.description,
                base_price: form.base_price,
            },
            errors: vec![format!("Failed to create service: {err}")],
        }));
    }

    log_activity(
        &state.db,
        "service_created",
        &format!("{} added service {}.", auth.email, form.name.trim()),
        Some(&auth.id),
    )
    .await;

    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/admin/dashboard"))
        .cookie(flash_cookie(Flash::ServiceAdded))
        .finish())
}

async fn approve_professional(
    state: web::Data<AppState>,
    path: web::Path<String>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    let professional_id = path.into_inner();

    let professional = sqlx::query_as::<_, (String,)>(
        "SELECT fullname FROM professionals WHERE id = ? LIMIT 1",
    )
    .bind(&professional_id)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None);

    let Some((fullname,)) = professional else {
        return Ok(HttpResponse::NotFound().body("Professional not found"));
    };

    sqlx::query("UPDATE professionals SET is_approved = 1 WHERE id = ?")
        .bind(&professional_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    log_activity(
        &state.db,
        "professional_approved",
        &format!("{} approved professional {}.", auth.email, fullname),
        Some(&auth.id),
    )
    .await;

    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/admin/dashboard"))
        .cookie(flash_cookie(Flash::ProfessionalApproved))
        .finish())
}

async fn professional_document(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let professional_id = path.into_inner();
    let row = sqlx::query_as::<_, (String,)>(
        "SELECT document_path FROM professionals WHERE id = ? LIMIT 1",
    )
    .bind(&professional_id)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None);

    let Some((document_path,)) = row else {
        return Ok(HttpResponse::NotFound().body("Professional not found"));
    };

    let file = NamedFile::open(document_path)?;
    Ok(file.into_response(&req))
}

fn to_service_view(row: ServiceRow) -> ServiceView {
    let description = row.description.unwrap_or_default();
    ServiceView {
        name: row.name,
        description: description.clone(),
        has_description: !description.trim().is_empty(),
        base_price: row.base_price,
    }
}

fn to_request_view(row: ServiceRequestRow) -> RequestView {
    RequestView {
        id: row.id,
        customer_name: row.customer_name.unwrap_or_default(),
        service_name: row.service_name.unwrap_or_default(),
        professional_name: row
            .professional_name
            .unwrap_or_else(|| "Unassigned".to_string()),
        requested_at: row.requested_at,
        status: row.status.as_str().to_string(),
    }
}

fn count(query: &str, state: &web::Data<AppState>) -> CountQuery {
    CountQuery {
        query: query.to_string(),
        state: state.clone(),
    }
}

struct CountQuery {
    query: String,
    state: web::Data<AppState>,
}

impl CountQuery {
    async fn run(self) -> i64 {
        sqlx::query_scalar::<_, i64>(&self.query)
            .fetch_one(&self.state.db)
            .await
            .unwrap_or(0)
    }
}
