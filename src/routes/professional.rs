use actix_web::{http::header, middleware::from_fn, web, HttpRequest, HttpResponse, Result};
use askama::Template;

use crate::{
    auth::{flash_cookie, professional_guard, AuthUser, Flash},
    db::{fetch_professional_by_user, log_activity},
    models::{RequestStatus, ServiceRequestRow},
    state::AppState,
    templates::{pop_flash, render_with_flash, FlashView},
};

#[derive(Clone, Debug)]
struct StatCard {
    label: String,
    value: i64,
}

#[derive(Clone, Debug)]
struct RequestView {
    id: String,
    customer_name: String,
    service_name: String,
    requested_at: String,
    status: String,
}

#[derive(Template)]
#[template(path = "professional_dashboard.html")]
struct ProfessionalDashboardTemplate {
    professional_name: String,
    service_name: String,
    approved: bool,
    stats: Vec<StatCard>,
    open: Vec<RequestView>,
    active: Vec<RequestView>,
    closed: Vec<RequestView>,
    flash: FlashView,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/professional")
            .wrap(from_fn(professional_guard))
            .service(web::resource("").route(web::get().to(index)))
            .service(web::resource("/").route(web::get().to(index)))
            .service(web::resource("/dashboard").route(web::get().to(dashboard)))
            .service(web::resource("/requests/{id}/accept").route(web::post().to(accept_request)))
            .service(web::resource("/requests/{id}/close").route(web::post().to(close_request))),
    );
}

async fn index() -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, "/professional/dashboard"))
        .finish()
}

async fn dashboard(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let Some(professional) = fetch_professional_by_user(&state.db, &auth.id).await else {
        return Ok(HttpResponse::NotFound().body("Professional profile not found"));
    };

    let total = count(
        "SELECT COUNT(*) FROM service_requests WHERE professional_id = ?",
        &state,
        &professional.id,
    )
    .await;
    let accepted = count(
        "SELECT COUNT(*) FROM service_requests WHERE professional_id = ? AND status = 'accepted'",
        &state,
        &professional.id,
    )
    .await;
    let closed = count(
        "SELECT COUNT(*) FROM service_requests WHERE professional_id = ? AND status = 'closed'",
        &state,
        &professional.id,
    )
    .await;

    let stats = vec![
        StatCard {
            label: "Assigned requests".to_string(),
            value: total,
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

    // Open pool: unassigned requests plus anything already pointed at this
    // professional but not yet accepted.
    let open = fetch_requests(
        &state,
        r#"WHERE (r.professional_id = ? OR r.professional_id IS NULL) AND r.status = 'requested'"#,
        &professional.id,
    )
    .await;
    let active = fetch_requests(
        &state,
        r#"WHERE r.professional_id = ? AND r.status = 'accepted'"#,
        &professional.id,
    )
    .await;
    let closed_list = fetch_requests(
        &state,
        r#"WHERE r.professional_id = ? AND r.status = 'closed'"#,
        &professional.id,
    )
    .await;

    let flash = pop_flash(&req);
    Ok(render_with_flash(
        ProfessionalDashboardTemplate {
            professional_name: professional.fullname,
            service_name: professional.service_name,
            approved: professional.is_approved == 1,
            stats,
            open,
            active,
            closed: closed_list,
            flash: flash.clone(),
        },
        &flash,
    ))
}

async fn accept_request(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let request_id = path.into_inner();

    let Some(professional) = fetch_professional_by_user(&state.db, &auth.id).await else {
        return Ok(HttpResponse::NotFound().body("Professional profile not found"));
    };

    if professional.is_approved != 1 {
        return Ok(HttpResponse::SeeOther()
            .append_header((header::LOCATION, "/professional/dashboard"))
            .cookie(flash_cookie(Flash::ApprovalPending))
            .finish());
    }

    let current = sqlx::query_as::<_, (Option<String>, RequestStatus)>(
        "SELECT professional_id, status FROM service_requests WHERE id = ?",
    )
    .bind(&request_id)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None);

    let Some((assigned_to, status)) = current else {
        return Ok(HttpResponse::NotFound().body("Service request not found"));
    };

    if status != RequestStatus::Requested {
        return Ok(HttpResponse::BadRequest().body("Invalid status"));
    }
    let can_take =
        assigned_to.is_none() || assigned_to.as_deref() == Some(professional.id.as_str());
    if !can_take {
        return Ok(HttpResponse::Forbidden().body("Not allowed"));
    }

    sqlx::query("UPDATE service_requests SET status = ?, professional_id = ? WHERE id = ?")
        .bind(RequestStatus::Accepted)
        .bind(&professional.id)
        .bind(&request_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    log_activity(
        &state.db,
        "request_accepted",
        &format!("{} accepted service request {}.", professional.fullname, request_id),
        Some(&auth.id),
    )
    .await;

    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/professional/dashboard"))
        .cookie(flash_cookie(Flash::RequestAccepted))
        .finish())
}

async fn close_request(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let request_id = path.into_inner();

    let Some(professional) = fetch_professional_by_user(&state.db, &auth.id).await else {
        return Ok(HttpResponse::NotFound().body("Professional profile not found"));
    };

    let current = sqlx::query_as::<_, (Option<String>, RequestStatus)>(
        "SELECT professional_id, status FROM service_requests WHERE id = ?",
    )
    .bind(&request_id)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None);

    let Some((assigned_to, status)) = current else {
        return Ok(HttpResponse::NotFound().body("Service request not found"));
    };

    if assigned_to.as_deref() != Some(professional.id.as_str()) {
        return Ok(HttpResponse::Forbidden().body("Not allowed"));
    }
    if status != RequestStatus::Accepted {
        return Ok(HttpResponse::BadRequest().body("Invalid status"));
    }

    sqlx::query("UPDATE service_requests SET status = ? WHERE id = ?")
        .bind(RequestStatus::Closed)
        .bind(&request_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    log_activity(
        &state.db,
        "request_closed",
        &format!("{} closed service request {}.", professional.fullname, request_id),
        Some(&auth.id),
    )
    .await;

    Ok(HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/professional/dashboard"))
        .cookie(flash_cookie(Flash::RequestClosed))
        .finish())
}

async fn fetch_requests(
    state: &web::Data<AppState>,
    where_clause: &str,
    professional_id: &str,
) -> Vec<RequestView> {
    let query = format!(
        r#"SELECT r.id, r.customer_id, r.service_id, r.professional_id, r.requested_at, r.status,
                  c.fullname AS customer_name,
                  s.name AS service_name,
                  NULL AS professional_name
           FROM service_requests r
           LEFT JOIN customers c ON r.customer_id = c.id
           LEFT JOIN services s ON r.service_id = s.id
           {where_clause}
           ORDER BY r.requested_at DESC"#
    );

    sqlx::query_as::<_, ServiceRequestRow>(&query)
        .bind(professional_id)
        .fetch_all(&state.db)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|row| RequestView {
            id: row.id,
            customer_name: row.customer_name.unwrap_or_default(),
            service_name: row.service_name.unwrap_or_default(),
            requested_at: row.requested_at,
            status: row.status.as_str().to_string(),
        })
        .collect()
}

async fn count(query: &str, state: &web::Data<AppState>, param: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(query)
        .bind(param)
        .fetch_one(&state.db)
        .await
        .unwrap_or(0)
}
