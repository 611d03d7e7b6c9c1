//! Service catalog, booking lifecycle, approval gating, and rating flows.

mod common;

use actix_web::{
    http::{header, StatusCode},
    test, App,
};

use homecall::db;

async fn login_cookie(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
    password: &str,
) -> actix_web::cookie::Cookie<'static> {
    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("email", email), ("password", password)])
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    common::session_cookie(&resp)
}

#[actix_web::test]
async fn admin_adds_a_service_and_duplicates_are_rejected() {
    let state = common::test_state().await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(homecall::configure_app))
            .await;

    db::seed_admin(&state.db).await.expect("seed admin");
    let admin = login_cookie(&app, "admin@homecall.local", "admin").await;

    let req = test::TestRequest::post()
        .uri("/admin/service/new")
        .cookie(admin.clone())
        .set_form([
            ("name", "Deep Cleaning"),
            ("description", "Full home deep clean"),
            ("base_price", "499"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "/admin/dashboard"
    );

    let (price,): (f64,) = sqlx::query_as("SELECT base_price FROM services WHERE name = ?")
        .bind("Deep Cleaning")
        .fetch_one(&state.db)
        .await
        .expect("service row");
    assert_eq!(price, 499.0);

    let req = test::TestRequest::post()
        .uri("/admin/service/new")
        .cookie(admin)
        .set_form([
            ("name", "Deep Cleaning"),
            ("description", ""),
            ("base_price", "99"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(String::from_utf8_lossy(&body).contains("Failed to create service"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM services")
        .fetch_one(&state.db)
        .await
        .expect("service count");
    assert_eq!(count, 1);
}

#[actix_web::test]
async fn customer_books_a_service() {
    let state = common::test_state().await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(homecall::configure_app))
            .await;

    let (_, customer_id) = common::create_customer(&state.db, "a@b.com", "x123", "Asha Rao").await;
    let service_id = common::create_service(&state.db, "Deep Cleaning", 499.0).await;
    let cookie = login_cookie(&app, "a@b.com", "x123").await;

    let req = test::TestRequest::post()
        .uri("/customer/book")
        .cookie(cookie)
        .set_form([("service_id", service_id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "/customer/dashboard"
    );

    let (found_customer, professional_id, status): (String, Option<String>, String) =
        sqlx::query_as(
            "SELECT customer_id, professional_id, status FROM service_requests WHERE service_id = ?",
        )
        .bind(&service_id)
        .fetch_one(&state.db)
        .await
        .expect("request row");
    assert_eq!(found_customer, customer_id);
    assert_eq!(professional_id, None);
    assert_eq!(status, "requested");
}

#[actix_web::test]
async fn booking_an_unknown_service_is_a_404() {
    let state = common::test_state().await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(homecall::configure_app))
            .await;

    common::create_customer(&state.db, "a@b.com", "x123", "Asha Rao").await;
    let cookie = login_cookie(&app, "a@b.com", "x123").await;

    let req = test::TestRequest::post()
        .uri("/customer/book")
        .cookie(cookie)
        .set_form([("service_id", "no-such-service")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn unapproved_professional_cannot_accept_requests() {
    let state = common::test_state().await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(homecall::configure_app))
            .await;

    let (_, customer_id) = common::create_customer(&state.db, "a@b.com", "x123", "Asha Rao").await;
    common::create_professional(&state.db, "ravi@example.com", "x123", "Ravi Kumar", false).await;
    let service_id = common::create_service(&state.db, "Plumbing", 299.0).await;
    let request_id =
        common::create_request(&state.db, &customer_id, &service_id, None, "requested").await;

    let cookie = login_cookie(&app, "ravi@example.com", "x123").await;
    let req = test::TestRequest::post()
        .uri(&format!("/professional/requests/{request_id}/accept"))
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "/professional/dashboard"
    );

    let (professional_id, status): (Option<String>, String) =
        sqlx::query_as("SELECT professional_id, status FROM service_requests WHERE id = ?")
            .bind(&request_id)
            .fetch_one(&state.db)
            .await
            .expect("request row");
    assert_eq!(professional_id, None);
    assert_eq!(status, "requested");
}

#[actix_web::test]
async fn approval_unlocks_accept_and_close() {
    let state = common::test_state().await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(homecall::configure_app))
            .await;

    let (_, customer_id) = common::create_customer(&state.db, "a@b.com", "x123", "Asha Rao").await;
    let (_, professional_id) =
        common::create_professional(&state.db, "ravi@example.com", "x123", "Ravi Kumar", false)
            .await;
    let service_id = common::create_service(&state.db, "Plumbing", 299.0).await;
    let request_id =
        common::create_request(&state.db, &customer_id, &service_id, None, "requested").await;

    db::seed_admin(&state.db).await.expect("seed admin");
    let admin = login_cookie(&app, "admin@homecall.local", "admin").await;
    let req = test::TestRequest::post()
        .uri(&format!("/admin/professionals/{professional_id}/approve"))
        .cookie(admin)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let approved: i64 = sqlx::query_scalar("SELECT is_approved FROM professionals WHERE id = ?")
        .bind(&professional_id)
        .fetch_one(&state.db)
        .await
        .expect("approved flag");
    assert_eq!(approved, 1);

    let professional = login_cookie(&app, "ravi@example.com", "x123").await;
    let req = test::TestRequest::post()
        .uri(&format!("/professional/requests/{request_id}/accept"))
        .cookie(professional.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let (assigned, status): (Option<String>, String) =
        sqlx::query_as("SELECT professional_id, status FROM service_requests WHERE id = ?")
            .bind(&request_id)
            .fetch_one(&state.db)
            .await
            .expect("request row");
    assert_eq!(assigned.as_deref(), Some(professional_id.as_str()));
    assert_eq!(status, "accepted");

    let req = test::TestRequest::post()
        .uri(&format!("/professional/requests/{request_id}/close"))
        .cookie(professional)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let status: String = sqlx::query_scalar("SELECT status FROM service_requests WHERE id = ?")
        .bind(&request_id)
        .fetch_one(&state.db)
        .await
        .expect("status");
    assert_eq!(status, "closed");
}

#[actix_web::test]
async fn only_the_assigned_professional_can_close() {
    let state = common::test_state().await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(homecall::configure_app))
            .await;

    let (_, customer_id) = common::create_customer(&state.db, "a@b.com", "x123", "Asha Rao").await;
    let (_, assigned_id) =
        common::create_professional(&state.db, "ravi@example.com", "x123", "Ravi Kumar", true)
            .await;
    common::create_professional(&state.db, "meena@example.com", "x123", "Meena Iyer", true).await;
    let service_id = common::create_service(&state.db, "Plumbing", 299.0).await;
    let request_id = common::create_request(
        &state.db,
        &customer_id,
        &service_id,
        Some(&assigned_id),
        "accepted",
    )
    .await;

    let other = login_cookie(&app, "meena@example.com", "x123").await;
    let req = test::TestRequest::post()
        .uri(&format!("/professional/requests/{request_id}/close"))
        .cookie(other)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let status: String = sqlx::query_scalar("SELECT status FROM service_requests WHERE id = ?")
        .bind(&request_id)
        .fetch_one(&state.db)
        .await
        .expect("status");
    assert_eq!(status, "accepted");
}

#[actix_web::test]
async fn accept_is_rejected_once_the_request_moved_on() {
    let state = common::test_state().await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(homecall::configure_app))
            .await;

    let (_, customer_id) = common::create_customer(&state.db, "a@b.com", "x123", "Asha Rao").await;
    let (_, professional_id) =
        common::create_professional(&state.db, "ravi@example.com", "x123", "Ravi Kumar", true)
            .await;
    let service_id = common::create_service(&state.db, "Plumbing", 299.0).await;
    let request_id = common::create_request(
        &state.db,
        &customer_id,
        &service_id,
        Some(&professional_id),
        "closed",
    )
    .await;

    let cookie = login_cookie(&app, "ravi@example.com", "x123").await;
    let req = test::TestRequest::post()
        .uri(&format!("/professional/requests/{request_id}/accept"))
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn rating_takes_the_professional_from_the_request_row() {
    let state = common::test_state().await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(homecall::configure_app))
            .await;

    let (_, customer_id) = common::create_customer(&state.db, "a@b.com", "x123", "Asha Rao").await;
    let (_, professional_id) =
        common::create_professional(&state.db, "ravi@example.com", "x123", "Ravi Kumar", true)
            .await;
    let service_id = common::create_service(&state.db, "Plumbing", 299.0).await;
    let request_id = common::create_request(
        &state.db,
        &customer_id,
        &service_id,
        Some(&professional_id),
        "closed",
    )
    .await;

    let cookie = login_cookie(&app, "a@b.com", "x123").await;
    // The forged professional_id field must be ignored.
    let req = test::TestRequest::post()
        .uri("/customer/rate")
        .cookie(cookie)
        .set_form([
            ("service_request_id", request_id.as_str()),
            ("rating", "5"),
            ("comments", "Quick and tidy work"),
            ("professional_id", "forged-professional"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "/customer/dashboard"
    );

    let reviews: Vec<(String, i64)> = sqlx::query_as(
        "SELECT professional_id, rating FROM reviews WHERE service_request_id = ?",
    )
    .bind(&request_id)
    .fetch_all(&state.db)
    .await
    .expect("review rows");
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].0, professional_id);
    assert_eq!(reviews[0].1, 5);
}

#[actix_web::test]
async fn rating_validation_and_missing_request_handling() {
    let state = common::test_state().await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(homecall::configure_app))
            .await;

    common::create_customer(&state.db, "a@b.com", "x123", "Asha Rao").await;
    let cookie = login_cookie(&app, "a@b.com", "x123").await;

    let req = test::TestRequest::post()
        .uri("/customer/rate")
        .cookie(cookie.clone())
        .set_form([
            ("service_request_id", "whatever"),
            ("rating", "9"),
            ("comments", ""),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/customer/rate")
        .cookie(cookie)
        .set_form([
            ("service_request_id", "no-such-request"),
            ("rating", "4"),
            ("comments", ""),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn rating_an_unassigned_request_fails_on_the_constraint() {
    let state = common::test_state().await;
    let app =
        test::init_service(App::new().app_data(state.clone()).configure(homecall::configure_app))
            .await;

    let (_, customer_id) = common::create_customer(&state.db, "a@b.com", "x123", "Asha Rao").await;
    let service_id = common::create_service(&state.db, "Plumbing", 299.0).await;
    let request_id =
        common::create_request(&state.db, &customer_id, &service_id, None, "requested").await;

    let cookie = login_cookie(&app, "a@b.com", "x123").await;
    let req = test::TestRequest::post()
        .uri("/customer/rate")
        .cookie(cookie)
        .set_form([
            ("service_request_id", request_id.as_str()),
            ("rating", "3"),
            ("comments", ""),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    // professional_id is NOT NULL on reviews; the insert fails and the
    // request surfaces it as a 500.
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
