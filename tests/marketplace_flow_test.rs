//! Database-backed marketplace flows driven through the HTTP router.
//!
//! Ignored by default; run with a Postgres `DATABASE_URL` and `--ignored`.

mod helpers;

use axum::http::{Method, StatusCode};
use helpers::*;
use serde_json::json;
use serde_json::Value;
use sqlx::PgPool;

async fn login(app: &TestApp, email: &str, password: &str) -> (StatusCode, Value) {
    app.call(
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": email, "password": password})),
    )
    .await
}

#[sqlx::test]
#[ignore]
async fn test_register_login_and_members(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let renter = app.register("Stage Builders", "user", "ops@stage.test").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "company_name": "Copycat",
                "account_type": "user",
                "name": "Someone",
                "email": "OPS@stage.test",
                "password": PASSWORD,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = login(&app, "ops@stage.test", "wrong password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = login(&app, " Ops@Stage.TEST ", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["email"], json!("ops@stage.test"));
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(uuid(&body["data"]["company"]["id"]), renter.company_id);
    assert_eq!(body["data"]["user"]["role"], json!("admin"));
    assert!(body["data"]["user"].get("password_hash").is_none());

    let (status, body) = app
        .post(
            "/api/company/members",
            &token,
            json!({"name": "Crew chief", "email": "crew@stage.test", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], json!("member"));

    let (_, body) = app.get("/api/company/members", &token).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test]
#[ignore]
async fn test_full_handshake_cancels_remaining_suppliers(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let market = Marketplace::create(&app).await;

    let detail = market.post_request(&app, 10, Some("1200.00")).await;
    assert_eq!(detail["rental_job"]["status"], json!("open"));
    assert_eq!(detail["supply_jobs"].as_array().unwrap().len(), 2);
    for view in detail["supply_jobs"].as_array().unwrap() {
        assert_eq!(view["latest_offer"]["version"], json!(1));
        assert_eq!(view["latest_offer"]["status"], json!("pending"));
    }

    let supply_a = supply_job_for(&detail, &market.provider_a);
    let supply_b = supply_job_for(&detail, &market.provider_b);

    // The renter sent v1, so only the provider may accept it
    let (status, _) = app
        .post(&format!("/api/supply-jobs/{}/handshake", supply_a), &market.renter.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(&format!("/api/supply-jobs/{}/handshake", supply_a), &market.provider_a.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let outcome = &body["data"];
    assert_eq!(outcome["rental_job"]["status"], json!("accepted"));
    assert_eq!(outcome["supply_job"]["handshake_status"], json!("accepted"));
    assert_eq!(outcome["committed"][0]["quantity"], json!(10));
    assert_eq!(outcome["auto_cancelled"], json!([supply_b.to_string()]));

    let (_, body) = app
        .get(&format!("/api/supply-jobs/{}", supply_b), &market.provider_b.token)
        .await;
    assert_eq!(body["data"]["supply_job"]["status"], json!("cancelled"));
    assert_eq!(body["data"]["supply_job"]["cancel_reason"], json!("request fully supplied"));
    assert_eq!(body["data"]["offers"][0]["status"], json!("cancelled"));

    let recipients = app.mail.recipients();
    for email in [&market.renter.email, &market.provider_a.email, &market.provider_b.email] {
        assert!(recipients.contains(email), "no mail for {}", email);
    }
}

#[sqlx::test]
#[ignore]
async fn test_offers_alternate_and_partial_handshakes_add_up(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let market = Marketplace::create(&app).await;

    let detail = market.post_request(&app, 10, None).await;
    let line_id = uuid(&detail["lines"][0]["id"]);
    let supply_a = supply_job_for(&detail, &market.provider_a);
    let supply_b = supply_job_for(&detail, &market.provider_b);

    let offers_a = format!("/api/supply-jobs/{}/offers", supply_a);
    let (status, body) = app
        .post(
            &offers_a,
            &market.provider_a.token,
            json!({
                "price": "900.00",
                "quantities": [{"rental_job_product_id": line_id, "quantity": 6}],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["version"], json!(1));

    // Same company again before the renter answers
    let (status, _) = app
        .post(&offers_a, &market.provider_a.token, json!({"price": "850.00"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Offering more than requested
    let (status, _) = app
        .post(
            &offers_a,
            &market.renter.token,
            json!({
                "price": "800.00",
                "quantities": [{"rental_job_product_id": line_id, "quantity": 11}],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(&offers_a, &market.renter.token, json!({"price": "800.00", "notes": "Budget is tight"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["version"], json!(2));

    let (status, body) = app
        .post(&format!("/api/supply-jobs/{}/handshake", supply_a), &market.provider_a.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["rental_job"]["status"], json!("partially_accepted"));
    assert_eq!(body["data"]["committed"][0]["quantity"], json!(6));
    assert_eq!(body["data"]["auto_cancelled"], json!([]));

    let (_, body) = app
        .get(&format!("/api/supply-jobs/{}", supply_a), &market.provider_a.token)
        .await;
    let statuses: Vec<_> = body["data"]["offers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["status"].clone())
        .collect();
    assert_eq!(statuses, vec![json!("countered"), json!("accepted")]);
    assert_eq!(body["data"]["supply_job"]["accepted_price"], json!("800.00"));

    // Provider B still offers the full 10 but only 4 remain
    let (status, _) = app
        .post(&format!("/api/supply-jobs/{}/offers", supply_b), &market.provider_b.token, json!({"price": "500.00"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app
        .post(&format!("/api/supply-jobs/{}/handshake", supply_b), &market.renter.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["committed"][0]["quantity"], json!(4));
    assert_eq!(body["data"]["rental_job"]["status"], json!("accepted"));

    let rental_id = detail["rental_job"]["id"].as_str().unwrap();
    let (_, body) = app
        .get(&format!("/api/rental-jobs/{}", rental_id), &market.renter.token)
        .await;
    assert_eq!(body["data"]["lines"][0]["fulfilled_quantity"], json!(10));
    assert_eq!(body["data"]["lines"][0]["requested_quantity"], json!(10));
}

#[sqlx::test]
#[ignore]
async fn test_concurrent_handshakes_never_overfill_a_line(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let market = Marketplace::create(&app).await;

    // Both providers hold the renter's v1 for all 10 units
    let detail = market.post_request(&app, 10, Some("700.00")).await;
    let rental_id = detail["rental_job"]["id"].as_str().unwrap().to_string();
    let uri_a = format!("/api/supply-jobs/{}/handshake", supply_job_for(&detail, &market.provider_a));
    let uri_b = format!("/api/supply-jobs/{}/handshake", supply_job_for(&detail, &market.provider_b));

    let ((status_a, _), (status_b, _)) = tokio::join!(
        app.post(&uri_a, &market.provider_a.token, json!({})),
        app.post(&uri_b, &market.provider_b.token, json!({})),
    );
    let mut statuses = vec![status_a, status_b];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

    let (_, body) = app
        .get(&format!("/api/rental-jobs/{}", rental_id), &market.renter.token)
        .await;
    assert_eq!(body["data"]["rental_job"]["status"], json!("accepted"));
    assert_eq!(body["data"]["lines"][0]["fulfilled_quantity"], json!(10));
}

#[sqlx::test]
#[ignore]
async fn test_offer_prices_must_fit_two_decimals(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let market = Marketplace::create(&app).await;

    let detail = market.post_request(&app, 1, None).await;
    let offers = format!("/api/supply-jobs/{}/offers", supply_job_for(&detail, &market.provider_a));

    let (status, _) = app
        .post(&offers, &market.provider_a.token, json!({"price": "99.999"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post(&offers, &market.provider_a.token, json!({"price": "10000000000.00"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = app
        .post(&offers, &market.provider_a.token, json!({"price": "99.990"}))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["price"], json!("99.99"));
}

#[sqlx::test]
#[ignore]
async fn test_cancel_complete_and_rate(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let market = Marketplace::create(&app).await;

    let detail = market.post_request(&app, 3, Some("300.00")).await;
    let supply_a = supply_job_for(&detail, &market.provider_a);
    let supply_b = supply_job_for(&detail, &market.provider_b);

    // The sender of a pending offer can't walk away from it
    let (status, _) = app
        .post(&format!("/api/supply-jobs/{}/cancel", supply_b), &market.renter.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            &format!("/api/supply-jobs/{}/cancel", supply_b),
            &market.provider_b.token,
            json!({"reason": "Fleet booked out"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], json!("cancelled"));
    assert_eq!(body["data"]["cancel_reason"], json!("Fleet booked out"));

    let (status, _) = app
        .post(&format!("/api/supply-jobs/{}/rating", supply_b), &market.renter.token, json!({"score": 1}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .post(&format!("/api/supply-jobs/{}/handshake", supply_a), &market.provider_a.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Only the provider dispatches, only the renter confirms completion
    let (status, _) = app
        .post(&format!("/api/supply-jobs/{}/start", supply_a), &market.renter.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .post(&format!("/api/supply-jobs/{}/start", supply_a), &market.provider_a.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("in_progress"));

    let (status, body) = app
        .post(&format!("/api/supply-jobs/{}/complete", supply_a), &market.renter.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], json!("completed"));

    let (_, body) = app.get("/api/rental-jobs?status=completed", &market.renter.token).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let rating_uri = format!("/api/supply-jobs/{}/rating", supply_a);
    let (status, _) = app
        .post(&rating_uri, &market.renter.token, json!({"score": 6}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post(&rating_uri, &market.provider_a.token, json!({"score": 5}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(&rating_uri, &market.renter.token, json!({"score": 4, "comment": "On time"}))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let (status, _) = app
        .post(&rating_uri, &market.renter.token, json!({"score": 5}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app
        .get(
            &format!("/api/companies/{}/ratings", market.provider_a.company_id),
            &market.provider_b.token,
        )
        .await;
    assert_eq!(body["data"]["rating_count"], json!(1));
    assert_eq!(body["data"]["recent"][0]["comment"], json!("On time"));
}

#[sqlx::test]
#[ignore]
async fn test_rental_job_cancellation_before_handshake(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let market = Marketplace::create(&app).await;

    let detail = market.post_request(&app, 2, Some("150.00")).await;
    let rental_id = detail["rental_job"]["id"].as_str().unwrap().to_string();
    let cancel_uri = format!("/api/rental-jobs/{}/cancel", rental_id);

    let (status, _) = app.post(&cancel_uri, &market.provider_a.token, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post(&cancel_uri, &market.renter.token, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], json!("cancelled"));

    let (_, body) = app.get("/api/supply-jobs?status=cancelled", &market.provider_a.token).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Nothing left to negotiate
    let supply_a = supply_job_for(&detail, &market.provider_a);
    let (status, _) = app
        .post(&format!("/api/supply-jobs/{}/handshake", supply_a), &market.provider_a.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test]
#[ignore]
async fn test_catalog_crud_and_import(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let market = Marketplace::create(&app).await;
    let provider = &market.provider_a;

    let (status, body) = app
        .post(
            "/api/products",
            &provider.token,
            json!({"name": "Scissor Lift 8m", "category": "access", "quantity": 2, "daily_price": "95.00"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let lift_id = uuid(&body["data"]["id"]);

    let (status, _) = app
        .post("/api/products", &market.renter.token, json!({"name": "Forklift", "quantity": 1}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            "/api/products/import",
            &provider.token,
            json!({"rows": [
                {"name": "scissor lift 8m", "quantity": 5},
                {"name": "Scissor-Lift 8M", "quantity": 1},
                {"name": "LED Par Can", "category": "lighting", "quantity": 40, "daily_price": "4.50"},
                {"name": "", "quantity": 3},
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let report = &body["data"];
    assert_eq!(report["created"], json!(1));
    assert_eq!(report["updated"], json!(1));
    assert_eq!(report["merged"], json!(1));
    assert_eq!(report["skipped"][0]["row"], json!(4));

    let (_, body) = app.get(&format!("/api/products/{}", lift_id), &provider.token).await;
    assert_eq!(body["data"]["quantity"], json!(6));
    assert_eq!(body["data"]["name"], json!("Scissor Lift 8m"));
    assert_eq!(body["data"]["daily_price"], json!("95.00"));

    let (_, body) = app.get("/api/products?q=par&category=lighting", &market.renter.token).await;
    assert_eq!(body["data"]["total"], json!(1));
    assert_eq!(body["data"]["items"][0]["company_name"], json!("Lift Hire"));

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/products/{}", lift_id), Some(&market.provider_b.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .call(Method::DELETE, &format!("/api/products/{}", lift_id), Some(&provider.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/products?q=lift", &market.renter.token).await;
    assert_eq!(body["data"]["total"], json!(0));

    let (_, body) = app.get("/api/providers", &market.renter.token).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test]
#[ignore]
async fn test_platform_admin_deactivates_company(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let market = Marketplace::create(&app).await;
    let admin = app.register("Subrent Ops", "user", PLATFORM_ADMIN_EMAIL).await;
    let detail = market.post_request(&app, 4, Some("400.00")).await;
    let offers_b = format!("/api/supply-jobs/{}/offers", supply_job_for(&detail, &market.provider_b));

    let (status, body) = app.get("/admin/companies?account_type=provider", &admin.token).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .post(
            &format!("/admin/companies/{}/active", market.provider_b.company_id),
            &admin.token,
            json!({"is_active": false}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], json!(false));

    let (status, _) = login(&app, &market.provider_b.email, PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Tokens issued before the deactivation stop working too
    let (status, body) = app
        .post(&offers_b, &market.provider_b.token, json!({"price": "350.00"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("Forbidden: Company is deactivated"));
    let (status, _) = app.get("/api/supply-jobs", &market.provider_b.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A deactivated provider can't be sent new requests
    let (status, _) = app
        .post(
            "/api/rental-jobs",
            &market.renter.token,
            json!({
                "title": "Corporate gala",
                "start_date": "2026-09-10",
                "end_date": "2026-09-11",
                "lines": [{"name": "Uplighter", "quantity": 12}],
                "provider_ids": [market.provider_b.company_id],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/rental-jobs",
            &market.renter.token,
            json!({
                "title": "Corporate gala",
                "start_date": "2026-09-10",
                "end_date": "2026-09-11",
                "lines": [{"name": "Uplighter", "quantity": 12}],
                "provider_ids": [market.provider_a.company_id],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, body) = app.get("/admin/rental-jobs?status=open", &admin.token).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .post(
            &format!("/admin/companies/{}/active", market.provider_b.company_id),
            &admin.token,
            json!({"is_active": true}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .post(&offers_b, &market.provider_b.token, json!({"price": "350.00"}))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
}
