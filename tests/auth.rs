use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use choreforge::auth::{AccessAuthority, AuthMiddleware, AuthResponse, LoginResponse};
use choreforge::config::AuthSettings;
use choreforge::routes;
use choreforge::routes::health;
use choreforge::store::{InMemoryIdentityStore, InMemoryTaskStore, TaskStore};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;

fn settings() -> AuthSettings {
    AuthSettings {
        signing_key: SecretString::from("integration-test-secret".to_string()),
        token_ttl: chrono::Duration::hours(24),
        hash_cost: 4,
        store_timeout: Duration::from_secs(1),
        resolve_subject: true,
    }
}

fn app_state() -> (web::Data<AccessAuthority>, web::Data<dyn TaskStore>) {
    let authority = AccessAuthority::new(Arc::new(InMemoryIdentityStore::new()), &settings());
    let tasks: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
    (web::Data::new(authority), web::Data::from(tasks))
}

#[actix_rt::test]
async fn test_register_and_login_flow() {
    let (authority, tasks) = app_state();
    let app = test::init_service(
        App::new()
            .app_data(authority.clone())
            .app_data(tasks.clone())
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            ),
    )
    .await;

    let register_payload = json!({
        "email": "a@x.com",
        "password": "Password123!",
        "first_name": "Ada",
        "last_name": "Lovelace"
    });
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&register_payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    assert_eq!(
        status,
        StatusCode::CREATED,
        "Registration failed. Body: {:?}",
        String::from_utf8_lossy(&body)
    );
    let registered: AuthResponse = serde_json::from_slice(&body).unwrap();
    assert!(!registered.token.is_empty());

    // Same email again, different case.
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "email": "A@X.com",
            "password": "Password123!",
            "first_name": "Ada",
            "last_name": "Lovelace"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Login is case-insensitive on the email.
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "A@X.com", "password": "Password123!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let login: LoginResponse = test::read_body_json(resp).await;
    assert_eq!(login.user_id, registered.user_id);
    assert_eq!(login.email, "a@x.com");
    assert_eq!(login.first_name, "Ada");

    // The token unlocks the caller's own profile.
    let req = test::TestRequest::get()
        .uri(&format!("/api/auth/user/{}", login.user_id))
        .append_header(("Authorization", format!("Bearer {}", login.token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let profile: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(profile["email"], "a@x.com");
    assert!(profile.get("credential_verifier").is_none());
}

#[actix_rt::test]
async fn test_signup_alias_for_web_client() {
    let (authority, tasks) = app_state();
    let app = test::init_service(
        App::new()
            .app_data(authority.clone())
            .app_data(tasks.clone())
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            ),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({
            "email": "web@x.com",
            "password": "Password123!",
            "first_name": "Web",
            "last_name": "Client"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["userId"].is_string());

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "web@x.com", "password": "Password123!" }))
        .to_request();
    let login: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(login["userId"], body["userId"]);
    assert_eq!(login["first_name"], "Web");
}

#[actix_rt::test]
async fn test_profile_of_another_user_is_rejected() {
    let (authority, tasks) = app_state();
    let app = test::init_service(
        App::new()
            .app_data(authority.clone())
            .app_data(tasks.clone())
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            ),
    )
    .await;

    let mut accounts = Vec::new();
    for email in ["a@x.com", "b@x.com"] {
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "email": email,
                "password": "Password123!",
                "first_name": "Test",
                "last_name": "User"
            }))
            .to_request();
        let registered: AuthResponse = test::call_and_read_body_json(&app, req).await;
        accounts.push(registered);
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/auth/user/{}", accounts[1].user_id))
        .append_header(("Authorization", format!("Bearer {}", accounts[0].token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_invalid_registration_inputs() {
    let (authority, tasks) = app_state();
    let app = test::init_service(
        App::new()
            .app_data(authority.clone())
            .app_data(tasks.clone())
            .service(web::scope("/api").configure(routes::config)),
    )
    .await;

    let test_cases = vec![
        // Deserialization errors (400 for missing fields)
        (
            json!({ "password": "Password123!", "first_name": "A", "last_name": "B" }),
            StatusCode::BAD_REQUEST,
            "missing email",
        ),
        (
            json!({ "email": "test@example.com", "first_name": "A", "last_name": "B" }),
            StatusCode::BAD_REQUEST,
            "missing password",
        ),
        (
            json!({ "email": "test@example.com", "password": "Password123!", "last_name": "B" }),
            StatusCode::BAD_REQUEST,
            "missing first name",
        ),
        // Validation errors (422 after successful deserialization)
        (
            json!({ "email": "invalid-email", "password": "Password123!", "first_name": "A", "last_name": "B" }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid email format",
        ),
        (
            json!({ "email": "test@example.com", "password": "123", "first_name": "A", "last_name": "B" }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "password too short",
        ),
        (
            json!({ "email": "test@example.com", "password": "Password123!", "first_name": "", "last_name": "B" }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "empty first name",
        ),
        (
            json!({ "email": "test@example.com", "password": "Password123!", "first_name": "A1!", "last_name": "B" }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "first name with invalid chars",
        ),
        (
            json!({ "email": "test@example.com", "password": "a".repeat(73), "first_name": "A", "last_name": "B" }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "password longer than 72 bytes",
        ),
    ];

    for (payload, expected_status, description) in test_cases {
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(&payload)
            .to_request();

        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body_bytes = test::read_body(resp).await;

        assert_eq!(
            status,
            expected_status,
            "Test case failed: {}. Body: {:?}",
            description,
            String::from_utf8_lossy(&body_bytes)
        );
    }
}

#[actix_rt::test]
async fn test_invalid_login_inputs() {
    let (authority, tasks) = app_state();
    authority
        .register(
            "login_test_user@example.com",
            "Password123!",
            "Login".into(),
            "Tester".into(),
        )
        .await
        .unwrap();

    let app = test::init_service(
        App::new()
            .app_data(authority.clone())
            .app_data(tasks.clone())
            .service(web::scope("/api").configure(routes::config)),
    )
    .await;

    let test_cases = vec![
        (
            json!({ "password": "Password123!" }),
            StatusCode::BAD_REQUEST,
            "missing email",
        ),
        (
            json!({ "email": "login_test_user@example.com" }),
            StatusCode::BAD_REQUEST,
            "missing password",
        ),
        (
            json!({ "email": "invalid-email", "password": "Password123!" }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid email format",
        ),
        (
            json!({ "email": "login_test_user@example.com", "password": "WrongPassword123!" }),
            StatusCode::UNAUTHORIZED,
            "incorrect password",
        ),
        (
            json!({ "email": "nonexistent@example.com", "password": "Password123!" }),
            StatusCode::UNAUTHORIZED,
            "non-existent user",
        ),
    ];

    let mut unauthorized_bodies = Vec::new();
    for (payload, expected_status, description) in test_cases {
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(&payload)
            .to_request();

        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body_bytes = test::read_body(resp).await;

        assert_eq!(
            status,
            expected_status,
            "Test case failed: {}. Body: {:?}",
            description,
            String::from_utf8_lossy(&body_bytes)
        );
        if status == StatusCode::UNAUTHORIZED {
            unauthorized_bodies.push(body_bytes);
        }
    }

    // Wrong password and unknown email must be indistinguishable.
    assert_eq!(unauthorized_bodies.len(), 2);
    assert_eq!(unauthorized_bodies[0], unauthorized_bodies[1]);
}

#[actix_rt::test]
async fn test_change_password() {
    let (authority, tasks) = app_state();
    let app = test::init_service(
        App::new()
            .app_data(authority.clone())
            .app_data(tasks.clone())
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            ),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "email": "pw@x.com",
            "password": "OldPassword1",
            "first_name": "Pat",
            "last_name": "Word"
        }))
        .to_request();
    let registered: AuthResponse = test::call_and_read_body_json(&app, req).await;
    let bearer = format!("Bearer {}", registered.token);

    let req = test::TestRequest::put()
        .uri("/api/auth/password")
        .append_header(("Authorization", bearer.clone()))
        .set_json(json!({ "current_password": "not-it", "new_password": "NewPassword1" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::put()
        .uri("/api/auth/password")
        .append_header(("Authorization", bearer))
        .set_json(json!({ "current_password": "OldPassword1", "new_password": "NewPassword1" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NO_CONTENT
    );

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "pw@x.com", "password": "NewPassword1" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}
