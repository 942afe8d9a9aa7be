//! Signup, verification, password reset and profile endpoints

mod common;

use common::{create_test_server, PASSWORD};
use scan_core::Role;
use serde_json::{json, Value};

fn signup_body(email: &str, role: &str) -> Value {
    json!({
        "email": email,
        "password": PASSWORD,
        "name": "Asha",
        "contactNumber": "555-0000",
        "role": role,
    })
}

/// Test: unverified accounts cannot log in until they follow the link
#[tokio::test]
async fn test_signup_requires_verification() {
    let app = create_test_server();

    let response = app
        .server
        .post("/api/auth/signup")
        .json(&signup_body("a@x.com", "Citizen"))
        .await;
    assert_eq!(response.status_code(), 201);
    assert_eq!(response.json::<Value>()["user"]["isVerified"], false);

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "a@x.com", "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), 403);

    let token = app.email.link_token("a@x.com").unwrap();
    let response = app
        .server
        .post("/api/auth/verify-email")
        .json(&json!({ "token": token }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>()["pendingApproval"], false);

    app.login("a@x.com").await;
}

/// Test: duplicate emails and bad input are refused
#[tokio::test]
async fn test_signup_rejections() {
    let app = create_test_server();
    app.server
        .post("/api/auth/signup")
        .json(&signup_body("a@x.com", "Citizen"))
        .await;

    let response = app
        .server
        .post("/api/auth/signup")
        .json(&signup_body("a@x.com", "Citizen"))
        .await;
    assert_eq!(response.status_code(), 409);

    let response = app
        .server
        .post("/api/auth/signup")
        .json(&signup_body("b@x.com", "Admin"))
        .await;
    assert_eq!(response.status_code(), 400);

    let mut short = signup_body("c@x.com", "Citizen");
    short["password"] = json!("short");
    let response = app.server.post("/api/auth/signup").json(&short).await;
    assert_eq!(response.status_code(), 400);
}

/// Test: volunteers wait for approval before they can work
#[tokio::test]
async fn test_unapproved_volunteer() {
    let app = create_test_server();
    app.server
        .post("/api/auth/signup")
        .json(&signup_body("v@x.com", "Volunteer"))
        .await;
    let token = app.email.link_token("v@x.com").unwrap();
    let response = app
        .server
        .post("/api/auth/verify-email")
        .json(&json!({ "token": token }))
        .await;
    assert_eq!(response.json::<Value>()["pendingApproval"], true);

    let session = app.login("v@x.com").await;
    let response = app
        .server
        .get("/api/volunteer/requests")
        .authorization_bearer(&session)
        .await;
    assert_eq!(response.status_code(), 403);
}

/// Test: forgot and reset password
#[tokio::test]
async fn test_password_reset() {
    let app = create_test_server();
    app.register("a@x.com", "Asha", Role::Citizen).await;

    let response = app
        .server
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": "a@x.com" }))
        .await;
    assert_eq!(response.status_code(), 200);

    // Unknown addresses look the same to the caller
    let response = app
        .server
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": "nobody@x.com" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let token = app.email.link_token("a@x.com").unwrap();
    let response = app
        .server
        .post(&format!("/api/auth/reset-password/{token}"))
        .json(&json!({ "password": "brand-new-pass" }))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "a@x.com", "password": "brand-new-pass" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = app
        .server
        .post(&format!("/api/auth/reset-password/{token}"))
        .json(&json!({ "password": "another-pass" }))
        .await;
    assert_eq!(response.status_code(), 400);
}

/// Test: profile edits, with volunteer-only fields ignored for citizens
#[tokio::test]
async fn test_update_profile() {
    let app = create_test_server();
    let (_, citizen) = app.register_and_login("a@x.com", "Asha", Role::Citizen).await;

    let response = app
        .server
        .put("/api/auth/update-profile")
        .authorization_bearer(&citizen)
        .json(&json!({ "name": "Asha K", "homeLocation": "Idukki" }))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    let body: Value = response.json();
    assert_eq!(body["user"]["name"], "Asha K");
    assert!(body["user"]["homeLocation"].is_null());

    let (_, vee) = app.register_and_login("v@x.com", "Vee", Role::Volunteer).await;
    let response = app
        .server
        .put("/api/auth/update-profile")
        .authorization_bearer(&vee)
        .json(&json!({ "homeLocation": "Idukki", "skills": ["Medical"] }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["user"]["homeLocation"], "Idukki");
    assert_eq!(body["user"]["skills"], json!(["Medical"]));

    let response = app
        .server
        .put("/api/auth/update-profile")
        .authorization_bearer(&vee)
        .json(&json!({ "homeLocation": "Atlantis" }))
        .await;
    assert_eq!(response.status_code(), 400);
}
