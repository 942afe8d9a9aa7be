//! Help request lifecycle through the HTTP API

mod common;

use std::thread;

use chrono::Duration;
use common::{create_test_server, create_test_server_with, driving_request, utc, TestApp};
use scan_core::{AccountId, Role};
use scan_server::{AccountStore, SqliteAccountStore};
use serde_json::{json, Value};

/// Test: request, accept, conflicting accept, wrong code, right code
#[tokio::test]
async fn test_driving_scenario() {
    let app = create_test_server();
    let (_, citizen) = app.register_and_login("a@x.com", "Asha", Role::Citizen).await;
    let (_, vee) = app.register_and_login("v@x.com", "Vee", Role::Volunteer).await;
    let (_, other) = app.register_and_login("w@x.com", "Wren", Role::Volunteer).await;

    let response = app
        .server
        .post("/api/help/request")
        .authorization_bearer(&citizen)
        .json(&driving_request())
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    let body: Value = response.json();
    assert_eq!(body["request"]["status"], "open");
    assert_eq!(body["request"]["details"]["title"], "Driving");
    assert_eq!(body["request"]["details"]["location"], "Kollam");
    assert!(body["request"].get("assignment").is_none());

    let response = app
        .server
        .get("/api/volunteer/requests")
        .authorization_bearer(&vee)
        .await;
    let body: Value = response.json();
    let requests = body["requests"].as_array().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["citizenEmail"], "a@x.com");

    let response = app
        .server
        .post("/api/volunteer/accept")
        .authorization_bearer(&vee)
        .json(&json!({ "citizenEmail": "a@x.com" }))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    let body: Value = response.json();
    assert_eq!(body["request"]["status"], "assigned");
    assert_eq!(body["request"]["assignment"]["volunteer_name"], "Vee");
    // The volunteer never sees the code
    assert!(body["request"]["assignment"].get("completion_code").is_none());

    let response = app
        .server
        .post("/api/volunteer/accept")
        .authorization_bearer(&other)
        .json(&json!({ "citizenEmail": "a@x.com" }))
        .await;
    assert_eq!(response.status_code(), 409);

    let code = app.email.completion_code("a@x.com").expect("No acceptance email");
    assert_eq!(code.len(), 6);

    let response = app
        .server
        .post("/api/volunteer/complete")
        .authorization_bearer(&vee)
        .json(&json!({ "citizenEmail": "a@x.com", "code": "000000" }))
        .await;
    assert_eq!(response.status_code(), 409);
    let body: Value = response.json();
    assert_eq!(body["success"], false);

    // The citizen still sees an assigned request with the emailed code
    let response = app
        .server
        .get("/api/help")
        .authorization_bearer(&citizen)
        .await;
    let body: Value = response.json();
    assert_eq!(body["request"]["status"], "assigned");
    assert_eq!(body["request"]["assignment"]["completion_code"], code.as_str());

    let response = app
        .server
        .post("/api/volunteer/complete")
        .authorization_bearer(&vee)
        .json(&json!({ "citizenEmail": "a@x.com", "code": code }))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    let body: Value = response.json();
    assert_eq!(body["request"]["status"], "completed");

    assert!(app
        .email
        .last("a@x.com", "Help Request Completed - SCAN")
        .is_some());
}

/// Test: the same flow against the SQLite store
#[tokio::test]
async fn test_scenario_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.db");
    let store = SqliteAccountStore::open(path.to_str().unwrap()).unwrap();
    let app = create_test_server_with(store);

    let (_, citizen) = app.register_and_login("a@x.com", "Asha", Role::Citizen).await;
    let (_, vee) = app.register_and_login("v@x.com", "Vee", Role::Volunteer).await;

    app.server
        .post("/api/help/request")
        .authorization_bearer(&citizen)
        .json(&driving_request())
        .await;
    let response = app
        .server
        .post("/api/volunteer/accept")
        .authorization_bearer(&vee)
        .json(&json!({ "citizenEmail": "a@x.com" }))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());

    let code = app.email.completion_code("a@x.com").unwrap();
    let response = app
        .server
        .post("/api/volunteer/complete")
        .authorization_bearer(&vee)
        .json(&json!({ "citizenEmail": "a@x.com", "code": code }))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
}

/// Two approved volunteers race to accept one open request; returns how many won
async fn race_two_accepts<S: AccountStore + 'static>(app: &TestApp<S>) -> usize {
    let (_, citizen) = app.register_and_login("a@x.com", "Asha", Role::Citizen).await;
    let first = app.register("v@x.com", "Vee", Role::Volunteer).await;
    let second = app.register("w@x.com", "Wren", Role::Volunteer).await;

    app.server
        .post("/api/help/request")
        .authorization_bearer(&citizen)
        .json(&driving_request())
        .await;

    let handles: Vec<_> = [first, second]
        .into_iter()
        .map(|id| {
            let state = app.state.clone();
            thread::spawn(move || {
                let volunteer = state.store.get_account(AccountId(id)).unwrap().unwrap();
                state.help.accept(&volunteer, "a@x.com").is_ok()
            })
        })
        .collect();
    handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count()
}

/// Test: of two volunteers racing to accept, exactly one wins
#[tokio::test]
async fn test_concurrent_accept() {
    let app = create_test_server();
    assert_eq!(race_two_accepts(&app).await, 1);
}

/// Test: the conditional update keeps accepts exclusive on SQLite too
#[tokio::test]
async fn test_concurrent_accept_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.db");
    let app = create_test_server_with(SqliteAccountStore::open(path.to_str().unwrap()).unwrap());

    assert_eq!(race_two_accepts(&app).await, 1);

    let citizen = app.state.store.get_account_by_email("a@x.com").unwrap().unwrap();
    assert_eq!(citizen.help_version, 2);
    assert!(app.email.completion_code("a@x.com").is_some());
}

/// Test: assigned requests cannot be cancelled inside the two hour window
#[tokio::test]
async fn test_cancel_window() {
    let app = create_test_server();
    app.register("a@x.com", "Asha", Role::Citizen).await;
    let citizen = app.login("a@x.com").await;
    let (_, vee) = app.register_and_login("v@x.com", "Vee", Role::Volunteer).await;

    app.server
        .post("/api/help/request")
        .authorization_bearer(&citizen)
        .json(&driving_request())
        .await;
    app.server
        .post("/api/volunteer/accept")
        .authorization_bearer(&vee)
        .json(&json!({ "citizenEmail": "a@x.com" }))
        .await;

    // 08:30 IST, ninety minutes before the requested time
    app.clock.set(utc("2025-01-01T03:00:00Z"));
    let citizen = app.login("a@x.com").await;
    let response = app
        .server
        .post("/api/help/cancel")
        .authorization_bearer(&citizen)
        .await;
    assert_eq!(response.status_code(), 409);

    let response = app
        .server
        .get("/api/help")
        .authorization_bearer(&citizen)
        .await;
    assert_eq!(response.json::<Value>()["request"]["status"], "assigned");
}

/// Test: assigned requests can be cancelled well ahead of time
#[tokio::test]
async fn test_cancel_assigned_early() {
    let app = create_test_server();
    let (_, citizen) = app.register_and_login("a@x.com", "Asha", Role::Citizen).await;
    let (_, vee) = app.register_and_login("v@x.com", "Vee", Role::Volunteer).await;

    app.server
        .post("/api/help/request")
        .authorization_bearer(&citizen)
        .json(&driving_request())
        .await;
    app.server
        .post("/api/volunteer/accept")
        .authorization_bearer(&vee)
        .json(&json!({ "citizenEmail": "a@x.com" }))
        .await;

    let response = app
        .server
        .post("/api/help/cancel")
        .authorization_bearer(&citizen)
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());

    let response = app
        .server
        .get("/api/help")
        .authorization_bearer(&citizen)
        .await;
    assert_eq!(response.json::<Value>()["request"]["status"], "idle");
}

/// Test: an unassigned request can be cancelled right up to its time
#[tokio::test]
async fn test_cancel_unassigned_late() {
    let app = create_test_server();
    let (_, citizen) = app.register_and_login("a@x.com", "Asha", Role::Citizen).await;
    app.server
        .post("/api/help/request")
        .authorization_bearer(&citizen)
        .json(&driving_request())
        .await;

    // 09:30 IST
    app.clock.set(utc("2025-01-01T04:00:00Z"));
    let citizen = app.login("a@x.com").await;
    let response = app
        .server
        .post("/api/help/cancel")
        .authorization_bearer(&citizen)
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
}

/// Test: malformed, premature and duplicate requests are refused
#[tokio::test]
async fn test_request_validation() {
    let app = create_test_server();
    let (_, citizen) = app.register_and_login("a@x.com", "Asha", Role::Citizen).await;
    let (_, vee) = app.register_and_login("v@x.com", "Vee", Role::Volunteer).await;

    let mut unknown_place = driving_request();
    unknown_place["location"] = json!("Atlantis");
    let response = app
        .server
        .post("/api/help/request")
        .authorization_bearer(&citizen)
        .json(&unknown_place)
        .await;
    assert_eq!(response.status_code(), 400);

    // One hour of notice is not enough
    let mut too_soon = driving_request();
    too_soon["requested_date"] = json!("2024-12-31");
    too_soon["requested_time"] = json!("11:00");
    let response = app
        .server
        .post("/api/help/request")
        .authorization_bearer(&citizen)
        .json(&too_soon)
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .server
        .post("/api/help/request")
        .authorization_bearer(&vee)
        .json(&driving_request())
        .await;
    assert_eq!(response.status_code(), 403);

    let response = app
        .server
        .post("/api/help/request")
        .json(&driving_request())
        .await;
    assert_eq!(response.status_code(), 401);

    let response = app
        .server
        .post("/api/help/request")
        .authorization_bearer(&citizen)
        .json(&driving_request())
        .await;
    assert_eq!(response.status_code(), 201);
    let response = app
        .server
        .post("/api/help/request")
        .authorization_bearer(&citizen)
        .json(&driving_request())
        .await;
    assert_eq!(response.status_code(), 409);
}

/// Test: requests whose time has passed drop out of the volunteer list
#[tokio::test]
async fn test_passed_requests_are_hidden() {
    let app = create_test_server();
    let (_, citizen) = app.register_and_login("a@x.com", "Asha", Role::Citizen).await;
    app.register("v@x.com", "Vee", Role::Volunteer).await;
    app.server
        .post("/api/help/request")
        .authorization_bearer(&citizen)
        .json(&driving_request())
        .await;

    app.clock.advance(Duration::days(1) + Duration::minutes(1));
    let vee = app.login("v@x.com").await;
    let response = app
        .server
        .get("/api/volunteer/requests")
        .authorization_bearer(&vee)
        .await;
    let body: Value = response.json();
    assert!(body["requests"].as_array().unwrap().is_empty());
}
