//! Common test utilities for server integration tests

#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use axum_test::TestServer;
use chrono::{DateTime, Utc};
use scan_core::{Clock, ManualClock, Role};
use scan_server::crypto::hash_password_with_cost;
use scan_server::store::{NewAccount, Profile};
use scan_server::{
    routes, AccountStore, AppState, Config, EmailSender, InMemoryAccountStore,
};
use serde_json::{json, Value};

pub const PASSWORD: &str = "password123";

/// 2024-12-31 10:00 IST, a day before the requests these tests make
pub const START: &str = "2024-12-31T04:30:00Z";

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mock email sender that keeps every message
#[derive(Default, Clone)]
pub struct MockEmailSender {
    pub sent: Arc<RwLock<Vec<SentEmail>>>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent message sent to `to` with `subject`
    pub fn last(&self, to: &str, subject: &str) -> Option<SentEmail> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == to && m.subject == subject)
            .cloned()
    }

    pub fn subjects_for(&self, to: &str) -> Vec<String> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.to == to)
            .map(|m| m.subject.clone())
            .collect()
    }

    /// Token from the newest verification or reset link mailed to `to`
    pub fn link_token(&self, to: &str) -> Option<String> {
        let sent = self.sent.read().unwrap();
        let body = &sent.iter().rev().find(|m| m.to == to)?.body;
        let start = body
            .find("token=")
            .map(|i| i + "token=".len())
            .or_else(|| body.find("/reset-password/").map(|i| i + "/reset-password/".len()))?;
        Some(
            body[start..]
                .chars()
                .take_while(|c| c.is_ascii_hexdigit())
                .collect(),
        )
    }

    /// Completion code from the acceptance email sent to a citizen
    pub fn completion_code(&self, to: &str) -> Option<String> {
        let mail = self.last(to, "Help Request Accepted - SCAN")?;
        let start = mail.body.find("completion code: ")? + "completion code: ".len();
        Some(
            mail.body[start..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect(),
        )
    }
}

impl EmailSender for MockEmailSender {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        self.sent.write().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub struct TestApp<S> {
    pub server: TestServer,
    pub email: MockEmailSender,
    pub clock: Arc<ManualClock>,
    pub state: Arc<AppState<S, MockEmailSender>>,
}

pub fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn test_config() -> Config {
    Config {
        jwt_secret: "test-secret".to_string(),
        client_url: "http://client.test".to_string(),
        bcrypt_cost: 4,
        ..Config::default()
    }
}

/// Build a test server over any store
pub fn create_test_server_with<S: AccountStore + 'static>(store: S) -> TestApp<S> {
    let email = MockEmailSender::new();
    let clock = Arc::new(ManualClock::new(utc(START)));
    let state = Arc::new(AppState::new(
        test_config(),
        store,
        email.clone(),
        clock.clone(),
    ));
    let server =
        TestServer::new(routes::create_router(state.clone())).expect("Failed to create test server");

    TestApp {
        server,
        email,
        clock,
        state,
    }
}

/// Create a test server over the in-memory store
pub fn create_test_server() -> TestApp<InMemoryAccountStore> {
    create_test_server_with(InMemoryAccountStore::new())
}

impl<S: AccountStore + 'static> TestApp<S> {
    /// Sign up and verify an account through the API; volunteers are also approved
    pub async fn register(&self, email: &str, name: &str, role: Role) -> u64 {
        let response = self
            .server
            .post("/api/auth/signup")
            .json(&json!({
                "email": email,
                "password": PASSWORD,
                "name": name,
                "contactNumber": "555-0000",
                "role": role.as_str(),
                "skills": ["Driving"],
                "homeLocation": "Kollam",
            }))
            .await;
        assert_eq!(response.status_code(), 201, "{}", response.text());
        let id = response.json::<Value>()["user"]["id"].as_u64().unwrap();

        let token = self.email.link_token(email).expect("No verification email");
        let response = self
            .server
            .post("/api/auth/verify-email")
            .json(&json!({ "token": token }))
            .await;
        assert_eq!(response.status_code(), 200, "{}", response.text());

        if role == Role::Volunteer {
            self.state
                .store
                .set_approved(scan_core::AccountId(id), true)
                .unwrap();
        }
        id
    }

    /// Insert an admin directly; there is no public signup for admins
    pub fn create_admin(&self, email: &str) -> u64 {
        let account = self
            .state
            .store
            .create_account(NewAccount {
                email: email.to_string(),
                password_hash: hash_password_with_cost(PASSWORD, 4).unwrap(),
                role: Role::Admin,
                profile: Profile {
                    name: "Admin".to_string(),
                    contact_number: "555-9999".to_string(),
                    ..Default::default()
                },
                verification_token_hash: format!("admin-{email}"),
                verification_expires_at: self.clock.now(),
                created_at: self.clock.now(),
            })
            .unwrap();
        self.state.store.mark_verified(account.id).unwrap();
        account.id.0
    }

    /// Log in and return the session token
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .server
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(response.status_code(), 200, "{}", response.text());
        response.json::<Value>()["sessionToken"]
            .as_str()
            .unwrap()
            .to_string()
    }

    pub async fn register_and_login(&self, email: &str, name: &str, role: Role) -> (u64, String) {
        let id = self.register(email, name, role).await;
        (id, self.login(email).await)
    }
}

/// The scenario request: Driving to the airport from Kollam on 2025-01-01 10:00 IST
pub fn driving_request() -> Value {
    json!({
        "title": "Driving",
        "description": "airport",
        "location": "Kollam",
        "requested_date": "2025-01-01",
        "requested_time": "10:00",
    })
}
