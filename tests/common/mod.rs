#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use time::Duration;
use tower::ServiceExt;

use hallbook::config::{BookingRules, Config, MailConfig};
use hallbook::db::{MemoryStore, Store};
use hallbook::email::{Mailer, OutgoingEmail};
use hallbook::models::user::session::Session;
use hallbook::models::user::{NewUser, Role, User, UserStatus};
use hallbook::routes::{router, AppState};
use hallbook::util::{current_time, hash_password};

pub const ADMIN_EMAIL: &str = "hall.admin@college.edu";
pub const PASSWORD: &str = "correct horse battery";

/// Keeps every email it is asked to send.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Fails to send anything, like a mail provider that is down.
pub struct BrokenMailer;

#[async_trait]
impl Mailer for BrokenMailer {
    async fn send(&self, _email: OutgoingEmail) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("mail provider unavailable"))
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_owned(),
        port: 5000,
        rules: BookingRules::default(),
        session_ttl: Duration::hours(1),
        mail: MailConfig {
            mailgun: None,
            from_name: "Seminar Hall Booking".to_owned(),
            from_address: "noreply@college.edu".to_owned(),
            admin_email: Some(ADMIN_EMAIL.to_owned()),
            frontend_url: "http://localhost:3000".to_owned(),
        },
        bootstrap_admin: None,
    }
}

pub struct TestApp {
    pub store: MemoryStore,
    pub mailer: RecordingMailer,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::default(), None)
    }

    pub fn with_broken_mailer() -> Self {
        Self::with_mailer(RecordingMailer::default(), Some(Arc::new(BrokenMailer)))
    }

    fn with_mailer(recorder: RecordingMailer, mailer: Option<Arc<dyn Mailer>>) -> Self {
        let store = MemoryStore::new();
        let state = AppState {
            store: Arc::new(store.clone()),
            mailer: mailer.unwrap_or_else(|| Arc::new(recorder.clone()) as Arc<dyn Mailer>),
            config: Arc::new(test_config()),
        };

        Self {
            store,
            mailer: recorder,
            router: router(state),
        }
    }

    /// Adds an account directly to the store.
    pub async fn add_user(&self, email: &str, role: Role, status: UserStatus) -> User {
        let mut tx = self.store.begin().await.unwrap();
        let user = tx
            .insert_user(
                &NewUser {
                    name: email.split('@').next().unwrap().to_owned(),
                    email: email.to_owned(),
                    pass_hash: hash_password(PASSWORD).unwrap(),
                    role,
                    status,
                },
                current_time(),
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();

        user
    }

    /// Adds an approved account and returns a token for it.
    pub async fn login_as(&self, email: &str, role: Role) -> String {
        let user = self.add_user(email, role, UserStatus::Approved).await;
        let session = Session::new(user.id, Duration::hours(1), current_time());

        let mut tx = self.store.begin().await.unwrap();
        tx.insert_session(&session).await.unwrap();
        tx.commit().await.unwrap();

        session.token
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("HALL_TOKEN", token);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, token, None).await
    }
}

/// A booking request in the far future, so it never lands in the past.
pub fn booking_body(date: &str, start: &str, end: &str) -> Value {
    serde_json::json!({
        "clubName": "Robotics Club",
        "title": "Robot Wars",
        "description": "Bring your bots",
        "date": date,
        "startTime": start,
        "endTime": end,
        "termsAccepted": true,
    })
}
