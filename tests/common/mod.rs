#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use numbet::cache::QueryCache;
use numbet::mailer::OtpMailer;
use numbet::models::multipliers::BetType;
use numbet::models::users::{Role, User};
use numbet::repositories::memory::MemoryStore;
use numbet::repositories::multipliers::MultiplierRepository;
use numbet::repositories::Repositories;
use numbet::services::{self, auth::TokenKeys};
use numbet::settings::Settings;

pub const SECRET: &str = "integration-secret";
pub const PASSWORD: &str = "hunter22";

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl OtpMailer for RecordingMailer {
    async fn send_otp(
        &self,
        email: &str,
        otp: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), anyhow::Error> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), otp.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    keys: TokenKeys,
}

pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.auth.jwt_secret = SECRET.to_string();
    settings.auth.bcrypt_cost = 4;
    settings
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(QueryCache::Disabled, settings())
}

pub fn spawn_app_with(cache: QueryCache, settings: Settings) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let app = services::build_app(
        Repositories::memory(store.clone()),
        cache,
        mailer.clone(),
        &settings,
    );

    TestApp {
        app,
        store,
        mailer,
        keys: TokenKeys::new(SECRET, settings.auth.token_ttl_days),
    }
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap()
    }

    pub fn cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string())
    }
}

impl TestApp {
    pub fn seed_user(&self, name: &str, email: &str, role: Role, balance: i64) -> User {
        let hash = bcrypt::hash(PASSWORD, 4).unwrap();
        let code = format!("{:0>8}", name.to_uppercase());
        let mut user = User::new(name, email, hash, role, code);
        user.wallet.main = Decimal::from(balance);
        self.store.insert_user(user.clone()).unwrap();
        user
    }

    pub async fn seed_multipliers(&self) {
        for (bet_type, value) in [(BetType::Single, 9), (BetType::Double, 90), (BetType::Triple, 900)] {
            self.store
                .upsert_multiplier(bet_type, Decimal::from(value))
                .await
                .unwrap();
        }
    }

    pub fn session(&self, user: &User) -> String {
        format!("auth_token={}", self.keys.issue(user).unwrap())
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        Reply {
            status,
            headers,
            bytes: bytes.to_vec(),
        }
    }

    pub async fn post(&self, uri: &str, body: Value) -> Reply {
        self.request(Method::POST, uri, Some(body), None).await
    }

    pub async fn post_as(&self, uri: &str, body: Value, cookie: &str) -> Reply {
        self.request(Method::POST, uri, Some(body), Some(cookie)).await
    }

    pub async fn get(&self, uri: &str) -> Reply {
        self.request(Method::GET, uri, None, None).await
    }
}

pub fn number(value: &Value) -> f64 {
    value.as_f64().unwrap_or_else(|| panic!("not a number: {}", value))
}
