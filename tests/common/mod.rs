#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use axum::Router;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;
use tower::ServiceExt;

use hotell::accounts::{self, session};
use hotell::catalog::{self, RoomInput};
use hotell::config::Config;
use hotell::db::models::{Room, RoomType};
use hotell::db;
use hotell::forms::RegisterForm;
use hotell::mail::MemoryMailer;
use hotell::routes;
use hotell::state::AppState;
use hotell::storage::LocalStorage;

pub struct TestApp {
    pub state: AppState,
    pub mailer: MemoryMailer,
    pub media_dir: std::path::PathBuf,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_mailer(MemoryMailer::new())
    }

    pub fn with_mailer(mailer: MemoryMailer) -> Self {
        let dir = TempDir::new().unwrap();
        let pool = db::create_pool(&dir.path().join("test.db")).expect("Failed to create test database");
        db::run_migrations(&pool).expect("Failed to run migrations");

        let media_dir = dir.path().join("media");
        std::fs::create_dir_all(&media_dir).unwrap();

        let state = AppState {
            db: pool,
            config: Config::default(),
            storage: Arc::new(LocalStorage::new(media_dir.clone())),
            mailer: Arc::new(mailer.clone()),
        };
        TestApp {
            state,
            mailer,
            media_dir,
            _dir: dir,
        }
    }

    pub fn router(&self) -> Router {
        routes::app(self.state.clone())
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.unwrap()
    }

    /// Register a guest and return a `Cookie` header value for their session.
    pub fn guest(&self, email: &str) -> String {
        let mut conn = self.state.db.get().unwrap();
        let user = accounts::register(
            &mut conn,
            &RegisterForm {
                email: email.to_string(),
                username: email.split('@').next().unwrap().to_string(),
                password: "correct-horse".to_string(),
                password_confirm: "correct-horse".to_string(),
            },
        )
        .unwrap();
        self.session_for(&user.id)
    }

    pub fn staff(&self, email: &str) -> String {
        let mut conn = self.state.db.get().unwrap();
        let user = accounts::create_superuser(&mut conn, email, "manager", "correct-horse").unwrap();
        self.session_for(&user.id)
    }

    fn session_for(&self, user_id: &str) -> String {
        let conn = self.state.db.get().unwrap();
        let token = session::create_session(&conn, user_id, 1).unwrap();
        format!("{}={}", self.state.config.auth.cookie_name, token)
    }

    pub fn room(&self, name: &str, price: i64) -> Room {
        let conn = self.state.db.get().unwrap();
        catalog::create_room(
            &conn,
            &RoomInput {
                name: name.to_string(),
                description: "A room for tests".to_string(),
                room_type: RoomType::Deluxe,
                price: Decimal::new(price, 0),
                available: true,
                max_occupancy: 2,
                size: 300,
            },
        )
        .unwrap()
    }
}

pub fn days_from_now(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, cookie: Option<&str>, fields: &[(&str, &str)]) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish();
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// All `Set-Cookie` values joined, for substring checks.
pub fn set_cookies(response: &Response<Body>) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("\n")
}
