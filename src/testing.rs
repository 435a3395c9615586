//! In-process fixture backend for tests
//!
//! A small axum server reproducing the slice of the marketplace API the
//! client consumes: envelope responses, bearer-gated `/auth/me`, the
//! adaptive entrance check, single-use OTP verification and localized
//! dictionaries. Request counters let tests assert on the exact number of
//! network calls a client operation performed.
//!
//! Fixture accounts:
//! - `user1` / `secret1` -> token `tok-user1`, owner "User One"
//! - phone `77001234567` with code `123456` (single use) -> token `tok-otp`

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::{Config, StorageDriver};

/// Shared fixture state: counters and behavior toggles.
#[derive(Debug, Default)]
pub(crate) struct BackendState {
    /// Hits on GET /dictionaries
    pub dict_hits: AtomicUsize,
    /// Hits on GET /auth/me
    pub me_hits: AtomicUsize,
    /// Hits on POST /auth/otp/request
    pub otp_request_hits: AtomicUsize,
    /// Whether the fixture OTP code has already been consumed
    pub otp_used: AtomicBool,
    /// Make GET /dictionaries fail with a 500
    pub fail_dictionaries: AtomicBool,
    /// Make GET /dictionaries return an empty list
    pub empty_dictionaries: AtomicBool,
    /// Make POST /auth/check-entrance fail with a 500
    pub fail_entrance: AtomicBool,
    /// Hold GET /auth/me responses for this long, to race in-flight
    /// lookups against state changes on the client
    pub me_delay_millis: AtomicU64,
}

/// Handle to a spawned fixture backend.
pub(crate) struct TestBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

static TRACING: std::sync::Once = std::sync::Once::new();

/// Route test log output through the tracing subscriber once per binary.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

impl TestBackend {
    /// Bind an ephemeral port and serve the fixture routes on it.
    pub async fn spawn() -> Self {
        init_tracing();
        let state = Arc::new(BackendState::default());

        let app = Router::new()
            .route("/auth/check-entrance", post(check_entrance))
            .route("/auth/login-json", post(login_json))
            .route("/auth/otp/request", post(otp_request))
            .route("/auth/otp/verify", post(otp_verify))
            .route("/auth/password/reset/request", post(reset_request))
            .route("/auth/password/reset/confirm", post(reset_confirm))
            .route("/auth/password/change", post(password_change))
            .route("/auth/me", get(me))
            .route("/dictionaries", get(dictionaries))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Client configuration pointing at this backend, memory storage.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.api.base_url = self.base_url.clone();
        config.api.timeout_seconds = 5;
        config.storage.driver = StorageDriver::Memory;
        config
    }

    pub fn dict_hits(&self) -> usize {
        self.state.dict_hits.load(Ordering::SeqCst)
    }

    pub fn me_hits(&self) -> usize {
        self.state.me_hits.load(Ordering::SeqCst)
    }

    pub fn otp_request_hits(&self) -> usize {
        self.state.otp_request_hits.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Envelope helpers
// ============================================================================

fn ok(data: Value) -> (StatusCode, Json<Value>) {
    let body = json!({
        "data": data,
        "code": 200,
        "message": {"ru": "Успешно", "kk": "Сәтті", "en": "Success"}
    });
    (StatusCode::OK, Json(body))
}

fn err(code: u16, ru: &str, kk: &str, en: &str) -> (StatusCode, Json<Value>) {
    let body = json!({
        "data": null,
        "code": code,
        "message": {"ru": ru, "kk": kk, "en": en}
    });
    (StatusCode::from_u16(code).unwrap(), Json(body))
}

fn invalid_otp() -> (StatusCode, Json<Value>) {
    err(400, "Неверный код", "Қате код", "Invalid security code")
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
}

// ============================================================================
// Handlers
// ============================================================================

async fn check_entrance(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if state.fail_entrance.load(Ordering::SeqCst) {
        return err(500, "Внутренняя ошибка", "Ішкі қате", "Internal error");
    }

    let login = body["login"].as_str().unwrap_or_default();
    match login {
        "user1" => ok(json!({"exists": true, "type": "password", "login": login})),
        // Legacy backend versions leaked a "pin" mode here; clients must
        // fall back to the code-based path for anything unknown.
        "weird" => ok(json!({"exists": true, "type": "pin", "login": login})),
        _ => ok(json!({"exists": false, "type": "otp", "login": login})),
    }
}

async fn login_json(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let login = body["login"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if login == "user1" && password == "secret1" {
        ok(json!({"access_token": "tok-user1", "token_type": "bearer", "user_id": 1}))
    } else {
        err(
            400,
            "Неверный логин или пароль",
            "Логин немесе пароль қате",
            "Incorrect login or password",
        )
    }
}

async fn otp_request(State(state): State<Arc<BackendState>>) -> (StatusCode, Json<Value>) {
    state.otp_request_hits.fetch_add(1, Ordering::SeqCst);
    ok(Value::Null)
}

async fn otp_verify(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let code = body["otp_code"].as_str().unwrap_or_default();
    if code != "123456" {
        return invalid_otp();
    }
    // The fixture code is single-use, as on the real backend
    if state.otp_used.swap(true, Ordering::SeqCst) {
        return invalid_otp();
    }
    ok(json!({"access_token": "tok-otp", "token_type": "bearer"}))
}

async fn reset_request(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    match body["login"].as_str() {
        Some("user1") | Some("77001234567") => ok(Value::Null),
        _ => err(
            404,
            "Пользователь не найден",
            "Пайдаланушы табылмады",
            "User not found",
        ),
    }
}

async fn reset_confirm(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["otp_code"].as_str() == Some("123456") && body["new_password"].is_string() {
        ok(Value::Null)
    } else {
        invalid_otp()
    }
}

async fn password_change(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if bearer(&headers) != Some("tok-user1") {
        return err(401, "Не авторизован", "Авторизацияланбаған", "Not authorized");
    }
    if body["old_password"].as_str() == Some("secret1") {
        ok(Value::Null)
    } else {
        err(400, "Неверный старый пароль", "Ескі пароль қате", "Wrong old password")
    }
}

async fn me(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    state.me_hits.fetch_add(1, Ordering::SeqCst);
    // Delay is sampled per request: responses already in flight keep the
    // delay they started with
    let delay = state.me_delay_millis.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
    }
    match bearer(&headers) {
        Some("tok-user1") => ok(json!({
            "id": 1,
            "name": "User One",
            "role": "owner",
            "email": "user1@example.com",
            "phone_number": null
        })),
        Some("tok-otp") => ok(json!({
            "id": 2,
            "name": "User 4567",
            "role": "client",
            "email": null,
            "phone_number": "77001234567"
        })),
        _ => err(401, "Не авторизован", "Авторизацияланбаған", "Not authorized"),
    }
}

async fn dictionaries(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    state.dict_hits.fetch_add(1, Ordering::SeqCst);

    if state.fail_dictionaries.load(Ordering::SeqCst) {
        return err(500, "Внутренняя ошибка", "Ішкі қате", "Internal error");
    }
    if state.empty_dictionaries.load(Ordering::SeqCst) {
        return ok(json!([]));
    }

    let lang = params.get("lang").map(String::as_str).unwrap_or("ru");
    let ty = params.get("type").map(String::as_str).unwrap_or_default();
    let parent_id = params.get("parent_id").and_then(|p| p.parse::<i64>().ok());

    let items = match (ty, parent_id) {
        ("CATEGORY", _) => {
            let economy = if lang == "en" { "Economy" } else { "Эконом" };
            json!([
                {"id": 10, "name": economy, "code": "ECONOMY", "parent_id": null},
                {"id": 11, "name": "SUV", "code": "SUV", "parent_id": null}
            ])
        }
        ("CITY", _) => json!([
            {"id": 20, "name": "Алматы", "code": "ALA", "parent_id": null},
            {"id": 21, "name": "Астана", "code": "AST", "parent_id": null}
        ]),
        ("MARKA", _) => json!([
            {"id": 1, "name": "Toyota", "parent_id": null},
            {"id": 2, "name": "Volkswagen", "parent_id": null}
        ]),
        ("MODEL", Some(1)) => json!([
            {"id": 30, "name": "Corolla", "parent_id": 1},
            {"id": 31, "name": "Camry", "parent_id": 1}
        ]),
        ("MODEL", Some(2)) => json!([
            {"id": 32, "name": "Polo", "parent_id": 2}
        ]),
        _ => json!([]),
    };

    ok(items)
}
