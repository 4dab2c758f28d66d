//! Fixture server imitating the session and location-record backends on a
//! single listener.
//!
//! Session routes answer with the 5-byte anti-XSSI prefix ahead of every JSON
//! body and report failures as `status_message`. Record routes require the
//! two identity headers and report failures as `{"code", "error"}`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const SESSION_PREFIX: &[u8; 5] = b")]}'\n";
pub const RECORDS_PATH: &str = "/1/classes/StudentLocation";

pub const USERNAME: &str = "student@example.com";
pub const PASSWORD: &str = "secret";
pub const SUBJECT_ID: &str = "3903878747";
pub const FIRST_NAME: &str = "Ada";
pub const LAST_NAME: &str = "Lovelace";
pub const XSRF_TOKEN: &str = "mock-xsrf-token";

pub const APPLICATION_ID: &str = "mock-application-id";
pub const REST_API_KEY: &str = "mock-rest-api-key";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentLocation {
    pub object_id: String,
    pub unique_key: String,
    pub first_name: String,
    pub last_name: String,
    pub map_string: String,
    #[serde(rename = "mediaURL")]
    pub media_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudentLocation {
    pub unique_key: String,
    pub first_name: String,
    pub last_name: String,
    pub map_string: String,
    #[serde(rename = "mediaURL", default)]
    pub media_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub udacity: Credentials,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    pub order: Option<String>,
}

/// Everything the mock remembers between requests.
#[derive(Debug, Default)]
pub struct MockState {
    /// Newest last.
    pub locations: Vec<StudentLocation>,
    pub sessions: Vec<String>,
    /// `X-XSRF-TOKEN` seen by each DELETE of the session, in order.
    pub logout_tokens: Vec<Option<String>>,
    clock: u64,
}

impl MockState {
    /// Deterministic ISO-8601 timestamp that increases on every call.
    fn tick(&mut self) -> String {
        self.clock += 1;
        let t = self.clock;
        format!("2015-09-18T{:02}:{:02}:{:02}.000Z", (t / 3600) % 24, (t / 60) % 60, t % 60)
    }
}

pub type Db = Arc<RwLock<MockState>>;

pub fn app() -> Router {
    app_with_state(Db::default())
}

pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route("/api/session", post(create_session).delete(delete_session))
        .route("/api/users/{id}", get(get_user))
        .route(RECORDS_PATH, get(list_locations).post(create_location))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, Db::default()).await
}

pub async fn serve(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(db)).await
}

fn prefixed(status: StatusCode, body: Value) -> (StatusCode, [(header::HeaderName, &'static str); 1], Vec<u8>) {
    let mut bytes = SESSION_PREFIX.to_vec();
    bytes.extend_from_slice(body.to_string().as_bytes());
    (status, [(header::CONTENT_TYPE, "application/json")], bytes)
}

async fn create_session(State(db): State<Db>, Json(input): Json<LoginRequest>) -> Response {
    if input.udacity.username != USERNAME || input.udacity.password != PASSWORD {
        debug!("rejecting credentials");
        return prefixed(
            StatusCode::FORBIDDEN,
            json!({"status_code": 403, "status_message": "Account not found or invalid credentials."}),
        )
        .into_response();
    }

    let session_id = Uuid::new_v4().simple().to_string();
    db.write().await.sessions.push(session_id.clone());
    info!(%session_id, "session created");

    let cookies = AppendHeaders([
        (header::SET_COOKIE, format!("XSRF-TOKEN={XSRF_TOKEN}; Path=/")),
        (header::SET_COOKIE, format!("session={session_id}; Path=/; HttpOnly")),
    ]);
    let body = json!({
        "account": {"registered": true, "key": SUBJECT_ID},
        "session": {"id": session_id, "expiration": "2015-11-17T15:52:28.498Z"},
    });
    (cookies, prefixed(StatusCode::OK, body)).into_response()
}

async fn delete_session(State(db): State<Db>, headers: HeaderMap) -> Response {
    let token = headers
        .get("x-xsrf-token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let mut state = db.write().await;
    state.logout_tokens.push(token);
    let session_id = state
        .sessions
        .pop()
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    info!(%session_id, "session deleted");
    prefixed(
        StatusCode::OK,
        json!({"session": {"id": session_id, "expiration": "2015-09-18T00:00:00.000Z"}}),
    )
    .into_response()
}

async fn get_user(Path(id): Path<String>) -> Response {
    if id != SUBJECT_ID {
        return prefixed(
            StatusCode::NOT_FOUND,
            json!({"status_code": 404, "status_message": "User not found."}),
        )
        .into_response();
    }
    prefixed(
        StatusCode::OK,
        json!({"user": {"key": id, "first_name": FIRST_NAME, "last_name": LAST_NAME}}),
    )
    .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    let matches = |name: &str, expected: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    };
    matches("x-parse-application-id", APPLICATION_ID) && matches("x-parse-rest-api-key", REST_API_KEY)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"code": 401, "error": "unauthorized"})),
    )
        .into_response()
}

async fn list_locations(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let state = db.read().await;
    let mut locations = state.locations.clone();
    if params.order.as_deref() == Some("-updatedAt") {
        locations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }
    let results: Vec<StudentLocation> = locations
        .into_iter()
        .skip(params.skip.unwrap_or(0))
        .take(params.limit.unwrap_or(100))
        .collect();
    Json(json!({"results": results})).into_response()
}

async fn create_location(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<NewStudentLocation>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = db.write().await;
    let now = state.tick();
    let location = StudentLocation {
        object_id: Uuid::new_v4().simple().to_string()[..10].to_string(),
        unique_key: input.unique_key,
        first_name: input.first_name,
        last_name: input.last_name,
        map_string: input.map_string,
        media_url: input.media_url,
        latitude: input.latitude,
        longitude: input.longitude,
        created_at: now.clone(),
        updated_at: now,
    };
    let body = json!({"objectId": location.object_id, "createdAt": location.created_at});
    info!(object_id = %location.object_id, "location created");
    state.locations.push(location);
    (StatusCode::CREATED, Json(body)).into_response()
}
