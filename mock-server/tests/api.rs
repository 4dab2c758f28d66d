use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{
    app, app_with_state, Db, StudentLocation, APPLICATION_ID, PASSWORD, RECORDS_PATH, REST_API_KEY,
    SESSION_PREFIX, SUBJECT_ID, USERNAME, XSRF_TOKEN,
};
use tower::ServiceExt;

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

/// Strip the session prefix, asserting it is there.
async fn prefixed_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    assert_eq!(&bytes[..5], &SESSION_PREFIX[..]);
    serde_json::from_slice(&bytes[5..]).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn record_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header("X-Parse-Application-Id", APPLICATION_ID)
        .header("X-Parse-REST-API-Key", REST_API_KEY)
        .body(body.to_string())
        .unwrap()
}

fn login_body(username: &str, password: &str) -> String {
    serde_json::json!({"udacity": {"username": username, "password": password}}).to_string()
}

fn location_body(key: &str) -> String {
    serde_json::json!({
        "uniqueKey": key,
        "firstName": "Ada",
        "lastName": "Lovelace",
        "mapString": "London",
        "latitude": 51.5,
        "longitude": -0.12,
    })
    .to_string()
}

// --- session ---

#[tokio::test]
async fn login_success_sets_cookies() {
    let resp = app()
        .oneshot(json_request("POST", "/api/session", &login_body(USERNAME, PASSWORD)))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let cookies: Vec<String> = resp
        .headers()
        .get_all(http::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies[0].starts_with(&format!("XSRF-TOKEN={XSRF_TOKEN}")));

    let json = prefixed_json(resp).await;
    assert_eq!(json["account"]["key"], SUBJECT_ID);
    assert!(json["session"]["id"].is_string());
}

#[tokio::test]
async fn login_wrong_password_reports_status_message() {
    let resp = app()
        .oneshot(json_request("POST", "/api/session", &login_body(USERNAME, "wrong")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let json = prefixed_json(resp).await;
    assert_eq!(json["status_code"], 403);
    assert!(json["status_message"].is_string());
    assert!(json.get("account").is_none());
}

#[tokio::test]
async fn get_user_known_and_unknown() {
    let resp = app()
        .oneshot(Request::builder().uri(format!("/api/users/{SUBJECT_ID}")).body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = prefixed_json(resp).await;
    assert_eq!(json["user"]["first_name"], "Ada");

    let resp = app()
        .oneshot(Request::builder().uri("/api/users/nobody").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json = prefixed_json(resp).await;
    assert_eq!(json["status_message"], "User not found.");
}

#[tokio::test]
async fn logout_records_xsrf_header() {
    let db = Db::default();
    let resp = app_with_state(db.clone())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/session")
                .header("X-XSRF-TOKEN", "tok")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = prefixed_json(resp).await;
    assert!(json["session"]["id"].is_string());

    let resp = app_with_state(db.clone())
        .oneshot(Request::builder().method("DELETE").uri("/api/session").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let state = db.read().await;
    assert_eq!(state.logout_tokens, vec![Some("tok".to_string()), None]);
}

// --- records ---

#[tokio::test]
async fn records_require_identity_headers() {
    let resp = app()
        .oneshot(Request::builder().uri(RECORDS_PATH).body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn create_location_returns_201() {
    let resp = app()
        .oneshot(record_request("POST", RECORDS_PATH, &location_body("k1")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await;
    assert!(json["objectId"].is_string());
    assert!(json["createdAt"].is_string());
}

#[tokio::test]
async fn create_location_missing_coordinates_returns_422() {
    let resp = app()
        .oneshot(record_request(
            "POST",
            RECORDS_PATH,
            r#"{"uniqueKey":"k","firstName":"A","lastName":"B","mapString":"X"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn list_orders_newest_first_and_pages() {
    let db = Db::default();
    for key in ["first", "second", "third"] {
        let resp = app_with_state(db.clone())
            .oneshot(record_request("POST", RECORDS_PATH, &location_body(key)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let uri = format!("{RECORDS_PATH}?limit=2&skip=0&order=-updatedAt");
    let resp = app_with_state(db.clone())
        .oneshot(record_request("GET", &uri, ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let results: Vec<StudentLocation> = serde_json::from_value(json["results"].clone()).unwrap();
    let keys: Vec<&str> = results.iter().map(|r| r.unique_key.as_str()).collect();
    assert_eq!(keys, vec!["third", "second"]);
    assert!(results[0].media_url.is_none());

    let uri = format!("{RECORDS_PATH}?limit=2&skip=2&order=-updatedAt");
    let resp = app_with_state(db)
        .oneshot(record_request("GET", &uri, ""))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
    assert_eq!(json["results"][0]["uniqueKey"], "first");
}
