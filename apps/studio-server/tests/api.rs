use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use parking_lot::Mutex;
use project::ProjectDb;
use serde_json::{json, Value};
use std::sync::Arc;
use studio_server::{router, AppState};
use timeline::{add_node, Project};
use tower::ServiceExt;

fn app() -> Router {
    let db = ProjectDb::open_in_memory().unwrap();
    db.create_user("editor", "correct horse").unwrap();
    router(AppState {
        db: Arc::new(Mutex::new(db)),
        session_ttl: chrono::Duration::hours(1),
        secure_cookies: false,
    })
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, headers, body)
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Logs in and returns the `name=value` part of the session cookie.
async fn login(app: &Router) -> String {
    let (status, headers, body) = send(
        app,
        json_request(
            "POST",
            "/api/login",
            None,
            json!({ "username": "editor", "password": "correct horse" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "editor");

    let set_cookie = headers
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn health_needs_no_session() {
    let app = app();
    let (status, _, body) = send(&app, get("/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn editor_routes_are_gated() {
    let app = app();
    let (status, _, body) = send(&app, get("/api/projects", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _, _) = send(&app, get("/api/projects", Some("studio_session=forged"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = app();
    let (status, headers, _) = send(
        &app,
        json_request(
            "POST",
            "/api/login",
            None,
            json!({ "username": "editor", "password": "nope" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn project_lifecycle() {
    let app = app();
    let cookie = login(&app).await;

    let (status, _, created) = send(
        &app,
        json_request("POST", "/api/projects", Some(&cookie), json!({ "name": "Pilot" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["videos"], json!([]));

    let (status, _, listing) = send(&app, get("/api/projects", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing[0]["name"], "Pilot");
    assert!(listing[0].get("videos").is_none());

    // Edit locally, then save the whole document.
    let mut project: Project = serde_json::from_value(created).unwrap();
    add_node(&mut project, "Intro");
    let (status, _, _) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/projects/{}", id),
            Some(&cookie),
            serde_json::to_value(&project).unwrap(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, loaded) = send(&app, get(&format!("/api/projects/{}", id), Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loaded["videos"][0]["name"], "Intro");
    assert_eq!(loaded["videos"][0]["isStartNode"], true);

    let (status, _, renamed) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/projects/{}", id),
            Some(&cookie),
            json!({ "name": "Season 1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Season 1");

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/projects/{}", id))
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&app, get(&format!("/api/projects/{}", id), Some(&cookie))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_saves_are_refused() {
    let app = app();
    let cookie = login(&app).await;
    let (_, _, created) = send(
        &app,
        json_request("POST", "/api/projects", Some(&cookie), json!({ "name": "Pilot" })),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/api/projects/{}", id);

    let malformed = Request::builder()
        .method("PUT")
        .uri(&uri)
        .header(header::COOKIE, &cookie)
        .body(Body::from("{\"videos\": 3"))
        .unwrap();
    let (status, _, _) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let other = Project::new("Other");
    let (status, _, _) = send(
        &app,
        json_request("PUT", &uri, Some(&cookie), serde_json::to_value(&other).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut nameless: Project = serde_json::from_value(created).unwrap();
    nameless.name = String::new();
    let (status, _, body) = send(
        &app,
        json_request("PUT", &uri, Some(&cookie), serde_json::to_value(&nameless).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn embed_is_public_and_cacheable() {
    let app = app();
    let cookie = login(&app).await;
    let (_, _, created) = send(
        &app,
        json_request("POST", "/api/projects", Some(&cookie), json!({ "name": "Shared" })),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let req = Request::builder()
        .uri(format!("/api/embed/{}", id))
        .header(header::ORIGIN, "https://blog.example.com")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Shared");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=60");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let (status, _, _) = send(
        &app,
        get(&format!("/api/embed/{}", Project::new("x").id), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app, get("/api/embed/not-a-uuid", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = app();
    let cookie = login(&app).await;

    let logout = Request::builder()
        .method("POST")
        .uri("/api/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&app, logout).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(headers[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    let (status, _, _) = send(&app, get("/api/projects", Some(&cookie))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_token_opens_the_gate() {
    let app = app();
    let (_, _, body) = send(
        &app,
        json_request(
            "POST",
            "/api/login",
            None,
            json!({ "username": "editor", "password": "correct horse" }),
        ),
    )
    .await;
    let token = body["token"].as_str().unwrap();

    let req = Request::builder()
        .uri("/api/projects")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _, listing) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing, json!([]));
}
