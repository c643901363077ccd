use aperture::config::Config;
use aperture::db::{GalleryKind, GalleryUpsert};
use aperture::server::router::{AppState, aperture_router};
use axum::{
    Json, Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    routing::get,
};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

const WEBHOOK_SECRET: &str = "hook-secret";
const ADMIN_PASSWORD: &str = "correct horse battery staple";

static NEXT_CLIENT: AtomicU32 = AtomicU32::new(1);

/// Every request gets its own client address so the per-client cooldowns stay out of the way.
fn fresh_client() -> String {
    let n = NEXT_CLIENT.fetch_add(1, Ordering::SeqCst);
    format!("198.51.{}.{}", n / 256, n % 256)
}

async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{}", addr)).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

async fn spawn_lightroom() -> Url {
    let app = Router::new()
        .route(
            "/v2/spaces/s1/albums/pub-album",
            get(|| async { Json(json!({ "id": "pub-album", "payload": { "name": "Street" } })) }),
        )
        .route(
            "/v2/spaces/s1/albums/pub-album/assets",
            get(|| async {
                let resources: Vec<_> = (1..=5)
                    .map(|i| json!({ "id": format!("x{i}"), "asset": { "id": format!("pub-{i}"), "subtype": "image" } }))
                    .collect();
                Json(json!({ "resources": resources }))
            }),
        )
        .route(
            "/v2/spaces/s2/albums/slow-album",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!({ "id": "slow-album" }))
            }),
        );
    spawn_test_server(app).await
}

async fn build_app(prefix: &str) -> (Router, AppState) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "aperture-{prefix}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    let database_url = format!("sqlite:{}", temp_path.display());
    let db = aperture::db::spawn(&database_url).await;

    db.upsert_gallery(GalleryUpsert {
        id: "beta".to_string(),
        kind: GalleryKind::Public,
        url: Some("https://lightroom.adobe.com/shares/s1/albums/pub-album".to_string()),
        album_id: None,
        album_name: None,
        featured: false,
        sort_order: 0,
    })
    .await
    .expect("seed gallery");

    let mut cfg = Config::default();
    cfg.basic.admin_password = ADMIN_PASSWORD.to_string();
    cfg.basic.session_secret = "s".repeat(64);
    cfg.basic.webhook_secret = WEBHOOK_SECRET.to_string();
    cfg.lightroom.api_url = spawn_lightroom().await;
    cfg.lightroom.api_key = "lr-api-key".to_string();
    cfg.lightroom.enable_multiplexing = false;
    cfg.lightroom.request_tps = 1000;

    let state = AppState::new(db, &cfg).expect("app state");
    (aperture_router(state.clone()), state)
}

fn sync_request(uri: &str, client: &str, secret: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", client);
    if let Some(secret) = secret {
        builder = builder.header("x-webhook-secret", secret);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

async fn body_json(resp: axum::response::Response) -> Value {
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&body).expect("response body was not json")
}

#[tokio::test]
async fn sync_route_enforces_auth_validation_limits_and_conflicts() {
    let (app, state) = build_app("route-sync").await;

    // 1) no credentials -> 401
    let resp = app
        .clone()
        .oneshot(sync_request("/api/sync", &fresh_client(), None, ""))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // 2) wrong secret -> 401
    let resp = app
        .clone()
        .oneshot(sync_request("/api/sync", &fresh_client(), Some("nope"), ""))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // 3) malformed gallery id -> 400
    let resp = app
        .clone()
        .oneshot(sync_request(
            "/api/sync",
            &fresh_client(),
            Some(WEBHOOK_SECRET),
            r#"{"galleryId":"../etc/passwd"}"#,
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // 4) same client again inside the window -> 429, before auth is checked
    let client = fresh_client();
    let resp = app
        .clone()
        .oneshot(sync_request("/api/sync", &client, None, ""))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let resp = app
        .clone()
        .oneshot(sync_request("/api/sync", &client, Some(WEBHOOK_SECRET), ""))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    // 5) a run already in progress -> 409
    let guard = state.sync.begin().expect("claim run slot");
    let resp = app
        .clone()
        .oneshot(sync_request("/api/sync", &fresh_client(), Some(WEBHOOK_SECRET), ""))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "SYNC_IN_PROGRESS");
    drop(guard);

    // 6) success
    let resp = app
        .clone()
        .oneshot(sync_request(
            "/api/sync",
            &fresh_client(),
            Some(WEBHOOK_SECRET),
            r#"{"galleryId":"beta"}"#,
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["albums"], 1);
    assert_eq!(body["photos"], 5);
    assert_eq!(body["galleryId"], "beta");

    // 7) unknown gallery -> 404 with no internal detail
    let resp = app
        .clone()
        .oneshot(sync_request(
            "/api/sync",
            &fresh_client(),
            Some(WEBHOOK_SECRET),
            r#"{"galleryId":"missing"}"#,
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // 8) public stats
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/sync")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["albumCount"], 1);
    assert_eq!(body["photoCount"], 5);
    assert!(body["lastUpdated"].is_string());
}

#[tokio::test]
async fn stream_route_emits_frames_until_completion() {
    let (app, _state) = build_app("route-stream").await;

    // status endpoint requires auth
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/sync/stream")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/sync/stream")
                .header(header::AUTHORIZATION, format!("Bearer {WEBHOOK_SECRET}"))
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "syncing": false, "startedAt": null }));

    let resp = app
        .clone()
        .oneshot(sync_request(
            "/api/sync/stream",
            &fresh_client(),
            Some(WEBHOOK_SECRET),
            "",
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );
    assert_eq!(
        resp.headers()
            .get("x-accel-buffering")
            .and_then(|v| v.to_str().ok()),
        Some("no")
    );

    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read event stream");
    let events: Vec<_> = futures::stream::iter([Ok::<_, std::convert::Infallible>(body)])
        .eventsource()
        .collect()
        .await;
    let frames: Vec<Value> = events
        .into_iter()
        .map(|e| e.expect("valid event"))
        .filter(|e| !e.data.is_empty())
        .map(|e| serde_json::from_str(&e.data).expect("frame is json"))
        .collect();

    assert!(frames.len() >= 2, "expected progress plus terminal frame");
    let last = frames.last().expect("terminal frame");
    assert_eq!(last["status"], "completed");
    assert_eq!(last["totalPhotos"], 5);
    assert_eq!(last["albums"], 1);
    assert!(
        frames[..frames.len() - 1]
            .iter()
            .all(|f| f["status"] == "running" || f["status"] == "pending")
    );
}

#[tokio::test]
async fn dropping_the_stream_cancels_the_run_and_frees_the_slot() {
    let (app, state) = build_app("route-disconnect").await;
    state
        .db
        .upsert_gallery(GalleryUpsert {
            id: "stall".to_string(),
            kind: GalleryKind::Public,
            url: Some("https://lightroom.adobe.com/shares/s2/albums/slow-album".to_string()),
            album_id: None,
            album_name: None,
            featured: false,
            sort_order: 1,
        })
        .await
        .expect("seed stalled gallery");

    let resp = app
        .clone()
        .oneshot(sync_request(
            "/api/sync/stream",
            &fresh_client(),
            Some(WEBHOOK_SECRET),
            r#"{"galleryId":"stall"}"#,
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(state.sync.is_running(), "run holds the slot while streaming");

    drop(resp);

    let mut released = false;
    for _ in 0..200 {
        if !state.sync.is_running() {
            released = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(released, "disconnect did not release the run slot");

    // The slot is free again, so a normal sync goes through.
    let resp = app
        .clone()
        .oneshot(sync_request(
            "/api/sync",
            &fresh_client(),
            Some(WEBHOOK_SECRET),
            r#"{"galleryId":"beta"}"#,
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["photos"], 5);
}

#[tokio::test]
async fn admin_session_gates_gallery_routes() {
    let (app, _state) = build_app("route-admin").await;

    let login = |password: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", fresh_client())
            .body(Body::from(json!({ "password": password }).to_string()))
            .expect("failed to build request")
    };

    let resp = app.clone().oneshot(login("guess")).await.expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());

    let resp = app
        .clone()
        .oneshot(login(ADMIN_PASSWORD))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let cookie = resp
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("aperture_session="))
        .and_then(|v| v.split(';').next())
        .expect("session cookie issued")
        .to_string();

    // without a session
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/galleries")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // with a session
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/galleries")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body[0]["id"], "beta");
    assert_eq!(body[0]["type"], "public");

    // invalid gallery payload -> 400
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/galleries")
                .header(header::COOKIE, &cookie)
                .header("content-type", "application/json")
                .body(Body::from(r#"[{"id":"p","type":"private"}]"#))
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/galleries")
                .header(header::COOKIE, &cookie)
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"[{"id":"gamma","type":"private","albumId":"a-1","sortOrder":2}]"#,
                ))
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    // the session also authorizes sync triggers
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/sync/stream")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    // Adobe connect redirects to IMS with a state parameter.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/adobe")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("redirect location");
    assert!(location.starts_with("https://ims-na1.adobelogin.com/ims/authorize/v2"));
    assert!(location.contains("state="));

    // callback without the CSRF cookie is refused
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/adobe/callback?code=abc&state=xyz")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await["error"]["code"], "OAUTH_SESSION_MISSING");
}
