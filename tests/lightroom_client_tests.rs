use aperture::config::LightroomConfig;
use aperture::error::ApertureError;
use aperture::lightroom::{LightroomClient, build_http_client};
use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

const API_KEY: &str = "lr-api-key";
const TOKEN: &str = "at-test-token";

#[derive(Clone, Default)]
struct MockState {
    headers: Arc<Mutex<Vec<(String, HeaderMap)>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockState {
    fn capture(&self, path: &str, headers: &HeaderMap) {
        self.headers
            .lock()
            .expect("capture lock poisoned")
            .push((path.to_string(), headers.clone()));
    }

    fn captured(&self) -> Vec<(String, HeaderMap)> {
        self.headers.lock().expect("capture lock poisoned").clone()
    }
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

fn client_for(base: Url, batch_size: usize) -> LightroomClient {
    let cfg = LightroomConfig {
        api_url: base,
        api_key: API_KEY.to_string(),
        enable_multiplexing: false,
        request_tps: 1000,
        ..LightroomConfig::default()
    };
    let http = build_http_client(&cfg).expect("http client");
    LightroomClient::new(&cfg, http, batch_size)
}

/// `aN` is updated on day N, except a1..a3 which are out of order (days 2, 1, 3).
fn album_json(id: &str) -> serde_json::Value {
    let day = match id {
        "a1" => 2,
        "a2" => 1,
        "a3" => 3,
        other => other[1..].parse::<u32>().expect("album index"),
    };
    json!({
        "id": id,
        "subtype": "collection",
        "updated": format!("2024-03-{day:02}T10:00:00Z"),
        "payload": { "name": format!("Album {id}") }
    })
}

async fn catalog(State(state): State<MockState>, headers: HeaderMap) -> impl IntoResponse {
    state.capture("/v2/catalog", &headers);
    "while (1) {}\n{\"id\":\"cat-1\",\"payload\":{\"name\":\"Main\"}}"
}

async fn albums(
    State(state): State<MockState>,
    Path(catalog_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.capture(&format!("/v2/catalogs/{catalog_id}/albums"), &headers);
    let body = match query.get("page").map(String::as_str) {
        None => {
            let resources: Vec<_> = ["a1", "a2", "a3", "a4"].into_iter().map(album_json).collect();
            json!({
                "resources": resources,
                "links": { "next": { "href": "albums?subtype=collection&page=2" } }
            })
        }
        Some(_) => {
            let resources: Vec<_> = ["a5", "a6", "a7"].into_iter().map(album_json).collect();
            json!({ "resources": resources, "links": {} })
        }
    };
    // Compact guard variant.
    format!("while(1){{}}{body}")
}

async fn album_assets(
    State(state): State<MockState>,
    Path((catalog_id, album_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> axum::response::Response {
    state.capture(
        &format!("/v2/catalogs/{catalog_id}/albums/{album_id}/assets"),
        &headers,
    );

    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(30)).await;
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    if album_id == "a3" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let count: usize = album_id[1..].parse().expect("album index");
    let resources: Vec<_> = (0..count)
        .map(|i| json!({ "id": format!("{album_id}-aa{i}"), "asset": { "id": format!("{album_id}-p{i}"), "subtype": "image" } }))
        .collect();
    axum::Json(json!({ "resources": resources })).into_response()
}

async fn space_assets(
    State(state): State<MockState>,
    Path((space_id, album_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.capture(
        &format!("/v2/spaces/{space_id}/albums/{album_id}/assets"),
        &headers,
    );
    axum::Json(json!({
        "resources": [
            { "id": "x1", "asset": { "id": "p1", "subtype": "image" } },
            { "id": "x2", "asset": { "id": "p2", "subtype": "video" } }
        ]
    }))
}

fn mock_router(state: MockState) -> Router {
    Router::new()
        .route("/v2/catalog", get(catalog))
        .route("/v2/catalogs/{catalog_id}/albums", get(albums))
        .route(
            "/v2/catalogs/{catalog_id}/albums/{album_id}/assets",
            get(album_assets),
        )
        .route(
            "/v2/spaces/{space_id}/albums/{album_id}/assets",
            get(space_assets),
        )
        .with_state(state)
}

#[tokio::test]
async fn albums_with_counts_are_batched_sorted_and_tolerate_failures() {
    let state = MockState::default();
    let base = spawn_test_server(mock_router(state.clone())).await;
    let client = client_for(base, 5);

    let catalog = client.fetch_catalog(TOKEN).await.expect("catalog");
    assert_eq!(catalog.id, "cat-1");

    let albums = client
        .fetch_albums_with_counts(TOKEN, &catalog.id)
        .await
        .expect("albums with counts");

    let order: Vec<&str> = albums.iter().map(|a| a.album.id.as_str()).collect();
    assert_eq!(order, vec!["a7", "a6", "a5", "a4", "a3", "a1", "a2"]);

    let counts: HashMap<&str, u64> = albums
        .iter()
        .map(|a| (a.album.id.as_str(), a.asset_count))
        .collect();
    assert_eq!(counts["a3"], 0, "failed count defaults to zero");
    assert_eq!(counts["a1"], 1);
    assert_eq!(counts["a7"], 7);

    let max = state.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 5, "at most one batch in flight, saw {max}");

    // Both album pages and every count request carried the credentials.
    let captured = state.captured();
    assert_eq!(
        captured
            .iter()
            .filter(|(path, _)| path == "/v2/catalogs/cat-1/albums")
            .count(),
        2
    );
    for (path, headers) in &captured {
        assert_eq!(
            headers.get("x-api-key").and_then(|v| v.to_str().ok()),
            Some(API_KEY),
            "missing api key on {path}"
        );
        assert_eq!(
            headers.get("authorization").and_then(|v| v.to_str().ok()),
            Some("Bearer at-test-token"),
            "missing bearer on {path}"
        );
    }

    let json = serde_json::to_value(&albums[0]).expect("serialize album");
    assert_eq!(json["id"], "a7");
    assert_eq!(json["assetCount"], 7);
}

#[tokio::test]
async fn public_space_requests_carry_only_the_api_key() {
    let state = MockState::default();
    let base = spawn_test_server(mock_router(state.clone())).await;
    let client = client_for(base, 5);

    let assets = client
        .fetch_space_assets("space-1", "album-1")
        .await
        .expect("space assets");
    let ids: Vec<&str> = assets.iter().map(|a| a.asset_id()).collect();
    assert_eq!(ids, vec!["p1", "p2"]);

    let captured = state.captured();
    let (_, headers) = captured.first().expect("one request");
    assert_eq!(
        headers.get("x-api-key").and_then(|v| v.to_str().ok()),
        Some(API_KEY)
    );
    assert!(headers.get("authorization").is_none());
}

#[tokio::test]
async fn non_success_status_is_an_upstream_error() {
    let app = Router::new().route(
        "/v2/catalog",
        get(|| async { (StatusCode::FORBIDDEN, "while (1) {}{\"code\":1001}") }),
    );
    let base = spawn_test_server(app).await;
    let client = client_for(base, 5);

    let err = client
        .fetch_catalog(TOKEN)
        .await
        .expect_err("403 must fail");
    assert!(
        matches!(err, ApertureError::UpstreamStatus(StatusCode::FORBIDDEN)),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn api_url_path_prefix_is_preserved() {
    let app = Router::new().route(
        "/lr/v2/catalog",
        get(|| async { "{\"id\":\"prefixed\"}" }),
    );
    let base = spawn_test_server(app).await;
    let client = client_for(base.join("/lr").expect("prefixed url"), 5);

    let catalog = client.fetch_catalog(TOKEN).await.expect("catalog");
    assert_eq!(catalog.id, "prefixed");
}
