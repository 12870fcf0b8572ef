use movies_api::create_noop_metrics;
use serde_json::{json, Value};
use tokio::net::TcpListener;

mod common;
use common::{TestServer, ORIGIN, TEST_API_KEY};

#[tokio::test]
async fn test_movie_detail_passthrough() {
    // ---
    let server = TestServer::new().await;

    let res = server
        .client
        .get(server.url("/api/movie/550"))
        .header("origin", ORIGIN)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["access-control-allow-origin"], ORIGIN);
    assert_eq!(res.headers()["access-control-allow-credentials"], "true");
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let text = res.text().await.unwrap();
    assert!(!text.contains(TEST_API_KEY));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body, json!({ "id": 550, "title": "Fight Club" }));
}

#[tokio::test]
async fn test_upstream_status_is_preserved() {
    // ---
    let server = TestServer::new().await;

    let res = server
        .client
        .get(server.url("/api/movie/404404"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
}

async fn upstream_echo(server: &TestServer, path: &str) -> Value {
    // ---
    let res = server.client.get(server.url(path)).send().await.unwrap();
    assert_eq!(res.status(), 200, "{path}");
    res.json().await.unwrap()
}

#[tokio::test]
async fn test_routes_map_to_upstream_paths() {
    // ---
    let server = TestServer::new().await;

    let cases = [
        ("/api/trending", "/3/trending/all/day"),
        ("/api/search?query=alien", "/3/search/multi"),
        ("/api/movie/search?query=alien", "/3/search/movie"),
        ("/api/movie/603/credits", "/3/movie/603/credits"),
        ("/api/tv/search?query=lost", "/3/search/tv"),
        ("/api/tv/1399", "/3/tv/1399"),
        ("/api/tv/1399/credits", "/3/tv/1399/credits"),
        ("/api/person/search?query=pitt", "/3/search/person"),
        ("/api/person/287", "/3/person/287"),
        ("/api/person/287/credits", "/3/person/287/combined_credits"),
    ];

    for (gateway, upstream) in cases {
        let body = upstream_echo(&server, gateway).await;
        assert_eq!(body["path"], upstream, "{gateway}");
        assert_eq!(body["keyed"], true, "{gateway}");
    }
}

#[tokio::test]
async fn test_query_string_is_forwarded_and_api_key_cannot_be_overridden() {
    // ---
    let server = TestServer::new().await;

    let body = upstream_echo(
        &server,
        "/api/movie/search?query=the%20thing&page=2&api_key=attacker",
    )
    .await;

    assert_eq!(body["params"], json!({ "query": "the thing", "page": "2" }));
    assert_eq!(body["keyed"], true);
}

#[tokio::test]
async fn test_non_numeric_media_id_is_422() {
    // ---
    let server = TestServer::new().await;

    let res = server
        .client
        .get(server.url("/api/movie/abc"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 422);
    assert_eq!(res.text().await.unwrap(), "Movie ID param not supplied");
}

#[tokio::test]
async fn test_unreachable_upstream_is_500_without_key() {
    // ---
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = format!("http://{}/3", listener.local_addr().unwrap());
    drop(listener);

    let server = TestServer::start(create_noop_metrics().unwrap(), &closed).await;

    let res = server
        .client
        .get(server.url("/api/trending"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    let text = res.text().await.unwrap();
    assert!(!text.is_empty());
    assert!(!text.contains(TEST_API_KEY));
}

#[tokio::test]
async fn test_unmatched_paths_are_404() {
    // ---
    let server = TestServer::new().await;

    for path in ["/api/unknown", "/api/movies", "/elsewhere"] {
        let res = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(res.status(), 404, "{path}");
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
        assert_eq!(res.text().await.unwrap(), "404, not found!");
    }

    // Known path, wrong method.
    let res = server
        .client
        .delete(server.url("/api/movie/550"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}
