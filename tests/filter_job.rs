use paywall_filter::{FilterConfig, FilterService, MinifluxClient};
use serde_json::json;
use std::sync::Once;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .try_init()
            .ok();
    });
}

const PAYWALLED_POST: &str = r#"<html><body>
    <article class="post"><div class="paywall"></div></article>
</body></html>"#;

const FREE_POST: &str = r#"<html><body>
    <article class="post"><p>Full article body.</p></article>
</body></html>"#;

fn client(api: &MockServer) -> MinifluxClient {
    MinifluxClient::with_api_key(&api.uri(), "secret").unwrap()
}

fn config() -> FilterConfig {
    FilterConfig::default()
}

/// Mounts the two list endpoints every run consumes.
async fn mount_lists(api: &MockServer, entries: serde_json::Value, feeds: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/v1/entries"))
        .and(query_param("status", "unread"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": entries.as_array().map(|a| a.len()).unwrap_or(0),
            "entries": entries,
        })))
        .mount(api)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/feeds"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feeds))
        .mount(api)
        .await;
}

fn substack_entry(id: i64, feed_id: i64, url: String) -> serde_json::Value {
    json!({
        "id": id,
        "feed_id": feed_id,
        "status": "unread",
        "title": format!("Post {id}"),
        "url": url,
    })
}

#[tokio::test]
async fn paywalled_entry_is_marked_read() {
    init_tracing();
    let api = MockServer::start().await;
    let pages = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/p/x"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAYWALLED_POST))
        .expect(1)
        .mount(&pages)
        .await;
    mount_lists(
        &api,
        json!([substack_entry(1, 10, format!("{}/p/x", pages.uri()))]),
        json!([{"id": 10, "feed_url": "https://a.substack.com/feed", "rewrite_rules": ""}]),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/v1/entries"))
        .and(body_json(json!({"entry_ids": [1], "status": "read"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&api)
        .await;

    let mut service = FilterService::new(client(&api), config()).unwrap();
    let summary = service.run_filter_job().await.unwrap();

    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.candidates, 1);
    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.paywalled, 1);
    assert_eq!(summary.marked, 1);
}

#[tokio::test]
async fn dry_run_never_writes() {
    init_tracing();
    let api = MockServer::start().await;
    let pages = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/p/x"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAYWALLED_POST))
        .mount(&pages)
        .await;
    mount_lists(
        &api,
        json!([substack_entry(1, 10, format!("{}/p/x", pages.uri()))]),
        json!([{"id": 10, "feed_url": "https://a.substack.com/feed", "rewrite_rules": ""}]),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/v1/entries"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&api)
        .await;

    let mut service = FilterService::new(
        client(&api),
        FilterConfig {
            dry_run: true,
            ..config()
        },
    )
    .unwrap();
    let summary = service.run_filter_job().await.unwrap();

    assert_eq!(summary.paywalled, 1);
    assert_eq!(summary.marked, 0);
}

#[tokio::test]
async fn second_run_hits_cache_and_skips_fetch() {
    init_tracing();
    let api = MockServer::start().await;
    let pages = MockServer::start().await;

    // The page must be fetched exactly once across both runs.
    Mock::given(method("GET"))
        .and(path("/p/x"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FREE_POST))
        .expect(1)
        .mount(&pages)
        .await;
    mount_lists(
        &api,
        json!([substack_entry(1, 10, format!("{}/p/x", pages.uri()))]),
        json!([{"id": 10, "feed_url": "https://a.substack.com/feed", "rewrite_rules": ""}]),
    )
    .await;

    let mut service = FilterService::new(client(&api), config()).unwrap();
    let first = service.run_filter_job().await.unwrap();
    assert_eq!(first.fetched, 1);
    assert_eq!(first.paywalled, 0);

    let second = service.run_filter_job().await.unwrap();
    assert_eq!(second.candidates, 1);
    assert_eq!(second.fetched, 0);
    assert_eq!(second.paywalled, 0);
}

#[tokio::test]
async fn fetch_failure_skips_entry_and_retries_next_run() {
    init_tracing();
    let api = MockServer::start().await;
    let pages = MockServer::start().await;

    // Failed fetches are not cached, so both runs hit the page.
    Mock::given(method("GET"))
        .and(path("/p/x"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&pages)
        .await;
    mount_lists(
        &api,
        json!([substack_entry(1, 10, format!("{}/p/x", pages.uri()))]),
        json!([{"id": 10, "feed_url": "https://a.substack.com/feed", "rewrite_rules": ""}]),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/v1/entries"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&api)
        .await;

    let mut service = FilterService::new(client(&api), config()).unwrap();
    let summary = service.run_filter_job().await.unwrap();
    assert_eq!(summary.candidates, 1);
    assert_eq!(summary.fetched, 0);
    assert_eq!(summary.paywalled, 0);
    assert!(service.cache().is_empty());

    service.run_filter_job().await.unwrap();
}

#[tokio::test]
async fn non_candidate_feeds_are_never_fetched() {
    init_tracing();
    let api = MockServer::start().await;
    let pages = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAYWALLED_POST))
        .expect(0)
        .mount(&pages)
        .await;
    mount_lists(
        &api,
        json!([substack_entry(1, 10, format!("{}/p/x", pages.uri()))]),
        json!([{"id": 10, "feed_url": "https://example.com/feed", "rewrite_rules": ""}]),
    )
    .await;

    let mut service = FilterService::new(client(&api), config()).unwrap();
    let summary = service.run_filter_job().await.unwrap();
    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.candidates, 0);
}

#[tokio::test]
async fn opt_in_tag_overrides_url_pattern() {
    init_tracing();
    let api = MockServer::start().await;
    let pages = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/p/x"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAYWALLED_POST))
        .expect(1)
        .mount(&pages)
        .await;
    mount_lists(
        &api,
        json!([substack_entry(1, 10, format!("{}/p/x", pages.uri()))]),
        json!([{
            "id": 10,
            "feed_url": "https://example.com/feed",
            "rewrite_rules": "paywall-filter",
        }]),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/v1/entries"))
        .and(body_json(json!({"entry_ids": [1], "status": "read"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&api)
        .await;

    let mut service = FilterService::new(client(&api), config()).unwrap();
    let summary = service.run_filter_job().await.unwrap();
    assert_eq!(summary.candidates, 1);
    assert_eq!(summary.marked, 1);
}

#[tokio::test]
async fn list_failure_aborts_the_run() {
    init_tracing();
    let api = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/entries"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&api)
        .await;

    let mut service = FilterService::new(client(&api), config()).unwrap();
    assert!(service.run_filter_job().await.is_err());
}

#[tokio::test]
async fn api_key_is_sent_as_auth_token() {
    init_tracing();
    let api = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .and(header("X-Auth-Token", "secret"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 7, "username": "ben"})),
        )
        .expect(1)
        .mount(&api)
        .await;

    let user = client(&api).me().await.unwrap();
    assert_eq!(user.id, 7);
    assert_eq!(user.username, "ben");
}
