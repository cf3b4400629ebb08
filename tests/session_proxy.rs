//! End-to-end session and cookie injection behavior.

use reqwest::header::{COOKIE, SET_COOKIE};
use search_session_proxy::SessionId;
use std::collections::BTreeMap;

mod common;

fn pairs(items: &[(&str, &str)]) -> BTreeMap<String, String> {
    items
        .iter()
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn seeded_session_cookies_reach_upstream() {
    let upstream = common::start_recording_upstream(200, "results", &[]).await;
    let proxy = common::start_proxy(common::proxy_config(upstream.addr)).await;

    let id = common::create_session(
        &proxy,
        Some(serde_json::json!({ "cookies": { "a": "1", "b": "2" } })),
    )
    .await;

    let res = common::client()
        .get(proxy.url("/search?q=rust"))
        .header(COOKIE, format!("sessionId={id}"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let set_cookies: Vec<_> = res
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(set_cookies.contains(&format!("sessionId={id}; Path=/")));
    assert_eq!(res.text().await.unwrap(), "results");

    let seen = upstream.last();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.target, "/?q=rust");
    assert_eq!(seen.cookies.len(), 1);
    assert_eq!(seen.cookie_pairs(), pairs(&[("a", "1"), ("b", "2")]));
}

#[tokio::test]
async fn anonymous_request_keeps_original_cookies() {
    let upstream = common::start_recording_upstream(200, "ok", &[]).await;
    let proxy = common::start_proxy(common::proxy_config(upstream.addr)).await;

    let res = common::client()
        .get(proxy.url("/search?q=x"))
        .header(COOKIE, "foo=client; bar=2")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert!(res.headers().get(SET_COOKIE).is_none());
    assert_eq!(upstream.last().cookies, vec!["foo=client; bar=2".to_string()]);
}

#[tokio::test]
async fn unknown_session_is_forwarded_untouched() {
    let upstream = common::start_recording_upstream(200, "ok", &[]).await;
    let proxy = common::start_proxy(common::proxy_config(upstream.addr)).await;
    proxy.store.create();

    let res = common::client()
        .get(proxy.url("/search"))
        .header(COOKIE, "sessionId=bogus; foo=1")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(upstream.last().cookies, vec!["sessionId=bogus; foo=1".to_string()]);
    assert_eq!(proxy.store.len(), 1, "no session created implicitly");
}

#[tokio::test]
async fn stored_cookie_overrides_client_cookie() {
    let upstream = common::start_recording_upstream(200, "ok", &[]).await;
    let proxy = common::start_proxy(common::proxy_config(upstream.addr)).await;

    let id = proxy.store.create();
    assert!(proxy.store.set_cookie(&id, "foo", "server"));

    common::client()
        .get(proxy.url("/search?q=1"))
        .header(COOKIE, format!("foo=client; sessionId={id}; other=kept"))
        .send()
        .await
        .unwrap();

    let seen = upstream.last().cookie_pairs();
    assert_eq!(seen.get("foo").map(String::as_str), Some("server"));
    assert_eq!(seen.get("other").map(String::as_str), Some("kept"));
    assert!(!seen.contains_key("sessionId"));
}

#[tokio::test]
async fn sessions_are_isolated() {
    let upstream = common::start_recording_upstream(200, "ok", &[]).await;
    let proxy = common::start_proxy(common::proxy_config(upstream.addr)).await;

    let a = common::create_session(&proxy, Some(serde_json::json!({ "cookies": { "owner": "a" } }))).await;
    let b = common::create_session(&proxy, Some(serde_json::json!({ "cookies": { "owner": "b" } }))).await;
    assert_ne!(a, b);

    common::client()
        .get(proxy.url("/search?q=b"))
        .header(COOKIE, format!("sessionId={b}"))
        .send()
        .await
        .unwrap();

    assert_eq!(upstream.last().cookie_pairs(), pairs(&[("owner", "b")]));
}

#[tokio::test]
async fn nested_paths_are_rewritten_and_host_changed() {
    let upstream = common::start_recording_upstream(200, "ok", &[]).await;
    let proxy = common::start_proxy(common::proxy_config(upstream.addr)).await;

    common::client()
        .get(proxy.url("/search/images?q=cats"))
        .send()
        .await
        .unwrap();

    let seen = upstream.last();
    assert_eq!(seen.target, "/images?q=cats");
    assert_eq!(seen.host, Some(upstream.addr.to_string()));
}

#[tokio::test]
async fn mount_with_trailing_slash_is_proxied() {
    let upstream = common::start_recording_upstream(200, "ok", &[]).await;
    let proxy = common::start_proxy(common::proxy_config(upstream.addr)).await;
    let id = common::create_session(&proxy, Some(serde_json::json!({ "cookies": { "a": "1" } }))).await;

    for (path, expected) in [("/search/", "/"), ("/search/?q=x", "/?q=x")] {
        let res = common::client()
            .get(proxy.url(path))
            .header(COOKIE, format!("sessionId={id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200, "{path}");

        let seen = upstream.last();
        assert_eq!(seen.target, expected);
        assert_eq!(seen.cookie_pairs(), pairs(&[("a", "1")]));
    }
    assert_eq!(upstream.requests().len(), 2);
}

#[tokio::test]
async fn request_id_reaches_upstream_and_client() {
    let upstream = common::start_recording_upstream(200, "ok", &[]).await;
    let proxy = common::start_proxy(common::proxy_config(upstream.addr)).await;

    let res = common::client().get(proxy.url("/search?q=id")).send().await.unwrap();
    let returned = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(!returned.is_empty());
    assert_eq!(upstream.last().request_id, Some(returned));

    common::client()
        .get(proxy.url("/search?q=id"))
        .header("x-request-id", "caller-chosen")
        .send()
        .await
        .unwrap();
    assert_eq!(upstream.last().request_id.as_deref(), Some("caller-chosen"));
}

#[tokio::test]
async fn upstream_response_is_passed_through_and_not_captured() {
    static HEADERS: &[(&str, &str)] = &[("x-upstream", "yes"), ("set-cookie", "NID=42; Path=/")];
    let upstream = common::start_recording_upstream(404, "missing", HEADERS).await;
    let proxy = common::start_proxy(common::proxy_config(upstream.addr)).await;

    let id = proxy.store.create();
    let res = common::client()
        .post(proxy.url("/search/form"))
        .header(COOKIE, format!("sessionId={id}"))
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    assert_eq!(res.headers()["x-upstream"], "yes");
    let set_cookies: Vec<_> = res.headers().get_all(SET_COOKIE).iter().collect();
    assert_eq!(set_cookies.len(), 2);
    assert_eq!(res.text().await.unwrap(), "missing");

    assert_eq!(upstream.last().method, "POST");
    let stored = proxy.store.get(&id).unwrap();
    assert!(stored.cookies.is_empty(), "upstream cookies must not be captured");
}

#[tokio::test]
async fn repeated_requests_see_identical_cookies() {
    let upstream = common::start_recording_upstream(200, "ok", &[]).await;
    let proxy = common::start_proxy(common::proxy_config(upstream.addr)).await;

    let id = common::create_session(&proxy, Some(serde_json::json!({ "cookies": { "k": "v" } }))).await;
    for _ in 0..2 {
        common::client()
            .get(proxy.url("/search"))
            .header(COOKIE, format!("sessionId={id}; c=1"))
            .send()
            .await
            .unwrap();
    }

    let requests = upstream.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].cookie_pairs(), requests[1].cookie_pairs());
    assert_eq!(
        proxy.store.get(&SessionId::from(id.as_str())).unwrap().cookies,
        pairs(&[("k", "v")])
    );
}

#[tokio::test]
async fn unrelated_paths_are_not_proxied() {
    let upstream = common::start_recording_upstream(200, "ok", &[]).await;
    let proxy = common::start_proxy(common::proxy_config(upstream.addr)).await;

    let res = common::client().get(proxy.url("/searching")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert!(upstream.requests().is_empty());
}
