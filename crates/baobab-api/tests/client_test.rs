#![allow(clippy::unwrap_used)]
// Integration tests for `BaobabClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use baobab_api::{BaobabClient, Error};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, BaobabClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = BaobabClient::with_client(
        reqwest::Client::new(),
        base_url,
        SecretString::from("server-secret".to_string()),
    );
    (server, client)
}

async fn logged_in() -> (MockServer, BaobabClient) {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("api-key-123"))
        .mount(&server)
        .await;
    let password = SecretString::from("pw".to_string());
    client.login("admin", &password).await.unwrap();
    (server, client)
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_stores_api_key() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .and(query_param("login_id", "admin"))
        .and(query_param("password", "pw"))
        .and(query_param("login_server_secret", "server-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  api-key-123\n"))
        .expect(1)
        .mount(&server)
        .await;

    let password = SecretString::from("pw".to_string());
    client.login("admin", &password).await.unwrap();
    assert!(client.has_api_key());
}

#[tokio::test]
async fn test_login_failure() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let password = SecretString::from("wrong".to_string());
    let result = client.login("admin", &password).await;

    assert!(
        matches!(result, Err(Error::HttpStatus { status: 403, .. })),
        "expected HTTP 403, got: {result:?}"
    );
    assert!(!client.has_api_key());
}

#[tokio::test]
async fn test_login_empty_key() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
        .mount(&server)
        .await;

    let password = SecretString::from("pw".to_string());
    let result = client.login("admin", &password).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert!(!client.has_api_key());
}

#[tokio::test]
async fn test_logout_expects_reset_content() {
    let (server, client) = logged_in().await;

    Mock::given(method("GET"))
        .and(path("/logout"))
        .and(query_param("login_api_key", "api-key-123"))
        .respond_with(ResponseTemplate::new(205))
        .expect(1)
        .mount(&server)
        .await;

    client.logout().await.unwrap();
    assert!(!client.has_api_key());
}

#[tokio::test]
async fn test_logout_with_other_status_is_an_error() {
    let (server, client) = logged_in().await;

    Mock::given(method("GET"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client.logout().await;
    assert!(matches!(result, Err(Error::HttpStatus { status: 500, .. })));
    assert!(!client.has_api_key());
}

#[tokio::test]
async fn test_my_user_info_400_means_none() {
    let (server, client) = logged_in().await;

    Mock::given(method("GET"))
        .and(path("/json/people/people/my_info"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    assert!(client.my_user_info().await.unwrap().is_none());
}

// ── Record endpoints ────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_by_ids_sends_credentials_and_details_flag() {
    let (server, client) = logged_in().await;

    let body = json!({ "places": [{ "id": 2, "name": "X", "lang": "en" }] });

    Mock::given(method("GET"))
        .and(path("/json/places/2,3"))
        .and(query_param("show_details", ""))
        .and(query_param("login_server_secret", "server-secret"))
        .and(query_param("login_api_key", "api-key-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let bytes = client.fetch_by_ids("places", &[2, 3]).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed, body);
}

#[tokio::test]
async fn test_fetch_requires_login() {
    let (_server, client) = setup().await;

    let result = client.fetch_by_ids("places", &[1]).await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

#[tokio::test]
async fn test_baseline_needs_no_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/json/baseline"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "baseline": { "plugins": ["people", "places"] } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    client.baseline().await.unwrap();
}

#[tokio::test]
async fn test_http_error_carries_status_and_body() {
    let (server, client) = logged_in().await;

    Mock::given(method("GET"))
        .and(path("/json/things/abc"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&server)
        .await;

    let err = client
        .fetch_things_by_key(&["abc".to_string()])
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.body().map(|b| b.as_ref()), Some(&b"nope"[..]));
}

#[tokio::test]
async fn test_put_record_sends_changes_as_query() {
    let (server, client) = logged_in().await;

    Mock::given(method("PUT"))
        .and(path("/json/places/7"))
        .and(query_param("name", "New Name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client
        .put_record("places", 7, &[("name".into(), "New Name".into())])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_fetch_logins_by_login_id() {
    let (server, client) = logged_in().await;

    Mock::given(method("GET"))
        .and(path("/json/people/logins/"))
        .and(query_param("login_ids", "alice,bob"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "logins": [] })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .fetch_logins_by_login_id(&["alice".into(), "bob".into()])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_thing_key_with_slash_stays_one_segment() {
    let (server, client) = logged_in().await;

    Mock::given(method("GET"))
        .and(path("/json/things/a%2Fb,lamp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "things": [] })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .fetch_things_by_key(&["a/b".into(), "lamp".into()])
        .await
        .unwrap();
}
