//! Integration tests for BundleManager over HTTP.
//!
//! Uses wiremock for HTTP mocking. Tests cover successful publication, status
//! mapping (404/429/5xx), retry, timeout and schema rejection, and that no
//! failure path replaces the current bundle.

use std::time::Duration;

use romhub_bundle::{
    BundleError, BundleManager, FetchError, HttpTransport, ParseError, TransportConfig,
    USER_AGENT_VALUE,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MANIFEST: &str = r#"{
    "provider_name": "XDA-Developers",
    "public_url": "https://xda.example/roms",
    "scheme_version": 1,
    "roms": [
        { "name": "OmniROM", "supported_devices": ["mako"] },
        { "name": "CyanogenMod", "supported_devices": ["find5", "mako"] },
        { "name": "Paranoid", "supported_devices": [] }
    ]
}"#;

const MANIFEST_V2: &str = r#"{
    "provider_name": "Future",
    "public_url": "https://future.example",
    "scheme_version": 2,
    "roms": []
}"#;

fn create_manager(max_retries: u32) -> BundleManager {
    let config = TransportConfig::default().with_max_retries(max_retries);
    BundleManager::new(HttpTransport::new(config).expect("failed to create transport"))
}

async fn mount_manifest(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_bundle_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bundle.json"))
        .and(header("user-agent", USER_AGENT_VALUE))
        .respond_with(ResponseTemplate::new(200).set_body_string(MANIFEST))
        .expect(1)
        .mount(&mock_server)
        .await;

    let manager = create_manager(0);
    let url = format!("{}/bundle.json", mock_server.uri());
    let fetched = manager.fetch_bundle(&url).await.expect("fetch failed");

    let bundle = manager.current_bundle().expect("expected current bundle");
    assert!(std::sync::Arc::ptr_eq(&fetched, &bundle));
    assert_eq!(bundle.provider_name(), "XDA-Developers");
    assert_eq!(bundle.public_url(), "https://xda.example/roms");
    assert_eq!(bundle.scheme_version(), 1);
    assert_eq!(bundle.roms().len(), 3);
    assert_eq!(
        bundle.supported_roms(),
        vec!["OmniROM", "CyanogenMod", "Paranoid"]
    );
    assert!(bundle.is_device_supported("find5"));
    assert!(!bundle.is_device_supported("hammerhead"));

    let status = manager.status();
    assert_eq!(status.source_url.as_deref(), Some(url.as_str()));
    assert!(!status.fetching);
    assert!(status.last_error.is_none());
}

#[tokio::test]
async fn test_transport_failure_with_nothing_loaded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bundle.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let manager = create_manager(0);
    let result = manager
        .fetch_bundle(&format!("{}/bundle.json", mock_server.uri()))
        .await;

    assert!(matches!(
        result,
        Err(BundleError::Fetch(FetchError::Status { status: 404, .. }))
    ));
    assert!(manager.current_bundle().is_none());
    assert!(manager.status().last_error.is_some());
}

#[tokio::test]
async fn test_transport_failure_keeps_previous_bundle() {
    let mock_server = MockServer::start().await;
    mount_manifest(&mock_server, "/good.json", MANIFEST).await;

    Mock::given(method("GET"))
        .and(path("/down.json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let manager = create_manager(0);
    manager
        .fetch_bundle(&format!("{}/good.json", mock_server.uri()))
        .await
        .expect("fetch failed");
    let before = manager.current_bundle().expect("expected bundle");

    let err = manager
        .fetch_bundle(&format!("{}/down.json", mock_server.uri()))
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    let after = manager.current_bundle().expect("bundle should survive");
    assert!(std::sync::Arc::ptr_eq(&before, &after));
    assert!(manager.status().is_stale());
}

#[tokio::test]
async fn test_unsupported_scheme_version_keeps_previous_bundle() {
    let mock_server = MockServer::start().await;
    mount_manifest(&mock_server, "/v1.json", MANIFEST).await;
    mount_manifest(&mock_server, "/v2.json", MANIFEST_V2).await;

    let manager = create_manager(0);
    manager
        .fetch_bundle(&format!("{}/v1.json", mock_server.uri()))
        .await
        .expect("fetch failed");

    let result = manager
        .fetch_bundle(&format!("{}/v2.json", mock_server.uri()))
        .await;
    assert_eq!(
        result.unwrap_err(),
        BundleError::Parse(ParseError::SchemaVersionUnsupported(2))
    );

    let bundle = manager.current_bundle().expect("bundle should survive");
    assert_eq!(bundle.provider_name(), "XDA-Developers");
}

#[tokio::test]
async fn test_unsupported_scheme_version_with_nothing_loaded() {
    let mock_server = MockServer::start().await;
    mount_manifest(&mock_server, "/v2.json", MANIFEST_V2).await;

    let manager = create_manager(0);
    let result = manager
        .fetch_bundle(&format!("{}/v2.json", mock_server.uri()))
        .await;

    assert!(matches!(
        result,
        Err(BundleError::Parse(ParseError::SchemaVersionUnsupported(2)))
    ));
    assert!(manager.current_bundle().is_none());
}

#[tokio::test]
async fn test_new_bundle_replaces_old_without_merging() {
    let mock_server = MockServer::start().await;
    mount_manifest(&mock_server, "/a.json", MANIFEST).await;
    mount_manifest(
        &mock_server,
        "/b.json",
        r#"{"provider_name":"Other","public_url":"https://other.example","scheme_version":1,
            "roms":[{"name":"Solo","supported_devices":["hammerhead"]}]}"#,
    )
    .await;

    let manager = create_manager(0);
    manager
        .fetch_bundle(&format!("{}/a.json", mock_server.uri()))
        .await
        .expect("fetch a failed");
    manager
        .fetch_bundle(&format!("{}/b.json", mock_server.uri()))
        .await
        .expect("fetch b failed");

    let bundle = manager.current_bundle().expect("expected bundle");
    assert_eq!(bundle.provider_name(), "Other");
    assert_eq!(bundle.supported_roms(), vec!["Solo"]);
    assert!(!bundle.is_device_supported("mako"));
    assert!(bundle.is_device_supported("hammerhead"));
}

#[tokio::test]
async fn test_malformed_rom_entry_skipped() {
    let mock_server = MockServer::start().await;
    mount_manifest(
        &mock_server,
        "/partial.json",
        r#"{"provider_name":"p","public_url":"u","scheme_version":1,
            "roms":[{"name":"ok","supported_devices":["mako"]},{"name":["broken"]}]}"#,
    )
    .await;

    let manager = create_manager(0);
    let bundle = manager
        .fetch_bundle(&format!("{}/partial.json", mock_server.uri()))
        .await
        .expect("partial manifest should load");

    assert_eq!(bundle.supported_roms(), vec!["ok"]);
}

#[tokio::test]
async fn test_rate_limited_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bundle.json"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "5"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let manager = create_manager(0);
    let result = manager
        .fetch_bundle(&format!("{}/bundle.json", mock_server.uri()))
        .await;

    match result {
        Err(BundleError::Fetch(FetchError::RateLimited { retry_after })) => {
            assert_eq!(retry_after, Some(Duration::from_secs(5)));
        }
        other => panic!("expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_retry_on_server_error_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bundle.json"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_manifest(&mock_server, "/bundle.json", MANIFEST).await;

    let manager = create_manager(1);
    let bundle = manager
        .fetch_bundle(&format!("{}/bundle.json", mock_server.uri()))
        .await
        .expect("retry should recover");

    assert_eq!(bundle.roms().len(), 3);
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bundle.json"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let manager = create_manager(3);
    let result = manager
        .fetch_bundle(&format!("{}/bundle.json", mock_server.uri()))
        .await;

    assert!(matches!(
        result,
        Err(BundleError::Fetch(FetchError::Status { status: 403, .. }))
    ));
}

#[tokio::test]
async fn test_fetch_timeout_keeps_state() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(MANIFEST)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let manager = create_manager(0);
    let result = manager
        .fetch_bundle_with_timeout(
            &format!("{}/slow.json", mock_server.uri()),
            Duration::from_millis(200),
        )
        .await;

    assert_eq!(
        result.unwrap_err(),
        BundleError::Fetch(FetchError::Timeout {
            after: Some(Duration::from_millis(200))
        })
    );
    assert!(manager.current_bundle().is_none());
    assert!(!manager.status().fetching);
}

#[tokio::test]
async fn test_invalid_url_rejected_before_request() {
    let manager = create_manager(0);

    let result = manager.fetch_bundle("file:///etc/bundle.json").await;
    assert!(matches!(
        result,
        Err(BundleError::Fetch(FetchError::InvalidUrl { .. }))
    ));
    assert!(!result.unwrap_err().is_retryable());
}

#[tokio::test]
async fn test_html_error_page_is_parse_error() {
    let mock_server = MockServer::start().await;
    mount_manifest(&mock_server, "/bundle.json", "<html>maintenance</html>").await;

    let manager = create_manager(0);
    let result = manager
        .fetch_bundle(&format!("{}/bundle.json", mock_server.uri()))
        .await;

    assert!(matches!(
        result,
        Err(BundleError::Parse(ParseError::InvalidJson { .. }))
    ));
    assert!(manager.current_bundle().is_none());
}
