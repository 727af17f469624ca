#![allow(clippy::unwrap_used)]
// Integration tests for `DaemonClient` using wiremock.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zerofly_api::{AUTH_HEADER, DaemonClient, Error, NetworkConfigUpdate, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

const TOKEN: &str = "s3cr3t-token";
const NWID: &str = "abcdef0123456789";

async fn setup() -> (MockServer, DaemonClient) {
    let server = MockServer::start().await;
    let token: SecretString = TOKEN.to_string().into();
    let client = DaemonClient::new(&server.uri(), &token, &TransportConfig::default()).unwrap();
    (server, client)
}

fn network_json(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "nwid": id,
        "name": name,
        "mac": "be:ef:00:11:22:33",
        "status": "OK",
        "type": "PRIVATE",
        "assignedAddresses": ["10.147.17.4/24"],
        "routes": [{ "target": "10.147.17.0/24", "via": null }],
        "mtu": 2800,
        "allowDefault": false,
        "allowGlobal": false,
        "allowManaged": true,
        "allowDNS": false,
        "portDeviceName": "ztabcdef12"
    })
}

// ── Auth header ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_status_sends_auth_header() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .and(header(AUTH_HEADER, TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "address": "89e92ceee5",
            "publicIdentity": "89e92ceee5:0:abcdef",
            "online": true,
            "version": "1.14.0",
            "tcpFallbackActive": false,
            "config": { "settings": { "primaryPort": 9993 } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = client.status().await.unwrap();
    assert_eq!(status.address, "89e92ceee5");
    assert!(status.online);
    assert_eq!(
        status.config.and_then(|c| c.settings).and_then(|s| s.primary_port),
        Some(9993)
    );
}

#[tokio::test]
async fn test_unauthorized_maps_to_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/network"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{}"))
        .mount(&server)
        .await;

    let result = client.list_networks().await;
    assert!(
        matches!(result, Err(Error::Unauthorized { status: 401 })),
        "expected Unauthorized, got: {result:?}"
    );
}

// ── Networks ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_networks() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/network"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            network_json(NWID, "lab"),
            network_json("1122334455667788", "")
        ])))
        .mount(&server)
        .await;

    let networks = client.list_networks().await.unwrap();
    assert_eq!(networks.len(), 2);
    assert_eq!(networks[0].id, NWID);
    assert_eq!(networks[0].port_device_name.as_deref(), Some("ztabcdef12"));
    assert!(networks[0].allow_managed);
    assert_eq!(networks[1].name, "");
}

#[tokio::test]
async fn test_join_posts_empty_object() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(format!("/network/{NWID}")))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(network_json(NWID, "")))
        .expect(1)
        .mount(&server)
        .await;

    let joined = client.join_network(NWID).await.unwrap();
    assert_eq!(joined.id, NWID);
}

#[tokio::test]
async fn test_update_network_sends_only_changed_flags() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(format!("/network/{NWID}")))
        .and(body_json(json!({ "allowDNS": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(network_json(NWID, "lab")))
        .expect(1)
        .mount(&server)
        .await;

    let update = NetworkConfigUpdate {
        allow_dns: Some(true),
        ..Default::default()
    };
    client.update_network(NWID, &update).await.unwrap();
}

#[tokio::test]
async fn test_get_unknown_network_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/network/ffffffffffffffff"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{}"))
        .mount(&server)
        .await;

    let result = client.get_network("ffffffffffffffff").await;
    match result {
        Err(Error::NotFound { path }) => assert_eq!(path, "network/ffffffffffffffff"),
        other => panic!("expected NotFound, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_leave_network() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path(format!("/network/{NWID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": true })))
        .expect(1)
        .mount(&server)
        .await;

    client.leave_network(NWID).await.unwrap();
}

// ── Peers ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_peers() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/peer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "address": "62f865ae71",
            "role": "PLANET",
            "latency": 37,
            "version": "-1.-1.-1",
            "paths": [{
                "address": "50.7.252.138/9993",
                "active": true,
                "expired": false,
                "preferred": true,
                "lastReceive": 1_700_000_000_000_i64
            }]
        }])))
        .mount(&server)
        .await;

    let peers = client.list_peers().await.unwrap();
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].role.as_deref(), Some("PLANET"));
    assert_eq!(peers[0].paths.len(), 1);
    assert!(peers[0].paths[0].preferred);
}

// ── Failure mapping ─────────────────────────────────────────────────

#[tokio::test]
async fn test_server_error_keeps_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/peer"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "internal failure" })),
        )
        .mount(&server)
        .await;

    let result = client.list_peers().await;
    match result {
        Err(Error::ServerError { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "internal failure");
        }
        other => panic!("expected ServerError, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let result = client.status().await;
    assert!(
        matches!(result, Err(Error::Malformed { .. })),
        "expected Malformed, got: {result:?}"
    );
}

#[tokio::test]
async fn test_wrong_shape_is_malformed() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/network"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": NWID })))
        .mount(&server)
        .await;

    let result = client.list_networks().await;
    assert!(matches!(result, Err(Error::Malformed { .. })));
}

#[tokio::test]
async fn test_slow_daemon_is_unreachable() {
    let server = MockServer::start().await;
    let token: SecretString = TOKEN.to_string().into();
    let transport = TransportConfig {
        timeout: Duration::from_millis(200),
        connect_timeout: Duration::from_millis(200),
    };
    let client = DaemonClient::new(&server.uri(), &token, &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "address": "89e92ceee5" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client.status().await.unwrap_err();
    assert!(err.is_unreachable(), "expected Unreachable, got: {err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_refused_connection_is_unreachable() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let token: SecretString = TOKEN.to_string().into();
    let client = DaemonClient::new(
        &format!("http://127.0.0.1:{port}"),
        &token,
        &TransportConfig::default(),
    )
    .unwrap();

    let err = client.list_networks().await.unwrap_err();
    assert!(err.is_unreachable(), "expected Unreachable, got: {err:?}");
}

/// Accepts one connection, reads the request, and hangs up without replying.
async fn hang_up_once() -> String {
    use tokio::io::AsyncReadExt;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            drop(socket);
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_connection_closed_before_reply_is_unreachable() {
    let url = hang_up_once().await;
    let token: SecretString = TOKEN.to_string().into();
    let client = DaemonClient::new(&url, &token, &TransportConfig::default()).unwrap();

    let err = client.status().await.unwrap_err();
    assert!(err.is_unreachable(), "expected Unreachable, got: {err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_generic_request_returns_null_for_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path(format!("/network/{NWID}")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let value = client
        .request(reqwest::Method::DELETE, &format!("/network/{NWID}"), None)
        .await
        .unwrap();
    assert!(value.is_null());
}

#[test]
fn test_token_with_newline_is_rejected() {
    let token: SecretString = "bad\ntoken".to_string().into();
    // Surrounding whitespace is trimmed; an embedded newline is not a valid header.
    let result = DaemonClient::new("http://127.0.0.1:9993", &token, &TransportConfig::default());
    assert!(matches!(result, Err(Error::InvalidToken(_))));
}
