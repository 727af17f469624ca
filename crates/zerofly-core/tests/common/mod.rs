#![allow(clippy::unwrap_used, dead_code)]
// Shared fixtures: a scripted host (systemd + iproute2) and a wiremock daemon.

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zerofly_core::{Controller, DaemonConfig, HostCommand, HostExecutor, HostOutput, SyncConfig};

pub const NWID: &str = "abcdef0123456789";
pub const IFNAME: &str = "ztabcdef01";
pub const NODE: &str = "89e92ceee5";

// ── Fake host ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct HostState {
    running: bool,
    boot_enabled: bool,
    /// ifname -> admin up
    interfaces: BTreeMap<String, bool>,
    deny_elevation: bool,
    calls: Vec<String>,
}

/// In-memory systemd unit and interface table that answers the exact
/// command lines the service controller issues.
#[derive(Debug, Default, Clone)]
pub struct FakeHost {
    state: Arc<Mutex<HostState>>,
}

impl FakeHost {
    pub fn running() -> Self {
        let host = Self::default();
        host.state.lock().unwrap().running = true;
        host
    }

    pub fn with_interface(self, name: &str, up: bool) -> Self {
        self.state
            .lock()
            .unwrap()
            .interfaces
            .insert(name.to_owned(), up);
        self
    }

    /// Flip an interface behind the controller's back.
    pub fn set_interface(&self, name: &str, up: bool) {
        self.state
            .lock()
            .unwrap()
            .interfaces
            .insert(name.to_owned(), up);
    }

    pub fn deny_elevation(self) -> Self {
        self.state.lock().unwrap().deny_elevation = true;
        self
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    pub fn interface_up(&self, name: &str) -> Option<bool> {
        self.state.lock().unwrap().interfaces.get(name).copied()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, line: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == line).count()
    }

    fn answer(&self, command: &HostCommand) -> HostOutput {
        let mut state = self.state.lock().unwrap();
        state.calls.push(command.to_string());

        let args: Vec<&str> = command.args.iter().map(String::as_str).collect();
        match (command.program.as_str(), args.as_slice()) {
            ("systemctl", ["show", _, _]) => ok(format!(
                "ActiveState={}\nUnitFileState={}\n",
                if state.running { "active" } else { "inactive" },
                if state.boot_enabled { "enabled" } else { "disabled" },
            )),
            ("systemctl", [action, _]) => {
                match *action {
                    "start" => state.running = true,
                    "stop" => state.running = false,
                    "enable" => state.boot_enabled = true,
                    "disable" => state.boot_enabled = false,
                    _ => return failed(1, "Unknown command verb"),
                }
                ok(String::new())
            }
            ("ip", ["--json", "address"]) => ok(links_json(state.interfaces.iter())),
            ("ip", ["--json", "link", "show", "dev", name]) => {
                match state.interfaces.get_key_value(*name) {
                    Some(entry) => ok(links_json(std::iter::once(entry))),
                    None => failed(1, &format!("Device \"{name}\" does not exist.")),
                }
            }
            ("pkexec", ["ip", "link", "set", name, direction]) => {
                if state.deny_elevation {
                    return failed(126, "");
                }
                let up = *direction == "up";
                match state.interfaces.get_mut(*name) {
                    Some(current) => {
                        *current = up;
                        ok(String::new())
                    }
                    None => failed(1, "Cannot find device"),
                }
            }
            _ => failed(127, "command not found"),
        }
    }
}

impl HostExecutor for FakeHost {
    fn run<'a>(&'a self, command: &'a HostCommand) -> BoxFuture<'a, io::Result<HostOutput>> {
        let output = self.answer(command);
        Box::pin(async move { Ok(output) })
    }
}

fn ok(stdout: String) -> HostOutput {
    HostOutput {
        code: Some(0),
        stdout,
        stderr: String::new(),
    }
}

fn failed(code: i32, stderr: &str) -> HostOutput {
    HostOutput {
        code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_owned(),
    }
}

fn links_json<'a>(links: impl Iterator<Item = (&'a String, &'a bool)>) -> String {
    let entries: Vec<_> = links
        .map(|(name, up)| {
            let mut flags = vec!["BROADCAST", "MULTICAST"];
            if *up {
                flags.push("UP");
            }
            json!({ "ifname": name, "flags": flags, "operstate": "UNKNOWN" })
        })
        .collect();
    serde_json::Value::Array(entries).to_string()
}

// ── Fake daemon ─────────────────────────────────────────────────────

pub fn status_json() -> serde_json::Value {
    json!({
        "address": NODE,
        "publicIdentity": format!("{NODE}:0:9e4b3a1f0c2d7e88aabbccdd:ffee"),
        "online": true,
        "version": "1.14.2",
        "tcpFallbackActive": false,
        "clock": 1_700_000_000_000_i64,
        "config": { "settings": { "primaryPort": 9993 } }
    })
}

pub fn network_json(id: &str, name: &str, ifname: &str) -> serde_json::Value {
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
        "dhcp": false,
        "bridge": false,
        "broadcastEnabled": true,
        "allowDefault": false,
        "allowGlobal": false,
        "allowManaged": true,
        "allowDNS": false,
        "portDeviceName": ifname,
        "portError": 0
    })
}

pub fn peer_json(address: &str, role: &str) -> serde_json::Value {
    json!({
        "address": address,
        "role": role,
        "latency": 12,
        "version": "1.14.2",
        "paths": [{
            "address": "203.0.113.7/9993",
            "localSocket": 1,
            "active": true,
            "expired": false,
            "preferred": true,
            "lastSend": 1_700_000_000_000_i64,
            "lastReceive": 1_700_000_000_500_i64,
            "trustedPathId": 0
        }]
    })
}

/// Mount `/status`, `/network`, and `/peer` answering with the given lists.
pub async fn mount_daemon(
    server: &MockServer,
    networks: Vec<serde_json::Value>,
    peers: Vec<serde_json::Value>,
) {
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_json()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/network"))
        .respond_with(ResponseTemplate::new(200).set_body_json(networks))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/peer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(peers))
        .mount(server)
        .await;
}

/// How many requests the mock daemon has seen for `verb` on `route`.
pub async fn request_count(server: &MockServer, verb: &str, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == route)
        .count()
}

// ── Hang-up daemon ──────────────────────────────────────────────────

/// A bare HTTP daemon answering `/status`, `/network`, and `/peer` with one
/// network, until [`hang_up`](Self::hang_up) is called. After that it reads
/// each request and closes the socket without replying.
pub struct HangUpDaemon {
    pub url: String,
    answering: Arc<AtomicBool>,
}

impl HangUpDaemon {
    pub async fn start() -> Self {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let answering = Arc::new(AtomicBool::new(true));

        let flag = Arc::clone(&answering);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let flag = Arc::clone(&flag);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let Ok(read) = socket.read(&mut buf).await else {
                        return;
                    };
                    if !flag.load(Ordering::SeqCst) {
                        return;
                    }
                    let request = String::from_utf8_lossy(&buf[..read]);
                    let route = request.split_whitespace().nth(1).unwrap_or("/");
                    let body = match route {
                        "/status" => status_json(),
                        "/network" => json!([network_json(NWID, "office", IFNAME)]),
                        "/peer" => json!([peer_json("1122334455", "PLANET")]),
                        _ => json!({}),
                    }
                    .to_string();
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { url, answering }
    }

    /// From now on, accept connections but never answer them.
    pub fn hang_up(&self) {
        self.answering.store(false, Ordering::SeqCst);
    }
}

// ── Controller ──────────────────────────────────────────────────────

pub fn config(url: &str) -> DaemonConfig {
    DaemonConfig {
        url: url.to_owned(),
        token: SecretString::from("test-token".to_owned()),
        timeout: Duration::from_secs(2),
        host_timeout: Duration::from_secs(5),
        sync: SyncConfig {
            poll_interval: Duration::from_millis(100),
            backoff_base: Duration::from_millis(50),
            backoff_max: Duration::from_millis(200),
            follow_up_refresh: Vec::new(),
        },
        background_sync: false,
        ..DaemonConfig::default()
    }
}

/// A started controller without the background poll loop.
pub async fn controller(url: &str, host: &FakeHost) -> Controller {
    controller_with(config(url), host).await
}

pub async fn controller_with(config: DaemonConfig, host: &FakeHost) -> Controller {
    let controller = Controller::with_executor(config, Arc::new(host.clone())).unwrap();
    controller.start().await.unwrap();
    controller
}

/// An address nothing listens on.
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}
