// End-to-end tests against a loopback panel: a real tokio-tungstenite
// server accepts the instance's connection and scripts the panel side of
// the protocol.

use link_core::config::{HandshakeMode, LinkConfig, ReconnectConfig, WebsocketConfig};
use link_core::host::{Motd, ServerHost};
use link_core::identity::InstanceId;
use link_core::link;
use link_core::protocol::HostMetadata;

use common::RedactedSecret;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct RecordingHost {
    commands: Mutex<Vec<String>>,
}

impl ServerHost for RecordingHost {
    fn start_server(&self) {}

    fn stop_server(&self) {}

    fn kill_server(&self) {}

    fn send_command(&self, line: &str) {
        self.commands.lock().expect("not poisoned").push(line.to_string());
    }

    fn server_status(&self) -> bool {
        false
    }

    fn server_file(&self) -> Option<String> {
        None
    }

    fn server_uptime(&self) -> Option<String> {
        None
    }

    fn server_cpu_usage(&self) -> Option<f64> {
        None
    }

    fn server_motd(&self) -> Option<Motd> {
        None
    }
}

fn test_config(addr: &str, handshake: HandshakeMode) -> Arc<LinkConfig> {
    Arc::new(LinkConfig {
        custom_name: Some("it-server".to_string()),
        websocket: WebsocketConfig {
            addr: addr.to_string(),
            password: RedactedSecret::new("secret"),
        },
        reconnect: ReconnectConfig {
            enable: false,
            interval: 1000.0,
            max_times: 0,
        },
        handshake,
    })
}

async fn accept_client(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _addr) = timeout(FRAME_TIMEOUT, listener.accept())
        .await
        .expect("timed out waiting for the instance to connect")
        .expect("accept failed");

    accept_async(stream)
        .await
        .expect("websocket handshake failed")
}

async fn next_json(panel: &mut WebSocketStream<TcpStream>) -> Value {
    loop {
        let frame = timeout(FRAME_TIMEOUT, panel.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .expect("read failed");

        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("frame is not JSON");
        }
    }
}

async fn send_json(panel: &mut WebSocketStream<TcpStream>, value: Value) {
    panel
        .send(Message::text(value.to_string()))
        .await
        .expect("send failed");
}

#[tokio::test]
async fn instance_verifies_then_serves_panel_requests() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = format!("ws://{}", listener.local_addr().expect("local addr"));

    let data_dir = tempfile::tempdir().expect("tempdir");
    let sandbox = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(sandbox.path().join("world")).expect("mkdir");
    std::fs::write(sandbox.path().join("server.jar"), b"12345").expect("write");

    let identity = InstanceId::load(data_dir.path()).expect("identity");
    let token = identity.token();
    let host = Arc::new(RecordingHost::default());

    let handle = link::start(
        test_config(&addr, HandshakeMode::Timestamp),
        identity,
        Arc::clone(&host) as Arc<dyn ServerHost>,
        HostMetadata::new("it-host", "1.0.0"),
        sandbox.path().to_path_buf(),
    );

    handle.connect();
    let mut panel = accept_client(&listener).await;

    // The instance speaks first: a verify request whose digest is keyed on
    // the timestamp it includes.
    let verify = next_json(&mut panel).await;
    assert_eq!(verify["type"], "request");
    assert_eq!(verify["subType"], "verify");
    assert_eq!(verify["data"]["instanceId"], token.as_str());
    assert_eq!(verify["data"]["customName"], "it-server");
    assert_eq!(verify["data"]["metadata"]["name"], "it-host");

    let time = verify["data"]["time"].as_str().expect("time");
    let expected = format!("{:x}", md5::compute(format!("{time}.secret")));
    assert_eq!(verify["data"]["md5"], expected.as_str());

    send_json(
        &mut panel,
        json!({ "type": "event", "subType": "verify_result", "data": { "success": true } }),
    )
    .await;

    // Heartbeat: a real sysinfo snapshot plus a stopped server.
    send_json(
        &mut panel,
        json!({ "type": "request", "subType": "heartbeat", "requestId": "hb-1" }),
    )
    .await;
    let heartbeat = next_json(&mut panel).await;
    assert_eq!(heartbeat["type"], "return");
    assert_eq!(heartbeat["subType"], "heartbeat");
    assert_eq!(heartbeat["requestId"], "hb-1");
    assert!(heartbeat["data"]["system"].is_object());
    assert_eq!(heartbeat["data"]["server"]["status"], false);
    assert_eq!(heartbeat["data"]["server"]["filename"], Value::Null);

    // Directory listing inside the sandbox.
    send_json(
        &mut panel,
        json!({ "type": "request", "subType": "get_dir_info", "data": "", "requestId": "d1" }),
    )
    .await;
    let listing = next_json(&mut panel).await;
    assert_eq!(listing["subType"], "dir_info");
    assert_eq!(listing["requestId"], "d1");
    assert_eq!(
        listing["data"]["items"],
        json!([
            { "kind": "dir", "name": "world", "relativePath": "world" },
            { "kind": "file", "name": "server.jar", "relativePath": "server.jar", "size": 5 }
        ])
    );

    // Escape attempt: indistinguishable from a missing directory.
    send_json(
        &mut panel,
        json!({ "type": "request", "subType": "get_dir_info", "data": "../../etc", "requestId": "r1" }),
    )
    .await;
    let escape = next_json(&mut panel).await;
    assert_eq!(escape["data"], json!({ "exists": false, "dir": "../../etc" }));
    assert_eq!(escape["requestId"], "r1");

    // Console input: forwarded to the host in order, no reply packet.
    send_json(
        &mut panel,
        json!({ "type": "request", "subType": "server_input", "data": ["say hello", "save-all"] }),
    )
    .await;
    let deadline = Instant::now() + FRAME_TIMEOUT;
    loop {
        if host.commands.lock().expect("not poisoned").len() == 2 {
            break;
        }
        assert!(Instant::now() < deadline, "commands never reached the host");
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        *host.commands.lock().expect("not poisoned"),
        vec!["say hello", "save-all"]
    );

    // Lifecycle broadcasts go out immediately...
    handle.on_server_started();
    let started = next_json(&mut panel).await;
    assert_eq!(started, json!({ "type": "event", "subType": "server_start" }));

    // ...while console lines are batched into one flush.
    handle.on_output_line("line one");
    handle.on_output_line("line two");
    let output = next_json(&mut panel).await;
    assert_eq!(output["type"], "event");
    assert_eq!(output["subType"], "server_output");
    assert_eq!(output["data"], json!(["line one", "line two"]));
}

#[tokio::test]
async fn challenge_handshake_answers_the_panel_nonce() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = format!("ws://{}", listener.local_addr().expect("local addr"));

    let data_dir = tempfile::tempdir().expect("tempdir");
    let sandbox = tempfile::tempdir().expect("tempdir");
    let identity = InstanceId::load(data_dir.path()).expect("identity");
    let host = Arc::new(RecordingHost::default());

    let handle = link::start(
        test_config(&addr, HandshakeMode::Challenge),
        identity,
        host as Arc<dyn ServerHost>,
        HostMetadata::new("it-host", "1.0.0"),
        sandbox.path().to_path_buf(),
    );

    handle.connect();
    let mut panel = accept_client(&listener).await;

    // In challenge mode the panel speaks first; the client stays quiet.
    let quiet = timeout(Duration::from_millis(300), panel.next()).await;
    assert!(quiet.is_err(), "client sent a frame before being challenged");

    send_json(
        &mut panel,
        json!({ "type": "request", "subType": "verify_request", "data": "n-42", "requestId": "v1" }),
    )
    .await;

    let reply = next_json(&mut panel).await;
    assert_eq!(reply["type"], "return");
    assert_eq!(reply["subType"], "verify");
    assert_eq!(reply["requestId"], "v1");

    let expected = format!("{:x}", md5::compute("n-42secret"));
    assert_eq!(reply["data"]["md5"], expected.as_str());
    assert_eq!(reply["data"].get("time"), None);
}
