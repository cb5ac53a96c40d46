//! End-to-end TCP integration tests.
//!
//! Each test boots a real server on an ephemeral port, drives it with raw
//! `TcpStream` clients and asserts on the wire-level responses and the
//! lifecycle events observed along the way.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use remotectl::config::ServerConfig;
use remotectl::events::{ServerObserver, SharedObserver};
use remotectl::host::HeadlessHost;
use remotectl::rpc::{ControlServer, ShutdownHandle};

/// Records every lifecycle event as a flat string for easy assertions.
#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn snapshot(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn count_of(&self, prefix: &str) -> usize {
        self.snapshot()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

impl ServerObserver for RecordingObserver {
    fn server_started(&self, port: u16) {
        self.push(format!("started:{port}"));
    }

    fn server_stopped(&self) {
        self.push("stopped".to_string());
    }

    fn client_connected(&self, address: &str) {
        self.push(format!("connected:{address}"));
    }

    fn client_disconnected(&self, address: &str) {
        self.push(format!("disconnected:{address}"));
    }

    fn command_executed(&self, command: &str, success: bool) {
        self.push(format!("executed:{command}:{success}"));
    }
}

struct TestServer {
    port: u16,
    shutdown: ShutdownHandle,
    observer: Arc<RecordingObserver>,
    task: JoinHandle<ControlServer<HeadlessHost>>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with_config(ServerConfig::default()).await
    }

    async fn start_with_config(config: ServerConfig) -> Self {
        let observer = Arc::new(RecordingObserver::default());
        let shared: SharedObserver = observer.clone();
        let mut server = ControlServer::new(HeadlessHost::new(), shared, &config);

        let port = server.start(0).await.expect("bind ephemeral port");
        let shutdown = server.shutdown_handle();
        let task = tokio::spawn(async move {
            server.run().await.expect("server run");
            server
        });

        Self {
            port,
            shutdown,
            observer,
            task,
        }
    }

    async fn connect(&self) -> (BufReader<OwnedReadHalf>, tokio::net::tcp::OwnedWriteHalf) {
        let stream = TcpStream::connect(("127.0.0.1", self.port))
            .await
            .expect("connect");
        let (read, write) = stream.into_split();
        (BufReader::new(read), write)
    }

    async fn stop(self) -> (ControlServer<HeadlessHost>, Arc<RecordingObserver>) {
        self.shutdown.signal();
        let server = self.task.await.expect("join server task");
        (server, self.observer)
    }
}

async fn read_json_line(reader: &mut BufReader<OwnedReadHalf>) -> Value {
    let mut line = String::new();
    let read = tokio::time::timeout(Duration::from_secs(5), reader.read_line(&mut line))
        .await
        .expect("response within timeout")
        .expect("read response line");
    assert!(read > 0, "connection closed before a response arrived");
    serde_json::from_str(line.trim()).expect("response is valid JSON")
}

/// Polls until the observer has recorded `count` events with the prefix.
async fn wait_for_event(observer: &RecordingObserver, prefix: &str, count: usize) {
    for _ in 0..100 {
        if observer.count_of(prefix) >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {count} '{prefix}' events, saw {:?}",
        observer.snapshot()
    );
}

#[tokio::test]
async fn login_round_trip() {
    let server = TestServer::start().await;
    let (mut reader, mut writer) = server.connect().await;

    writer.write_all(b"login:bob:pw123\n").await.unwrap();
    let response = read_json_line(&mut reader).await;

    assert!(response["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(response["result"]["success"], Value::Bool(true));
    assert_eq!(response["result"]["message"], "登录成功");
    assert_eq!(response["result"]["data"]["account"], "bob");
    assert!(response["result"]["data"]["loginTime"].is_string());

    server.stop().await;
}

#[tokio::test]
async fn json_request_echoes_id() {
    let server = TestServer::start().await;
    let (mut reader, mut writer) = server.connect().await;

    writer
        .write_all(
            b"{\"id\":\"42\",\"method\":\"execute\",\"params\":{\"command\":\"testbutton\"}}\n",
        )
        .await
        .unwrap();
    let response = read_json_line(&mut reader).await;

    assert_eq!(response["id"], "42");
    assert_eq!(response["result"]["success"], Value::Bool(true));
    assert_eq!(response["result"]["message"], "测试按钮执行成功");
    assert_eq!(response["result"]["data"]["buttonClicked"], Value::Bool(true));
    assert!(response["result"]["data"]["clickTime"].is_string());

    server.stop().await;
}

#[tokio::test]
async fn unknown_command_gets_error_envelope() {
    let server = TestServer::start().await;
    let (mut reader, mut writer) = server.connect().await;

    writer.write_all(b"foobar\n").await.unwrap();
    let response = read_json_line(&mut reader).await;

    assert!(response["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(response["error"]["code"], Value::from(-1));
    assert_eq!(response["error"]["message"], "unknown command: foobar");
    assert_eq!(response["error"]["data"], serde_json::json!({}));
    assert!(response.get("result").is_none());

    server.stop().await;
}

#[tokio::test]
async fn malformed_json_gets_error_response_not_disconnect() {
    let server = TestServer::start().await;
    let (mut reader, mut writer) = server.connect().await;

    writer.write_all(b"{not json\n").await.unwrap();
    let response = read_json_line(&mut reader).await;
    assert_eq!(response["error"]["message"], "unknown command: {not json");

    // The connection survives and keeps serving.
    writer.write_all(b"getstate\n").await.unwrap();
    let response = read_json_line(&mut reader).await;
    assert_eq!(response["result"]["success"], Value::Bool(true));

    server.stop().await;
}

#[tokio::test]
async fn line_split_across_reads_dispatches_once() {
    let server = TestServer::start().await;
    let (mut reader, mut writer) = server.connect().await;

    writer.write_all(b"getsta").await.unwrap();
    writer.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    writer.write_all(b"te\n").await.unwrap();

    let response = read_json_line(&mut reader).await;
    assert_eq!(response["result"]["success"], Value::Bool(true));
    assert_eq!(response["result"]["message"], "状态获取成功");

    let (_, observer) = server.stop().await;
    assert_eq!(observer.count_of("executed:"), 1);
}

#[tokio::test]
async fn batched_lines_yield_ordered_responses_with_distinct_ids() {
    let server = TestServer::start().await;
    let (mut reader, mut writer) = server.connect().await;

    writer.write_all(b"testbutton\ngetstate\n").await.unwrap();

    let first = read_json_line(&mut reader).await;
    let second = read_json_line(&mut reader).await;

    assert_eq!(first["result"]["message"], "测试按钮执行成功");
    assert_eq!(second["result"]["message"], "状态获取成功");

    let first_id = first["id"].as_str().unwrap();
    let second_id = second["id"].as_str().unwrap();
    assert!(!first_id.is_empty());
    assert_ne!(first_id, second_id);

    server.stop().await;
}

#[tokio::test]
async fn state_reflects_prior_commands() {
    let server = TestServer::start().await;
    let (mut reader, mut writer) = server.connect().await;

    writer.write_all(b"login:alice:secret123\n").await.unwrap();
    read_json_line(&mut reader).await;
    writer.write_all(b"testbutton\n").await.unwrap();
    read_json_line(&mut reader).await;

    writer.write_all(b"getstate\n").await.unwrap();
    let response = read_json_line(&mut reader).await;

    let data = &response["result"]["data"];
    assert_eq!(data["windowTitle"], "remotectl");
    assert_eq!(data["isVisible"], Value::Bool(true));
    assert_eq!(data["isEnabled"], Value::Bool(true));
    assert!(data["currentTime"].is_string());
    assert!(data["applicationVersion"].is_string());
    assert_eq!(data["isLoggedIn"], Value::Bool(true));
    assert_eq!(data["clickCount"], Value::from(1));

    server.stop().await;
}

#[tokio::test]
async fn lifecycle_events_are_observed() {
    let server = TestServer::start().await;
    assert_eq!(server.observer.count_of("started:"), 1);

    let (mut reader, mut writer) = server.connect().await;
    wait_for_event(&server.observer, "connected:", 1).await;

    writer.write_all(b"testbutton\n").await.unwrap();
    read_json_line(&mut reader).await;
    wait_for_event(&server.observer, "executed:testbutton:true", 1).await;

    drop(reader);
    drop(writer);
    wait_for_event(&server.observer, "disconnected:", 1).await;

    let (_, observer) = server.stop().await;
    assert_eq!(observer.count_of("stopped"), 1);
}

#[tokio::test]
async fn stopping_twice_emits_one_stopped_event() {
    let server = TestServer::start().await;
    let (mut server, observer) = server.stop().await;

    // The run loop already performed the stop; further calls are no-ops.
    server.stop().await;
    server.stop().await;

    assert_eq!(observer.count_of("stopped"), 1);
    assert!(!server.is_running());
}

#[tokio::test]
async fn oversized_line_drops_the_client() {
    let config = ServerConfig {
        max_line_bytes: 128,
        ..ServerConfig::default()
    };
    let server = TestServer::start_with_config(config).await;
    let (_reader, mut writer) = server.connect().await;

    // No newline: the buffer can only grow past the limit.
    writer.write_all(&[b'x'; 256]).await.unwrap();
    writer.flush().await.unwrap();

    wait_for_event(&server.observer, "disconnected:", 1).await;

    server.stop().await;
}

#[tokio::test]
async fn non_reading_client_does_not_stall_others() {
    let server = TestServer::start().await;

    // Flood large lines without ever reading the responses, so the kernel
    // buffers towards this client fill up and its outbound queue overflows.
    let (_flood_reader, mut flood_writer) = server.connect().await;
    let line = format!("{}\n", "x".repeat(50 * 1024));
    for _ in 0..600 {
        // Once the server drops the flooder, further writes fail; done.
        if flood_writer.write_all(line.as_bytes()).await.is_err() {
            break;
        }
    }

    // A well-behaved client must still get served promptly.
    let (mut reader, mut writer) = server.connect().await;
    writer.write_all(b"getstate\n").await.unwrap();
    let response = read_json_line(&mut reader).await;
    assert_eq!(response["result"]["success"], Value::Bool(true));

    // The flooder is dropped under the overflow policy.
    wait_for_event(&server.observer, "disconnected:", 1).await;

    // And shutdown still completes.
    tokio::time::timeout(Duration::from_secs(5), server.stop())
        .await
        .expect("shutdown within timeout");
}

#[tokio::test]
async fn multiple_clients_are_isolated() {
    let server = TestServer::start().await;
    let (mut reader_a, mut writer_a) = server.connect().await;
    let (mut reader_b, mut writer_b) = server.connect().await;

    // A partial line from one client must not leak into the other's stream.
    writer_a.write_all(b"getsta").await.unwrap();
    writer_b.write_all(b"testbutton\n").await.unwrap();

    let response_b = read_json_line(&mut reader_b).await;
    assert_eq!(response_b["result"]["message"], "测试按钮执行成功");

    writer_a.write_all(b"te\n").await.unwrap();
    let response_a = read_json_line(&mut reader_a).await;
    assert_eq!(response_a["result"]["message"], "状态获取成功");

    server.stop().await;
}
