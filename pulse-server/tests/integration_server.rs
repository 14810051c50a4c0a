//! End-to-end tests: real listener, real websocket client.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use pulse::MonitorConfig;
use pulse::wire::decode_snapshot;
use pulse_server::{ServerConfig, ServerError, bind, serve};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const CAPACITY: usize = 32;

struct TestServer {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<(), ServerError>>,
    _ui: tempfile::TempDir,
}

async fn start_server() -> TestServer {
    let ui = tempfile::tempdir().unwrap();
    std::fs::write(
        ui.path().join("index.html"),
        "<html><body>pulse test page</body></html>",
    )
    .unwrap();

    let listener = bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig {
        ui_dir: ui.path().to_path_buf(),
        monitor: MonitorConfig::new(
            CAPACITY,
            Duration::from_millis(5),
            Duration::from_millis(50),
        )
        .unwrap(),
    };

    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(serve(listener, config, async move {
        let _ = stopped.await;
    }));

    TestServer {
        addr,
        stop,
        task,
        _ui: ui,
    }
}

/// Minimal HTTP/1.1 GET returning the raw response.
async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

async fn next_frame<S>(ws: &mut S) -> String
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("no frame within 5s")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return text;
        }
    }
}

#[tokio::test]
async fn test_websocket_receives_full_snapshots() {
    let server = start_server().await;

    let (mut ws, _) = connect_async(format!("ws://{}/ws", server.addr))
        .await
        .unwrap();

    let first = decode_snapshot(&next_frame(&mut ws).await).unwrap();
    let second = decode_snapshot(&next_frame(&mut ws).await).unwrap();

    assert_eq!(first.len(), CAPACITY);
    assert_eq!(second.len(), CAPACITY);
    assert!(first.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(second.last().unwrap().timestamp > first.last().unwrap().timestamp);
    assert!(second.iter().all(|s| (0.0..1.0).contains(&s.value)));

    server.stop.send(()).unwrap();
    timeout(Duration::from_secs(5), server.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_disconnecting_client_does_not_stop_others() {
    let server = start_server().await;
    let url = format!("ws://{}/ws", server.addr);

    let (mut kept, _) = connect_async(url.as_str()).await.unwrap();
    let (mut dropped, _) = connect_async(url.as_str()).await.unwrap();

    next_frame(&mut kept).await;
    next_frame(&mut dropped).await;
    drop(dropped);

    for _ in 0..5 {
        let frame = decode_snapshot(&next_frame(&mut kept).await).unwrap();
        assert_eq!(frame.len(), CAPACITY);
    }

    server.stop.send(()).unwrap();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_health_reports_sessions() {
    let server = start_server().await;

    let (mut ws, _) = connect_async(format!("ws://{}/ws", server.addr))
        .await
        .unwrap();
    next_frame(&mut ws).await;

    let response = http_get(server.addr, "/health").await;
    assert!(response.starts_with("HTTP/1.1 200"));

    let body = response.split("\r\n\r\n").nth(1).unwrap();
    let health: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["sessions"], 1);
    assert_eq!(health["capacity"], CAPACITY);
    // At least one broadcast period of 5 ms samples has elapsed.
    assert!(health["pushes"].as_u64().unwrap() > 0);

    server.stop.send(()).unwrap();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_static_ui_served_at_root() {
    let server = start_server().await;

    let index = http_get(server.addr, "/").await;
    assert!(index.starts_with("HTTP/1.1 200"));
    assert!(index.contains("pulse test page"));

    let missing = http_get(server.addr, "/nope.js").await;
    assert!(missing.starts_with("HTTP/1.1 404"));

    server.stop.send(()).unwrap();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_bind_conflict_is_an_error() {
    let taken = bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap().to_string();

    let err = bind(&addr).await.unwrap_err();
    assert!(matches!(err, ServerError::Bind { .. }));
    assert!(err.to_string().contains(&addr));
}
