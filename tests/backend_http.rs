use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use copilot_core::{
    ActorRole, BackendClient, CallContext, CallError, Config, StreamEnd, StreamError, StreamHub,
    TaskStatus, TaskStreamClient,
};

/// Serves canned HTTP/1.1 responses keyed by request path and reports each request head.
async fn serve(routes: Vec<(&'static str, String)>) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                return;
            };
            let routes = routes.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match sock.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&head).to_string();
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let _ = tx.send(head);

                let reply = routes
                    .iter()
                    .find(|(p, _)| *p == path)
                    .map(|(_, r)| r.clone())
                    .unwrap_or_else(|| {
                        "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".into()
                    });
                let _ = sock.write_all(reply.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });

    (format!("http://{addr}"), rx)
}

/// Accepts connections and never answers them.
async fn serve_silent() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((sock, _)) = listener.accept().await {
            held.push(sock);
        }
    });
    format!("http://{addr}")
}

fn json_reply(body: Value) -> String {
    let body = body.to_string();
    format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn sse_reply(frames: &[&str]) -> String {
    format!(
        "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n{}",
        frames.concat()
    )
}

fn ctx(preview: bool) -> CallContext {
    CallContext::new("acme", ActorRole::Manager, preview).unwrap()
}

#[tokio::test]
async fn json_calls_carry_context_headers() {
    let (base, mut heads) = serve(vec![
        ("/deals", json_reply(json!([{ "id": 1 }]))),
        ("/tasks/t1/audit", json_reply(json!({ "id": "t1", "steps": 3 }))),
    ])
    .await;
    let client = BackendClient::new(&base, ctx(true), &Config::default()).unwrap();

    let deals: Vec<Value> = client.get_json("deals").await.unwrap();
    assert_eq!(deals.len(), 1);

    let head = heads.recv().await.unwrap().to_ascii_lowercase();
    assert!(head.contains("x-tenant-id: acme"));
    assert!(head.contains("x-actor-role: manager"));
    assert!(head.contains("x-preview: true"));

    let audit = client.task_audit("t1").await.unwrap();
    assert_eq!(audit["steps"], 3);
}

#[tokio::test]
async fn bad_status_and_bad_body_map_to_call_errors() {
    let (base, _heads) = serve(vec![(
        "/broken",
        "HTTP/1.1 200 OK\r\ncontent-length: 9\r\nconnection: close\r\n\r\n<html/>\r\n".to_string(),
    )])
    .await;
    let client = BackendClient::new(&base, ctx(false), &Config::default()).unwrap();

    let missing = client.get_json::<Value>("nope").await.unwrap_err();
    assert!(matches!(missing, CallError::Transport { .. }));

    let broken = client.get_json::<Value>("broken").await.unwrap_err();
    assert!(matches!(broken, CallError::Decode { .. }));
}

#[tokio::test]
async fn stream_feeds_registry_until_backend_closes() {
    let (base, mut heads) = serve(vec![(
        "/tasks/stream",
        sse_reply(&[
            "event: status\ndata: {\"id\":\"t1\",\"status\":\"queued\",\"tenant\":\"acme\"}\n\n",
            "event: heartbeat\ndata: {}\n\n",
            "event: status\ndata: {\"id\":\"t1\",\"status\":\"done\",\"result\":{\"ok\":true},\"tenant\":\"acme\"}\n\n",
        ]),
    )])
    .await;
    let backend = BackendClient::new(&base, ctx(false), &Config::default()).unwrap();
    let hub = StreamHub::default();

    let session = hub.open(&backend).await.unwrap();
    let waiter = {
        let session = session.clone();
        tokio::spawn(async move { session.wait().await })
    };
    let again = hub.open(&backend).await.unwrap();
    assert!(Arc::ptr_eq(&session, &again) || session.is_finished());

    let end = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(end, StreamEnd::Closed);
    assert_eq!(session.wait().await, StreamEnd::Closed);

    let rec = session.registry().get("t1").await.unwrap();
    assert_eq!(rec.status, TaskStatus::Done);
    assert_eq!(rec.result, Some(json!({ "ok": true })));

    let head = heads.recv().await.unwrap().to_ascii_lowercase();
    assert!(head.starts_with("get /tasks/stream"));
    assert!(head.contains("accept: text/event-stream"));
}

#[tokio::test]
async fn rejected_stream_is_the_surfaced_error() {
    let (base, _heads) = serve(vec![]).await;
    let backend = BackendClient::new(&base, ctx(false), &Config::default()).unwrap();

    let err = TaskStreamClient::new(backend).connect().await.unwrap_err();
    assert!(matches!(err, StreamError::Status { status: 404 }));
}

#[tokio::test]
async fn silent_backend_times_out_instead_of_hanging() {
    let base = serve_silent().await;
    let cfg = Config {
        connect_timeout: Duration::from_millis(200),
        ..Config::default()
    };
    let backend = BackendClient::new(&base, ctx(false), &cfg).unwrap();
    let hub = StreamHub::new(cfg);

    let err = tokio::time::timeout(Duration::from_secs(5), hub.open(&backend))
        .await
        .expect("open must give up on its own")
        .unwrap_err();
    assert!(matches!(err, StreamError::Timeout { .. }));
    assert_eq!(hub.live_sessions(), 0);
}

#[tokio::test]
async fn hung_open_does_not_block_other_tenants() {
    let silent = serve_silent().await;
    let (live, _heads) = serve(vec![(
        "/tasks/stream",
        sse_reply(&["event: status\ndata: {\"id\":\"t1\",\"status\":\"queued\"}\n\n"]),
    )])
    .await;
    let cfg = Config {
        connect_timeout: Duration::from_secs(3),
        ..Config::default()
    };
    let hub = Arc::new(StreamHub::new(cfg.clone()));

    let stuck = {
        let hub = hub.clone();
        let backend = BackendClient::new(&silent, ctx(false), &cfg).unwrap();
        tokio::spawn(async move { hub.open(&backend).await.map(|_| ()) })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let other = CallContext::new("globex", ActorRole::Viewer, false).unwrap();
    let backend = BackendClient::new(&live, other, &cfg).unwrap();
    let started = Instant::now();
    let session = tokio::time::timeout(Duration::from_secs(1), hub.open(&backend))
        .await
        .expect("unrelated key waited on a hung open")
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(session.tenant(), "globex");
    assert!(!stuck.is_finished());

    let err = stuck.await.unwrap().unwrap_err();
    assert!(matches!(err, StreamError::Timeout { .. }));
}
