//! Proxy tests over real sockets: client → masking proxy → mock upstream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use masking_proxy::config::ProxyConfig;
use masking_proxy::http::HttpServer;
use masking_proxy::lifecycle::Shutdown;
use masking_proxy::SENTINEL;

mod common;
use common::{MemorySink, Reply};

const LOGIN: &str = r#"{"user":"a","password":"p"}"#;
const TOKEN: &str = r#"{"token":{"value":"abc","ttl":60}}"#;

async fn start_proxy(
    proxy_addr: SocketAddr,
    config: ProxyConfig,
) -> (Arc<MemorySink>, Shutdown, tokio::task::JoinHandle<()>) {
    let sink = Arc::new(MemorySink::default());
    let server = HttpServer::with_sink(config, sink.clone()).unwrap();
    let listener = tokio::net::TcpListener::bind(proxy_addr).await.unwrap();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    (sink, shutdown, handle)
}

fn config(proxy_addr: SocketAddr, backend_addr: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.upstream.address = backend_addr.to_string();
    config
}

#[tokio::test]
async fn test_exchange_is_forwarded_verbatim_and_logged_masked() {
    // unique ports per test
    let backend_addr: SocketAddr = "127.0.0.1:28281".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28282".parse().unwrap();

    let received =
        common::start_programmable_backend(backend_addr, || async { Reply::json(TOKEN) }).await;

    let mut config = config(proxy_addr, backend_addr);
    config.masking.request.headers = vec!["Authorization".into()];
    config.masking.request.fields = vec!["password".into()];
    config.masking.response.json_paths = vec!["$.token.value".into()];
    let (sink, shutdown, handle) = start_proxy(proxy_addr, config).await;

    let res = common::client()
        .post(format!("http://{}/login?next=home", proxy_addr))
        .header("authorization", "Bearer xyz")
        .header("content-type", "application/json")
        .body(LOGIN)
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), TOKEN);

    // upstream got the unmasked request
    assert_eq!(received.body(0), LOGIN.as_bytes());
    let head = String::from_utf8_lossy(&received.all()[0]).to_ascii_lowercase();
    assert!(head.starts_with("post /login?next=home http/1.1"), "{head}");
    assert!(head.contains("authorization: bearer xyz"));

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].line.to_string(),
        format!("POST http://{}/login", proxy_addr)
    );
    assert_eq!(records[0].headers.get("authorization"), Some(SENTINEL));
    assert_eq!(records[0].body, r#"{"user":"a","password":"***masked***"}"#);
    assert_eq!(records[1].line.to_string(), "200");
    assert_eq!(records[1].body, r#"{"token":{"value":"***masked***","ttl":60}}"#);

    shutdown.trigger();
    let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
}

#[tokio::test]
async fn test_upstream_status_passes_through() {
    let backend_addr: SocketAddr = "127.0.0.1:28283".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28284".parse().unwrap();

    common::start_programmable_backend(backend_addr, || async {
        Reply {
            status: 503,
            content_type: "text/plain",
            body: "Service Unavailable".into(),
        }
    })
    .await;

    let (sink, shutdown, handle) = start_proxy(proxy_addr, config(proxy_addr, backend_addr)).await;

    let res = common::client()
        .get(format!("http://{}/status", proxy_addr))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "Service Unavailable");
    assert_eq!(sink.records()[1].line.to_string(), "503");

    shutdown.trigger();
    let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
}

#[tokio::test]
async fn test_unreachable_upstream_is_502() {
    // nothing listens on the backend port
    let backend_addr: SocketAddr = "127.0.0.1:28285".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28286".parse().unwrap();

    let (sink, shutdown, handle) = start_proxy(proxy_addr, config(proxy_addr, backend_addr)).await;

    let res = common::client()
        .get(format!("http://{}/", proxy_addr))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 502);
    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].line.to_string(), "502");

    shutdown.trigger();
    let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
}

#[tokio::test]
async fn test_timed_out_exchange_is_logged_as_408() {
    let backend_addr: SocketAddr = "127.0.0.1:28289".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28290".parse().unwrap();

    common::start_programmable_backend(backend_addr, || async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        Reply::json("{}")
    })
    .await;

    let mut config = config(proxy_addr, backend_addr);
    config.timeouts.request_secs = 1;
    let (sink, shutdown, handle) = start_proxy(proxy_addr, config).await;

    let res = common::client()
        .get(format!("http://{}/slow", proxy_addr))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 408);
    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].line.to_string(), "408");

    shutdown.trigger();
    let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
}

#[tokio::test]
async fn test_shutdown_stops_server() {
    let backend_addr: SocketAddr = "127.0.0.1:28287".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28288".parse().unwrap();

    let (_, shutdown, handle) = start_proxy(proxy_addr, config(proxy_addr, backend_addr)).await;
    shutdown.trigger();

    let joined = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(joined.is_ok(), "server did not stop after shutdown");
}
