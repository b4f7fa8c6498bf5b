//! End-to-end tests over a real listener.

mod common;

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use common::{channel_recorder, next_document, start_recording_backend, test_config, unused_addr};
use xray_propagation::config::ServiceConfig;
use xray_propagation::recorder::SegmentDocument;
use xray_propagation::{HttpServer, Shutdown, TraceHeader, X_AMZN_TRACE_ID};

struct Running {
    addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<Result<(), std::io::Error>>,
    documents: tokio::sync::mpsc::UnboundedReceiver<SegmentDocument>,
}

async fn start(config: ServiceConfig) -> Running {
    let (recorder, documents) = channel_recorder();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::with_recorder(config, recorder);
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    Running { addr, shutdown, task, documents }
}

impl Running {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) {
        self.shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), self.task).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
    }
}

#[tokio::test]
async fn test_status_route_over_tcp() {
    let mut server = start(test_config(None)).await;

    let res = reqwest::get(server.url("/status/429")).await.unwrap();
    assert_eq!(res.status().as_u16(), 429);
    let header = res.headers()[X_AMZN_TRACE_ID].to_str().unwrap().to_string();
    assert_eq!(res.text().await.unwrap(), "Too Many Requests");

    let doc = next_document(&mut server.documents).await;
    assert_eq!(header, format!("Root={}", doc.trace_id));
    assert!(doc.error);
    assert!(doc.throttle);
    assert!(!doc.fault);
    assert!(doc.http.request.client_ip.starts_with("127.0.0.1:"));
    assert_eq!(doc.http.response.content_length, "Too Many Requests".len() as u64);

    server.stop().await;
}

#[tokio::test]
async fn test_downstream_call_carries_trace() {
    let (backend, mut captured) = start_recording_backend(200, "backend says hi").await;
    let mut server = start(test_config(Some(backend))).await;

    let res = reqwest::Client::new()
        .get(server.url("/downstream/items"))
        .header(X_AMZN_TRACE_ID, "Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(
        res.headers()[X_AMZN_TRACE_ID],
        "Root=1-5759e988-bd862e3fe1be46a994272793"
    );
    assert_eq!(res.text().await.unwrap(), "backend says hi");

    let request = captured.recv().await.unwrap();
    assert!(request.request_line.starts_with("GET /items"));
    let outbound = TraceHeader::parse(request.header(X_AMZN_TRACE_ID).unwrap());

    let doc = next_document(&mut server.documents).await;
    assert_eq!(doc.trace_id, "1-5759e988-bd862e3fe1be46a994272793");
    assert_eq!(doc.parent_id.as_deref(), Some("53995c3f42cd8ad8"));
    assert_eq!(doc.subsegments.len(), 1);

    let sub = &doc.subsegments[0];
    assert_eq!(sub.name, "127.0.0.1");
    assert_eq!(sub.http.response.status, Some(200));
    assert!(!sub.in_progress);

    assert_eq!(outbound.root(), Some("1-5759e988-bd862e3fe1be46a994272793"));
    assert_eq!(outbound.parent(), Some(sub.id.as_str()));
    assert_eq!(outbound.sampled(), Some("1"));

    server.stop().await;
}

#[tokio::test]
async fn test_downstream_unsampled_still_propagates() {
    let (backend, mut captured) = start_recording_backend(200, "ok").await;
    let mut server = start(test_config(Some(backend))).await;

    let res = reqwest::Client::new()
        .get(server.url("/downstream"))
        .header(X_AMZN_TRACE_ID, "Root=abc;Sampled=0")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let request = captured.recv().await.unwrap();
    let outbound = TraceHeader::parse(request.header(X_AMZN_TRACE_ID).unwrap());
    assert_eq!(outbound.root(), Some("abc"));
    assert_eq!(outbound.sampled(), Some("0"));
    assert!(outbound.parent().is_some());

    assert!(server.documents.try_recv().is_err());
    server.stop().await;
}

#[tokio::test]
async fn test_downstream_unreachable_is_a_fault() {
    let mut server = start(test_config(Some(unused_addr().await))).await;

    let res = reqwest::get(server.url("/downstream")).await.unwrap();
    assert_eq!(res.status().as_u16(), 502);

    let doc = next_document(&mut server.documents).await;
    assert!(doc.fault);
    assert_eq!(doc.http.response.status, Some(502));

    let sub = &doc.subsegments[0];
    assert!(sub.fault);
    assert!(sub.cause.is_some());

    server.stop().await;
}

#[tokio::test]
async fn test_downstream_not_configured() {
    let mut server = start(test_config(None)).await;

    let res = reqwest::get(server.url("/downstream")).await.unwrap();
    assert_eq!(res.status().as_u16(), 404);

    let doc = next_document(&mut server.documents).await;
    assert!(doc.error);
    assert!(doc.subsegments.is_empty());

    server.stop().await;
}
