//! Requests over a real socket.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use keystone::prelude::*;
use keystone_config::ServerConfig;
use keystone_server::{Server, ShutdownSignal};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

fn routes() -> RouteCollection {
    RouteCollection::new()
        .route(
            Route::post("/echo/:name")
                .body(ObjectSchema::new().required("greeting", FieldType::String))
                .handle(|ctx: RequestContext| async move {
                    let params = ctx.params::<Value>().cloned();
                    let body = ctx.body::<serde_json::Map<String, Value>>().cloned();
                    Ok::<_, DomainError>(json!({ "params": params, "body": body }))
                }),
        )
        .unwrap()
        .route(Route::get("/slow").handle(|_ctx: RequestContext| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, DomainError>("late")
        }))
        .unwrap()
}

async fn start(config: ServerConfig) -> (SocketAddr, ShutdownSignal, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let server = Server::new(App::new(&routes()).unwrap(), config);

    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { server.run_with_listener(listener, shutdown).await.unwrap() }
    });
    (addr, shutdown, handle)
}

async fn send(addr: SocketAddr, request: http::Request<Full<Bytes>>) -> (http::StatusCode, Value) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = http1::handshake(TokioIo::new(stream)).await.unwrap();
    tokio::spawn(conn);

    let response = sender.send_request(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn post(addr: SocketAddr, path: &str, body: &str) -> http::Request<Full<Bytes>> {
    http::Request::post(path)
        .header("host", addr.to_string())
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

#[tokio::test]
async fn test_round_trip_and_shutdown() {
    let (addr, shutdown, handle) = start(ServerConfig::default()).await;

    let (status, body) = send(addr, post(addr, "/echo/ada", r#"{"greeting":"hi"}"#)).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"params": {"name": "ada"}, "body": {"greeting": "hi"}}));

    let (status, body) = send(addr, post(addr, "/echo/ada", "{}")).await;
    assert_eq!(status, 400);
    assert_eq!(body["name"], "BAD_REQUEST");

    let (status, body) = send(addr, post(addr, "/missing", "{}")).await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Route not found");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_request_timeout_is_gateway_timeout() {
    let config = ServerConfig {
        request_timeout_ms: 50,
        ..ServerConfig::default()
    };
    let (addr, shutdown, _handle) = start(config).await;

    let request = http::Request::get("/slow")
        .header("host", addr.to_string())
        .body(Full::new(Bytes::new()))
        .unwrap();
    let (status, body) = send(addr, request).await;

    assert_eq!(status, 504);
    assert_eq!(body, json!({"name": "GATEWAY_TIMEOUT", "code": 504, "message": "Request timed out"}));
    shutdown.trigger();
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let config = ServerConfig {
        max_body_bytes: 16,
        ..ServerConfig::default()
    };
    let (addr, shutdown, _handle) = start(config).await;

    let payload = format!(r#"{{"greeting":"{}"}}"#, "x".repeat(64));
    let (status, body) = send(addr, post(addr, "/echo/ada", &payload)).await;

    assert_eq!(status, 413);
    assert_eq!(body["name"], "PAYLOAD_TOO_LARGE");
    shutdown.trigger();
}
