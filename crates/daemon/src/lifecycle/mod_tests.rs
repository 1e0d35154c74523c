// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::test_helpers::test_config;
use super::*;
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

async fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn run_serves_until_signalled_then_cleans_up() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let daemon = startup(&config).await.unwrap();
    let addr = daemon.local_addr().unwrap();
    let dispatcher = daemon.state.dispatcher.clone();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(daemon.run(async {
        let _ = stop_rx.await;
    }));

    let response = get(addr, "/api/v1/health").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("\"status\":\"ok\""));

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
    assert!(!dispatcher.is_accepting());
    assert!(!config.lock_path.exists());
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn lock_is_released_after_shutdown() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let first = startup(&config).await.unwrap();
    assert!(matches!(startup(&config).await, Err(LifecycleError::LockFailed(_))));
    first.shutdown().await;

    let second = startup(&config).await.unwrap();
    second.shutdown().await;
}
