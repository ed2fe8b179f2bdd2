//! Shared utilities for integration testing.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tcp_path_router::{HttpServer, Observers, RouterConfig, ServerHandle};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// How long a test waits for something that should happen.
pub const PATIENCE: Duration = Duration::from_secs(5);

/// Config for a server on a free loopback port.
pub fn loopback_config() -> RouterConfig {
    let mut config = RouterConfig::default();
    config.server.port = 0;
    config.interfaces.station = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config
}

/// Observers that report every lifecycle event as a short string.
pub fn recording_observers() -> (Observers, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (t1, t2, t3, t4, t5) = (tx.clone(), tx.clone(), tx.clone(), tx.clone(), tx);
    let observers = Observers::new()
        .on_connect(move |_| {
            let _ = t1.send("connect".to_string());
        })
        .on_disconnect(move |_| {
            let _ = t2.send("disconnect".to_string());
        })
        .on_reconnect(move |_, code| {
            let _ = t3.send(format!("reconnect {code}"));
        })
        .on_sent(move |_| {
            let _ = t4.send("sent".to_string());
        })
        .on_receive(move |_, chunk| {
            let _ = t5.send(format!("receive {}", chunk.len()));
        });
    (observers, rx)
}

/// Start `server` and return its handle.
pub async fn start(server: HttpServer) -> ServerHandle {
    server.start().await.expect("server failed to start")
}

/// Next observer event, failing the test if none arrives in time.
pub async fn next_event(events: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(PATIENCE, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("observer channel closed")
}

/// Send `request` and read until the server closes the connection.
pub async fn request(addr: SocketAddr, request: &str) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    read_until_closed(&mut stream).await
}

pub async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut response = Vec::new();
    tokio::time::timeout(PATIENCE, stream.read_to_end(&mut response))
        .await
        .expect("server did not close the connection")
        .unwrap();
    response
}

/// True if nothing arrives on `stream` within `wait`.
pub async fn stays_silent(stream: &mut TcpStream, wait: Duration) -> bool {
    let mut buf = [0u8; 64];
    tokio::time::timeout(wait, stream.read(&mut buf)).await.is_err()
}
