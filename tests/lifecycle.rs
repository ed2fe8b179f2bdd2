//! Connection lifecycle and server control over real TCP connections.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tcp_path_router::{HttpServer, Observers, ServerError};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

mod common;

#[tokio::test]
async fn test_second_client_waits_for_first() {
    let (observers, mut events) = common::recording_observers();
    let mut server = HttpServer::new(common::loopback_config()).unwrap();
    server.register_path("/status", "OK", || {}).unwrap();
    server.set_observers(observers);
    let handle = common::start(server).await;

    let first = TcpStream::connect(handle.local_addr()).await.unwrap();
    assert_eq!(common::next_event(&mut events).await, "connect");

    let mut second = TcpStream::connect(handle.local_addr()).await.unwrap();
    second.write_all(b"GET /status HTTP/1.1\r\n\r\n").await.unwrap();
    assert!(common::stays_silent(&mut second, Duration::from_millis(300)).await);

    drop(first);
    assert_eq!(common::next_event(&mut events).await, "disconnect");
    assert_eq!(common::next_event(&mut events).await, "connect");
    assert_eq!(common::read_until_closed(&mut second).await, b"OK");

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_application_send_reaches_client() {
    let (observers, mut events) = common::recording_observers();
    let mut server = HttpServer::new(common::loopback_config()).unwrap();
    server.set_observers(observers);
    let handle = common::start(server).await;

    let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();
    assert_eq!(common::next_event(&mut events).await, "connect");

    handle.send("pong", false).unwrap();
    handle.send("bye", true).unwrap();
    assert_eq!(common::read_until_closed(&mut stream).await, b"pongbye");

    assert_eq!(common::next_event(&mut events).await, "sent");
    assert_eq!(common::next_event(&mut events).await, "sent");
    assert_eq!(common::next_event(&mut events).await, "disconnect");

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_connected_clients_lists_peer() {
    let (observers, mut events) = common::recording_observers();
    let mut server = HttpServer::new(common::loopback_config()).unwrap();
    server.set_observers(observers);
    let handle = common::start(server).await;

    assert!(handle.connected_clients().await.unwrap().is_empty());

    let _stream = TcpStream::connect(handle.local_addr()).await.unwrap();
    assert_eq!(common::next_event(&mut events).await, "connect");
    assert_eq!(
        handle.connected_clients().await.unwrap(),
        vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]
    );

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_all_keeps_serving() {
    let (observers, mut events) = common::recording_observers();
    let mut server = HttpServer::new(common::loopback_config()).unwrap();
    server.register_path("/status", "OK", || {}).unwrap();
    server.set_observers(observers);
    let handle = common::start(server).await;

    let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();
    assert_eq!(common::next_event(&mut events).await, "connect");

    handle.disconnect_all().unwrap();
    assert!(common::read_until_closed(&mut stream).await.is_empty());
    assert_eq!(common::next_event(&mut events).await, "disconnect");

    let response = common::request(handle.local_addr(), "GET /status HTTP/1.1\r\n\r\n").await;
    assert_eq!(response, b"OK");

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_idle_client_is_dropped() {
    let (observers, mut events) = common::recording_observers();
    let mut config = common::loopback_config();
    config.server.timeout_secs = 1;
    let mut server = HttpServer::new(config).unwrap();
    server.set_observers(observers);
    let handle = common::start(server).await;

    let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();
    assert_eq!(common::next_event(&mut events).await, "connect");
    assert!(common::read_until_closed(&mut stream).await.is_empty());
    assert_eq!(common::next_event(&mut events).await, "disconnect");

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_closes_client_and_listener() {
    let (observers, mut events) = common::recording_observers();
    let mut server = HttpServer::new(common::loopback_config()).unwrap();
    server.set_observers(observers);
    let handle = common::start(server).await;
    let addr = handle.local_addr();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    assert_eq!(common::next_event(&mut events).await, "connect");

    handle.stop().await.unwrap();
    assert_eq!(common::next_event(&mut events).await, "disconnect");
    assert!(common::read_until_closed(&mut stream).await.is_empty());

    assert!(TcpStream::connect(addr).await.is_err());
    assert!(matches!(handle.send("late", false), Err(ServerError::NotRunning)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_next_client_connects_after_previous_disconnect() {
    let (tx, mut events) = mpsc::unbounded_channel();
    let (t1, t2, t3) = (tx.clone(), tx.clone(), tx);
    // A slow observer holds the event loop while the first client's
    // disconnect and the waiting client's accept both become ready
    let observers = Observers::new()
        .on_connect(move |_| {
            let _ = t1.send("connect");
        })
        .on_sent(move |_| {
            std::thread::sleep(Duration::from_millis(200));
            let _ = t2.send("sent");
        })
        .on_disconnect(move |_| {
            let _ = t3.send("disconnect");
        });

    let mut server = HttpServer::new(common::loopback_config()).unwrap();
    server.register_path("/status", "OK", || {}).unwrap();
    server.set_observers(observers);
    let handle = common::start(server).await;
    let addr = handle.local_addr();

    let mut current = TcpStream::connect(addr).await.unwrap();
    for _ in 0..5 {
        assert_eq!(next_str(&mut events).await, "connect");
        let waiting = TcpStream::connect(addr).await.unwrap();

        current.write_all(b"GET /status HTTP/1.1\r\n\r\n").await.unwrap();
        assert_eq!(common::read_until_closed(&mut current).await, b"OK");
        assert_eq!(next_str(&mut events).await, "sent");
        assert_eq!(next_str(&mut events).await, "disconnect");

        current = waiting;
    }

    assert_eq!(next_str(&mut events).await, "connect");
    current.write_all(b"GET /status HTTP/1.1\r\n\r\n").await.unwrap();
    assert_eq!(common::read_until_closed(&mut current).await, b"OK");
    handle.stop().await.unwrap();
}

async fn next_str(events: &mut mpsc::UnboundedReceiver<&'static str>) -> &'static str {
    tokio::time::timeout(common::PATIENCE, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("observer channel closed")
}

#[tokio::test]
async fn test_stop_abandons_writes_to_stalled_client() {
    let (observers, mut events) = common::recording_observers();
    let mut config = common::loopback_config();
    config.server.timeout_secs = 0;
    config.server.shutdown_grace_ms = 200;
    let mut server = HttpServer::new(config).unwrap();
    server
        .register_path("/big", vec![b'x'; 64 * 1024 * 1024], || {})
        .unwrap();
    server.set_observers(observers);
    let handle = common::start(server).await;

    // Never read, so the response can't drain
    let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();
    assert_eq!(common::next_event(&mut events).await, "connect");
    stream.write_all(b"GET /big HTTP/1.1\r\n\r\n").await.unwrap();
    assert!(common::next_event(&mut events).await.starts_with("receive"));

    tokio::time::timeout(common::PATIENCE, handle.stop())
        .await
        .expect("stop waited on a stalled write")
        .unwrap();
    assert_eq!(common::next_event(&mut events).await, "disconnect");
    drop(stream);
}
