//! Byte transport between the event loop and client sockets.
//!
//! # Responsibilities
//! - Define the [`Transport`] seam the routing core sends through
//! - Run one reader and one writer task per accepted TCP connection
//! - Report connect-side events (receive, sent, disconnect, reconnect)
//!   back to the event loop over a channel
//!
//! # Design Decisions
//! - Sends and closes are fire-and-forget commands; the caller never waits
//! - A close is applied after every command already queued for that
//!   connection, so back-to-back send/close pairs all reach the wire
//! - Sends addressed to no connection, or to one already gone, are dropped
//! - Clean EOF, idle timeout, local close and write failure end in
//!   `Disconnect`; a read error ends in `Reconnect` carrying the OS error
//!   code, with no `Disconnect` after it
//! - The connection permit lives with the link and is released by `detach`,
//!   so the next client is accepted only after the event loop has handled
//!   the previous client's terminal event
//! - `abort_all` interrupts writes stuck on a client that stopped reading

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};

use crate::net::connection::{ConnectionHandle, ConnectionId};
use crate::net::listener::ConnectionPermit;
use crate::observability::metrics;

/// Largest chunk handed to the core per receive event (one TCP segment on Ethernet).
pub const RECV_CHUNK_SIZE: usize = 1460;

/// Events a transport reports about its connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connect(ConnectionHandle),
    Disconnect(ConnectionHandle),
    Reconnect(ConnectionHandle, i32),
    Sent(ConnectionHandle),
    Receive(ConnectionHandle, Bytes),
}

/// Outgoing side of a transport as seen by the routing core.
///
/// `None` means no client is connected; implementations treat it as a no-op.
pub trait Transport {
    fn send(&mut self, conn: Option<ConnectionId>, data: Bytes);
    fn close(&mut self, conn: Option<ConnectionId>);
}

enum WriteCommand {
    Send(Bytes),
    Close,
}

struct ClientLink {
    peer: SocketAddr,
    writer: mpsc::UnboundedSender<WriteCommand>,
    abort: Arc<Notify>,
    _permit: ConnectionPermit,
}

/// Tokio TCP implementation of [`Transport`].
pub struct TcpTransport {
    links: HashMap<ConnectionId, ClientLink>,
    events: mpsc::UnboundedSender<TransportEvent>,
    idle_timeout: Option<Duration>,
}

impl TcpTransport {
    /// `idle_timeout` of `None` keeps idle connections open forever.
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>, idle_timeout: Option<Duration>) -> Self {
        Self {
            links: HashMap::new(),
            events,
            idle_timeout,
        }
    }

    /// Take ownership of an accepted stream and start its I/O tasks.
    pub fn attach(&mut self, stream: TcpStream, peer: SocketAddr, permit: ConnectionPermit) -> ConnectionHandle {
        let handle = ConnectionHandle::new(ConnectionId::new(), peer);
        let (reader, writer) = stream.into_split();
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(Notify::new());
        let abort = Arc::new(Notify::new());

        tokio::spawn(write_loop(
            handle,
            writer,
            write_rx,
            self.events.clone(),
            closed.clone(),
            abort.clone(),
        ));
        tokio::spawn(read_loop(handle, reader, self.events.clone(), closed, self.idle_timeout));

        let link = ClientLink {
            peer,
            writer: write_tx,
            abort,
            _permit: permit,
        };
        self.links.insert(handle.id(), link);
        metrics::connection_opened();
        handle
    }

    /// Forget a connection after its terminal event. Drops the writer once its
    /// queue drains and frees the connection slot.
    pub fn detach(&mut self, id: ConnectionId) {
        if self.links.remove(&id).is_some() {
            metrics::connection_closed();
        }
    }

    /// Request close of every live connection.
    pub fn close_all(&mut self) {
        for (id, link) in &self.links {
            tracing::debug!(connection_id = %id, peer_addr = %link.peer, "Disconnecting client");
            let _ = link.writer.send(WriteCommand::Close);
        }
    }

    /// Give up on pending writes and close every live connection now.
    pub fn abort_all(&mut self) {
        for (id, link) in &self.links {
            tracing::warn!(connection_id = %id, peer_addr = %link.peer, "Aborting pending writes");
            link.abort.notify_one();
        }
    }

    pub fn connected_peers(&self) -> Vec<IpAddr> {
        self.links.values().map(|link| link.peer.ip()).collect()
    }

    pub fn is_idle(&self) -> bool {
        self.links.is_empty()
    }

    fn command(&mut self, conn: Option<ConnectionId>, command: WriteCommand) {
        let link = conn.and_then(|id| self.links.get(&id));
        match link {
            Some(link) => {
                let _ = link.writer.send(command);
            }
            None => tracing::debug!("No client connection, dropping write"),
        }
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, conn: Option<ConnectionId>, data: Bytes) {
        self.command(conn, WriteCommand::Send(data));
    }

    fn close(&mut self, conn: Option<ConnectionId>) {
        self.command(conn, WriteCommand::Close);
    }
}

async fn write_loop(
    handle: ConnectionHandle,
    mut writer: OwnedWriteHalf,
    mut commands: mpsc::UnboundedReceiver<WriteCommand>,
    events: mpsc::UnboundedSender<TransportEvent>,
    closed: Arc<Notify>,
    abort: Arc<Notify>,
) {
    let mut close_requested = false;
    loop {
        let command = if close_requested {
            match commands.try_recv() {
                Ok(command) => command,
                Err(_) => break,
            }
        } else {
            match commands.recv().await {
                Some(command) => command,
                None => break,
            }
        };

        match command {
            WriteCommand::Send(data) => {
                let written = tokio::select! {
                    biased;
                    _ = abort.notified() => break,
                    written = writer.write_all(&data) => written,
                };
                if let Err(e) = written {
                    tracing::warn!(connection_id = %handle.id(), error = %e, "Write failed");
                    break;
                }
                metrics::record_bytes_sent(data.len());
                let _ = events.send(TransportEvent::Sent(handle));
            }
            WriteCommand::Close => close_requested = true,
        }
    }

    let _ = writer.shutdown().await;
    closed.notify_one();
}

enum ReadOutcome {
    Data(usize),
    Eof,
    TimedOut,
    Failed(io::Error),
}

async fn read_chunk(reader: &mut OwnedReadHalf, buf: &mut [u8], idle_timeout: Option<Duration>) -> ReadOutcome {
    let read = match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, reader.read(buf)).await {
            Ok(read) => read,
            Err(_) => return ReadOutcome::TimedOut,
        },
        None => reader.read(buf).await,
    };
    match read {
        Ok(0) => ReadOutcome::Eof,
        Ok(n) => ReadOutcome::Data(n),
        Err(e) => ReadOutcome::Failed(e),
    }
}

async fn read_loop(
    handle: ConnectionHandle,
    mut reader: OwnedReadHalf,
    events: mpsc::UnboundedSender<TransportEvent>,
    closed: Arc<Notify>,
    idle_timeout: Option<Duration>,
) {
    let mut buf = vec![0u8; RECV_CHUNK_SIZE];
    let terminal = loop {
        let outcome = tokio::select! {
            _ = closed.notified() => break TransportEvent::Disconnect(handle),
            outcome = read_chunk(&mut reader, &mut buf, idle_timeout) => outcome,
        };

        match outcome {
            ReadOutcome::Data(n) => {
                let chunk = Bytes::copy_from_slice(&buf[..n]);
                if events.send(TransportEvent::Receive(handle, chunk)).is_err() {
                    return;
                }
            }
            ReadOutcome::Eof => break TransportEvent::Disconnect(handle),
            ReadOutcome::TimedOut => {
                tracing::debug!(connection_id = %handle.id(), "Idle timeout, closing connection");
                break TransportEvent::Disconnect(handle);
            }
            ReadOutcome::Failed(e) => {
                tracing::warn!(connection_id = %handle.id(), error = %e, "Read failed");
                break TransportEvent::Reconnect(handle, e.raw_os_error().unwrap_or(-1));
            }
        }
    };

    let _ = events.send(terminal);
}
