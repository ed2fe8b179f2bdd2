//! TCP server setup and control.
//!
//! # Responsibilities
//! - Validate configuration and build the routing engine
//! - Bind the listener on the configured interface
//! - Run the event loop that owns the engine and the transport
//! - Give the application a cloneable control handle
//!
//! # Design Decisions
//! - One event loop task owns all mutable state; accept loop, socket tasks
//!   and control handles talk to it over channels
//! - Events are processed one at a time, in arrival order
//! - `stop` closes the client first, then the listener, and returns once
//!   both are gone; writes still pending after the shutdown grace period
//!   are abandoned

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::schema::{RouterConfig, MAX_CLIENT_COUNT, MAX_TIMEOUT_SECS};
use crate::config::watcher::RuntimeSettings;
use crate::error::ServerError;
use crate::http::engine::Engine;
use crate::lifecycle::Shutdown;
use crate::net::interfaces::{AddressQuery, ConfiguredInterfaces};
use crate::net::listener::{Accepted, Listener, ListenerError};
use crate::net::observers::Observers;
use crate::net::transport::{TcpTransport, TransportEvent};
use crate::routing::matcher::Terminator;
use crate::routing::table::PathEntry;

/// A configured, not yet started server.
pub struct HttpServer {
    config: RouterConfig,
    engine: Engine,
    interfaces: Box<dyn AddressQuery>,
}

impl HttpServer {
    /// Create a server. Fails without side effects on a timeout above two hours
    /// or an empty terminator.
    pub fn new(config: RouterConfig) -> Result<Self, ServerError> {
        let server = &config.server;
        if server.timeout_secs > MAX_TIMEOUT_SECS {
            tracing::error!(
                timeout_secs = server.timeout_secs,
                "TCP timeout cannot be more than {} seconds",
                MAX_TIMEOUT_SECS
            );
            return Err(ServerError::TimeoutTooLarge {
                secs: server.timeout_secs,
            });
        }

        let mut engine = Engine::new(Terminator::new(server.terminator.clone())?);
        engine.set_debug(server.debug);
        engine.set_match_mode(server.match_mode);
        let interfaces = Box::new(ConfiguredInterfaces::from(&config.interfaces));

        let this = Self {
            config,
            engine,
            interfaces,
        };
        tracing::info!(
            server_ip = %this.server_ip(),
            server_port = this.server_port(),
            timeout_secs = this.timeout_secs(),
            bind_mode = ?this.config.server.bind_mode,
            "Initialized tcp server"
        );
        Ok(this)
    }

    /// Replace the interface address lookup.
    pub fn with_address_query(mut self, query: impl AddressQuery + 'static) -> Self {
        self.interfaces = Box::new(query);
        self
    }

    /// Route requests containing `pattern` to `response`, then run `callback`.
    pub fn register_path<F>(
        &mut self,
        pattern: impl Into<String>,
        response: impl Into<Bytes>,
        callback: F,
    ) -> Result<(), ServerError>
    where
        F: FnMut() + Send + 'static,
    {
        self.engine
            .register_path(PathEntry::new(pattern, response, callback))
            .map(|_| ())
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.config.server.debug = debug;
        self.engine.set_debug(debug);
    }

    pub fn set_terminator(&mut self, terminator: impl Into<String>) -> Result<(), ServerError> {
        let terminator = Terminator::new(terminator)?;
        self.config.server.terminator = terminator.as_str().to_string();
        self.engine.set_terminator(terminator);
        Ok(())
    }

    pub fn set_observers(&mut self, observers: Observers) {
        self.engine.set_observers(observers);
        if self.config.server.debug {
            tracing::debug!("Lifecycle observers registered");
        }
    }

    pub fn server_port(&self) -> u16 {
        self.config.server.port
    }

    pub fn server_ip(&self) -> IpAddr {
        self.interfaces.ip_for(self.config.server.bind_mode)
    }

    pub fn timeout_secs(&self) -> u32 {
        self.config.server.timeout_secs
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server_ip(), self.server_port())
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Bind and start serving. Registration is closed from here on.
    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let listener = Listener::bind(self.bind_addr(), MAX_CLIENT_COUNT).await?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        let shutdown = Shutdown::new();
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let accept_task = tokio::spawn(listener.serve(accepted_tx, shutdown.subscribe()));
        let event_loop = EventLoop {
            engine: self.engine,
            transport: TcpTransport::new(events_tx, self.config.server.idle_timeout()),
            shutdown,
            shutdown_grace: self.config.server.shutdown_grace(),
            abort_at: None,
            accept_task: Some(accept_task),
            stop_waiters: Vec::new(),
        };
        tokio::spawn(event_loop.run(commands_rx, accepted_rx, events_rx));

        tracing::info!(address = %local_addr, "Server started");
        Ok(ServerHandle {
            commands: commands_tx,
            local_addr,
        })
    }
}

enum Command {
    Send { data: Bytes, close: bool },
    DisconnectAll,
    SetTerminator(Terminator),
    SetDebug(bool),
    ConnectedClients(oneshot::Sender<Vec<IpAddr>>),
    Stop(oneshot::Sender<()>),
}

struct EventLoop {
    engine: Engine,
    transport: TcpTransport,
    shutdown: Shutdown,
    shutdown_grace: Duration,
    abort_at: Option<Instant>,
    accept_task: Option<JoinHandle<()>>,
    stop_waiters: Vec<oneshot::Sender<()>>,
}

impl EventLoop {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut accepted: mpsc::UnboundedReceiver<Accepted>,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        loop {
            tokio::select! {
                Some(command) = commands.recv() => self.on_command(command),
                Some(conn) = accepted.recv() => self.on_accepted(conn),
                Some(event) = events.recv() => self.on_event(event),
                _ = tokio::time::sleep_until(self.abort_at.unwrap_or_else(Instant::now)), if self.abort_at.is_some() => {
                    self.abort_at = None;
                    self.transport.abort_all();
                }
                else => break,
            }

            if self.stopping() && self.transport.is_idle() {
                break;
            }
        }

        // Handles see NotRunning from here on
        drop(commands);
        if let Some(task) = self.accept_task.take() {
            let _ = task.await;
        }
        tracing::info!("Server stopped");
        for waiter in self.stop_waiters {
            let _ = waiter.send(());
        }
    }

    fn stopping(&self) -> bool {
        !self.stop_waiters.is_empty()
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Send { data, close } => self.engine.send(&mut self.transport, data, close),
            Command::DisconnectAll => {
                self.transport.close_all();
                tracing::info!("All clients disconnected from server");
            }
            Command::SetTerminator(terminator) => self.engine.set_terminator(terminator),
            Command::SetDebug(debug) => self.engine.set_debug(debug),
            Command::ConnectedClients(reply) => {
                let _ = reply.send(self.transport.connected_peers());
            }
            Command::Stop(reply) => {
                tracing::info!("Stopping server");
                self.transport.close_all();
                self.shutdown.trigger();
                if self.stop_waiters.is_empty() {
                    self.abort_at = Some(Instant::now() + self.shutdown_grace);
                }
                self.stop_waiters.push(reply);
            }
        }
    }

    fn on_accepted(&mut self, conn: Accepted) {
        if self.stopping() {
            tracing::debug!(peer_addr = %conn.peer, "Server stopping, dropping new connection");
            return;
        }
        let handle = self.transport.attach(conn.stream, conn.peer, conn.permit);
        self.engine
            .handle_event(TransportEvent::Connect(handle), &mut self.transport);
    }

    fn on_event(&mut self, event: TransportEvent) {
        let finished = match &event {
            TransportEvent::Disconnect(handle) | TransportEvent::Reconnect(handle, _) => Some(handle.id()),
            _ => None,
        };
        self.engine.handle_event(event, &mut self.transport);
        if let Some(id) = finished {
            self.transport.detach(id);
        }
    }
}

/// Cloneable control handle for a running server.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    commands: mpsc::UnboundedSender<Command>,
    local_addr: SocketAddr,
}

impl ServerHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Send bytes to the connected client, optionally closing afterwards.
    pub fn send(&self, data: impl Into<Bytes>, should_close: bool) -> Result<(), ServerError> {
        self.command(Command::Send {
            data: data.into(),
            close: should_close,
        })
    }

    pub fn disconnect_all(&self) -> Result<(), ServerError> {
        self.command(Command::DisconnectAll)
    }

    pub fn set_terminator(&self, terminator: impl Into<String>) -> Result<(), ServerError> {
        self.command(Command::SetTerminator(Terminator::new(terminator)?))
    }

    pub fn set_debug(&self, debug: bool) -> Result<(), ServerError> {
        self.command(Command::SetDebug(debug))
    }

    /// Apply settings picked up from a reloaded configuration.
    pub fn apply_settings(&self, settings: &RuntimeSettings) -> Result<(), ServerError> {
        self.set_terminator(settings.terminator.clone())?;
        self.set_debug(settings.debug)
    }

    /// IP addresses of connected clients.
    pub async fn connected_clients(&self) -> Result<Vec<IpAddr>, ServerError> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::ConnectedClients(tx))?;
        rx.await.map_err(|_| ServerError::NotRunning)
    }

    /// Disconnect the client, stop listening, and wait for both.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Stop(tx))?;
        rx.await.map_err(|_| ServerError::NotRunning)
    }

    fn command(&self, command: Command) -> Result<(), ServerError> {
        self.commands
            .send(command)
            .map_err(|_| ServerError::NotRunning)
    }
}
