//! Application observers for connection lifecycle events.
//!
//! Every observer is optional; a notification with no observer is dropped.

use std::fmt;

use crate::net::connection::ConnectionHandle;

pub type ConnectionObserver = Box<dyn FnMut(&ConnectionHandle) + Send>;
pub type ReconnectObserver = Box<dyn FnMut(&ConnectionHandle, i32) + Send>;
pub type ReceiveObserver = Box<dyn FnMut(&ConnectionHandle, &[u8]) + Send>;

/// The five lifecycle callbacks an application can install.
#[derive(Default)]
pub struct Observers {
    connect: Option<ConnectionObserver>,
    disconnect: Option<ConnectionObserver>,
    reconnect: Option<ReconnectObserver>,
    sent: Option<ConnectionObserver>,
    receive: Option<ReceiveObserver>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect(mut self, f: impl FnMut(&ConnectionHandle) + Send + 'static) -> Self {
        self.connect = Some(Box::new(f));
        self
    }

    pub fn on_disconnect(mut self, f: impl FnMut(&ConnectionHandle) + Send + 'static) -> Self {
        self.disconnect = Some(Box::new(f));
        self
    }

    /// Called with the OS error code when a connection fails abnormally.
    pub fn on_reconnect(mut self, f: impl FnMut(&ConnectionHandle, i32) + Send + 'static) -> Self {
        self.reconnect = Some(Box::new(f));
        self
    }

    pub fn on_sent(mut self, f: impl FnMut(&ConnectionHandle) + Send + 'static) -> Self {
        self.sent = Some(Box::new(f));
        self
    }

    /// Called with the raw chunk after a request has been routed to at least one path.
    pub fn on_receive(mut self, f: impl FnMut(&ConnectionHandle, &[u8]) + Send + 'static) -> Self {
        self.receive = Some(Box::new(f));
        self
    }

    pub(crate) fn notify_connect(&mut self, handle: &ConnectionHandle) {
        if let Some(f) = self.connect.as_mut() {
            f(handle);
        }
    }

    pub(crate) fn notify_disconnect(&mut self, handle: &ConnectionHandle) {
        if let Some(f) = self.disconnect.as_mut() {
            f(handle);
        }
    }

    pub(crate) fn notify_reconnect(&mut self, handle: &ConnectionHandle, error_code: i32) {
        if let Some(f) = self.reconnect.as_mut() {
            f(handle, error_code);
        }
    }

    pub(crate) fn notify_sent(&mut self, handle: &ConnectionHandle) {
        if let Some(f) = self.sent.as_mut() {
            f(handle);
        }
    }

    pub(crate) fn notify_receive(&mut self, handle: &ConnectionHandle, chunk: &[u8]) {
        if let Some(f) = self.receive.as_mut() {
            f(handle, chunk);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("connect", &self.connect.is_some())
            .field("disconnect", &self.disconnect.is_some())
            .field("reconnect", &self.reconnect.is_some())
            .field("sent", &self.sent.is_some())
            .field("receive", &self.receive.is_some())
            .finish()
    }
}
