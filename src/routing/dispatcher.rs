//! Response dispatch for a completed request.
//!
//! # Responsibilities
//! - Answer unmatched requests with the canned 404 and close
//! - For every matched entry, in registration order: clear its flag, send
//!   its response, close, run its callback
//! - Forward the raw chunk to the receive observer after routing
//!
//! # Design Decisions
//! - Several matching entries each send and close; the client may see more
//!   than one response on the same connection
//! - The 404 path returns early: no table walk, no receive notification
//! - Connection liveness is the transport's concern, not checked here

use bytes::Bytes;

use crate::http::response::NOT_FOUND_RESPONSE;
use crate::net::connection::{ConnectionHandle, ConnectionId};
use crate::net::observers::Observers;
use crate::net::transport::Transport;
use crate::routing::matcher::RequestEvaluation;
use crate::routing::table::PathTable;

/// What a dispatch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No path matched; 404 sent.
    NotFound,
    /// This many matched entries were answered.
    Routed(usize),
}

/// Dispatch a boundary-complete request.
///
/// `source` is the connection the chunk arrived on; `conn` is the active
/// connection responses are addressed to.
pub fn dispatch<T: Transport + ?Sized>(
    evaluation: &RequestEvaluation,
    table: &mut PathTable,
    source: &ConnectionHandle,
    chunk: &[u8],
    conn: Option<ConnectionId>,
    transport: &mut T,
    observers: &mut Observers,
) -> DispatchOutcome {
    if !evaluation.any_path_matched {
        tracing::debug!(connection_id = %source.id(), "No path matched, sending 404");
        transport.send(conn, Bytes::from_static(NOT_FOUND_RESPONSE.as_bytes()));
        transport.close(conn);
        return DispatchOutcome::NotFound;
    }

    let mut routed = 0;
    for entry in table.iter_mut().filter(|entry| entry.is_matched()) {
        entry.set_matched(false);
        tracing::debug!(connection_id = %source.id(), pattern = %entry.pattern(), "Path matched");
        transport.send(conn, entry.response().clone());
        transport.close(conn);
        entry.invoke();
        routed += 1;
    }

    observers.notify_receive(source, chunk);
    DispatchOutcome::Routed(routed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::transport::testing::{Op, RecordingTransport};
    use crate::routing::matcher::{evaluate, Terminator};
    use crate::routing::table::PathEntry;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn source() -> ConnectionHandle {
        ConnectionHandle::new(ConnectionId::new(), SocketAddr::from(([10, 0, 0, 2], 5000)))
    }

    fn counting_entry(pattern: &str, response: &'static str, hits: &Arc<AtomicUsize>) -> PathEntry {
        let hits = hits.clone();
        PathEntry::new(pattern, response, move || {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn run(table: &mut PathTable, chunk: &[u8], observers: &mut Observers) -> (DispatchOutcome, Vec<Op>, ConnectionId) {
        let src = source();
        let eval = evaluate(chunk, &Terminator::default(), table);
        assert!(eval.boundary_complete);
        let mut transport = RecordingTransport::default();
        let outcome = dispatch(&eval, table, &src, chunk, Some(src.id()), &mut transport, observers);
        (outcome, transport.ops, src.id())
    }

    #[test]
    fn test_single_match_sends_closes_and_calls_back() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut table = PathTable::new();
        table.register(counting_entry("/status", "OK", &hits)).unwrap();

        let (outcome, ops, id) = run(
            &mut table,
            b"GET /status HTTP/1.1\r\nHost: x\r\n\r\n",
            &mut Observers::new(),
        );

        assert_eq!(outcome, DispatchOutcome::Routed(1));
        assert_eq!(ops, [Op::Send(Some(id), Bytes::from("OK")), Op::Close(Some(id))]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!table.get(0).unwrap().is_matched());
    }

    #[test]
    fn test_no_match_sends_404_only() {
        let hits = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(AtomicUsize::new(0));
        let r = received.clone();
        let mut observers = Observers::new().on_receive(move |_, _| {
            r.fetch_add(1, Ordering::SeqCst);
        });
        let mut table = PathTable::new();
        table.register(counting_entry("/status", "OK", &hits)).unwrap();

        let (outcome, ops, id) = run(&mut table, b"GET /unknown HTTP/1.1\r\n\r\n", &mut observers);

        assert_eq!(outcome, DispatchOutcome::NotFound);
        assert_eq!(
            ops,
            [
                Op::Send(Some(id), Bytes::from_static(NOT_FOUND_RESPONSE.as_bytes())),
                Op::Close(Some(id)),
            ]
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(received.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_two_matches_send_twice_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (o1, o2) = (order.clone(), order.clone());
        let mut table = PathTable::new();
        table.register(PathEntry::new("/led", "A", move || o1.lock().unwrap().push("led"))).unwrap();
        table.register(PathEntry::new("/on", "B", move || o2.lock().unwrap().push("on"))).unwrap();

        let (outcome, ops, id) = run(&mut table, b"GET /led/on HTTP/1.1\r\n\r\n", &mut Observers::new());

        assert_eq!(outcome, DispatchOutcome::Routed(2));
        assert_eq!(
            ops,
            [
                Op::Send(Some(id), Bytes::from("A")),
                Op::Close(Some(id)),
                Op::Send(Some(id), Bytes::from("B")),
                Op::Close(Some(id)),
            ]
        );
        assert_eq!(*order.lock().unwrap(), ["led", "on"]);
        assert!(table.iter().all(|e| !e.is_matched()));
    }

    #[test]
    fn test_receive_observer_gets_raw_chunk() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let mut observers = Observers::new().on_receive(move |_, chunk| s.lock().unwrap().extend_from_slice(chunk));
        let mut table = PathTable::new();
        table.register(PathEntry::new("/", "OK", || {})).unwrap();

        let chunk = b"GET / HTTP/1.1\r\n\r\n";
        run(&mut table, chunk, &mut observers);
        assert_eq!(seen.lock().unwrap().as_slice(), chunk);
    }

    #[test]
    fn test_absent_connection_is_passed_through() {
        let mut table = PathTable::new();
        table.register(PathEntry::new("/", "OK", || {})).unwrap();
        let chunk = b"GET / HTTP/1.1\r\n\r\n";
        let eval = evaluate(chunk, &Terminator::default(), &mut table);

        let mut transport = RecordingTransport::default();
        dispatch(&eval, &mut table, &source(), chunk, None, &mut transport, &mut Observers::new());
        assert_eq!(transport.ops, [Op::Send(None, Bytes::from("OK")), Op::Close(None)]);
    }
}
