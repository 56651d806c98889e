//! Fuzz target for the connection state machine
//!
//! Drives the machine through arbitrary event/time sequences and checks
//! the invariants that matter:
//!
//! - Never panics, whatever order transport reports arrive in
//! - At most one connection attempt in flight at any moment
//! - No `OpenTransport` is ever emitted without credentials
//! - After a manual disconnect, nothing reopens the transport

#![no_main]

use std::time::{Duration, Instant};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use matchwire_core::{
    Connection, ConnectionAction, ConnectionConfig, Credentials,
};
use matchwire_proto::{ClientEvent, ErrorKind, ErrorNotice, ServerEvent};

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Connect,
    Disconnect,
    TransportOpened,
    TransportFailed,
    TransportClosed,
    NetworkChange { online: bool },
    HeartbeatAck,
    AuthError,
    EmitHeartbeat,
    Tick { advance_ms: u16 },
}

fuzz_target!(|ops: Vec<Op>| {
    let mut conn: Connection = Connection::new(ConnectionConfig::default());
    let mut now = Instant::now();
    let mut in_flight = 0i32;
    let mut manually_closed = false;

    for op in ops {
        let actions = match op {
            Op::Connect => {
                manually_closed = false;
                conn.connect(
                    Credentials { user_id: "u".into(), token: "t".into() },
                    now,
                )
            },
            Op::Disconnect => {
                manually_closed = true;
                conn.disconnect()
            },
            Op::TransportOpened => {
                if in_flight > 0 {
                    in_flight -= 1;
                }
                conn.transport_opened(now)
            },
            Op::TransportFailed => {
                if in_flight > 0 {
                    in_flight -= 1;
                }
                conn.transport_failed("fuzzed failure", now)
            },
            Op::TransportClosed => {
                if in_flight > 0 {
                    in_flight -= 1;
                }
                conn.transport_closed("fuzzed close", now)
            },
            Op::NetworkChange { online } => conn.network_changed(online, now),
            Op::HeartbeatAck => conn.handle_inbound(&ServerEvent::HeartbeatAck, now),
            Op::AuthError => {
                manually_closed = true; // credentials cleared, same contract
                conn.handle_inbound(
                    &ServerEvent::Error(ErrorNotice {
                        message: "rejected".into(),
                        kind: ErrorKind::Auth,
                    }),
                    now,
                )
            },
            Op::EmitHeartbeat => conn.emit(ClientEvent::Heartbeat).unwrap_or_default(),
            Op::Tick { advance_ms } => {
                now += Duration::from_millis(u64::from(advance_ms));
                conn.tick(now)
            },
        };

        for action in actions {
            if matches!(action, ConnectionAction::OpenTransport(_)) {
                assert!(!manually_closed, "reopened after manual disconnect/auth reject");
                in_flight += 1;
                assert!(in_flight <= 1, "two connection attempts in flight");
            }
        }
    }
});
