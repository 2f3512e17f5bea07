//! P4Runtime client session used by the test vector runner.
//!
//! This crate owns everything between the execution engine and the device's
//! P4Runtime endpoint:
//!
//! - **Connection**: the gRPC channel to the device and the cancellation
//!   scope that bounds the whole session.
//! - **Stream channel**: the single bidirectional `StreamChannel` RPC, a
//!   send loop that drains outbound arbitration updates and packet-outs, and a
//!   receive loop that demultiplexes inbound messages into per-kind delivery
//!   channels.
//! - **Mastership arbitration**: the election-id handshake every write-class
//!   operation must win before it touches the device.
//! - **Request operations**: write, pipeline config, packet-out and the
//!   timeout-bounded packet-in check, each reported as pass/fail.
//!
//! ## Architecture
//!
//! ```text
//!  P4RuntimeSession ── write / set_pipeline_config ──► P4RuntimeService (unary)
//!        │
//!        │ acquire_mastership / packet_out / await_packet_in
//!        ▼
//!  StreamChannel
//!   ├─ send loop:    arbitration_tx, packet_out_tx ──► request stream
//!   └─ receive loop: response stream ──► arbitration | packet-in | other
//! ```
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`]      | `P4rtConfig` defaults, `Target` |
//! | [`proto`]       | `p4.v1` wire messages (prost) |
//! | [`service`]     | `P4RuntimeService` seam and the tonic client |
//! | [`connection`]  | Connection lifecycle and cancellation scope |
//! | [`stream`]      | Stream channel multiplexer |
//! | [`arbitration`] | Election ids and the mastership gate |
//! | [`session`]     | Gated request operations |
//! | [`error`]       | Crate-wide error enum |

pub mod arbitration;
pub mod config;
pub mod connection;
pub mod error;
#[cfg(any(test, feature = "dev-context-only-utils"))]
pub mod loopback;
pub mod proto;
pub mod service;
pub mod session;
pub mod stream;

pub use {
    arbitration::{ArbitrationIdentity, ElectionId},
    config::{P4rtConfig, Target},
    connection::Connection,
    error::{P4rtError, Result},
    service::{GrpcP4RuntimeService, P4RuntimeService},
    session::P4RuntimeSession,
    stream::{InboundKind, StreamChannel},
};
