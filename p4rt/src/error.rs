//! Error types for the P4Runtime session.

use thiserror::Error;

/// Errors that can occur while talking to a P4Runtime device.
///
/// Only the setup variants ([`Connect`](Self::Connect),
/// [`InvalidTarget`](Self::InvalidTarget), [`StreamOpen`](Self::StreamOpen))
/// are fatal to a run. Everything
/// else is recovered by the request operations into a failed result.
#[derive(Error, Debug)]
pub enum P4rtError {
    /// The transport to the device could not be established.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        /// Address we tried to reach.
        address: String,
        /// Underlying transport failure.
        #[source]
        source: tonic::transport::Error,
    },

    /// The target address is not a usable URI.
    #[error("invalid target address {address:?}: {reason}")]
    InvalidTarget {
        /// Address as configured.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A unary RPC (Write, SetForwardingPipelineConfig) failed.
    #[error("rpc failed: {0}")]
    Rpc(tonic::Status),

    /// The device refused to open the stream channel.
    #[error("failed to open stream channel: {0}")]
    StreamOpen(tonic::Status),

    /// The stream channel failed while receiving.
    #[error("stream channel error: {0}")]
    Stream(tonic::Status),

    /// The device ended the stream channel, or the stream stopped accepting
    /// outbound messages.
    #[error("stream channel closed")]
    StreamClosed,

    /// A delivery channel has no producer or consumer left.
    #[error("delivery channel closed")]
    ChannelClosed,

    /// A bounded wait elapsed without a message.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// The caller passed no request.
    #[error("missing request")]
    MissingRequest,

    /// The arbitration response did not confirm us as master.
    #[error("not master for device {device_id}: {reason}")]
    NotMaster {
        /// Device the arbitration was for.
        device_id: u64,
        /// What the response said instead.
        reason: String,
    },

    /// A received packet-in did not match the expected payload.
    #[error("payload mismatch: expected {expected}, received {received}")]
    PayloadMismatch {
        /// Expected payload, hex encoded.
        expected: String,
        /// Received payload, hex encoded.
        received: String,
    },

    /// The session was torn down while the operation was in flight.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience result type for P4Runtime session operations.
pub type Result<T> = std::result::Result<T, P4rtError>;
