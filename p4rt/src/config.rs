//! Configuration for the P4Runtime session.

use {
    crate::arbitration::{ArbitrationIdentity, ElectionId},
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

/// Default P4Runtime gRPC port.
pub const DEFAULT_P4RT_PORT: u16 = 9559;

/// The device under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// `host:port` or a full `http://host:port` URI of the P4Runtime server.
    pub address: String,
}

impl Target {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// The address as a URI, adding the `http://` scheme when it is missing.
    pub fn uri(&self) -> String {
        if self.address.contains("://") {
            self.address.clone()
        } else {
            format!("http://{}", self.address)
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::new(format!("127.0.0.1:{DEFAULT_P4RT_PORT}"))
    }
}

/// Timeouts and buffer sizes for a P4Runtime session.
#[derive(Debug, Clone)]
pub struct P4rtConfig {
    /// How long to wait for the transport to come up (ms).
    pub connect_timeout_ms: u64,

    /// How long `await_packet_in` waits for a packet before failing (ms).
    pub packet_in_timeout_ms: u64,

    /// How long the mastership gate waits for an arbitration response (ms).
    /// Follows the same bounded-wait policy as packet-in.
    pub arbitration_timeout_ms: u64,

    /// Capacity of every delivery channel and of the outbound stream queue.
    /// A full delivery channel drops the newest inbound message.
    pub channel_buffer_size: usize,

    /// Arbitration identity used for packet-out when a test vector does not
    /// name one.
    pub packet_out_identity: ArbitrationIdentity,
}

impl Default for P4rtConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            packet_in_timeout_ms: 3_000,
            arbitration_timeout_ms: 3_000,
            channel_buffer_size: 1_024,
            packet_out_identity: ArbitrationIdentity::new(1, ElectionId::new(1, 5)),
        }
    }
}

impl P4rtConfig {
    /// Shorter timeouts for in-process tests.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            connect_timeout_ms: 1_000,
            packet_in_timeout_ms: 3_000,
            arbitration_timeout_ms: 3_000,
            channel_buffer_size: 16,
            ..Self::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn packet_in_timeout(&self) -> Duration {
        Duration::from_millis(self.packet_in_timeout_ms)
    }

    pub fn arbitration_timeout(&self) -> Duration {
        Duration::from_millis(self.arbitration_timeout_ms)
    }
}
