//! Mastership arbitration.
//!
//! A controller may only mutate device state while it is master for that
//! device. Mastership is won by sending a `MasterArbitrationUpdate` carrying
//! the controller's election id on the stream channel; the device answers on
//! the same stream with the election id of the current master and an OK
//! status when that master is us.

use {
    crate::{
        error::{P4rtError, Result},
        proto::{MasterArbitrationUpdate, Uint128},
        stream::StreamChannel,
    },
    log::{debug, info, warn},
    serde::{Deserialize, Serialize},
    std::fmt,
    tokio::{sync::mpsc::error::TryRecvError, time::timeout},
};

/// `google.rpc.Code::OK`.
const STATUS_OK: i32 = 0;

/// A 128-bit election id. Higher ids win arbitration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElectionId {
    pub high: u64,
    pub low: u64,
}

impl ElectionId {
    pub const fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }
}

impl From<Uint128> for ElectionId {
    fn from(value: Uint128) -> Self {
        Self::new(value.high, value.low)
    }
}

impl From<ElectionId> for Uint128 {
    fn from(value: ElectionId) -> Self {
        Uint128 {
            high: value.high,
            low: value.low,
        }
    }
}

impl fmt::Display for ElectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.high, self.low)
    }
}

/// Who we claim to be when arbitrating for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitrationIdentity {
    pub device_id: u64,
    pub election_id: ElectionId,
}

impl ArbitrationIdentity {
    pub const fn new(device_id: u64, election_id: ElectionId) -> Self {
        Self {
            device_id,
            election_id,
        }
    }

    /// Identity carried by a write-class request. A request without an
    /// election id arbitrates with the zero id, which a device never grants.
    pub fn from_request(device_id: u64, election_id: Option<Uint128>) -> Self {
        Self::new(device_id, election_id.map(ElectionId::from).unwrap_or_default())
    }

    /// The update that asks the device to make us master.
    pub fn to_update(self) -> MasterArbitrationUpdate {
        MasterArbitrationUpdate {
            device_id: self.device_id,
            election_id: Some(self.election_id.into()),
            status: None,
        }
    }

    /// Check whether `response` confirms this identity as master.
    pub fn confirm(&self, response: &MasterArbitrationUpdate) -> Result<()> {
        let not_master = |reason: String| P4rtError::NotMaster {
            device_id: self.device_id,
            reason,
        };

        if response.device_id != self.device_id {
            return Err(not_master(format!(
                "response is for device {}",
                response.device_id
            )));
        }
        let master = response.election_id.map(ElectionId::from);
        if master != Some(self.election_id) {
            return Err(not_master(match master {
                Some(id) => format!("current master has election id {id}"),
                None => "response carries no election id".to_string(),
            }));
        }
        match &response.status {
            Some(status) if status.code == STATUS_OK => Ok(()),
            Some(status) => Err(not_master(format!(
                "status {}: {}",
                status.code, status.message
            ))),
            None => Err(not_master("response carries no status".to_string())),
        }
    }
}

impl StreamChannel {
    /// Run the arbitration handshake for `identity`.
    ///
    /// Returns `true` only when the device confirms us as master within the
    /// arbitration timeout.
    pub async fn acquire_mastership(&self, identity: &ArbitrationIdentity) -> bool {
        match self.try_acquire_mastership(identity).await {
            Ok(()) => {
                info!(
                    "mastership acquired for device {} (election id {})",
                    identity.device_id, identity.election_id
                );
                true
            }
            Err(e) => {
                warn!("mastership arbitration failed: {}", e);
                false
            }
        }
    }

    pub async fn try_acquire_mastership(&self, identity: &ArbitrationIdentity) -> Result<()> {
        // Hold the receiver for the whole handshake so the response we read
        // belongs to the update we sent.
        let mut responses = self.arbitration_rx.lock().await;
        loop {
            match responses.try_recv() {
                Ok(stale) => debug!("discarding stale arbitration update: {:?}", stale),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(P4rtError::ChannelClosed),
            }
        }

        debug!(
            "sending arbitration update for device {} (election id {})",
            identity.device_id, identity.election_id
        );
        self.arbitration_tx
            .send(identity.to_update())
            .await
            .map_err(|_| P4rtError::ChannelClosed)?;

        let response = timeout(self.arbitration_timeout, responses.recv())
            .await
            .map_err(|_| P4rtError::Timeout(self.arbitration_timeout.as_millis() as u64))?
            .ok_or(P4rtError::ChannelClosed)?;
        debug!("arbitration response: {:?}", response);
        identity.confirm(&response)
    }
}
