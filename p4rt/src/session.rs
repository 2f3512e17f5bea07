//! The P4Runtime session and its request operations.
//!
//! A [`P4RuntimeSession`] is the one active connection to the device under
//! test. Every operation is reported as pass/fail: errors below the test case
//! boundary are logged here and turned into `false`. The `try_*` variants
//! return the underlying [`P4rtError`] instead.
//!
//! Write-class operations (write, pipeline config, packet-out) run the
//! mastership gate first and never reach the device when it fails.

use {
    crate::{
        arbitration::ArbitrationIdentity,
        config::{P4rtConfig, Target},
        connection::Connection,
        error::{P4rtError, Result},
        proto::{PacketIn, PacketOut, SetForwardingPipelineConfigRequest, WriteRequest},
        service::P4RuntimeService,
        stream::StreamChannel,
    },
    log::{debug, error, info, warn},
    std::{future::Future, sync::Arc},
};

pub struct P4RuntimeSession {
    connection: Connection,
    stream: StreamChannel,
    config: P4rtConfig,
}

impl P4RuntimeSession {
    /// Connect to `target` and open the stream channel.
    ///
    /// Fails when the connection cannot be established or the device refuses
    /// the stream; either must abort the run. The session is torn down
    /// before the error is returned.
    pub async fn init(target: &Target, config: P4rtConfig) -> Result<Self> {
        let connection = Connection::connect(target, &config).await?;
        let session = Self::from_connection(connection, config);
        if let Err(e) = session.ensure_stream_open().await {
            session.tear_down().await;
            return Err(e);
        }
        Ok(session)
    }

    /// Build a session on an already established service.
    pub fn with_service(service: Arc<dyn P4RuntimeService>, config: P4rtConfig) -> Self {
        Self::from_connection(Connection::with_service(service), config)
    }

    fn from_connection(connection: Connection, config: P4rtConfig) -> Self {
        let stream = StreamChannel::open(&connection, &config);
        Self {
            connection,
            stream,
            config,
        }
    }

    pub fn config(&self) -> &P4rtConfig {
        &self.config
    }

    pub fn stream(&self) -> &StreamChannel {
        &self.stream
    }

    /// Wait, bounded by the connect timeout, for the stream channel to open.
    /// See [`StreamChannel::wait_open`].
    pub async fn ensure_stream_open(&self) -> Result<()> {
        self.stream.wait_open(self.config.connect_timeout()).await
    }

    /// Close the stream channel, then cancel the connection scope.
    pub async fn tear_down(self) {
        info!("tearing down P4Runtime session");
        let Self {
            connection, stream, ..
        } = self;
        stream.close().await;
        connection.tear_down();
    }

    pub async fn write(&self, request: Option<&WriteRequest>) -> bool {
        report("write", self.try_write(request).await)
    }

    pub async fn try_write(&self, request: Option<&WriteRequest>) -> Result<()> {
        let request = request.ok_or(P4rtError::MissingRequest)?;
        let identity = ArbitrationIdentity::from_request(request.device_id, request.election_id);
        self.stream.try_acquire_mastership(&identity).await?;

        debug!(
            "sending write with {} updates to device {}",
            request.updates.len(),
            request.device_id
        );
        self.unary(self.connection.service().write(request.clone()))
            .await?;
        Ok(())
    }

    pub async fn set_pipeline_config(
        &self,
        request: Option<&SetForwardingPipelineConfigRequest>,
    ) -> bool {
        report(
            "set forwarding pipeline config",
            self.try_set_pipeline_config(request).await,
        )
    }

    pub async fn try_set_pipeline_config(
        &self,
        request: Option<&SetForwardingPipelineConfigRequest>,
    ) -> Result<()> {
        let request = request.ok_or(P4rtError::MissingRequest)?;
        let identity = ArbitrationIdentity::from_request(request.device_id, request.election_id);
        self.stream.try_acquire_mastership(&identity).await?;

        debug!(
            "setting forwarding pipeline config on device {} (action {})",
            request.device_id, request.action
        );
        self.unary(
            self.connection
                .service()
                .set_forwarding_pipeline_config(request.clone()),
        )
        .await?;
        Ok(())
    }

    /// Arbitrate as `identity`, then queue `packet` for transmission.
    ///
    /// Succeeds once the packet is queued, not once it is on the wire.
    pub async fn packet_out(&self, packet: &PacketOut, identity: &ArbitrationIdentity) -> bool {
        report("packet-out", self.try_packet_out(packet, identity).await)
    }

    pub async fn try_packet_out(
        &self,
        packet: &PacketOut,
        identity: &ArbitrationIdentity,
    ) -> Result<()> {
        self.stream.try_acquire_mastership(identity).await?;
        self.stream.send_packet_out(packet.clone()).await
    }

    /// Wait for the next packet-in and compare its payload with `expected`.
    ///
    /// Only the payload takes part in the comparison, and it must match
    /// byte for byte.
    pub async fn await_packet_in(&self, expected: &PacketIn) -> bool {
        report("packet-in", self.try_await_packet_in(expected).await)
    }

    pub async fn try_await_packet_in(&self, expected: &PacketIn) -> Result<()> {
        let received = self
            .stream
            .next_packet_in(self.config.packet_in_timeout())
            .await?;
        debug!("received packet-in ({} bytes)", received.payload.len());
        if received.payload == expected.payload {
            Ok(())
        } else {
            Err(P4rtError::PayloadMismatch {
                expected: hex::encode(&expected.payload),
                received: hex::encode(&received.payload),
            })
        }
    }

    /// Run a unary RPC inside the connection scope.
    async fn unary<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, tonic::Status>>,
    {
        tokio::select! {
            biased;
            _ = self.connection.cancel_token().cancelled() => Err(P4rtError::Cancelled),
            result = call => result.map_err(P4rtError::Rpc),
        }
    }
}

fn report(operation: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => {
            debug!("{} succeeded", operation);
            true
        }
        Err(
            e @ (P4rtError::MissingRequest
            | P4rtError::NotMaster { .. }
            | P4rtError::PayloadMismatch { .. }),
        ) => {
            warn!("{} failed: {}", operation, e);
            false
        }
        Err(e) => {
            error!("{} failed: {}", operation, e);
            false
        }
    }
}
