//! In-process P4Runtime device for tests.
//!
//! [`LoopbackDevice`] implements [`P4RuntimeService`] without a network. It
//! records every request, answers arbitration according to an
//! [`ArbitrationPolicy`], mirrors packet-outs back as packet-ins, and lets a
//! test inject arbitrary inbound stream items.

use {
    crate::{
        proto::{
            stream_message_request, MasterArbitrationUpdate, PacketIn, PacketOut,
            SetForwardingPipelineConfigRequest, SetForwardingPipelineConfigResponse, Status,
            StreamMessageResponse, Uint128, WriteRequest, WriteResponse,
        },
        service::{InboundStream, OutboundStream, P4RuntimeService},
    },
    async_trait::async_trait,
    futures::StreamExt,
    parking_lot::Mutex,
    std::sync::Arc,
    tokio::sync::{mpsc, watch},
    tokio_stream::wrappers::ReceiverStream,
};

/// `google.rpc.Code::ALREADY_EXISTS`, sent to controllers that lost
/// arbitration.
const STATUS_ALREADY_EXISTS: i32 = 6;

type InboundItem = Result<StreamMessageResponse, tonic::Status>;

/// How the device answers `MasterArbitrationUpdate`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbitrationPolicy {
    /// Confirm the sender as master.
    Grant,
    /// Report a higher election id as master.
    Deny,
    /// Never answer.
    Silent,
}

/// Requests recorded by the device and the open stream, shared with the
/// per-stream task.
struct Recorded {
    writes: Mutex<Vec<WriteRequest>>,
    pipeline_configs: Mutex<Vec<SetForwardingPipelineConfigRequest>>,
    arbitration_updates: Mutex<Vec<MasterArbitrationUpdate>>,
    packets_out: Mutex<Vec<PacketOut>>,
    inbound: Mutex<Option<mpsc::Sender<InboundItem>>>,
    streams_opened: watch::Sender<usize>,
    half_closed: watch::Sender<bool>,
}

impl Default for Recorded {
    fn default() -> Self {
        Self {
            writes: Mutex::default(),
            pipeline_configs: Mutex::default(),
            arbitration_updates: Mutex::default(),
            packets_out: Mutex::default(),
            inbound: Mutex::default(),
            streams_opened: watch::Sender::new(0),
            half_closed: watch::Sender::new(false),
        }
    }
}

pub struct LoopbackDevice {
    arbitration: ArbitrationPolicy,
    echo_packets: bool,
    refuse_stream: bool,
    unary_failure: Option<tonic::Code>,
    recorded: Arc<Recorded>,
}

impl Default for LoopbackDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackDevice {
    /// A device that grants arbitration and echoes packets.
    pub fn new() -> Self {
        Self {
            arbitration: ArbitrationPolicy::Grant,
            echo_packets: true,
            refuse_stream: false,
            unary_failure: None,
            recorded: Arc::default(),
        }
    }

    pub fn with_arbitration(mut self, policy: ArbitrationPolicy) -> Self {
        self.arbitration = policy;
        self
    }

    /// Swallow packet-outs instead of mirroring them.
    pub fn without_echo(mut self) -> Self {
        self.echo_packets = false;
        self
    }

    /// Fail every `StreamChannel` call.
    pub fn refuse_stream(mut self) -> Self {
        self.refuse_stream = true;
        self
    }

    /// Fail every unary RPC with `code`.
    pub fn failing_unary(mut self, code: tonic::Code) -> Self {
        self.unary_failure = Some(code);
        self
    }

    pub fn writes(&self) -> Vec<WriteRequest> {
        self.recorded.writes.lock().clone()
    }

    pub fn pipeline_configs(&self) -> Vec<SetForwardingPipelineConfigRequest> {
        self.recorded.pipeline_configs.lock().clone()
    }

    pub fn arbitration_updates(&self) -> Vec<MasterArbitrationUpdate> {
        self.recorded.arbitration_updates.lock().clone()
    }

    pub fn packets_out(&self) -> Vec<PacketOut> {
        self.recorded.packets_out.lock().clone()
    }

    pub fn streams_opened(&self) -> usize {
        *self.recorded.streams_opened.borrow()
    }

    pub fn is_half_closed(&self) -> bool {
        *self.recorded.half_closed.borrow()
    }

    /// Wait until a stream channel has been opened.
    pub async fn wait_for_stream(&self) {
        let mut opened = self.recorded.streams_opened.subscribe();
        let _ = opened.wait_for(|count| *count > 0).await;
    }

    /// Wait until the client half-closes the stream channel.
    pub async fn wait_for_half_close(&self) {
        let mut closed = self.recorded.half_closed.subscribe();
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Push an item onto the open stream channel. Returns `false` when no
    /// stream is open.
    pub async fn inject(&self, item: InboundItem) -> bool {
        let sender = self.recorded.inbound.lock().clone();
        match sender {
            Some(sender) => sender.send(item).await.is_ok(),
            None => false,
        }
    }

    fn unary_result(&self) -> Result<(), tonic::Status> {
        match self.unary_failure {
            Some(code) => Err(tonic::Status::new(code, "loopback device rejected the request")),
            None => Ok(()),
        }
    }
}

/// Answers stream requests on behalf of one open stream channel.
struct Responder {
    arbitration: ArbitrationPolicy,
    echo_packets: bool,
    recorded: Arc<Recorded>,
}

impl Responder {
    fn arbitration_response(&self, update: &MasterArbitrationUpdate) -> Option<MasterArbitrationUpdate> {
        match self.arbitration {
            ArbitrationPolicy::Grant => Some(MasterArbitrationUpdate {
                device_id: update.device_id,
                election_id: update.election_id,
                status: Some(Status {
                    code: 0,
                    message: "you are master".to_string(),
                    details: vec![],
                }),
            }),
            ArbitrationPolicy::Deny => Some(MasterArbitrationUpdate {
                device_id: update.device_id,
                election_id: Some(Uint128 {
                    high: u64::MAX,
                    low: u64::MAX,
                }),
                status: Some(Status {
                    code: STATUS_ALREADY_EXISTS,
                    message: "another controller is master".to_string(),
                    details: vec![],
                }),
            }),
            ArbitrationPolicy::Silent => None,
        }
    }

    fn respond(&self, update: stream_message_request::Update) -> Option<StreamMessageResponse> {
        match update {
            stream_message_request::Update::Arbitration(update) => {
                let response = self.arbitration_response(&update);
                self.recorded.arbitration_updates.lock().push(update);
                response.map(StreamMessageResponse::arbitration)
            }
            stream_message_request::Update::Packet(packet) => {
                self.recorded.packets_out.lock().push(packet.clone());
                self.echo_packets.then(|| {
                    StreamMessageResponse::packet(PacketIn {
                        payload: packet.payload,
                        metadata: packet.metadata,
                    })
                })
            }
            stream_message_request::Update::Other(_) => None,
        }
    }
}

#[async_trait]
impl P4RuntimeService for LoopbackDevice {
    async fn write(&self, request: WriteRequest) -> Result<WriteResponse, tonic::Status> {
        self.recorded.writes.lock().push(request);
        self.unary_result()?;
        Ok(WriteResponse {})
    }

    async fn set_forwarding_pipeline_config(
        &self,
        request: SetForwardingPipelineConfigRequest,
    ) -> Result<SetForwardingPipelineConfigResponse, tonic::Status> {
        self.recorded.pipeline_configs.lock().push(request);
        self.unary_result()?;
        Ok(SetForwardingPipelineConfigResponse {})
    }

    async fn stream_channel(
        &self,
        mut outbound: OutboundStream,
    ) -> Result<InboundStream, tonic::Status> {
        if self.refuse_stream {
            return Err(tonic::Status::unavailable("loopback device refused the stream"));
        }

        let (tx, rx) = mpsc::channel::<InboundItem>(1_024);
        *self.recorded.inbound.lock() = Some(tx.clone());
        self.recorded
            .streams_opened
            .send_modify(|count| *count = count.saturating_add(1));

        let responder = Responder {
            arbitration: self.arbitration,
            echo_packets: self.echo_packets,
            recorded: Arc::clone(&self.recorded),
        };
        tokio::spawn(async move {
            while let Some(request) = outbound.next().await {
                let Some(update) = request.update else {
                    continue;
                };
                if let Some(response) = responder.respond(update) {
                    if tx.send(Ok(response)).await.is_err() {
                        break;
                    }
                }
            }
            // The client half-closed: finish the RPC from our side as well.
            responder.recorded.inbound.lock().take();
            responder.recorded.half_closed.send_replace(true);
        });

        Ok(ReceiverStream::new(rx).boxed())
    }
}
