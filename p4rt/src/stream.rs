//! Stream channel multiplexer.
//!
//! One bidirectional `StreamChannel` RPC carries every arbitration update and
//! packet for the session. Two tasks own it for its whole lifetime:
//!
//! - the **send loop** drains the arbitration-send and packet-out queues and
//!   writes each message to the stream, in arrival order per queue;
//! - the **receive loop** reads inbound messages and routes each one by
//!   [`InboundKind`] to its delivery channel: arbitration responses,
//!   packet-ins, or the catch-all channel for everything else.
//!
//! ## Delivery policy
//!
//! Delivery channels are bounded by `channel_buffer_size`. The receive loop
//! never waits for a consumer: when a channel is full the newest message is
//! dropped, logged, and counted in [`StreamChannel::dropped_messages`].
//! Ordering holds within a kind; there is no ordering across kinds.
//!
//! Each kind assumes a single waiter at a time. Receivers sit behind async
//! mutexes, so a second waiter queues behind the first instead of racing it.
//!
//! Nothing is discarded between test cases: a packet-in that no expectation
//! consumed is the first one the next packet-in check sees.

use {
    crate::{
        config::P4rtConfig,
        connection::Connection,
        error::{P4rtError, Result},
        proto::{
            stream_message_response::Update, MasterArbitrationUpdate, PacketIn, PacketOut,
            StreamMessageRequest, StreamMessageResponse,
        },
        service::{InboundStream, OutboundStream, P4RuntimeService},
    },
    futures::StreamExt,
    log::{debug, error, info, warn},
    parking_lot::Mutex,
    std::{
        fmt,
        sync::{
            atomic::{AtomicU64, Ordering},
            Arc,
        },
        time::Duration,
    },
    tokio::{
        sync::{
            mpsc::{self, error::TrySendError},
            watch, Mutex as AsyncMutex,
        },
        task::JoinHandle,
        time::timeout,
    },
    tokio_util::sync::CancellationToken,
};

/// Kind tag of an inbound stream message; selects its delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKind {
    Arbitration,
    PacketIn,
    Digest,
    IdleTimeout,
    Other,
    Error,
    /// No update set, or an update this client does not know.
    Unknown,
}

impl InboundKind {
    pub fn of(response: &StreamMessageResponse) -> Self {
        match &response.update {
            Some(Update::Arbitration(_)) => Self::Arbitration,
            Some(Update::Packet(_)) => Self::PacketIn,
            Some(Update::Digest(_)) => Self::Digest,
            Some(Update::IdleTimeoutNotification(_)) => Self::IdleTimeout,
            Some(Update::Other(_)) => Self::Other,
            Some(Update::Error(_)) => Self::Error,
            None => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arbitration => "arbitration",
            Self::PacketIn => "packet_in",
            Self::Digest => "digest",
            Self::IdleTimeout => "idle_timeout_notification",
            Self::Other => "other",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InboundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of establishing the `StreamChannel` RPC.
#[derive(Debug)]
enum OpenState {
    Opening,
    Open,
    Failed(tonic::Status),
}

/// State shared between the stream loops and the handle.
#[derive(Debug)]
struct StreamState {
    last_error: Mutex<Option<Arc<P4rtError>>>,
    dropped: AtomicU64,
    opened: watch::Sender<OpenState>,
}

impl Default for StreamState {
    fn default() -> Self {
        Self {
            last_error: Mutex::new(None),
            dropped: AtomicU64::new(0),
            opened: watch::Sender::new(OpenState::Opening),
        }
    }
}

impl StreamState {
    /// Keeps the first error; later ones are consequences of it.
    fn record(&self, error: P4rtError) {
        self.last_error
            .lock()
            .get_or_insert_with(|| Arc::new(error));
    }
}

/// Handle to the session's stream channel.
pub struct StreamChannel {
    cancel: CancellationToken,
    pub(crate) arbitration_tx: mpsc::Sender<MasterArbitrationUpdate>,
    pub(crate) arbitration_rx: AsyncMutex<mpsc::Receiver<MasterArbitrationUpdate>>,
    pub(crate) arbitration_timeout: Duration,
    packet_out_tx: mpsc::Sender<PacketOut>,
    packet_in_rx: AsyncMutex<mpsc::Receiver<PacketIn>>,
    other_rx: AsyncMutex<mpsc::Receiver<StreamMessageResponse>>,
    state: Arc<StreamState>,
    send_loop: JoinHandle<()>,
    receive_loop: JoinHandle<()>,
}

impl StreamChannel {
    /// Open the stream channel on `connection` and start both loops.
    ///
    /// The RPC itself is established by the receive loop, so a device that
    /// only answers after its first inbound message does not stall the
    /// caller. A failure to open is recorded as [`last_error`](Self::last_error)
    /// and every later operation on the stream fails.
    pub fn open(connection: &Connection, config: &P4rtConfig) -> Self {
        let cancel = connection.cancel_token().child_token();
        let capacity = config.channel_buffer_size.max(1);
        let state = Arc::new(StreamState::default());

        let (sink, outbound) = mpsc::channel::<StreamMessageRequest>(capacity);
        let (arbitration_send_tx, arbitration_send_rx) = mpsc::channel(capacity);
        let (packet_out_tx, packet_out_rx) = mpsc::channel(capacity);
        let (arbitration_tx, arbitration_rx) = mpsc::channel(capacity);
        let (packet_in_tx, packet_in_rx) = mpsc::channel(capacity);
        let (other_tx, other_rx) = mpsc::channel(capacity);

        let router = Router {
            arbitration: arbitration_tx,
            packet_in: packet_in_tx,
            other: other_tx,
            state: Arc::clone(&state),
        };

        let send_loop = tokio::spawn(send_loop(
            sink,
            arbitration_send_rx,
            packet_out_rx,
            Arc::clone(&state),
            cancel.clone(),
        ));
        let receive_loop = tokio::spawn(receive_loop(
            Arc::clone(connection.service()),
            OutboundStream::new(outbound),
            router,
            cancel.clone(),
        ));

        Self {
            cancel,
            arbitration_tx: arbitration_send_tx,
            arbitration_rx: AsyncMutex::new(arbitration_rx),
            arbitration_timeout: config.arbitration_timeout(),
            packet_out_tx,
            packet_in_rx: AsyncMutex::new(packet_in_rx),
            other_rx: AsyncMutex::new(other_rx),
            state,
            send_loop,
            receive_loop,
        }
    }

    /// Wait up to `wait` for the receive loop to establish the RPC.
    ///
    /// Fails with [`P4rtError::StreamOpen`] when the device refused the
    /// stream. A stream still being established when `wait` elapses is not
    /// an error: some devices only send response headers with their first
    /// message, and a later failure still lands in
    /// [`last_error`](Self::last_error).
    pub async fn wait_open(&self, wait: Duration) -> Result<()> {
        let mut opened = self.state.opened.subscribe();
        let settled = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(P4rtError::Cancelled),
            settled = timeout(
                wait,
                opened.wait_for(|state| !matches!(state, OpenState::Opening)),
            ) => settled,
        };
        match settled {
            Ok(Ok(state)) => match &*state {
                OpenState::Failed(status) => Err(P4rtError::StreamOpen(status.clone())),
                OpenState::Open | OpenState::Opening => Ok(()),
            },
            Ok(Err(_)) => Err(P4rtError::StreamClosed),
            Err(_) => {
                debug!(
                    "stream channel not confirmed open after {}ms, continuing",
                    wait.as_millis()
                );
                Ok(())
            }
        }
    }

    /// The first error that stopped a stream loop, if any.
    pub fn last_error(&self) -> Option<Arc<P4rtError>> {
        self.state.last_error.lock().clone()
    }

    /// Inbound messages dropped because their delivery channel was full.
    pub fn dropped_messages(&self) -> u64 {
        self.state.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Queue a packet-out for the send loop. Waits only while the queue is
    /// full.
    pub async fn send_packet_out(&self, packet: PacketOut) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(P4rtError::Cancelled),
            sent = self.packet_out_tx.send(packet) => sent.map_err(|_| P4rtError::ChannelClosed),
        }
    }

    /// Wait up to `wait` for the next packet-in.
    pub async fn next_packet_in(&self, wait: Duration) -> Result<PacketIn> {
        let mut packets = self.packet_in_rx.lock().await;
        recv_within(&mut packets, wait).await
    }

    /// Wait up to `wait` for the next message on the catch-all channel.
    pub async fn next_other(&self, wait: Duration) -> Result<StreamMessageResponse> {
        let mut others = self.other_rx.lock().await;
        recv_within(&mut others, wait).await
    }

    /// Close the stream: cancel its scope, then half-close the send side.
    ///
    /// A failure while closing is logged; the stream counts as closed either
    /// way.
    pub async fn close(self) {
        debug!("closing stream channel");
        self.cancel.cancel();
        let Self {
            send_loop,
            receive_loop,
            ..
        } = self;
        if let Err(e) = send_loop.await {
            warn!("error closing the stream channel: {}", e);
        }
        if let Err(e) = receive_loop.await {
            warn!("stream channel receive loop ended abnormally: {}", e);
        }
    }
}

async fn recv_within<T>(rx: &mut mpsc::Receiver<T>, wait: Duration) -> Result<T> {
    match timeout(wait, rx.recv()).await {
        Ok(Some(item)) => Ok(item),
        Ok(None) => Err(P4rtError::ChannelClosed),
        Err(_) => Err(P4rtError::Timeout(wait.as_millis() as u64)),
    }
}

/// Per-kind delivery table used by the receive loop.
struct Router {
    arbitration: mpsc::Sender<MasterArbitrationUpdate>,
    packet_in: mpsc::Sender<PacketIn>,
    other: mpsc::Sender<StreamMessageResponse>,
    state: Arc<StreamState>,
}

impl Router {
    fn route(&self, response: StreamMessageResponse) {
        let kind = InboundKind::of(&response);
        debug!("received {} on stream channel", kind);
        if let Some(Update::Error(stream_error)) = &response.update {
            warn!(
                "device reported stream error {}: {}",
                stream_error.canonical_code, stream_error.message
            );
        }

        let delivered = match response.update {
            Some(Update::Arbitration(update)) => deliver(&self.arbitration, update),
            Some(Update::Packet(packet)) => deliver(&self.packet_in, packet),
            update => deliver(&self.other, StreamMessageResponse { update }),
        };
        if let Err(reason) = delivered {
            self.state.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("dropping inbound {} message: {}", kind, reason);
        }
    }
}

fn deliver<T>(tx: &mpsc::Sender<T>, item: T) -> std::result::Result<(), &'static str> {
    match tx.try_send(item) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) => Err("delivery channel full"),
        Err(TrySendError::Closed(_)) => Err("delivery channel closed"),
    }
}

async fn receive_loop(
    service: Arc<dyn P4RuntimeService>,
    outbound: OutboundStream,
    router: Router,
    cancel: CancellationToken,
) {
    let mut inbound: InboundStream = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        opened = service.stream_channel(outbound) => match opened {
            Ok(inbound) => inbound,
            Err(status) => {
                error!("failed to open stream channel: {}", status);
                router.state.record(P4rtError::StreamOpen(status.clone()));
                router.state.opened.send_replace(OpenState::Failed(status));
                return;
            }
        },
    };
    info!("stream channel open");
    router.state.opened.send_replace(OpenState::Open);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = inbound.next() => next,
        };
        match next {
            Some(Ok(response)) => router.route(response),
            Some(Err(status)) => {
                error!("stream channel receive error: {}", status);
                router.state.record(P4rtError::Stream(status));
                break;
            }
            None => {
                warn!("stream channel closed by device");
                router.state.record(P4rtError::StreamClosed);
                break;
            }
        }
    }
    debug!("stream channel receive loop stopped");
}

async fn send_loop(
    sink: mpsc::Sender<StreamMessageRequest>,
    mut arbitration_rx: mpsc::Receiver<MasterArbitrationUpdate>,
    mut packet_out_rx: mpsc::Receiver<PacketOut>,
    state: Arc<StreamState>,
    cancel: CancellationToken,
) {
    loop {
        let request = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            Some(update) = arbitration_rx.recv() => StreamMessageRequest::arbitration(update),
            Some(packet) = packet_out_rx.recv() => {
                debug!("sending packet-out ({} bytes)", packet.payload.len());
                StreamMessageRequest::packet(packet)
            }
            else => break,
        };
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = sink.send(request) => sent,
        };
        if sent.is_err() {
            warn!("stream channel stopped accepting outbound messages");
            state.record(P4rtError::StreamClosed);
            break;
        }
    }
    // Dropping the sink ends the request stream: the half-close.
    drop(sink);
    debug!("stream channel send loop stopped");
}
