//! Event encoding and per-participant delivery.
//!
//! Every participant owns a [`Mailbox`]: an unbounded queue drained by a
//! dedicated writer task that pushes frames into the participant's
//! [`EventSink`]. Posting a frame never waits on the network, so the hub
//! can post while holding the session lock and the frames land in each
//! queue in exactly the order the state changes were committed.
//!
//! The writer tasks do the actual I/O, concurrently and independently:
//! a slow or dead recipient only ever stalls its own queue.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, warn};
use typerace_protocol::{Codec, Identity, JsonCodec, RoomCode, ServerEvent};

use crate::DeliveryError;

/// One encoded event, shared by every recipient.
pub type Frame = Arc<[u8]>;

/// Where a participant's frames end up (usually a WebSocket).
///
/// Implementations must serialize their own writes: the hub never calls
/// `deliver` on the same sink concurrently, but the sink may be shared
/// with code that does.
pub trait EventSink: Send + Sync + 'static {
    /// Writes one frame to the participant.
    fn deliver(
        &self,
        frame: Frame,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// A channel sink, handy for tests and in-process clients.
impl EventSink for mpsc::UnboundedSender<Frame> {
    async fn deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.send(frame).map_err(|_| DeliveryError::Closed)
    }
}

/// Serializes `event` to its wire form.
///
/// Encoding the hub's own event types cannot realistically fail; if it
/// does, the event is logged and skipped.
pub(crate) fn encode(room: &RoomCode, event: &ServerEvent) -> Option<Frame> {
    match JsonCodec.encode(event) {
        Ok(bytes) => Some(Frame::from(bytes)),
        Err(e) => {
            warn!(room = %room, event = event.kind(), error = %e, "failed to encode event");
            None
        }
    }
}

/// The outbound queue of one participant.
#[derive(Debug, Clone)]
pub(crate) struct Mailbox {
    tx: mpsc::UnboundedSender<Frame>,
}

impl Mailbox {
    /// Spawns the writer task for `sink` and returns its queue.
    ///
    /// The task stops once every `Mailbox` clone is dropped and the
    /// queue is drained, or as soon as the sink reports it is closed.
    pub(crate) fn spawn<K: EventSink>(
        room: RoomCode,
        identity: Identity,
        sink: K,
        send_timeout: Duration,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                let result = time::timeout(send_timeout, sink.deliver(frame))
                    .await
                    .unwrap_or(Err(DeliveryError::TimedOut));
                match result {
                    Ok(()) => {}
                    Err(DeliveryError::Closed) => {
                        debug!(room = %room, participant = %identity, "recipient closed; dropping mailbox");
                        return;
                    }
                    Err(e) => {
                        warn!(room = %room, participant = %identity, error = %e, "send failed");
                    }
                }
            }
            debug!(room = %room, participant = %identity, "mailbox drained");
        });
        Self { tx }
    }

    /// Queues `frame`. Returns `false` if the writer task is gone.
    pub(crate) fn post(&self, frame: &Frame) -> bool {
        self.tx.send(Arc::clone(frame)).is_ok()
    }
}
