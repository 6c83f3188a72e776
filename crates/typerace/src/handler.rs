//! Per-connection handler: join, receive loop, leave.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Read the room code from the path and the username from the query
//!   2. Join the hub; on refusal, close with the diagnostic reason
//!   3. Loop: receive frames → forward stats to the hub
//!   4. Leave the room when the socket goes away

use std::sync::Arc;

use typerace_hub::{DeliveryError, EventSink, Frame, Hub, Ticket};
use typerace_protocol::{ClientMessage, Identity, JsonCodec, RoomCode};
use typerace_store::RoomStore;
use typerace_transport::{
    Connection, TransportError, UpgradeRequest, WebSocketConnection,
};

use crate::TyperaceError;

/// Query parameter carrying the participant's identity.
const USERNAME_PARAM: &str = "username";

/// Delivers hub frames to one WebSocket.
///
/// The connection's write lock serializes these sends with anything
/// else writing to the socket.
struct SocketSink(Arc<WebSocketConnection>);

impl EventSink for SocketSink {
    async fn deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.0.send(&frame).await.map_err(delivery_error)
    }
}

/// A failed write means the socket is gone; the mailbox stops on
/// `Closed` instead of retrying every later frame.
fn delivery_error(e: TransportError) -> DeliveryError {
    match e {
        TransportError::SendFailed(_) | TransportError::ConnectionClosed(_) => {
            DeliveryError::Closed
        }
        other => DeliveryError::Failed(other.to_string()),
    }
}

/// Drop guard that removes the participant when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the leave.
struct LeaveGuard<S: RoomStore> {
    ticket: Ticket,
    hub: Hub<S>,
}

impl<S: RoomStore> Drop for LeaveGuard<S> {
    fn drop(&mut self) {
        let ticket = self.ticket.clone();
        let hub = self.hub.clone();
        tokio::spawn(async move {
            hub.leave(&ticket).await;
        });
    }
}

/// Splits `/ws/{code}?username={name}` into its two parameters.
///
/// Missing parts come back empty; the hub refuses those joins.
pub(crate) fn parse_join(
    request: &UpgradeRequest,
    prefix: &str,
) -> (RoomCode, Identity) {
    let code = request
        .path()
        .strip_prefix(prefix)
        .map(|rest| rest.trim_end_matches('/'))
        .filter(|rest| !rest.contains('/'))
        .unwrap_or("");
    let username = request.param(USERNAME_PARAM).unwrap_or("").trim();
    (RoomCode::from(code), Identity::from(username))
}

/// Handles a single connection from upgrade to close.
pub(crate) async fn handle_connection<S: RoomStore>(
    conn: WebSocketConnection,
    hub: Hub<S>,
    prefix: Arc<str>,
) -> Result<(), TyperaceError> {
    let conn_id = conn.id();
    let conn = Arc::new(conn);
    let (code, identity) = parse_join(conn.request(), &prefix);
    tracing::debug!(%conn_id, room = %code, participant = %identity, "join requested");

    let ticket = match hub
        .join(code, identity, SocketSink(Arc::clone(&conn)))
        .await
    {
        Ok(ticket) => ticket,
        Err(e) => {
            tracing::info!(%conn_id, error = %e, "join refused");
            conn.close_with_reason(e.close_reason()).await?;
            return Ok(());
        }
    };
    let _guard = LeaveGuard {
        ticket: ticket.clone(),
        hub: hub.clone(),
    };

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(room = %ticket.code(), participant = %ticket.identity(), "connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(room = %ticket.code(), participant = %ticket.identity(), error = %e, "recv error");
                break;
            }
        };
        handle_message(&hub, &ticket, &data).await;
    }

    // _guard drops here → participant leaves.
    Ok(())
}

/// Routes one client frame. Nothing a client sends can end the
/// connection; bad frames are logged and dropped.
async fn handle_message<S: RoomStore>(hub: &Hub<S>, ticket: &Ticket, data: &[u8]) {
    match ClientMessage::decode(&JsonCodec, data) {
        Ok(ClientMessage::StatsUpdate(stats)) => {
            if let Err(e) = hub.report_stats(ticket, stats).await {
                tracing::debug!(room = %ticket.code(), participant = %ticket.identity(), error = %e, "stats dropped");
            }
        }
        Ok(ClientMessage::Unknown(kind)) => {
            tracing::debug!(room = %ticket.code(), participant = %ticket.identity(), %kind, "ignoring unknown message type");
        }
        Err(e) => {
            tracing::warn!(room = %ticket.code(), participant = %ticket.identity(), error = %e, "malformed message");
        }
    }
}
