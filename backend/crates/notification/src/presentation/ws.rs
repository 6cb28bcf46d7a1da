//! WebSocket fan-out
//!
//! One connection per browser tab. Each connection subscribes to the bus
//! (optionally resuming after `?since=`), filters by audience and forwards
//! events in sequence order. Client acks are tracked per connection and
//! echoed back so the client knows which resume point the server saw.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use kernel::actor::CurrentUser;
use tokio::sync::{broadcast::error::RecvError, mpsc};

use crate::application::bus::{EventBus, Subscription};
use crate::domain::event::SequencedEvent;
use crate::domain::repository::NotificationRepository;
use crate::presentation::dto::{ClientFrame, ServerFrame, WsQuery};
use crate::presentation::handlers::NotificationAppState;

/// Replies produced by the receive half
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    Acked(u64),
    Pong,
}

/// What to do with one item from the broadcast receiver
#[derive(Debug)]
enum Live<'a> {
    Send(ServerFrame<'a>),
    /// Addressed to someone else
    Skip,
    Closed,
}

/// Highest sequence number the client acknowledged on this connection
#[derive(Debug, Default)]
struct AckTracker(AtomicU64);

impl AckTracker {
    /// Record an ack and return the resulting high-water mark, which never
    /// moves backwards
    fn ack(&self, seq: u64) -> u64 {
        self.0.fetch_max(seq, Ordering::Relaxed).max(seq)
    }

    fn last(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Frames written right after the upgrade: `resync` when the resume point
/// fell out of the ring, then the backlog the viewer may see
fn opening_frames<'a>(
    backlog: &'a [Arc<SequencedEvent>],
    resync_from: Option<u64>,
    viewer: &CurrentUser,
) -> Vec<ServerFrame<'a>> {
    resync_from
        .map(|oldest| ServerFrame::Resync { oldest })
        .into_iter()
        .chain(
            backlog
                .iter()
                .filter(|e| e.audience.admits(viewer))
                .map(|e| ServerFrame::Event(e)),
        )
        .collect()
}

fn live_frame<'a>(
    received: &'a Result<Arc<SequencedEvent>, RecvError>,
    viewer: &CurrentUser,
) -> Live<'a> {
    match received {
        Ok(event) if event.audience.admits(viewer) => Live::Send(ServerFrame::Event(event)),
        Ok(_) => Live::Skip,
        Err(RecvError::Lagged(missed)) => Live::Send(ServerFrame::Lagged { missed: *missed }),
        Err(RecvError::Closed) => Live::Closed,
    }
}

/// `None` for frames that get no answer
fn client_reply(text: &str, acks: &AckTracker) -> Option<Reply> {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::Ack { seq }) => Some(Reply::Acked(acks.ack(seq))),
        Ok(ClientFrame::Ping) => Some(Reply::Pong),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed client frame");
            None
        }
    }
}

/// GET /api/ws
pub async fn ws_handler<R>(
    ws: WebSocketUpgrade,
    State(state): State<NotificationAppState<R>>,
    viewer: CurrentUser,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse
where
    R: NotificationRepository + Send + Sync + 'static,
{
    let bus = state.bus.clone();
    let ping_interval = state.ping_interval;
    ws.on_upgrade(move |socket| handle_connection(socket, bus, viewer, query.since, ping_interval))
}

async fn send_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    frame: &ServerFrame<'_>,
) -> Result<(), ()> {
    let json = serde_json::to_string(frame).map_err(|e| {
        tracing::error!(error = %e, "Failed to encode WebSocket frame");
    })?;
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}

async fn handle_connection(
    socket: WebSocket,
    bus: EventBus,
    viewer: CurrentUser,
    since: Option<u64>,
    ping_interval: Duration,
) {
    let (mut sender, mut receiver) = socket.split();
    let Subscription {
        backlog,
        resync_from,
        receiver: mut events,
    } = bus.subscribe_since(since);
    let (reply_tx, mut reply_rx) = mpsc::channel::<Reply>(16);
    let acks = Arc::new(AckTracker::default());

    tracing::info!(
        user_id = %viewer.user_id,
        since = ?since,
        backlog = backlog.len(),
        active = bus.subscriber_count(),
        "WebSocket connection opened"
    );

    let mut send_task = tokio::spawn(async move {
        for frame in opening_frames(&backlog, resync_from, &viewer) {
            if send_frame(&mut sender, &frame).await.is_err() {
                return;
            }
        }

        let mut ping = tokio::time::interval(ping_interval);
        ping.tick().await;

        loop {
            tokio::select! {
                received = events.recv() => {
                    let frame = match live_frame(&received, &viewer) {
                        Live::Send(frame) => frame,
                        Live::Skip => continue,
                        Live::Closed => break,
                    };
                    if let ServerFrame::Lagged { missed } = &frame {
                        tracing::warn!(user_id = %viewer.user_id, missed = *missed, "WebSocket client lagged");
                    }
                    if send_frame(&mut sender, &frame).await.is_err() {
                        break;
                    }
                }
                reply = reply_rx.recv() => {
                    let frame = match reply {
                        Some(Reply::Acked(seq)) => ServerFrame::Acked { seq },
                        Some(Reply::Pong) => ServerFrame::Pong,
                        None => break,
                    };
                    if send_frame(&mut sender, &frame).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let recv_acks = acks.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let reply = match msg {
                Message::Text(text) => match client_reply(text.as_str(), &recv_acks) {
                    Some(reply) => reply,
                    None => continue,
                },
                Message::Close(_) => break,
                _ => continue,
            };
            if reply_tx.send(reply).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!(
        user_id = %viewer.user_id,
        last_acked = acks.last(),
        "WebSocket connection closed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::EventBusConfig;
    use crate::domain::event::{Audience, EventEnvelope};
    use kernel::actor::UserRole;
    use kernel::id::{OrganizationId, UserId};

    fn bus(channel_capacity: usize, replay_capacity: usize) -> EventBus {
        EventBus::new(&EventBusConfig {
            channel_capacity,
            replay_capacity,
            ..Default::default()
        })
    }

    fn publish(bus: &EventBus, event_type: &str, audience: Audience) -> u64 {
        bus.publish(EventEnvelope::new(event_type, serde_json::json!({})), audience)
    }

    fn sent_seqs(frames: &[ServerFrame<'_>]) -> Vec<u64> {
        frames
            .iter()
            .filter_map(|f| match f {
                ServerFrame::Event(e) => Some(e.seq),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_backlog_is_filtered_by_audience() {
        let bus = bus(16, 16);
        let org = OrganizationId::new();
        let viewer = CurrentUser::new(UserId::new(), UserRole::Institution, Some(org));

        publish(&bus, "job.posted", Audience::All);
        publish(&bus, "message.received", Audience::User(UserId::new()));
        publish(&bus, "verification.requested", Audience::Organization(org));
        publish(&bus, "credential.issued", Audience::User(viewer.user_id));

        let subscription = bus.subscribe_since(Some(0));
        assert_eq!(subscription.resync_from, None);
        let frames = opening_frames(&subscription.backlog, subscription.resync_from, &viewer);
        assert_eq!(sent_seqs(&frames), vec![1, 3, 4]);
    }

    #[test]
    fn test_resync_comes_before_backlog() {
        let bus = bus(16, 2);
        let viewer = CurrentUser::new(UserId::new(), UserRole::Student, None);
        for _ in 0..5 {
            publish(&bus, "job.posted", Audience::All);
        }

        let subscription = bus.subscribe_since(Some(1));
        let frames = opening_frames(&subscription.backlog, subscription.resync_from, &viewer);
        assert!(matches!(frames[0], ServerFrame::Resync { oldest: 4 }));
        assert_eq!(sent_seqs(&frames), vec![4, 5]);
    }

    #[tokio::test]
    async fn test_live_events_skip_other_audiences() {
        let bus = bus(16, 16);
        let viewer = CurrentUser::new(UserId::new(), UserRole::Student, None);
        let mut events = bus.subscribe_since(None).receiver;

        publish(&bus, "message.received", Audience::User(UserId::new()));
        publish(&bus, "message.received", Audience::User(viewer.user_id));

        let other = events.recv().await;
        assert!(matches!(live_frame(&other, &viewer), Live::Skip));
        let mine = events.recv().await;
        assert!(matches!(
            live_frame(&mine, &viewer),
            Live::Send(ServerFrame::Event(event)) if event.seq == 2
        ));
    }

    #[tokio::test]
    async fn test_slow_receiver_gets_lagged_frame() {
        let bus = bus(2, 16);
        let viewer = CurrentUser::new(UserId::new(), UserRole::Student, None);
        let mut events = bus.subscribe_since(None).receiver;
        for _ in 0..5 {
            publish(&bus, "job.posted", Audience::All);
        }

        let received = events.recv().await;
        assert!(matches!(
            live_frame(&received, &viewer),
            Live::Send(ServerFrame::Lagged { missed: 3 })
        ));
    }

    #[test]
    fn test_acks_never_move_backwards() {
        let acks = AckTracker::default();
        assert_eq!(client_reply(r#"{"type":"ack","seq":7}"#, &acks), Some(Reply::Acked(7)));
        assert_eq!(client_reply(r#"{"type":"ack","seq":3}"#, &acks), Some(Reply::Acked(7)));
        assert_eq!(client_reply(r#"{"type":"ack","seq":9}"#, &acks), Some(Reply::Acked(9)));
        assert_eq!(client_reply(r#"{"type":"ping"}"#, &acks), Some(Reply::Pong));
        assert_eq!(client_reply("not json", &acks), None);
        assert_eq!(acks.last(), 9);
    }
}
