use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::message::ChatMessage;

/// Unique id of one live connection. Distinct from the user id so the
/// same user can hold several connections to the same room.
pub type ClientId = String;

/// Membership event handed to a room when a client joins.
pub struct Registration {
    pub client_id: ClientId,
    pub outbound: mpsc::Sender<ChatMessage>,
}

/// Depth of the register/unregister queues. Teardown must never stall
/// waiting for the control loop, so these stay shallow but nonzero.
const MEMBERSHIP_QUEUE_DEPTH: usize = 64;

/// Depth of the shared broadcast queue. Inbound pumps block here when a
/// room is saturated, which throttles producers without touching the
/// control loop.
const BROADCAST_QUEUE_DEPTH: usize = 256;

#[derive(Debug, Error)]
#[error("room {0} is closed")]
pub struct RoomClosed(pub String);

/// Handle to a live room's control loop.
///
/// The loop is the single writer of the membership set; everything
/// reaches it through the three queues or the cancellation token.
#[derive(Clone)]
pub struct RoomHandle {
    id: String,
    register_tx: mpsc::Sender<Registration>,
    unregister_tx: mpsc::Sender<ClientId>,
    broadcast_tx: mpsc::Sender<ChatMessage>,
    cancel: CancellationToken,
}

impl RoomHandle {
    /// Spawns a room's control loop and returns the handle to it.
    pub fn open(id: String) -> Self {
        let (register_tx, register_rx) = mpsc::channel(MEMBERSHIP_QUEUE_DEPTH);
        let (unregister_tx, unregister_rx) = mpsc::channel(MEMBERSHIP_QUEUE_DEPTH);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(BROADCAST_QUEUE_DEPTH);
        let cancel = CancellationToken::new();

        info!(room_id = %id, "Opening room");
        tokio::spawn(run_control_loop(
            id.clone(),
            register_rx,
            unregister_rx,
            broadcast_rx,
            cancel.clone(),
        ));

        Self {
            id,
            register_tx,
            unregister_tx,
            broadcast_tx,
            cancel,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Adds a client to the room's membership set.
    pub async fn register(&self, registration: Registration) -> Result<(), RoomClosed> {
        self.register_tx
            .send(registration)
            .await
            .map_err(|_| RoomClosed(self.id.clone()))
    }

    /// Removes a client from the membership set. Best-effort and
    /// idempotent: removing an absent client, or notifying a room that
    /// has already terminated, is a no-op.
    pub async fn unregister(&self, client_id: ClientId) {
        let _ = self.unregister_tx.send(client_id).await;
    }

    /// Queues a message for fan-out to every current member.
    pub async fn broadcast(&self, message: ChatMessage) -> Result<(), RoomClosed> {
        self.broadcast_tx
            .send(message)
            .await
            .map_err(|_| RoomClosed(self.id.clone()))
    }

    /// The room-wide cancellation token, observed by every member.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Terminates the room. Members observe the shared token and tear
    /// themselves down.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Single-consumer event loop for one room.
///
/// Waits on the four sources and handles exactly one event per
/// iteration; `select!` picks among ready branches at random so none of
/// them can be starved.
async fn run_control_loop(
    room_id: String,
    mut register_rx: mpsc::Receiver<Registration>,
    mut unregister_rx: mpsc::Receiver<ClientId>,
    mut broadcast_rx: mpsc::Receiver<ChatMessage>,
    cancel: CancellationToken,
) {
    let mut members: HashMap<ClientId, mpsc::Sender<ChatMessage>> = HashMap::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(room_id = %room_id, members = members.len(), "Room cancelled, control loop exiting");
                break;
            }
            registration = register_rx.recv() => match registration {
                Some(registration) => {
                    debug!(
                        room_id = %room_id,
                        client_id = %registration.client_id,
                        "Client registered"
                    );
                    members.insert(registration.client_id, registration.outbound);
                }
                None => break,
            },
            client_id = unregister_rx.recv() => match client_id {
                Some(client_id) => {
                    if members.remove(&client_id).is_some() {
                        debug!(room_id = %room_id, client_id = %client_id, "Client unregistered");
                    }
                }
                None => break,
            },
            message = broadcast_rx.recv() => match message {
                Some(message) => fan_out(&room_id, &members, message),
                None => break,
            },
        }
    }
}

/// Delivers one message to every member, the sender included.
///
/// Uses `try_send` so a slow consumer can never stall the loop: a full
/// outbound queue drops the message for that recipient only.
fn fan_out(room_id: &str, members: &HashMap<ClientId, mpsc::Sender<ChatMessage>>, message: ChatMessage) {
    for (client_id, outbound) in members {
        match outbound.try_send(message.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(
                    room_id = %room_id,
                    client_id = %client_id,
                    "Outbound queue full, dropping message for slow consumer"
                );
            }
            // Receiver already gone; its unregister is in flight
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::message::UserIdentity;
    use std::time::Duration;
    use tokio::time::timeout;

    fn identity(name: &str) -> UserIdentity {
        UserIdentity {
            user_id: format!("{name}-uuid"),
            username: name.to_string(),
        }
    }

    fn message(sender: &str, body: &str) -> ChatMessage {
        ChatMessage::new(&identity(sender), body.to_string())
    }

    async fn join(
        room: &RoomHandle,
        client_id: &str,
        capacity: usize,
    ) -> mpsc::Receiver<ChatMessage> {
        let (tx, rx) = mpsc::channel(capacity);
        room.register(Registration {
            client_id: client_id.to_string(),
            outbound: tx,
        })
        .await
        .unwrap();
        rx
    }

    async fn recv(rx: &mut mpsc::Receiver<ChatMessage>) -> ChatMessage {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for broadcast")
            .expect("outbound queue closed")
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_members_including_sender() {
        let room = RoomHandle::open("room-1".to_string());
        let mut alice_rx = join(&room, "alice", 8).await;
        let mut bob_rx = join(&room, "bob", 8).await;

        room.broadcast(message("alice", "hi")).await.unwrap();

        assert_eq!(recv(&mut alice_rx).await.body, "hi");
        assert_eq!(recv(&mut bob_rx).await.body, "hi");
    }

    #[tokio::test]
    async fn test_per_room_message_order_is_preserved() {
        let room = RoomHandle::open("room-1".to_string());
        let mut rx = join(&room, "alice", 16).await;

        for i in 0..5 {
            room.broadcast(message("alice", &format!("m{i}"))).await.unwrap();
        }

        for i in 0..5 {
            assert_eq!(recv(&mut rx).await.body, format!("m{i}"));
        }
    }

    #[tokio::test]
    async fn test_unregister_removes_member_and_is_idempotent() {
        let room = RoomHandle::open("room-1".to_string());
        let mut alice_rx = join(&room, "alice", 8).await;
        let mut bob_rx = join(&room, "bob", 8).await;

        room.unregister("alice".to_string()).await;
        // Duplicate unregister of the same client is a no-op
        room.unregister("alice".to_string()).await;
        // Unregistering a client that never joined is a no-op too
        room.unregister("nobody".to_string()).await;

        room.broadcast(message("bob", "still here")).await.unwrap();

        assert_eq!(recv(&mut bob_rx).await.body, "still here");
        // Bob's delivery proves the loop processed the broadcast; alice
        // must have seen nothing.
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_register_then_immediate_unregister_leaves_no_residue() {
        let room = RoomHandle::open("room-1".to_string());
        let mut alice_rx = join(&room, "alice", 8).await;
        let mut ghost_rx = join(&room, "ghost", 8).await;
        room.unregister("ghost".to_string()).await;

        room.broadcast(message("alice", "anyone?")).await.unwrap();

        assert_eq!(recv(&mut alice_rx).await.body, "anyone?");
        assert!(ghost_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_outbound_queue_drops_without_stalling_the_room() {
        let room = RoomHandle::open("room-1".to_string());
        // Slow consumer with room for a single message
        let mut slow_rx = join(&room, "slow", 1).await;
        let mut fast_rx = join(&room, "fast", 8).await;

        room.broadcast(message("fast", "first")).await.unwrap();
        room.broadcast(message("fast", "second")).await.unwrap();
        room.broadcast(message("fast", "third")).await.unwrap();

        // The fast consumer sees everything in order
        assert_eq!(recv(&mut fast_rx).await.body, "first");
        assert_eq!(recv(&mut fast_rx).await.body, "second");
        assert_eq!(recv(&mut fast_rx).await.body, "third");

        // The slow consumer got the first message and dropped the rest;
        // a gap, never a reorder
        assert_eq!(recv(&mut slow_rx).await.body, "first");
        assert!(slow_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_terminates_the_control_loop() {
        let room = RoomHandle::open("room-1".to_string());
        let _rx = join(&room, "alice", 8).await;

        room.close();
        assert!(room.is_closed());

        // The loop drains nothing after cancellation; sends fail once
        // the receivers are dropped. Cancellation is observable
        // immediately through the token either way.
        let token = room.cancel_token();
        timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("cancellation should be observable");
    }

    #[tokio::test]
    async fn test_broadcast_after_close_reports_room_closed() {
        let room = RoomHandle::open("room-1".to_string());
        room.close();

        // The loop drops its receivers when it exits; once that happens
        // every further broadcast fails with RoomClosed.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        loop {
            if room.broadcast(message("alice", "too late")).await.is_err() {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "closed room kept accepting broadcasts"
            );
            tokio::task::yield_now().await;
        }
        assert!(room.is_closed());
    }
}
