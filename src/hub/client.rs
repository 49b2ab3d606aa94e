use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::message::{ChatFrame, ChatMessage, UserIdentity};
use super::room::{ClientId, Registration, RoomClosed, RoomHandle};
use super::socket::{FrameSink, FrameStream, InboundFrame, SocketError};
use crate::config::HubConfig;

/// One participant's live session in a room.
///
/// Owns the connection exclusively: the read half feeds the room's
/// broadcast queue, the write half drains the bounded outbound queue.
/// Built once per successful handshake and consumed by `start`.
pub struct Client {
    id: ClientId,
    identity: UserIdentity,
    room: RoomHandle,
    sink: Box<dyn FrameSink>,
    stream: Box<dyn FrameStream>,
    config: HubConfig,
}

/// Handle to a running client's lifecycle.
pub struct ClientHandle {
    client_id: ClientId,
    cancel: CancellationToken,
    done: JoinHandle<()>,
}

impl ClientHandle {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Requests teardown. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once all three duties have stopped and the client is
    /// fully torn down.
    pub async fn closed(self) {
        let _ = self.done.await;
    }
}

impl Client {
    pub fn new(
        room: RoomHandle,
        identity: UserIdentity,
        sink: Box<dyn FrameSink>,
        stream: Box<dyn FrameStream>,
        config: HubConfig,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            identity,
            room,
            sink,
            stream,
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Registers with the room and starts the three duties: inbound
    /// pump, outbound pump, and the supervisory loop that tears the
    /// client down exactly once.
    ///
    /// Fails only if the room has already terminated, in which case no
    /// task is started and dropping the socket halves closes the
    /// connection.
    pub async fn start(self) -> Result<ClientHandle, RoomClosed> {
        let Client {
            id,
            identity,
            room,
            sink,
            stream,
            config,
        } = self;

        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity);
        room.register(Registration {
            client_id: id.clone(),
            outbound: outbound_tx,
        })
        .await?;

        let cancel = CancellationToken::new();
        let room_cancel = room.cancel_token();

        let inbound = tokio::spawn(inbound_pump(
            stream,
            room.clone(),
            identity,
            cancel.clone(),
            config.read_timeout,
            config.max_frame_bytes,
        ));
        let outbound = tokio::spawn(outbound_pump(
            sink,
            outbound_rx,
            cancel.clone(),
            config.ping_interval,
            config.write_timeout,
        ));
        let done = tokio::spawn(supervise(
            id.clone(),
            room,
            cancel.clone(),
            room_cancel,
            inbound,
            outbound,
        ));

        Ok(ClientHandle {
            client_id: id,
            cancel,
            done,
        })
    }
}

/// Reads frames until the connection dies, misbehaves, or goes silent
/// past the read deadline. Every decoded message is tagged with this
/// client's identity and pushed to the room's broadcast queue.
///
/// Failures here are connection-local: they cancel this client only,
/// never the room.
async fn inbound_pump(
    mut stream: Box<dyn FrameStream>,
    room: RoomHandle,
    identity: UserIdentity,
    cancel: CancellationToken,
    read_timeout: Duration,
    max_frame_bytes: usize,
) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return,
            frame = timeout(read_timeout, stream.next_frame()) => frame,
        };

        match frame {
            Err(_) => {
                debug!(username = %identity.username, "No peer activity within read deadline");
                break;
            }
            Ok(None) => {
                debug!("Peer connection ended");
                break;
            }
            Ok(Some(Err(e))) => {
                warn!(error = ?e, "Read failed");
                break;
            }
            Ok(Some(Ok(InboundFrame::Close))) => {
                debug!("Peer requested close");
                break;
            }
            // Any control traffic is proof of life; the deadline resets
            // on the next read
            Ok(Some(Ok(InboundFrame::Pong))) => {}
            Ok(Some(Ok(InboundFrame::Text(text)))) => {
                if text.len() > max_frame_bytes {
                    warn!(
                        size = text.len(),
                        limit = max_frame_bytes,
                        "Frame exceeds size limit"
                    );
                    break;
                }
                match serde_json::from_str::<ChatFrame>(&text) {
                    Ok(frame) => {
                        let message = ChatMessage::new(&identity, frame.body);
                        if room.broadcast(message).await.is_err() {
                            // Room terminated; the supervisor observes
                            // its token independently
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Undecodable frame");
                        break;
                    }
                }
            }
        }
    }
    cancel.cancel();
}

/// Writes queued messages and periodic keepalive pings until cancelled
/// or the connection fails. Consecutive queued messages are coalesced
/// into one write burst before flushing.
async fn outbound_pump(
    mut sink: Box<dyn FrameSink>,
    mut outbound_rx: mpsc::Receiver<ChatMessage>,
    cancel: CancellationToken,
    ping_interval: Duration,
    write_timeout: Duration,
) {
    let mut ticker = interval_at(Instant::now() + ping_interval, ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            message = outbound_rx.recv() => match message {
                Some(message) => {
                    match timeout(
                        write_timeout,
                        write_burst(sink.as_mut(), &mut outbound_rx, message),
                    )
                    .await
                    {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            warn!(error = ?e, "Write failed");
                            break;
                        }
                        Err(_) => {
                            warn!("Write deadline exceeded");
                            break;
                        }
                    }
                }
                // Queue closed underneath us; nothing left to deliver
                None => break,
            },
            _ = ticker.tick() => {
                match timeout(write_timeout, sink.send_ping()).await {
                    Ok(Ok(())) => {}
                    _ => {
                        warn!("Keepalive write failed");
                        break;
                    }
                }
            }
        }
    }
    cancel.cancel();
    let _ = timeout(write_timeout, sink.close()).await;
}

/// Feeds the first message plus everything already queued, then flushes
/// once, so a backlog goes out in a single transport write.
async fn write_burst(
    sink: &mut dyn FrameSink,
    queue: &mut mpsc::Receiver<ChatMessage>,
    first: ChatMessage,
) -> Result<(), SocketError> {
    encode_and_feed(sink, &first).await?;
    while let Ok(next) = queue.try_recv() {
        encode_and_feed(sink, &next).await?;
    }
    sink.flush().await
}

async fn encode_and_feed(
    sink: &mut dyn FrameSink,
    message: &ChatMessage,
) -> Result<(), SocketError> {
    let text =
        serde_json::to_string(message).map_err(|e| SocketError::SendFailed(e.to_string()))?;
    sink.feed_text(text).await
}

/// Waits for either this client's cancellation or the room's, then
/// performs teardown exactly once: stop both pumps, notify the room's
/// unregister queue, and let the outbound pump close the connection.
async fn supervise(
    client_id: ClientId,
    room: RoomHandle,
    cancel: CancellationToken,
    room_cancel: CancellationToken,
    inbound: JoinHandle<()>,
    outbound: JoinHandle<()>,
) {
    tokio::select! {
        _ = cancel.cancelled() => {
            debug!(client_id = %client_id, "Client cancelled");
        }
        _ = room_cancel.cancelled() => {
            debug!(client_id = %client_id, "Room closed, tearing down client");
        }
    }

    cancel.cancel();
    let _ = inbound.await;
    let _ = outbound.await;
    room.unregister(client_id.clone()).await;
    debug!(client_id = %client_id, "Client closed");
}
