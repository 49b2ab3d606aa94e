use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use parley::room::repository::InMemoryRoomRepository;
use parley::room::service::RoomService;
use parley::{ChatMessage, Client, ClientHandle, HubConfig, RoomHandle, RoomRegistry, UserIdentity};

use super::mocks::{mock_socket, MockSocket, SinkEvent};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestClient {
    pub socket: MockSocket,
    handle: Option<ClientHandle>,
}

/// A room created through the real allocation path with a set of
/// participants attached over mocked connections.
pub struct TestSetup {
    pub registry: RoomRegistry,
    pub room: RoomHandle,
    pub room_id: String,
    clients: HashMap<String, TestClient>,
}

pub struct TestSetupBuilder {
    participants: Vec<String>,
    hub_config: HubConfig,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            participants: vec![],
            hub_config: HubConfig::default(),
        }
    }

    pub fn with_participants(mut self, participants: Vec<&str>) -> Self {
        self.participants = participants.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_two_participants(self) -> Self {
        self.with_participants(vec!["alice", "bob"])
    }

    pub async fn build(self) -> TestSetup {
        let registry = RoomRegistry::new();
        let service = RoomService::new(Arc::new(InMemoryRoomRepository::new()), registry.clone());

        let room_id = service.create_room().await.expect("room creation").id;
        let room = service.resolve_room(&room_id).await.expect("room lookup");

        let mut clients = HashMap::new();
        for name in self.participants {
            let (socket, sink, stream) = mock_socket();
            let identity = UserIdentity {
                user_id: format!("{name}-uuid"),
                username: name.clone(),
            };
            let handle = Client::new(
                room.clone(),
                identity,
                sink,
                stream,
                self.hub_config.clone(),
            )
            .start()
            .await
            .expect("client start");

            clients.insert(
                name,
                TestClient {
                    socket,
                    handle: Some(handle),
                },
            );
        }

        TestSetup {
            registry,
            room,
            room_id,
            clients,
        }
    }
}

impl TestSetup {
    fn client_mut(&mut self, name: &str) -> &mut TestClient {
        self.clients
            .get_mut(name)
            .unwrap_or_else(|| panic!("unknown participant: {name}"))
    }

    /// Pushes a chat frame into the named participant's connection, as
    /// if the peer had typed it.
    pub fn send_chat(&mut self, name: &str, body: &str) {
        let frame = serde_json::to_string(&parley::ChatFrame {
            body: body.to_string(),
        })
        .unwrap();
        self.client_mut(name)
            .socket
            .frames
            .send(Ok(parley::InboundFrame::Text(frame)))
            .expect("client connection already closed");
    }

    /// Waits for the next chat message written to the named
    /// participant's connection, skipping pings and flush markers.
    pub async fn expect_chat(&mut self, name: &str) -> ChatMessage {
        let client = self.client_mut(name);
        timeout(Duration::from_secs(2), async {
            loop {
                match client.socket.events.recv().await {
                    Some(SinkEvent::Text(text)) => {
                        return serde_json::from_str::<ChatMessage>(&text)
                            .expect("outbound frame was not a chat message")
                    }
                    Some(SinkEvent::Ping) | Some(SinkEvent::Flush) => {}
                    Some(SinkEvent::Close) | None => panic!("connection closed while waiting"),
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("{name} never received a chat message"))
    }

    /// Drains everything recorded on the named participant's connection
    /// so far and returns the chat messages among it.
    pub fn drain_chats(&mut self, name: &str) -> Vec<ChatMessage> {
        let client = self.client_mut(name);
        let mut messages = Vec::new();
        while let Ok(event) = client.socket.events.try_recv() {
            if let SinkEvent::Text(text) = event {
                if let Ok(message) = serde_json::from_str::<ChatMessage>(&text) {
                    messages.push(message);
                }
            }
        }
        messages
    }

    /// Makes every further write on the named participant's connection
    /// fail, as a permanently stalled or broken transport would.
    pub fn break_writes(&mut self, name: &str) {
        self.client_mut(name)
            .socket
            .fail_writes
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Simulates an abnormal peer failure (socket reset) and waits for
    /// the client to finish tearing down.
    pub async fn disconnect_abnormally(&mut self, name: &str) {
        let client = self.client_mut(name);
        let _ = client.socket.frames.send(Err(parley::SocketError::ReceiveFailed(
            "connection reset".to_string(),
        )));
        let handle = client.handle.take().expect("client already disconnected");
        timeout(Duration::from_secs(2), handle.closed())
            .await
            .expect("client did not tear down after socket reset");
    }

    /// Waits for the named participant to reach terminal teardown.
    pub async fn wait_closed(&mut self, name: &str) {
        if let Some(handle) = self.client_mut(name).handle.take() {
            timeout(Duration::from_secs(2), handle.closed())
                .await
                .expect("client did not reach teardown in time");
        }
    }
}
