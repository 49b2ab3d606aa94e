use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use parley::{FrameSink, FrameStream, InboundFrame, SocketError};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Everything the mock write half recorded, in order.
#[derive(Debug, PartialEq)]
pub enum SinkEvent {
    Text(String),
    Flush,
    Ping,
    Close,
}

pub struct MockSink {
    events: mpsc::UnboundedSender<SinkEvent>,
    fail_writes: Arc<AtomicBool>,
}

#[async_trait]
impl FrameSink for MockSink {
    async fn feed_text(&mut self, text: String) -> Result<(), SocketError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SocketError::SendFailed("mock write failure".to_string()));
        }
        let _ = self.events.send(SinkEvent::Text(text));
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SocketError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SocketError::SendFailed("mock flush failure".to_string()));
        }
        let _ = self.events.send(SinkEvent::Flush);
        Ok(())
    }

    async fn send_ping(&mut self) -> Result<(), SocketError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SocketError::SendFailed("mock ping failure".to_string()));
        }
        let _ = self.events.send(SinkEvent::Ping);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        let _ = self.events.send(SinkEvent::Close);
        Ok(())
    }
}

pub struct MockStream {
    frames: mpsc::UnboundedReceiver<Result<InboundFrame, SocketError>>,
}

#[async_trait]
impl FrameStream for MockStream {
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, SocketError>> {
        self.frames.recv().await
    }
}

/// Test-side handles to one mocked connection: push inbound frames,
/// observe outbound sink events, flip writes into failure mode.
pub struct MockSocket {
    pub frames: mpsc::UnboundedSender<Result<InboundFrame, SocketError>>,
    pub events: mpsc::UnboundedReceiver<SinkEvent>,
    pub fail_writes: Arc<AtomicBool>,
}

pub fn mock_socket() -> (MockSocket, Box<dyn FrameSink>, Box<dyn FrameStream>) {
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let fail_writes = Arc::new(AtomicBool::new(false));

    let sink = MockSink {
        events: events_tx,
        fail_writes: fail_writes.clone(),
    };
    let stream = MockStream { frames: frames_rx };

    (
        MockSocket {
            frames: frames_tx,
            events: events_rx,
            fail_writes,
        },
        Box::new(sink),
        Box::new(stream),
    )
}
