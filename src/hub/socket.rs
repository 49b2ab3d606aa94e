use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream, StreamExt};
use futures::SinkExt;

/// A single inbound frame, reduced to what the hub cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// A text payload from the peer.
    Text(String),
    /// Control-frame activity (ping/pong). Carries no payload but counts
    /// as proof of life for the read deadline.
    Pong,
    /// The peer requested an orderly close.
    Close,
}

#[derive(Debug)]
pub enum SocketError {
    ConnectionClosed,
    SendFailed(String),
    ReceiveFailed(String),
}

/// Write half of a connection - all the outbound pump needs.
///
/// `feed_text` queues a frame without flushing so several queued messages
/// can be pushed in one transport write; callers must `flush` to finish
/// the burst.
#[async_trait]
pub trait FrameSink: Send {
    async fn feed_text(&mut self, text: String) -> Result<(), SocketError>;

    async fn flush(&mut self) -> Result<(), SocketError>;

    /// Send a liveness probe frame.
    async fn send_ping(&mut self) -> Result<(), SocketError>;

    /// Close the connection.
    async fn close(&mut self) -> Result<(), SocketError>;
}

/// Read half of a connection (None once the peer is gone).
#[async_trait]
pub trait FrameStream: Send {
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, SocketError>>;
}

/// Direct implementation on the write half of axum's WebSocket
#[async_trait]
impl FrameSink for SplitSink<WebSocket, Message> {
    async fn feed_text(&mut self, text: String) -> Result<(), SocketError> {
        self.feed(Message::Text(text))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn flush(&mut self) -> Result<(), SocketError> {
        SinkExt::flush(self)
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn send_ping(&mut self) -> Result<(), SocketError> {
        self.send(Message::Ping(Vec::new()))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

/// Direct implementation on the read half of axum's WebSocket
#[async_trait]
impl FrameStream for SplitStream<WebSocket> {
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, SocketError>> {
        match self.next().await {
            Some(Ok(Message::Text(text))) => Some(Ok(InboundFrame::Text(text))),
            // axum answers pings automatically; both directions of
            // control traffic count as peer activity
            Some(Ok(Message::Pong(_))) | Some(Ok(Message::Ping(_))) => Some(Ok(InboundFrame::Pong)),
            Some(Ok(Message::Close(_))) => Some(Ok(InboundFrame::Close)),
            Some(Ok(Message::Binary(_))) => Some(Err(SocketError::ReceiveFailed(
                "unexpected binary frame".to_string(),
            ))),
            Some(Err(e)) => Some(Err(SocketError::ReceiveFailed(e.to_string()))),
            None => None,
        }
    }
}
