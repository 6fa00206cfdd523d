//! Connection to the voting server
//!
//! A `Connector` opens one logical connection and hands back its two halves.
//! `run_link` owns those halves for the lifetime of the connection and talks
//! to the runtime only through channels.

mod ws;

pub use ws::WsConnector;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("not connected to the voting server")]
    NotConnected,
    #[error("could not connect: {0}")]
    Connect(String),
    #[error("connection closed: {0}")]
    Closed(String),
    #[error("websocket error: {0}")]
    Protocol(String),
}

/// Outbound half of a connection
#[async_trait]
pub trait FrameSender: Send {
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Best-effort graceful close
    async fn close(&mut self);
}

/// Inbound half of a connection
#[async_trait]
pub trait FrameReceiver: Send {
    /// Next text frame. `None` once the peer has closed the connection.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;
}

pub type Link = (Box<dyn FrameSender>, Box<dyn FrameReceiver>);

/// Opens connections to the voting server
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Link, TransportError>;
}

#[async_trait]
impl<T: Connector + ?Sized> Connector for Arc<T> {
    async fn connect(&self) -> Result<Link, TransportError> {
        (**self).connect().await
    }
}

// ============================================================================
// Connection pump
// ============================================================================

/// Reported by a running link. `generation` tells apart links that have
/// since been replaced.
#[derive(Debug)]
pub enum LinkEvent {
    Established {
        generation: u64,
        outbound: mpsc::UnboundedSender<String>,
    },
    Frame {
        generation: u64,
        text: String,
    },
    Closed {
        generation: u64,
        reason: String,
    },
    Failed {
        generation: u64,
        error: TransportError,
    },
}

impl LinkEvent {
    pub fn generation(&self) -> u64 {
        match self {
            LinkEvent::Established { generation, .. }
            | LinkEvent::Frame { generation, .. }
            | LinkEvent::Closed { generation, .. }
            | LinkEvent::Failed { generation, .. } => *generation,
        }
    }
}

/// Connect, then shuttle frames both ways until either side closes or
/// `cancel` fires. Always ends with exactly one `Closed` or `Failed`, unless
/// cancelled.
pub async fn run_link<C: Connector + ?Sized>(
    connector: &C,
    generation: u64,
    events: mpsc::Sender<LinkEvent>,
    cancel: CancellationToken,
) {
    let connected = tokio::select! {
        () = cancel.cancelled() => return,
        result = connector.connect() => result,
    };

    let (mut sender, mut receiver) = match connected {
        Ok(link) => link,
        Err(error) => {
            tracing::debug!(generation, %error, "Connect failed");
            let _ = events.send(LinkEvent::Failed { generation, error }).await;
            return;
        }
    };

    let (outbound, mut outbound_rx) = mpsc::unbounded_channel();
    if events
        .send(LinkEvent::Established {
            generation,
            outbound,
        })
        .await
        .is_err()
    {
        sender.close().await;
        return;
    }

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!(generation, "Link cancelled, closing");
                sender.close().await;
                return;
            }

            Some(frame) = outbound_rx.recv() => {
                if let Err(error) = sender.send(frame).await {
                    tracing::warn!(generation, %error, "Send failed, dropping connection");
                    let _ = events
                        .send(LinkEvent::Closed { generation, reason: error.to_string() })
                        .await;
                    return;
                }
            }

            inbound = receiver.recv() => {
                let closed = match inbound {
                    Some(Ok(text)) => {
                        if events.send(LinkEvent::Frame { generation, text }).await.is_err() {
                            sender.close().await;
                            return;
                        }
                        continue;
                    }
                    Some(Err(error)) => error.to_string(),
                    None => "server closed the connection".to_string(),
                };
                let _ = events
                    .send(LinkEvent::Closed { generation, reason: closed })
                    .await;
                return;
            }
        }
    }
}
