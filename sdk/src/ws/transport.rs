//! Socket transport abstraction.
//!
//! The pool never touches a socket directly: a [`Connector`] opens one and
//! hands back a [`TransportHandle`], a pair of channels carrying outbound
//! commands and inbound events. [`TungsteniteConnector`] is the production
//! implementation; tests plug in an in-memory one.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::config::WsConfig;
use super::error::WsError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Commands sent to an open socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Send a text frame.
    Text(String),

    /// Close the socket.
    Close {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
}

/// Events received from an open socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame arrived.
    Text(String),

    /// A socket-level error occurred. A `Closed` event follows.
    Error(String),

    /// The socket closed. No further events are delivered.
    Closed {
        /// Close code, if the peer sent one.
        code: Option<u16>,
    },
}

/// Channel pair bound to one open socket.
#[derive(Debug)]
pub struct TransportHandle {
    /// Outbound commands.
    pub commands: mpsc::UnboundedSender<TransportCommand>,

    /// Inbound events.
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens sockets to the realtime endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a socket and resolves once it reaches the open state.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket fails before opening.
    async fn connect(&self, url: &str) -> Result<TransportHandle, WsError>;
}

/// Connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    connect_timeout: Duration,
    heartbeat_interval: Duration,
}

impl TungsteniteConnector {
    /// Creates a connector using the timeouts from the configuration.
    #[must_use]
    pub fn from_config(config: &WsConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            heartbeat_interval: config.heartbeat_interval,
        }
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<TransportHandle, WsError> {
        let (ws_stream, _) =
            tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(url))
                .await
                .map_err(|_| WsError::Connection("timed out waiting for socket open".to_string()))?
                .map_err(|e| WsError::Connection(e.to_string()))?;

        let (sink, source) = ws_stream.split();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(write_loop(sink, command_rx, self.heartbeat_interval));
        tokio::spawn(read_loop(source, event_tx));

        Ok(TransportHandle {
            commands: command_tx,
            events: event_rx,
        })
    }
}

/// Forwards commands to the socket and keeps it alive with pings.
async fn write_loop(
    mut sink: WsSink,
    mut commands: mpsc::UnboundedReceiver<TransportCommand>,
    heartbeat: Duration,
) {
    let heartbeat_enabled = !heartbeat.is_zero();
    let period = if heartbeat_enabled {
        heartbeat
    } else {
        Duration::from_secs(3600)
    };
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(TransportCommand::Text(text)) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        warn!("Failed to send frame: {}", e);
                        break;
                    }
                }
                Some(TransportCommand::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    debug!("Sent close frame with code {}", code);
                    break;
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            _ = ticker.tick(), if heartbeat_enabled => {
                if sink.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Forwards socket frames as transport events.
async fn read_loop(mut source: WsSource, events: mpsc::UnboundedSender<TransportEvent>) {
    let mut close_code = None;

    while let Some(result) = source.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if events
                    .send(TransportEvent::Text(text.as_str().to_owned()))
                    .is_err()
                {
                    return;
                }
            }
            Ok(Message::Close(frame)) => {
                close_code = frame.map(|f| u16::from(f.code));
                break;
            }
            Ok(_) => {}
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e.to_string()));
                break;
            }
        }
    }

    let _ = events.send(TransportEvent::Closed { code: close_code });
}
