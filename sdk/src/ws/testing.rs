//! In-memory transport for unit tests.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::WsError;
use super::transport::{Connector, TransportCommand, TransportEvent, TransportHandle};

/// Server side of one fake socket.
#[derive(Debug)]
pub(crate) struct FakeRemote {
    pub(crate) url: String,
    commands: Mutex<mpsc::UnboundedReceiver<TransportCommand>>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl FakeRemote {
    pub(crate) fn send_text(&self, text: &str) {
        let _ = self.events.send(TransportEvent::Text(text.to_string()));
    }

    pub(crate) fn send_json(&self, value: serde_json::Value) {
        self.send_text(&value.to_string());
    }

    pub(crate) fn send_error(&self, message: &str) {
        let _ = self.events.send(TransportEvent::Error(message.to_string()));
    }

    pub(crate) fn close(&self, code: Option<u16>) {
        let _ = self.events.send(TransportEvent::Closed { code });
    }

    /// Returns every command the client sent since the last call.
    pub(crate) fn drain_commands(&self) -> Vec<TransportCommand> {
        let mut rx = self.commands.lock().expect("commands lock");
        let mut out = Vec::new();
        while let Ok(command) = rx.try_recv() {
            out.push(command);
        }
        out
    }
}

/// Connector that records every connect and hands out fake sockets.
#[derive(Debug, Default)]
pub(crate) struct FakeConnector {
    delay: Duration,
    connects: AtomicUsize,
    failures_remaining: AtomicU32,
    drop_on_open: AtomicBool,
    remotes: Mutex<Vec<Arc<FakeRemote>>>,
}

impl FakeConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Makes the next `n` connects fail.
    pub(crate) fn fail_next(&self, n: u32) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Makes every later socket close with 1011 as soon as it opens.
    pub(crate) fn drop_on_open(&self) {
        self.drop_on_open.store(true, Ordering::SeqCst);
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn remote(&self, index: usize) -> Arc<FakeRemote> {
        let remotes = self.remotes.lock().expect("remotes lock");
        Arc::clone(remotes.get(index).expect("remote exists"))
    }

    pub(crate) fn socket_count(&self) -> usize {
        self.remotes.lock().expect("remotes lock").len()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, url: &str) -> Result<TransportHandle, WsError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.connects.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(WsError::Connection("connection refused".to_string()));
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        if self.drop_on_open.load(Ordering::SeqCst) {
            let _ = event_tx.send(TransportEvent::Closed { code: Some(1011) });
        }

        self.remotes
            .lock()
            .expect("remotes lock")
            .push(Arc::new(FakeRemote {
                url: url.to_string(),
                commands: Mutex::new(command_rx),
                events: event_tx,
            }));

        Ok(TransportHandle {
            commands: command_tx,
            events: event_rx,
        })
    }
}

/// Polls `condition` until it holds, failing the test after a second.
pub(crate) async fn eventually(condition: impl Fn() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached in time");
}
