//! Shared realtime connection pool.
//!
//! Guarantees at most one live socket per [`ConnectionKey`] and fans every
//! inbound frame out to all subscribers registered on that socket. A socket
//! is torn down when its last subscriber leaves (normal closure) or when the
//! peer closes it, in which case subscribers receive a synthetic
//! [`InboundFrame::ConnectionLost`] and the entry is dropped so the next
//! [`ConnectionPool::acquire`] opens a fresh socket.
//!
//! Opening is single-flight: concurrent acquires for the same key before
//! the socket opens all wait on the same attempt.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, error, info, warn};

use super::config::WsConfig;
use super::error::WsError;
use super::messages::{ClientMessage, InboundFrame, NORMAL_CLOSURE};
use super::metrics::PoolMetrics;
use super::transport::{
    Connector, TransportCommand, TransportEvent, TransportHandle, TungsteniteConnector,
};
use crate::credentials::{Credential, CredentialKind};

/// Identifier of a registered subscriber.
pub type SubscriberId = u64;

/// Callback invoked with every frame delivered to a subscriber.
pub type FrameCallback = Arc<dyn Fn(&InboundFrame) + Send + Sync>;

/// Global subscriber ID counter.
static SUBSCRIBER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a process-unique subscriber ID.
#[must_use]
pub fn next_subscriber_id() -> SubscriberId {
    SUBSCRIBER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Identifies one shareable socket: a game plus the credential used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    game_id: String,
    kind: CredentialKind,
    credential_prefix: String,
}

impl ConnectionKey {
    /// Derives the key for a game and credential.
    #[must_use]
    pub fn new(game_id: impl Into<String>, credential: &Credential) -> Self {
        Self {
            game_id: game_id.into(),
            kind: credential.kind(),
            credential_prefix: credential.prefix().to_string(),
        }
    }

    /// Returns the game id.
    #[must_use]
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Returns the credential prefix.
    #[must_use]
    pub fn credential_prefix(&self) -> &str {
        &self.credential_prefix
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.game_id, self.kind)
    }
}

/// Most recent state-bearing frames, replayed to late subscribers.
#[derive(Debug, Default)]
struct ReplayCache {
    subscribed: Option<InboundFrame>,
    leaderboard: Option<InboundFrame>,
    game_state: Option<InboundFrame>,
}

impl ReplayCache {
    fn record(&mut self, frame: &InboundFrame) {
        match frame {
            InboundFrame::Subscribed { .. } => self.subscribed = Some(frame.clone()),
            InboundFrame::LeaderboardUpdate { .. } => self.leaderboard = Some(frame.clone()),
            InboundFrame::GameStateChanged { .. } => self.game_state = Some(frame.clone()),
            _ => {}
        }
    }

    fn frames(&self) -> Vec<InboundFrame> {
        [&self.subscribed, &self.leaderboard, &self.game_state]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }
}

struct SubscriberSet {
    open: bool,
    callbacks: BTreeMap<SubscriberId, FrameCallback>,
    replay: ReplayCache,
}

/// One live socket shared by every subscriber of its key.
pub struct PooledConnection {
    key: ConnectionKey,
    commands: mpsc::UnboundedSender<TransportCommand>,
    subscribers: Mutex<SubscriberSet>,
    /// Serializes callback invocation so replay and live frames never interleave.
    delivery: Mutex<()>,
    metrics: Arc<PoolMetrics>,
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("key", &self.key)
            .field("open", &self.is_open())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl PooledConnection {
    fn new(
        key: ConnectionKey,
        commands: mpsc::UnboundedSender<TransportCommand>,
        metrics: Arc<PoolMetrics>,
    ) -> Self {
        Self {
            key,
            commands,
            subscribers: Mutex::new(SubscriberSet {
                open: true,
                callbacks: BTreeMap::new(),
                replay: ReplayCache::default(),
            }),
            delivery: Mutex::new(()),
            metrics,
        }
    }

    /// Returns the pool key.
    #[must_use]
    pub const fn key(&self) -> &ConnectionKey {
        &self.key
    }

    /// Returns the game this socket is subscribed to.
    #[must_use]
    pub fn game_id(&self) -> &str {
        self.key.game_id()
    }

    /// Returns true while the socket is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        lock(&self.subscribers).open
    }

    /// Returns the number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).callbacks.len()
    }

    /// Returns true if the subscriber is registered.
    #[must_use]
    pub fn has_subscriber(&self, id: SubscriberId) -> bool {
        lock(&self.subscribers).callbacks.contains_key(&id)
    }

    fn add(&self, id: SubscriberId, callback: FrameCallback) -> Result<(), WsError> {
        let _delivery = lock(&self.delivery);

        let replay = {
            let mut set = lock(&self.subscribers);
            if !set.open {
                return Err(WsError::Closed);
            }
            if set.callbacks.insert(id, Arc::clone(&callback)).is_none() {
                self.metrics.record_subscriber_added();
            }
            set.replay.frames()
        };

        debug!("Subscriber {} added to {}", id, self.key);

        for frame in &replay {
            self.deliver(id, &callback, frame);
        }
        Ok(())
    }

    /// Removes a subscriber; returns true if that closed the socket.
    fn remove(&self, id: SubscriberId) -> bool {
        let mut set = lock(&self.subscribers);
        if set.callbacks.remove(&id).is_none() {
            return false;
        }
        self.metrics.record_subscriber_removed();
        debug!("Subscriber {} removed from {}", id, self.key);

        self.close_if_unused(set)
    }

    /// Closes the socket with a normal closure if nobody is registered.
    fn close_if_unused(&self, mut set: MutexGuard<'_, SubscriberSet>) -> bool {
        if !set.callbacks.is_empty() || !set.open {
            return false;
        }

        set.open = false;
        drop(set);

        let _ = self.commands.send(TransportCommand::Close {
            code: NORMAL_CLOSURE,
            reason: "no subscribers".to_string(),
        });
        self.metrics.record_socket_closed();
        info!("Closed socket for {}: no subscribers left", self.key);
        true
    }

    fn dispatch(&self, frame: &InboundFrame) {
        let _delivery = lock(&self.delivery);

        let callbacks: Vec<(SubscriberId, FrameCallback)> = {
            let mut set = lock(&self.subscribers);
            set.replay.record(frame);
            set.callbacks
                .iter()
                .map(|(id, callback)| (*id, Arc::clone(callback)))
                .collect()
        };

        for (id, callback) in &callbacks {
            self.deliver(*id, callback, frame);
        }
    }

    /// Marks the socket closed and hands every subscriber a
    /// `connection_lost` frame.
    fn terminate(&self, code: Option<u16>, send_close: bool) {
        let _delivery = lock(&self.delivery);

        let (was_open, callbacks) = {
            let mut set = lock(&self.subscribers);
            let was_open = std::mem::replace(&mut set.open, false);
            (was_open, std::mem::take(&mut set.callbacks))
        };

        if was_open {
            if send_close {
                let _ = self.commands.send(TransportCommand::Close {
                    code: code.unwrap_or(NORMAL_CLOSURE),
                    reason: "pool shutdown".to_string(),
                });
            }
            self.metrics.record_socket_closed();
        }

        let frame = InboundFrame::ConnectionLost { code };
        for (id, callback) in &callbacks {
            self.metrics.record_subscriber_removed();
            self.deliver(*id, callback, &frame);
        }
    }

    fn deliver(&self, id: SubscriberId, callback: &FrameCallback, frame: &InboundFrame) {
        if catch_unwind(AssertUnwindSafe(|| callback(frame))).is_err() {
            self.metrics.record_callback_panic();
            error!(
                "Subscriber {} callback panicked on {} frame",
                id,
                frame.kind()
            );
        }
    }
}

/// Why a slot did not yield a connection.
enum SlotError {
    /// The open failed; the slot is already gone.
    Failed(WsError),
    /// The slot was removed while this acquirer waited on it.
    Superseded,
}

#[derive(Default)]
struct PoolSlot {
    connection: OnceCell<Arc<PooledConnection>>,
}

struct PoolInner {
    config: WsConfig,
    connector: Arc<dyn Connector>,
    slots: Mutex<HashMap<ConnectionKey, Arc<PoolSlot>>>,
    metrics: Arc<PoolMetrics>,
}

impl PoolInner {
    /// Returns the slot for a key, replacing one whose socket has closed.
    fn slot_for(&self, key: &ConnectionKey) -> Arc<PoolSlot> {
        let mut slots = lock(&self.slots);
        let stale = slots
            .get(key)
            .and_then(|slot| slot.connection.get())
            .is_some_and(|connection| !connection.is_open());
        if stale {
            slots.remove(key);
        }
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    fn owns_slot(&self, key: &ConnectionKey, slot: &Arc<PoolSlot>) -> bool {
        lock(&self.slots)
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    fn remove_slot(&self, key: &ConnectionKey, slot: &Arc<PoolSlot>) {
        let mut slots = lock(&self.slots);
        if slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(key);
        }
    }

    /// Initialises a slot's connection.
    ///
    /// A failed open removes the slot before the cell is released, and a
    /// waiter that then gets to run the init on a removed slot backs out,
    /// so only a slot in the map can ever hold a socket.
    async fn open_slot(
        self: &Arc<Self>,
        key: &ConnectionKey,
        slot: &Arc<PoolSlot>,
        credential: &Credential,
    ) -> Result<Arc<PooledConnection>, SlotError> {
        if !self.owns_slot(key, slot) {
            return Err(SlotError::Superseded);
        }
        self.open(key, credential).await.map_err(|e| {
            self.remove_slot(key, slot);
            SlotError::Failed(e)
        })
    }

    fn evict(&self, connection: &Arc<PooledConnection>) {
        let mut slots = lock(&self.slots);
        let owned = slots
            .get(connection.key())
            .and_then(|slot| slot.connection.get())
            .is_some_and(|current| Arc::ptr_eq(current, connection));
        if owned {
            slots.remove(connection.key());
        }
    }

    async fn open(
        self: &Arc<Self>,
        key: &ConnectionKey,
        credential: &Credential,
    ) -> Result<Arc<PooledConnection>, WsError> {
        debug!("Opening socket for {}", key);

        let url = self.config.connection_url(credential.token())?;
        let TransportHandle { commands, events } = match self.connector.connect(&url).await {
            Ok(handle) => handle,
            Err(e) => {
                self.metrics.record_connect_failure();
                warn!("Failed to open socket for {}: {}", key, e);
                return Err(e);
            }
        };

        let handshake = serde_json::to_string(&ClientMessage::subscribe(key.game_id()))
            .map_err(|e| WsError::Serialization(e.to_string()))?;
        if commands.send(TransportCommand::Text(handshake)).is_err() {
            self.metrics.record_connect_failure();
            return Err(WsError::SendFailed(
                "socket closed before subscribe handshake".to_string(),
            ));
        }

        self.metrics.record_socket_opened();
        let connection = Arc::new(PooledConnection::new(
            key.clone(),
            commands,
            Arc::clone(&self.metrics),
        ));

        tokio::spawn(read_frames(
            Arc::clone(&connection),
            events,
            Arc::downgrade(self),
        ));

        info!("Socket opened for {}", key);
        Ok(connection)
    }
}

/// Decodes inbound events and fans frames out until the socket closes.
async fn read_frames(
    connection: Arc<PooledConnection>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    pool: Weak<PoolInner>,
) {
    let mut close_code = None;

    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Text(text) => {
                connection.metrics.record_frame_received();
                match serde_json::from_str::<InboundFrame>(&text) {
                    Ok(frame) => connection.dispatch(&frame),
                    Err(e) => {
                        connection.metrics.record_frame_dropped();
                        warn!("Dropping malformed frame on {}: {}", connection.key, e);
                    }
                }
            }
            TransportEvent::Error(e) => {
                warn!("Socket error on {}: {}", connection.key, e);
            }
            TransportEvent::Closed { code } => {
                close_code = code;
                break;
            }
        }
    }

    info!("Socket for {} closed (code {:?})", connection.key, close_code);

    if let Some(pool) = pool.upgrade() {
        pool.evict(&connection);
    }
    connection.terminate(close_code, false);
}

/// Process-wide registry of shared realtime sockets.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("url", &self.inner.config.url)
            .field("connections", &self.connection_count())
            .finish()
    }
}

impl ConnectionPool {
    /// Creates a pool that opens sockets through the given connector.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: WsConfig, connector: Arc<dyn Connector>) -> Result<Self, WsError> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                connector,
                slots: Mutex::new(HashMap::new()),
                metrics: Arc::new(PoolMetrics::new()),
            }),
        })
    }

    /// Creates a pool backed by `tokio-tungstenite`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_tungstenite(config: WsConfig) -> Result<Self, WsError> {
        let connector = Arc::new(TungsteniteConnector::from_config(&config));
        Self::new(config, connector)
    }

    /// Returns the pool configuration.
    #[must_use]
    pub fn config(&self) -> &WsConfig {
        &self.inner.config
    }

    /// Returns the pool metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<PoolMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Returns an open socket for the game and credential, opening one if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::NoCredential`] for a blank credential, the
    /// connector's error if the socket fails before opening, or
    /// [`WsError::Closed`] if sockets keep closing as they open.
    pub async fn acquire(
        &self,
        game_id: &str,
        credential: &Credential,
    ) -> Result<Arc<PooledConnection>, WsError> {
        if credential.is_empty() {
            return Err(WsError::NoCredential("credential token is empty".to_string()));
        }
        if game_id.is_empty() {
            return Err(WsError::InvalidConfig("game id cannot be empty".to_string()));
        }

        let key = ConnectionKey::new(game_id, credential);
        let mut closed_once = false;

        loop {
            let slot = self.inner.slot_for(&key);
            let result = slot
                .connection
                .get_or_try_init(|| self.inner.open_slot(&key, &slot, credential))
                .await;

            match result {
                Ok(connection) if connection.is_open() => return Ok(Arc::clone(connection)),
                Ok(_) => {
                    self.inner.remove_slot(&key, &slot);
                    if closed_once {
                        return Err(WsError::Closed);
                    }
                    closed_once = true;
                }
                Err(SlotError::Superseded) => {}
                Err(SlotError::Failed(e)) => return Err(e),
            }
        }
    }

    /// Registers a subscriber callback on a connection.
    ///
    /// Frames cached on the connection are replayed to the new callback
    /// before any later frame.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::Closed`] if the socket closed after it was
    /// acquired.
    pub fn add_subscriber(
        &self,
        connection: &Arc<PooledConnection>,
        id: SubscriberId,
        callback: FrameCallback,
    ) -> Result<(), WsError> {
        connection.add(id, callback)
    }

    /// Deregisters a subscriber. Closes the socket with a normal closure
    /// and forgets the connection when it was the last one.
    pub fn remove_subscriber(&self, connection: &Arc<PooledConnection>, id: SubscriberId) {
        if connection.remove(id) {
            self.inner.evict(connection);
        }
    }

    /// Closes a connection that ended up with no subscribers, e.g. when the
    /// subscriber that acquired it was cancelled before registering.
    pub fn release_if_unused(&self, connection: &Arc<PooledConnection>) {
        if connection.close_if_unused(lock(&connection.subscribers)) {
            self.inner.evict(connection);
        }
    }

    /// Returns the live connection for a game and credential, if any.
    #[must_use]
    pub fn connection(&self, game_id: &str, credential: &Credential) -> Option<Arc<PooledConnection>> {
        let key = ConnectionKey::new(game_id, credential);
        lock(&self.inner.slots)
            .get(&key)
            .and_then(|slot| slot.connection.get())
            .filter(|connection| connection.is_open())
            .cloned()
    }

    /// Returns the number of live connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        lock(&self.inner.slots)
            .values()
            .filter_map(|slot| slot.connection.get())
            .filter(|connection| connection.is_open())
            .count()
    }

    /// Closes every socket with a normal closure and empties the pool.
    pub fn shutdown(&self) {
        let slots: Vec<Arc<PoolSlot>> = lock(&self.inner.slots).drain().map(|(_, slot)| slot).collect();

        let mut closed = 0;
        for slot in slots {
            if let Some(connection) = slot.connection.get() {
                connection.terminate(Some(NORMAL_CLOSURE), true);
                closed += 1;
            }
        }

        info!("Connection pool shut down, {} sockets closed", closed);
    }
}
