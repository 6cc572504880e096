//! Leaderboard subscription facade.
//!
//! A [`LeaderboardSubscription`] gives one consumer a reactive view of a
//! game (leaderboard, activity feed, status, connectivity) backed by a
//! shared pooled socket. It resolves the credential, registers on the pool,
//! folds every frame into its own [`SubscriptionState`] and reconnects with
//! exponential backoff after abnormal closures.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::WsError;
use super::messages::{is_abnormal_closure, InboundFrame};
use super::pool::{next_subscriber_id, ConnectionPool, FrameCallback, PooledConnection, SubscriberId};
use super::reconnect::{ConnectionPhase, ReconnectPolicy, ReconnectState, RetryDecision};
use crate::credentials::{Credential, CredentialProvider};
use crate::types::{ActivityFeed, LeaderboardSnapshot, WinnerInfo};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reactive state exposed to a consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionState {
    /// Latest leaderboard snapshot.
    pub leaderboard: Option<LeaderboardSnapshot>,

    /// Most recent activity events, newest first.
    pub events: ActivityFeed,

    /// Current game status label.
    pub game_status: Option<String>,

    /// Last announced winner.
    pub winner: Option<WinnerInfo>,

    /// Whether the subscriber is registered on an open socket.
    pub is_connected: bool,

    /// Whether the first data is still pending.
    pub is_loading: bool,

    /// Local time of the last data frame.
    pub last_update: Option<DateTime<Utc>>,

    /// Error to surface to the user.
    pub error: Option<String>,

    /// Connection phase.
    pub phase: ConnectionPhase,
}

impl Default for SubscriptionState {
    fn default() -> Self {
        Self::new(ActivityFeed::default(), false)
    }
}

impl SubscriptionState {
    fn new(events: ActivityFeed, is_loading: bool) -> Self {
        Self {
            leaderboard: None,
            events,
            game_status: None,
            winner: None,
            is_connected: false,
            is_loading,
            last_update: None,
            error: None,
            phase: ConnectionPhase::Idle,
        }
    }

    /// Folds one frame into the state.
    pub fn apply(&mut self, frame: &InboundFrame) {
        match frame {
            InboundFrame::LeaderboardUpdate { .. } => {
                self.leaderboard = frame.to_snapshot();
                self.is_loading = false;
                self.last_update = Some(Utc::now());
            }
            InboundFrame::ActivityEvent { event } => {
                self.events.push(event.clone());
                self.last_update = Some(Utc::now());
            }
            InboundFrame::GameStateChanged {
                new_state, winner, ..
            } => {
                self.game_status = Some(new_state.clone());
                if let Some(winner) = winner {
                    self.winner = Some(winner.clone());
                }
                self.last_update = Some(Utc::now());
            }
            InboundFrame::Subscribed { .. } => {
                self.is_loading = false;
            }
            InboundFrame::Error { message } => {
                self.error = Some(message.clone());
                self.is_loading = false;
            }
            InboundFrame::ConnectionLost { .. } => {
                self.is_connected = false;
            }
        }
    }
}

/// Where a subscription gets its credential from.
#[derive(Clone)]
pub enum CredentialSource {
    /// A per-session signed token; opens a user connection.
    Session(String),

    /// A per-device public token from a provider; opens a public connection.
    Public {
        /// Provider that caches or mints the token.
        provider: Arc<dyn CredentialProvider>,
        /// Device id to mint with, if known.
        device_id: Option<String>,
    },
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(_) => write!(f, "CredentialSource::Session(..)"),
            Self::Public { device_id, .. } => f
                .debug_struct("CredentialSource::Public")
                .field("device_id", device_id)
                .finish(),
        }
    }
}

impl CredentialSource {
    async fn resolve(&self) -> Result<Credential, WsError> {
        match self {
            Self::Session(token) => Ok(Credential::Session(token.clone())),
            Self::Public {
                provider,
                device_id,
            } => provider
                .get_or_create(device_id.as_deref())
                .await
                .map(Credential::Public)
                .map_err(|e| WsError::NoCredential(e.to_string())),
        }
    }
}

struct Shared {
    id: SubscriberId,
    pool: ConnectionPool,
    state: watch::Sender<SubscriptionState>,
    cancelled: AtomicBool,
    registration: Mutex<Option<Arc<PooledConnection>>>,
}

/// How one registration on a socket ended.
enum Registration {
    /// Registered; resolves with the close code once the socket goes away.
    Active(mpsc::UnboundedReceiver<Option<u16>>),
    /// The socket closed between acquire and registration.
    Raced,
    /// The subscription was cancelled.
    Cancelled,
}

impl Shared {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn update(&self, f: impl FnOnce(&mut SubscriptionState)) {
        self.state.send_modify(f);
    }

    fn callback(self: &Arc<Self>, lost: mpsc::UnboundedSender<Option<u16>>) -> FrameCallback {
        let shared: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |frame: &InboundFrame| {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            if shared.is_cancelled() {
                return;
            }
            shared.update(|state| state.apply(frame));
            if let InboundFrame::ConnectionLost { code } = frame {
                let _ = lost.send(*code);
            }
        })
    }

    /// Registers on an acquired connection unless cancelled meanwhile.
    fn register(
        self: &Arc<Self>,
        connection: Arc<PooledConnection>,
        reconnect: &mut ReconnectState,
    ) -> Registration {
        let mut registration = lock(&self.registration);

        if self.is_cancelled() {
            drop(registration);
            self.pool.release_if_unused(&connection);
            return Registration::Cancelled;
        }

        let phase = reconnect.on_open();
        self.update(|state| {
            state.is_connected = true;
            state.error = None;
            state.phase = phase;
        });

        let (lost_tx, lost_rx) = mpsc::unbounded_channel();
        match self
            .pool
            .add_subscriber(&connection, self.id, self.callback(lost_tx))
        {
            Ok(()) => {
                debug!("Subscriber {} registered on {}", self.id, connection.key());
                *registration = Some(connection);
                Registration::Active(lost_rx)
            }
            Err(_) => {
                self.update(|state| state.is_connected = false);
                Registration::Raced
            }
        }
    }

    /// Connects, stays registered while the socket lives and retries after
    /// abnormal closures until cancelled or out of attempts.
    async fn supervise(self: Arc<Self>, game_id: String, source: CredentialSource) {
        let policy = ReconnectPolicy::from_config(self.pool.config());
        let mut reconnect = ReconnectState::new(policy);

        loop {
            if self.is_cancelled() {
                return;
            }

            let phase = reconnect.on_connect_started();
            self.update(|state| state.phase = phase);

            let failure = match self.connect(&game_id, &source).await {
                Ok(connection) => match self.register(connection, &mut reconnect) {
                    Registration::Active(mut lost) => {
                        let Some(code) = lost.recv().await else {
                            return;
                        };
                        lock(&self.registration).take();

                        if !is_abnormal_closure(code) {
                            let phase = reconnect.on_normal_close();
                            self.update(|state| state.phase = phase);
                            info!("Subscription {} to {} closed normally", self.id, game_id);
                            return;
                        }
                        warn!(
                            "Subscription {} to {} lost its socket (code {:?})",
                            self.id, game_id, code
                        );
                        None
                    }
                    Registration::Raced => continue,
                    Registration::Cancelled => return,
                },
                Err(e) => Some(e),
            };

            if let Some(e) = &failure {
                warn!("Subscription {} to {} failed: {}", self.id, game_id, e);
                let message = e.to_string();
                self.update(|state| state.error = Some(message));
            }

            match reconnect.on_failure() {
                RetryDecision::Retry { attempt, delay } => {
                    info!(
                        "Reconnecting subscription {} to {} (attempt {} in {:?})",
                        self.id, game_id, attempt, delay
                    );
                    self.update(|state| state.phase = reconnect.phase());
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp { attempts } => {
                    warn!(
                        "Subscription {} to {} gave up after {} attempts",
                        self.id, game_id, attempts
                    );
                    let message = WsError::ReconnectExhausted { attempts }.to_string();
                    self.update(|state| {
                        state.is_connected = false;
                        state.is_loading = false;
                        state.error = Some(message);
                        state.phase = ConnectionPhase::Failed;
                    });
                    return;
                }
            }
        }
    }

    async fn connect(
        &self,
        game_id: &str,
        source: &CredentialSource,
    ) -> Result<Arc<PooledConnection>, WsError> {
        let credential = source.resolve().await?;
        self.pool.acquire(game_id, &credential).await
    }
}

/// One consumer's live view of a game.
///
/// Dropping the subscription unsubscribes it.
pub struct LeaderboardSubscription {
    shared: Arc<Shared>,
    game_id: Option<String>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for LeaderboardSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaderboardSubscription")
            .field("id", &self.shared.id)
            .field("game_id", &self.game_id)
            .field("phase", &self.shared.state.borrow().phase)
            .finish()
    }
}

impl LeaderboardSubscription {
    /// Starts a subscription. Without a game id it stays idle and never
    /// connects.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(pool: ConnectionPool, game_id: Option<String>, source: CredentialSource) -> Self {
        let game_id = game_id.filter(|id| !id.is_empty());
        let feed = ActivityFeed::with_capacity(pool.config().feed_capacity);
        let (state, _) = watch::channel(SubscriptionState::new(feed, game_id.is_some()));

        let shared = Arc::new(Shared {
            id: next_subscriber_id(),
            pool,
            state,
            cancelled: AtomicBool::new(false),
            registration: Mutex::new(None),
        });

        let task = game_id.clone().map(|game| {
            debug!("Subscription {} starting for {} ({:?})", shared.id, game, source);
            tokio::spawn(Arc::clone(&shared).supervise(game, source))
        });

        Self {
            shared,
            game_id,
            task: Mutex::new(task),
        }
    }

    /// Returns this subscriber's id.
    #[must_use]
    pub fn subscriber_id(&self) -> SubscriberId {
        self.shared.id
    }

    /// Returns the game being followed, if any.
    #[must_use]
    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref()
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        self.shared.state.borrow().clone()
    }

    /// Returns a receiver notified after every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SubscriptionState> {
        self.shared.state.subscribe()
    }

    /// Dismisses the current error.
    pub fn clear_error(&self) {
        self.shared.update(|state| state.error = None);
    }

    /// Returns true once unsubscribed.
    #[must_use]
    pub fn is_unsubscribed(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Deregisters from the pool and stops reconnecting. Idempotent.
    ///
    /// Data already received stays in the state.
    pub fn unsubscribe(&self) {
        if self.shared.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        let connection = lock(&self.shared.registration).take();
        if let Some(connection) = connection {
            self.shared.pool.remove_subscriber(&connection, self.shared.id);
        }

        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }

        self.shared.update(|state| {
            state.is_connected = false;
            state.is_loading = false;
            state.phase = ConnectionPhase::Idle;
        });
        debug!("Subscription {} unsubscribed", self.shared.id);
    }
}

impl Drop for LeaderboardSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
