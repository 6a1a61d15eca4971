//! services/api/src/session/mod.rs
//!
//! The owner of the single messaging-platform session.
//!
//! Every operation that mutates the session (connect, reopen, disconnect, delete,
//! applying a platform event) runs under one async mutex, so overlapping HTTP
//! requests and platform callbacks can never interleave mid-transition. Platform
//! callbacks arrive as `SessionEvent`s on a channel and are applied by a single
//! event loop (see `dispatch`). Each handle the manager opens gets a new
//! generation number; events stamped with an older generation are dropped.

pub mod dispatch;
pub mod pairing;
pub mod reconnect;
pub mod status;

use outreach_core::domain::{InboundMessage, LaunchOptions, QrCode};
use outreach_core::ports::{
    EventSink, MessagingPlatform, PlatformEvent, PlatformHandle, PortError, PortResult,
    SessionEvent,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use dispatch::{run_event_loop, SessionObserver};
pub use status::{classify_status, LostReason, SessionSnapshot, SessionState, StatusClass};

//=========================================================================================
// Configuration
//=========================================================================================

/// Limits for the interactive (user-initiated) pairing flow.
#[derive(Debug, Clone, Copy)]
pub struct PairingPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    /// Wait before each reopen of a session lost mid-pairing.
    pub retry_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub launch: LaunchOptions,
    /// The on-disk credential directory of the session, wiped on fresh connects.
    pub credentials_dir: PathBuf,
    pub reconnect_interval: Duration,
    pub pairing: PairingPolicy,
}

/// What applying one platform event did.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Stale generation or no live handle.
    Ignored,
    QrStored,
    StatusApplied,
    /// The session just transitioned into connected.
    Reconnected,
    Inbound(InboundMessage),
}

//=========================================================================================
// SessionManager
//=========================================================================================

struct SessionInner {
    handle: Option<Arc<dyn PlatformHandle>>,
    generation: u64,
    owner: Option<Uuid>,
    state: SessionState,
    platform_status: Option<String>,
    qr: Option<QrCode>,
    valid_session: bool,
    reconnect: Option<CancellationToken>,
    reconnect_attempts: u32,
    pairing: Option<CancellationToken>,
}

pub struct SessionManager {
    platform: Arc<dyn MessagingPlatform>,
    config: SessionConfig,
    inner: Mutex<SessionInner>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionManager {
    /// Creates the manager and the receiving end of its event channel, which
    /// must be handed to `run_event_loop`.
    pub fn new(
        platform: Arc<dyn MessagingPlatform>,
        config: SessionConfig,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        let manager = Arc::new(Self {
            platform,
            config,
            inner: Mutex::new(SessionInner {
                handle: None,
                generation: 0,
                owner: None,
                state: SessionState::Disconnected,
                platform_status: None,
                qr: None,
                valid_session: false,
                reconnect: None,
                reconnect_attempts: 0,
                pairing: None,
            }),
            events_tx,
            state_tx,
        });
        (manager, events_rx)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// A receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, inner: &mut SessionInner, state: SessionState) {
        if inner.state != state {
            debug!("Session state {} -> {}", inner.state.as_str(), state.as_str());
        }
        inner.state = state.clone();
        self.state_tx.send_replace(state);
    }

    fn snapshot_of(inner: &SessionInner) -> SessionSnapshot {
        SessionSnapshot {
            state: inner.state.clone(),
            platform_status: inner.platform_status.clone(),
            qr: inner.qr.clone(),
            valid_session: inner.valid_session,
            has_client: inner.handle.is_some(),
            is_reconnecting: inner.reconnect.is_some(),
            is_pairing: inner.pairing.is_some(),
            reconnect_attempts: inner.reconnect_attempts,
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        Self::snapshot_of(&inner)
    }

    /// The user who started the session, if any.
    pub async fn owner(&self) -> Option<Uuid> {
        self.inner.lock().await.owner
    }

    /// Opens a fresh handle under a new generation. The caller holds the lock.
    async fn open_locked(&self, inner: &mut SessionInner) -> PortResult<()> {
        inner.generation += 1;
        let sink = EventSink::new(inner.generation, self.events_tx.clone());
        self.set_state(inner, SessionState::Connecting);
        let handle = self.platform.create(&self.config.launch, sink).await?;
        inner.handle = Some(handle);
        info!("Session handle opened (generation {})", inner.generation);
        Ok(())
    }

    /// Tears the live handle down. The caller holds the lock.
    async fn close_locked(&self, inner: &mut SessionInner) {
        if let Some(token) = inner.reconnect.take() {
            token.cancel();
        }
        if let Some(token) = inner.pairing.take() {
            token.cancel();
        }
        // Anything the old handle still emits is now stale.
        inner.generation += 1;
        inner.qr = None;
        inner.valid_session = false;
        inner.reconnect_attempts = 0;
        if let Some(handle) = inner.handle.take() {
            if let Err(e) = handle.close().await {
                warn!("Closing the session handle failed: {}", e);
            }
        }
    }

    //=====================================================================================
    // Lifecycle
    //=====================================================================================

    /// Opens the session unless one already exists, in which case the current
    /// snapshot is returned untouched.
    pub async fn connect(self: &Arc<Self>, owner: Option<Uuid>) -> PortResult<SessionSnapshot> {
        self.connect_inner(owner, false).await
    }

    /// `connect` plus a pairing supervisor bounded by the pairing policy.
    pub async fn start(self: &Arc<Self>, owner: Option<Uuid>) -> PortResult<SessionSnapshot> {
        self.connect_inner(owner, true).await
    }

    async fn connect_inner(
        self: &Arc<Self>,
        owner: Option<Uuid>,
        supervise: bool,
    ) -> PortResult<SessionSnapshot> {
        let mut inner = self.inner.lock().await;
        if inner.handle.is_some() {
            debug!("Session already exists; connect is a no-op");
            return Ok(Self::snapshot_of(&inner));
        }
        if owner.is_some() {
            inner.owner = owner;
        }

        remove_credentials(&self.config.credentials_dir).await;
        inner.qr = None;
        inner.valid_session = false;
        inner.platform_status = None;

        if let Err(e) = self.open_locked(&mut inner).await {
            warn!("Failed to open a messaging session: {}", e);
            self.set_state(&mut inner, SessionState::Disconnected);
            return Err(e);
        }

        if supervise {
            if let Some(token) = inner.reconnect.take() {
                token.cancel();
            }
            if let Some(previous) = inner.pairing.take() {
                previous.cancel();
            }
            let token = CancellationToken::new();
            inner.pairing = Some(token.clone());
            tokio::spawn(pairing::supervise(
                self.clone(),
                token,
                self.config.pairing,
            ));
        }

        Ok(Self::snapshot_of(&inner))
    }

    /// Closes the current handle (if any) and opens a new one.
    ///
    /// Does nothing once `guard` is cancelled, so a loop that was stopped while
    /// waiting for the lock cannot resurrect a session the user closed.
    pub(crate) async fn reopen(&self, guard: &CancellationToken) -> PortResult<()> {
        let mut inner = self.inner.lock().await;
        if guard.is_cancelled() {
            return Ok(());
        }
        inner.reconnect_attempts += 1;
        info!("Reconnection attempt {}", inner.reconnect_attempts);

        let previous = inner.state.clone();
        if let Some(handle) = inner.handle.take() {
            if let Err(e) = handle.close().await {
                debug!("Closing the stale handle failed: {}", e);
            }
        }
        if let Err(e) = self.open_locked(&mut inner).await {
            self.set_state(&mut inner, previous);
            return Err(e);
        }
        Ok(())
    }

    /// Ends a pairing attempt that ran out of time or attempts.
    pub(crate) async fn fail_pairing(&self, token: &CancellationToken, reason: String) {
        let mut inner = self.inner.lock().await;
        if token.is_cancelled() {
            return;
        }
        warn!("Pairing failed: {}", reason);
        self.close_locked(&mut inner).await;
        self.set_state(&mut inner, SessionState::Failed(reason));
    }

    /// Stops every loop, closes the handle and forgets the QR.
    /// A no-op when there is no session.
    pub async fn disconnect(&self) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        if inner.handle.is_some() || inner.reconnect.is_some() || inner.pairing.is_some() {
            info!("Disconnecting the messaging session");
        }
        self.close_locked(&mut inner).await;
        self.set_state(&mut inner, SessionState::Disconnected);
        Self::snapshot_of(&inner)
    }

    /// `disconnect` plus removal of the on-disk credentials, used to recover from
    /// a corrupted session.
    pub async fn delete_session(&self) -> PortResult<SessionSnapshot> {
        let mut inner = self.inner.lock().await;
        self.close_locked(&mut inner).await;
        inner.platform_status = None;
        self.set_state(&mut inner, SessionState::Disconnected);
        match tokio::fs::remove_dir_all(&self.config.credentials_dir).await {
            Ok(()) => info!(
                "Removed session credentials at {}",
                self.config.credentials_dir.display()
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(PortError::Unexpected(format!(
                    "failed to remove {}: {}",
                    self.config.credentials_dir.display(),
                    e
                )))
            }
        }
        Ok(Self::snapshot_of(&inner))
    }

    //=====================================================================================
    // Platform events
    //=====================================================================================

    /// Applies one platform event to the state machine.
    pub async fn apply_event(self: &Arc<Self>, event: SessionEvent) -> EventOutcome {
        let mut inner = self.inner.lock().await;
        if event.generation != inner.generation || inner.handle.is_none() {
            debug!(
                "Dropping event from generation {} (current {})",
                event.generation, inner.generation
            );
            return EventOutcome::Ignored;
        }

        match event.event {
            PlatformEvent::Qr(qr) => {
                info!("QR code received ({:?})", qr.kind);
                inner.qr = Some(qr);
                // A QR only proves the platform answered, not that login succeeded.
                inner.valid_session = true;
                self.set_state(&mut inner, SessionState::AwaitingScan);
                EventOutcome::QrStored
            }
            PlatformEvent::Status(raw) => {
                info!("Platform status: {}", raw);
                let class = classify_status(&raw);
                inner.platform_status = Some(raw);
                match class {
                    StatusClass::Connected => {
                        let was_connected = inner.state == SessionState::Connected;
                        inner.qr = None;
                        inner.valid_session = true;
                        inner.reconnect_attempts = 0;
                        if let Some(token) = inner.reconnect.take() {
                            token.cancel();
                        }
                        if let Some(token) = inner.pairing.take() {
                            token.cancel();
                        }
                        self.set_state(&mut inner, SessionState::Connected);
                        if was_connected {
                            EventOutcome::StatusApplied
                        } else {
                            info!("Session connected");
                            EventOutcome::Reconnected
                        }
                    }
                    StatusClass::Syncing => {
                        self.set_state(&mut inner, SessionState::Syncing);
                        EventOutcome::StatusApplied
                    }
                    StatusClass::Lost(reason) => {
                        inner.valid_session = false;
                        inner.qr = None;
                        self.set_state(&mut inner, SessionState::Lost(reason));
                        if inner.pairing.is_none() && inner.reconnect.is_none() {
                            let token = CancellationToken::new();
                            inner.reconnect = Some(token.clone());
                            tokio::spawn(reconnect::run(
                                self.clone(),
                                token,
                                self.config.reconnect_interval,
                            ));
                            info!("Session lost ({}); reconnecting", reason.as_str());
                        }
                        EventOutcome::StatusApplied
                    }
                    StatusClass::Other => EventOutcome::StatusApplied,
                }
            }
            PlatformEvent::Message(message) => EventOutcome::Inbound(message),
        }
    }

    //=====================================================================================
    // Sending
    //=====================================================================================

    async fn live_handle(&self) -> PortResult<Arc<dyn PlatformHandle>> {
        self.inner
            .lock()
            .await
            .handle
            .clone()
            .ok_or_else(|| PortError::ServiceUnavailable("No active messaging session".to_string()))
    }

    pub async fn has_client(&self) -> bool {
        self.inner.lock().await.handle.is_some()
    }

    pub async fn send_text(&self, chat_id: &str, text: &str) -> PortResult<()> {
        let handle = self.live_handle().await?;
        handle.send_text(chat_id, text).await
    }

    pub async fn send_file(
        &self,
        chat_id: &str,
        path: &Path,
        file_name: &str,
        caption: &str,
    ) -> PortResult<()> {
        let handle = self.live_handle().await?;
        handle.send_file(chat_id, path, file_name, caption).await
    }

    /// The platform's own view of the connection, when a handle exists.
    pub async fn connection_state(&self) -> PortResult<Option<String>> {
        let handle = match self.inner.lock().await.handle.clone() {
            Some(handle) => handle,
            None => return Ok(None),
        };
        handle.connection_state().await.map(Some)
    }
}

async fn remove_credentials(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => info!("Removed stale session credentials at {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {}", dir.display(), e),
    }
}
