//! services/api/src/session/dispatch.rs
//!
//! The single consumer of platform events. Events are applied one at a time,
//! so at most one inbound message or replay is being handled at any moment.

use super::{EventOutcome, SessionManager};
use async_trait::async_trait;
use outreach_core::domain::InboundMessage;
use outreach_core::ports::SessionEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Receives what the session manager hands upward.
#[async_trait]
pub trait SessionObserver: Send + Sync {
    async fn on_message(&self, message: InboundMessage);

    /// Called once per transition into connected.
    async fn on_reconnected(&self);
}

pub async fn run_event_loop(
    manager: Arc<SessionManager>,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    observer: Arc<dyn SessionObserver>,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match manager.apply_event(event).await {
            EventOutcome::Inbound(message) => observer.on_message(message).await,
            EventOutcome::Reconnected => observer.on_reconnected().await,
            EventOutcome::Ignored | EventOutcome::QrStored | EventOutcome::StatusApplied => {}
        }
    }
    info!("Session event loop stopped");
}
