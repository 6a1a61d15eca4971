//! services/api/src/session/reconnect.rs
//!
//! The always-on background reconnection loop. Unlike pairing it has no attempt
//! cap: it reopens the session every interval until a connected status cancels
//! its token (or the user disconnects).

use super::SessionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub(crate) async fn run(manager: Arc<SessionManager>, token: CancellationToken, period: Duration) {
    info!("Starting automatic reconnection every {:?}", period);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                // Connect failures are "still trying", never fatal.
                if let Err(e) = manager.reopen(&token).await {
                    warn!("Reconnection attempt failed: {}", e);
                }
            }
        }
    }
    info!("Reconnection loop stopped");
}
