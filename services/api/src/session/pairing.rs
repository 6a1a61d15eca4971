//! services/api/src/session/pairing.rs
//!
//! The supervisor that bounds an interactive pairing attempt. It watches the
//! session state until the session connects; while it runs, a lost session is
//! reopened after `retry_delay` instead of waiting for the background loop.
//! Running out of attempts or hitting the deadline moves the session to `Failed`.

use super::{PairingPolicy, SessionManager, SessionState};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub(crate) async fn supervise(
    manager: Arc<SessionManager>,
    token: CancellationToken,
    policy: PairingPolicy,
) {
    let mut states = manager.watch_state();
    let deadline = tokio::time::sleep(policy.timeout);
    tokio::pin!(deadline);

    // The connect that spawned us was the first attempt.
    let mut attempts: u32 = 1;
    info!(
        "Pairing started: {:?} deadline, {} attempts",
        policy.timeout, policy.max_attempts
    );

    loop {
        if token.is_cancelled() {
            return;
        }
        let state = states.borrow_and_update().clone();
        match state {
            SessionState::Connected | SessionState::Disconnected | SessionState::Failed(_) => {
                debug!("Pairing supervisor done ({})", state.as_str());
                return;
            }
            SessionState::Lost(reason) => {
                if attempts >= policy.max_attempts {
                    manager
                        .fail_pairing(
                            &token,
                            format!(
                                "Session lost ({}) after {} attempts",
                                reason.as_str(),
                                attempts
                            ),
                        )
                        .await;
                    return;
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    _ = &mut deadline => {
                        time_out(&manager, &token, &policy).await;
                        return;
                    }
                    _ = tokio::time::sleep(policy.retry_delay) => {}
                }
                // The session may have recovered on its own while we waited.
                if !matches!(*states.borrow_and_update(), SessionState::Lost(_)) {
                    continue;
                }
                attempts += 1;
                if let Err(e) = manager.reopen(&token).await {
                    warn!("Pairing attempt {} failed to open: {}", attempts, e);
                }
                // A failed reopen leaves the state lost; the next pass waits again.
                continue;
            }
            _ => {}
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = &mut deadline => {
                time_out(&manager, &token, &policy).await;
                return;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

async fn time_out(manager: &SessionManager, token: &CancellationToken, policy: &PairingPolicy) {
    manager
        .fail_pairing(
            token,
            format!("Pairing timed out after {} seconds", policy.timeout.as_secs()),
        )
        .await;
}
