//! services/api/src/autoreply/retry.rs
//!
//! The durable queue of autoreplies that could not be delivered. Entries live in
//! the `pending_replies` table and are replayed, oldest first, every time the
//! session transitions into connected.

use crate::session::SessionManager;
use chrono::Utc;
use outreach_core::domain::{NewPendingReply, PendingReply, ReplyUpdate};
use outreach_core::phone;
use outreach_core::ports::{DatabaseService, PortError, PortResult};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What one replay pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub delivered: usize,
    /// Dropped without sending: the reply is gone, already answered, or its
    /// contact was taken over by a human.
    pub discarded: usize,
    /// Still queued, with the attempt count bumped.
    pub failed: usize,
}

pub struct PendingReplyQueue {
    db: Arc<dyn DatabaseService>,
    session: Arc<SessionManager>,
    replaying: Mutex<()>,
}

impl PendingReplyQueue {
    pub fn new(db: Arc<dyn DatabaseService>, session: Arc<SessionManager>) -> Self {
        Self {
            db,
            session,
            replaying: Mutex::new(()),
        }
    }

    pub async fn enqueue(
        &self,
        reply_id: Uuid,
        phone: &str,
        message: &str,
    ) -> PortResult<PendingReply> {
        let pending = self
            .db
            .create_pending_reply(NewPendingReply {
                reply_id,
                phone: phone.to_string(),
                message: message.to_string(),
            })
            .await?;
        info!("Queued autoreply {} for {}", pending.id, phone);
        Ok(pending)
    }

    /// Attempts every queued entry once. A failing entry never stops the pass.
    pub async fn replay(&self) -> PortResult<ReplayReport> {
        // Two passes over the same rows would send twice.
        let _pass = self.replaying.lock().await;

        let queued = self.db.list_pending_replies().await?;
        let mut report = ReplayReport::default();
        if queued.is_empty() {
            return Ok(report);
        }
        info!("Replaying {} pending replies", queued.len());

        for pending in queued {
            let reply = match self.db.get_reply(pending.reply_id).await {
                Ok(reply) => Some(reply),
                Err(PortError::NotFound(_)) => None,
                Err(e) => {
                    warn!("Could not load reply {}: {}", pending.reply_id, e);
                    self.bump(&pending).await;
                    report.failed += 1;
                    continue;
                }
            };

            let reply = match reply {
                Some(reply) if !reply.is_resolved() => reply,
                _ => {
                    debug!("Discarding pending reply {} (already resolved)", pending.id);
                    self.remove(&pending).await;
                    report.discarded += 1;
                    continue;
                }
            };

            // A human answering any message of the contact takes the whole
            // conversation over, including what was queued before.
            match self.db.list_replies_for_contact(reply.contact_id).await {
                Ok(history) if history.iter().any(|r| r.is_human_responded) => {
                    debug!(
                        "Discarding pending reply {} (contact {} handled by a human)",
                        pending.id, reply.contact_id
                    );
                    self.remove(&pending).await;
                    report.discarded += 1;
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Could not load the history of contact {}: {}", reply.contact_id, e);
                    self.bump(&pending).await;
                    report.failed += 1;
                    continue;
                }
            }

            let chat = phone::chat_id(&pending.phone);
            match self.session.send_text(&chat, &pending.message).await {
                Ok(()) => {
                    let update = ReplyUpdate::ai_delivered(&pending.message, Utc::now());
                    if let Err(e) = self.db.update_reply(pending.reply_id, update).await {
                        warn!("Delivered pending reply {} but could not mark it: {}", pending.id, e);
                    }
                    self.remove(&pending).await;
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!("Pending reply {} still undeliverable: {}", pending.id, e);
                    self.bump(&pending).await;
                    report.failed += 1;
                }
            }
        }

        info!(
            "Replay finished: {} delivered, {} discarded, {} still queued",
            report.delivered, report.discarded, report.failed
        );
        Ok(report)
    }

    async fn bump(&self, pending: &PendingReply) {
        if let Err(e) = self.db.increment_pending_attempts(pending.id).await {
            warn!("Could not bump attempts on {}: {}", pending.id, e);
        }
    }

    async fn remove(&self, pending: &PendingReply) {
        if let Err(e) = self.db.delete_pending_reply(pending.id).await {
            warn!("Could not remove pending reply {}: {}", pending.id, e);
        }
    }
}
