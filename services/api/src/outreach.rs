//! services/api/src/outreach.rs
//!
//! Bulk campaign sends. Recipients are messaged one at a time with a throttle
//! between them, and every campaign is recorded in the sent ledger so that a
//! repeated request is rejected as a duplicate instead of re-sending.

use crate::adapters::FileLedger;
use crate::session::SessionManager;
use outreach_core::domain::{CampaignStatus, CampaignUpdate};
use outreach_core::phone;
use outreach_core::ports::{DatabaseService, PortError, PortResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub name: String,
    pub phone: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CampaignSend {
    pub recipients: Vec<Recipient>,
    pub message: String,
    pub campaign_id: Option<String>,
    pub campaign_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendReport {
    pub success: usize,
    pub failed: usize,
    pub duplicate: bool,
}

/// Fills `{{name}}` (first name, "User" when blank) and `{{title}}`.
pub fn personalize(template: &str, recipient: &Recipient) -> String {
    let first_name = recipient.name.split_whitespace().next().unwrap_or("User");
    template
        .replace("{{name}}", first_name)
        .replace("{{title}}", recipient.title.as_deref().unwrap_or(""))
}

pub struct CampaignSender {
    db: Arc<dyn DatabaseService>,
    session: Arc<SessionManager>,
    ledger: Arc<FileLedger>,
    delay: Duration,
    attachment: Option<PathBuf>,
    // Held from the ledger check to the ledger write, so two requests for the
    // same campaign cannot both pass the duplicate check.
    sending: Mutex<()>,
}

impl CampaignSender {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        session: Arc<SessionManager>,
        ledger: Arc<FileLedger>,
        delay: Duration,
        attachment: Option<PathBuf>,
    ) -> Self {
        Self {
            db,
            session,
            ledger,
            delay,
            attachment,
            sending: Mutex::new(()),
        }
    }

    pub fn ledger(&self) -> &Arc<FileLedger> {
        &self.ledger
    }

    pub async fn send(&self, owner: Uuid, request: CampaignSend) -> PortResult<SendReport> {
        if !self.session.has_client().await {
            return Err(PortError::InvalidInput("Session not started".to_string()));
        }
        if request.recipients.is_empty() || request.message.trim().is_empty() {
            return Err(PortError::InvalidInput(
                "Recipients and a message are required".to_string(),
            ));
        }

        let _sending = self.sending.lock().await;
        let campaign_id = request.campaign_id.as_deref();
        let campaign_name = request.campaign_name.as_deref();
        if self.ledger.contains(campaign_id, campaign_name).await? {
            info!(
                "Campaign {:?} / {:?} already processed; skipping",
                campaign_id, campaign_name
            );
            return Ok(SendReport {
                duplicate: true,
                ..Default::default()
            });
        }

        let mut report = SendReport::default();
        for (index, recipient) in request.recipients.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.send_one(&request.message, recipient).await {
                report.success += 1;
            } else {
                report.failed += 1;
            }
        }
        info!(
            "Campaign send finished: {} sent, {} failed",
            report.success, report.failed
        );

        if let Err(e) = self.ledger.record(campaign_id, campaign_name).await {
            warn!("Could not record the campaign in the sent ledger: {}", e);
        }
        if let Some(id) = campaign_id.and_then(|id| Uuid::parse_str(id).ok()) {
            let update = CampaignUpdate {
                status: Some(CampaignStatus::Sent),
                ..Default::default()
            };
            if let Err(e) = self.db.update_campaign(id, owner, update).await {
                warn!("Could not mark campaign {} as sent: {}", id, e);
            }
        }
        Ok(report)
    }

    async fn send_one(&self, template: &str, recipient: &Recipient) -> bool {
        if phone::normalize(&recipient.phone).is_empty() {
            warn!("Recipient '{}' has no phone number", recipient.name);
            return false;
        }
        let chat = phone::chat_id(&recipient.phone);
        let text = personalize(template, recipient);

        if let Err(e) = self.session.send_text(&chat, &text).await {
            warn!("Failed to send to {}: {}", chat, e);
            return false;
        }

        if let Some(path) = &self.attachment {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string());
            // The text already went out; a failed attachment does not undo that.
            if let Err(e) = self.session.send_file(&chat, path, &file_name, "").await {
                warn!("Attachment to {} failed: {}", chat, e);
            }
        }
        true
    }
}
