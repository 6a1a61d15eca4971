//! services/api/src/autoreply/router.rs
//!
//! Decides, for every inbound message, whether the bot answers and with what.
//!
//! The flow is: filter the sender, resolve the contact and its autoreply
//! campaign, persist the message as a `Reply`, then (unless a human has taken
//! over the contact) look for a confident FAQ match, personalize the answer and
//! send it. A failed send is queued for replay instead of surfacing an error.

use super::retry::PendingReplyQueue;
use crate::assistant::Assistant;
use crate::session::{SessionManager, SessionObserver};
use async_trait::async_trait;
use chrono::Utc;
use outreach_core::domain::{Contact, InboundMessage, NewReply, Reply, ReplyUpdate, Sentiment};
use outreach_core::faq::find_matching_faq;
use outreach_core::phone;
use outreach_core::ports::{DatabaseService, PortResult};
use outreach_core::routing::{resolve_contact, select_autoreply_campaign};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Group chat or status broadcast.
    NotDirect,
    /// Nobody has started the session, so there is no account to file it under.
    NoOwner,
    UnknownContact,
    NoAutoreplyCampaign,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Ignored(IgnoreReason),
    /// A human already answered this contact; the bot stays out.
    Suppressed { reply_id: Uuid },
    NoMatch { reply_id: Uuid },
    Delivered { reply_id: Uuid, response: String, score: f64 },
    /// Generated but not sent; sits in the pending queue.
    Queued { reply_id: Uuid, response: String, score: f64 },
}

pub struct Autoresponder {
    db: Arc<dyn DatabaseService>,
    session: Arc<SessionManager>,
    assistant: Arc<Assistant>,
    queue: Arc<PendingReplyQueue>,
    company_info: Option<String>,
}

impl Autoresponder {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        session: Arc<SessionManager>,
        assistant: Arc<Assistant>,
        queue: Arc<PendingReplyQueue>,
        company_info: Option<String>,
    ) -> Self {
        Self {
            db,
            session,
            assistant,
            queue,
            company_info,
        }
    }

    pub fn queue(&self) -> &Arc<PendingReplyQueue> {
        &self.queue
    }

    pub async fn handle_inbound(&self, message: &InboundMessage) -> PortResult<RouteOutcome> {
        if phone::is_ignored_sender(&message.from) {
            debug!("Ignoring message from {}", message.from);
            return Ok(RouteOutcome::Ignored(IgnoreReason::NotDirect));
        }

        let Some(owner) = self.session.owner().await else {
            warn!("Inbound message with no session owner; dropping");
            return Ok(RouteOutcome::Ignored(IgnoreReason::NoOwner));
        };

        let sender = phone::sender_phone(&message.from);
        let contacts = self.db.list_contacts(owner).await?;
        let Some(contact) = resolve_contact(sender, &contacts) else {
            info!("No contact matches sender {}", sender);
            return Ok(RouteOutcome::Ignored(IgnoreReason::UnknownContact));
        };

        let campaigns = self.db.list_campaigns(owner).await?;
        let Some(campaign) = select_autoreply_campaign(contact, &campaigns) else {
            info!("No autoreply campaign covers contact {}", contact.id);
            return Ok(RouteOutcome::Ignored(IgnoreReason::NoAutoreplyCampaign));
        };

        let reply = self
            .record_reply(campaign.id, contact.id, &message.body)
            .await?;
        self.respond(owner, &reply, contact, &message.body, &message.from)
            .await
    }

    /// Runs the answering half for a message already on record: the most recent
    /// reply of the contact in the campaign, or a new one if there is none.
    pub async fn respond_to_contact(
        &self,
        owner: Uuid,
        campaign_id: Uuid,
        contact_id: Uuid,
        user_message: &str,
    ) -> PortResult<RouteOutcome> {
        let campaign = self.db.get_campaign(campaign_id, owner).await?;
        let contact = self.db.get_contact(contact_id, owner).await?;

        let existing = self
            .db
            .list_replies_for_contact(contact.id)
            .await?
            .into_iter()
            .find(|reply| reply.campaign_id == campaign.id);
        let reply = match existing {
            Some(reply) => reply,
            None => self.record_reply(campaign.id, contact.id, user_message).await?,
        };

        let destination = phone::chat_id(&contact.phone);
        self.respond(owner, &reply, &contact, user_message, &destination)
            .await
    }

    /// Persists one inbound message with its sentiment and bumps the campaign stats.
    pub async fn record_reply(
        &self,
        campaign_id: Uuid,
        contact_id: Uuid,
        body: &str,
    ) -> PortResult<Reply> {
        let sentiment = match self.assistant.analyze_sentiment(body).await {
            Ok(analysis) => analysis.sentiment,
            Err(e) => {
                warn!("Sentiment analysis failed, using neutral: {}", e);
                Sentiment::Neutral
            }
        };

        let reply = self
            .db
            .create_reply(NewReply {
                campaign_id,
                contact_id,
                message: body.to_string(),
                sentiment,
            })
            .await?;
        if let Err(e) = self.db.record_reply_sentiment(campaign_id, sentiment).await {
            warn!("Could not update reply stats for campaign {}: {}", campaign_id, e);
        }
        Ok(reply)
    }

    async fn respond(
        &self,
        owner: Uuid,
        reply: &Reply,
        contact: &Contact,
        message: &str,
        destination: &str,
    ) -> PortResult<RouteOutcome> {
        let history = self.db.list_replies_for_contact(contact.id).await?;
        if history.iter().any(|r| r.is_human_responded) {
            info!("Contact {} is handled by a human; no autoreply", contact.id);
            return Ok(RouteOutcome::Suppressed { reply_id: reply.id });
        }

        let faqs = self.db.list_faqs(owner).await?;
        let Some(matched) = find_matching_faq(message, &faqs) else {
            info!("No FAQ matches the message from contact {}", contact.id);
            return Ok(RouteOutcome::NoMatch { reply_id: reply.id });
        };
        let score = matched.score;
        debug!("Matched FAQ '{}' ({:.2})", matched.faq.question, score);

        let response = match self
            .assistant
            .generate_autoreply(
                message,
                matched.faq,
                Some(contact.name.as_str()),
                self.company_info.as_deref(),
            )
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("Autoreply generation failed, sending the FAQ answer: {}", e);
                matched.faq.answer.clone()
            }
        };

        let chat = phone::chat_id(destination);
        match self.session.send_text(&chat, &response).await {
            Ok(()) => {
                self.db
                    .update_reply(reply.id, ReplyUpdate::ai_delivered(&response, Utc::now()))
                    .await?;
                info!("Autoreply delivered to {}", chat);
                Ok(RouteOutcome::Delivered {
                    reply_id: reply.id,
                    response,
                    score,
                })
            }
            Err(e) => {
                warn!("Autoreply to {} failed, queueing: {}", chat, e);
                self.queue.enqueue(reply.id, &chat, &response).await?;
                Ok(RouteOutcome::Queued {
                    reply_id: reply.id,
                    response,
                    score,
                })
            }
        }
    }
}

#[async_trait]
impl SessionObserver for Autoresponder {
    async fn on_message(&self, message: InboundMessage) {
        match self.handle_inbound(&message).await {
            Ok(outcome) => debug!("Inbound message from {} -> {:?}", message.from, outcome),
            Err(e) => error!("Failed to handle message from {}: {}", message.from, e),
        }
    }

    async fn on_reconnected(&self) {
        if let Err(e) = self.queue.replay().await {
            error!("Pending reply replay failed: {}", e);
        }
    }
}
