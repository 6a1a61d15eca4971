//! crates/outreach_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases, the
//! LLM provider, or the browser-automation messaging platform.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::{
    Campaign, CampaignUpdate, Contact, ContactUpdate, Faq, FaqUpdate, InboundMessage,
    LaunchOptions, NewCampaign, NewContact, NewFaq, NewPendingReply, NewReply, PendingReply,
    QrCode, Reply, ReplyUpdate, Sentiment, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A required capability is not configured or not running. Never retried.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    /// The remote side answered, but not with something usable.
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Persistence
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users & auth ---
    async fn create_user_with_email(
        &self,
        email: &str,
        name: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Contacts ---
    async fn list_contacts(&self, user_id: Uuid) -> PortResult<Vec<Contact>>;

    async fn get_contact(&self, id: Uuid, user_id: Uuid) -> PortResult<Contact>;

    async fn create_contact(&self, user_id: Uuid, contact: NewContact) -> PortResult<Contact>;

    async fn update_contact(
        &self,
        id: Uuid,
        user_id: Uuid,
        update: ContactUpdate,
    ) -> PortResult<Contact>;

    async fn delete_contact(&self, id: Uuid, user_id: Uuid) -> PortResult<()>;

    // --- Campaigns ---
    /// Newest first.
    async fn list_campaigns(&self, user_id: Uuid) -> PortResult<Vec<Campaign>>;

    async fn get_campaign(&self, id: Uuid, user_id: Uuid) -> PortResult<Campaign>;

    async fn create_campaign(&self, user_id: Uuid, campaign: NewCampaign) -> PortResult<Campaign>;

    async fn update_campaign(
        &self,
        id: Uuid,
        user_id: Uuid,
        update: CampaignUpdate,
    ) -> PortResult<Campaign>;

    async fn delete_campaign(&self, id: Uuid, user_id: Uuid) -> PortResult<()>;

    async fn record_reply_sentiment(&self, campaign_id: Uuid, sentiment: Sentiment)
        -> PortResult<()>;

    // --- Replies ---
    /// Newest first.
    async fn list_replies_for_campaign(&self, campaign_id: Uuid) -> PortResult<Vec<Reply>>;

    /// Newest first.
    async fn list_replies_for_contact(&self, contact_id: Uuid) -> PortResult<Vec<Reply>>;

    async fn get_reply(&self, id: Uuid) -> PortResult<Reply>;

    async fn create_reply(&self, reply: NewReply) -> PortResult<Reply>;

    async fn update_reply(&self, id: Uuid, update: ReplyUpdate) -> PortResult<Reply>;

    async fn delete_reply(&self, id: Uuid) -> PortResult<()>;

    // --- FAQs ---
    async fn list_faqs(&self, user_id: Uuid) -> PortResult<Vec<Faq>>;

    async fn create_faq(&self, user_id: Uuid, faq: NewFaq) -> PortResult<Faq>;

    async fn update_faq(&self, id: Uuid, user_id: Uuid, update: FaqUpdate) -> PortResult<Faq>;

    async fn delete_faq(&self, id: Uuid, user_id: Uuid) -> PortResult<()>;

    // --- Pending replies ---
    /// Oldest first (insertion order).
    async fn list_pending_replies(&self) -> PortResult<Vec<PendingReply>>;

    async fn create_pending_reply(&self, pending: NewPendingReply) -> PortResult<PendingReply>;

    async fn increment_pending_attempts(&self, id: Uuid) -> PortResult<PendingReply>;

    async fn delete_pending_reply(&self, id: Uuid) -> PortResult<()>;
}

//=========================================================================================
// LLM
//=========================================================================================

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends a single-prompt chat completion and returns the trimmed text.
    ///
    /// Fails with `ServiceUnavailable` when no credential is configured and with
    /// `Upstream` on a non-2xx answer or an answer without text. Never retries.
    async fn complete(&self, prompt: &str, model: Option<&str>) -> PortResult<String>;
}

//=========================================================================================
// Messaging platform
//=========================================================================================

/// What the platform reports about a session it opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    Qr(QrCode),
    Status(String),
    Message(InboundMessage),
}

/// A platform event tagged with the generation of the handle that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub generation: u64,
    pub event: PlatformEvent,
}

/// Where a platform handle delivers its callbacks.
///
/// Every handle gets its own sink, so events emitted by a handle that has since
/// been closed can be recognised and dropped by the consumer.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the consumer has gone away.
    pub fn emit(&self, event: PlatformEvent) -> bool {
        self.tx
            .send(SessionEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// A live automation session.
#[async_trait]
pub trait PlatformHandle: Send + Sync {
    async fn close(&self) -> PortResult<()>;

    async fn send_text(&self, chat_id: &str, text: &str) -> PortResult<()>;

    async fn send_file(
        &self,
        chat_id: &str,
        path: &Path,
        file_name: &str,
        caption: &str,
    ) -> PortResult<()>;

    async fn connection_state(&self) -> PortResult<String>;
}

/// Opens sessions against the messaging platform.
#[async_trait]
pub trait MessagingPlatform: Send + Sync {
    async fn create(
        &self,
        options: &LaunchOptions,
        events: EventSink,
    ) -> PortResult<Arc<dyn PlatformHandle>>;
}
