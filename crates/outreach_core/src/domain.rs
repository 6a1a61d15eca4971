//! crates/outreach_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

//=========================================================================================
// Contacts
//=========================================================================================

/// A person a user can message. The phone is the join key for inbound messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub title: Option<String>,
    pub phone: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub name: String,
    pub title: Option<String>,
    pub phone: String,
    pub tags: Vec<String>,
}

/// Partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ContactUpdate {
    pub name: Option<String>,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub tags: Option<Vec<String>>,
}

//=========================================================================================
// Campaigns
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sent,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Sent => "sent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(CampaignStatus::Draft),
            "scheduled" => Some(CampaignStatus::Scheduled),
            "sent" => Some(CampaignStatus::Sent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyStats {
    pub total: i32,
    pub positive: i32,
    pub negative: i32,
    pub neutral: i32,
}

impl ReplyStats {
    pub fn record(&mut self, sentiment: Sentiment) {
        self.total += 1;
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub message: String,
    pub selected_contacts: Vec<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: CampaignStatus,
    pub autoreply_enabled: bool,
    pub reply_stats: ReplyStats,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// True when an inbound message from `contact_id` may be auto-answered under this campaign.
    pub fn covers_for_autoreply(&self, contact_id: Uuid) -> bool {
        self.autoreply_enabled && self.selected_contacts.contains(&contact_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub name: String,
    pub message: String,
    pub selected_contacts: Vec<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: CampaignStatus,
    pub autoreply_enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CampaignUpdate {
    pub name: Option<String>,
    pub message: Option<String>,
    pub selected_contacts: Option<Vec<Uuid>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: Option<CampaignStatus>,
    pub autoreply_enabled: Option<bool>,
}

//=========================================================================================
// Replies (inbound messages)
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    /// Lenient parse; anything unrecognised is neutral.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

/// One inbound message from a contact, plus whatever answered it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub contact_id: Uuid,
    pub message: String,
    pub sentiment: Sentiment,
    pub received_at: DateTime<Utc>,
    pub is_ai_responded: bool,
    pub ai_response: Option<String>,
    pub ai_response_time: Option<DateTime<Utc>>,
    pub is_human_responded: bool,
    pub human_response: Option<String>,
}

impl Reply {
    /// A reply is resolved once either the bot or a human has answered it.
    pub fn is_resolved(&self) -> bool {
        self.is_ai_responded || self.is_human_responded
    }
}

#[derive(Debug, Clone)]
pub struct NewReply {
    pub campaign_id: Uuid,
    pub contact_id: Uuid,
    pub message: String,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Default)]
pub struct ReplyUpdate {
    pub is_ai_responded: Option<bool>,
    pub ai_response: Option<String>,
    pub ai_response_time: Option<DateTime<Utc>>,
    pub is_human_responded: Option<bool>,
    pub human_response: Option<String>,
}

impl ReplyUpdate {
    /// The update recorded once an autoreply has actually been delivered.
    pub fn ai_delivered(response: &str, at: DateTime<Utc>) -> Self {
        Self {
            is_ai_responded: Some(true),
            ai_response: Some(response.to_string()),
            ai_response_time: Some(at),
            ..Default::default()
        }
    }
}

//=========================================================================================
// FAQs and pending replies
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Faq {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFaq {
    pub question: String,
    pub answer: String,
    pub category: String,
}

#[derive(Debug, Clone, Default)]
pub struct FaqUpdate {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub category: Option<String>,
}

/// An autoreply that was generated but could not be delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReply {
    pub id: Uuid,
    pub reply_id: Uuid,
    pub phone: String,
    pub message: String,
    pub queued_at: DateTime<Utc>,
    pub attempt_count: i32,
}

#[derive(Debug, Clone)]
pub struct NewPendingReply {
    pub reply_id: Uuid,
    pub phone: String,
    pub message: String,
}

//=========================================================================================
// Messaging session
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrKind {
    Text,
    Image,
}

/// The pairing code handed to the dashboard, already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrCode {
    pub kind: QrKind,
    pub payload: String,
}

impl QrCode {
    pub fn from_text(payload: impl Into<String>) -> Self {
        let payload = payload.into();
        let kind = if payload.starts_with("data:image/") {
            QrKind::Image
        } else {
            QrKind::Text
        };
        Self { kind, payload }
    }
}

/// An inbound event as the platform reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// `"<phone>@c.us"` for direct chats, `"...@g.us"` for groups.
    pub from: String,
    pub body: String,
}

/// The fixed browser launch set used for every session the platform opens.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOptions {
    pub session_name: String,
    pub headless: bool,
    pub protocol_timeout: Duration,
    pub browser_args: Vec<String>,
    pub auto_close: Duration,
}

impl LaunchOptions {
    pub fn new(session_name: impl Into<String>) -> Self {
        let browser_args = [
            "--no-sandbox",
            "--disable-setuid-sandbox",
            "--disable-dev-shm-usage",
            "--disable-accelerated-2d-canvas",
            "--no-first-run",
            "--no-zygote",
            "--disable-gpu",
            "--disable-background-timer-throttling",
            "--disable-backgrounding-occluded-windows",
            "--disable-renderer-backgrounding",
            "--disable-features=TranslateUI",
            "--disable-ipc-flooding-protection",
            "--disable-web-security",
            "--disable-features=VizDisplayCompositor",
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect();

        Self {
            session_name: session_name.into(),
            headless: true,
            protocol_timeout: Duration::from_secs(60),
            browser_args,
            auto_close: Duration::from_secs(3600),
        }
    }
}
