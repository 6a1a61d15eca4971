//! In-memory fakes of every port, shared by the integration tests.

#![allow(dead_code)]

use api_lib::session::{PairingPolicy, SessionConfig, SessionManager};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outreach_core::domain::*;
use outreach_core::ports::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

//=========================================================================================
// Database
//=========================================================================================

#[derive(Default)]
struct Store {
    users: Vec<(UserCredentials, Option<String>)>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    contacts: Vec<Contact>,
    campaigns: Vec<Campaign>,
    replies: Vec<Reply>,
    faqs: Vec<Faq>,
    pending: Vec<PendingReply>,
}

#[derive(Default)]
pub struct InMemoryDb {
    store: Mutex<Store>,
}

fn not_found(what: &str, id: Uuid) -> PortError {
    PortError::NotFound(format!("{} {}", what, id))
}

impl InMemoryDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_contact(&self, user_id: Uuid, name: &str, phone: &str) -> Contact {
        let now = Utc::now();
        let contact = Contact {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            title: None,
            phone: phone.to_string(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.store.lock().unwrap().contacts.push(contact.clone());
        contact
    }

    pub fn seed_campaign(
        &self,
        user_id: Uuid,
        name: &str,
        contacts: &[Uuid],
        autoreply_enabled: bool,
        created_at: DateTime<Utc>,
    ) -> Campaign {
        let campaign = Campaign {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            message: "Hello {{name}}".to_string(),
            selected_contacts: contacts.to_vec(),
            scheduled_at: None,
            status: CampaignStatus::Draft,
            autoreply_enabled,
            reply_stats: ReplyStats::default(),
            created_at,
        };
        self.store.lock().unwrap().campaigns.push(campaign.clone());
        campaign
    }

    pub fn seed_faq(&self, user_id: Uuid, question: &str, answer: &str) -> Faq {
        let faq = Faq {
            id: Uuid::new_v4(),
            user_id,
            question: question.to_string(),
            answer: answer.to_string(),
            category: "general".to_string(),
            created_at: Utc::now(),
        };
        self.store.lock().unwrap().faqs.push(faq.clone());
        faq
    }

    pub fn seed_reply(&self, campaign_id: Uuid, contact_id: Uuid, message: &str) -> Reply {
        let reply = Reply {
            id: Uuid::new_v4(),
            campaign_id,
            contact_id,
            message: message.to_string(),
            sentiment: Sentiment::Neutral,
            received_at: Utc::now(),
            is_ai_responded: false,
            ai_response: None,
            ai_response_time: None,
            is_human_responded: false,
            human_response: None,
        };
        self.store.lock().unwrap().replies.push(reply.clone());
        reply
    }

    pub fn mark_human_responded(&self, reply_id: Uuid, response: &str) {
        let mut store = self.store.lock().unwrap();
        let reply = store
            .replies
            .iter_mut()
            .find(|r| r.id == reply_id)
            .expect("seeded reply");
        reply.is_human_responded = true;
        reply.human_response = Some(response.to_string());
    }

    pub fn reply(&self, id: Uuid) -> Reply {
        self.store
            .lock()
            .unwrap()
            .replies
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .expect("reply exists")
    }

    pub fn replies(&self) -> Vec<Reply> {
        self.store.lock().unwrap().replies.clone()
    }

    pub fn campaign(&self, id: Uuid) -> Campaign {
        self.store
            .lock()
            .unwrap()
            .campaigns
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .expect("campaign exists")
    }

    pub fn pending(&self) -> Vec<PendingReply> {
        self.store.lock().unwrap().pending.clone()
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user_with_email(
        &self,
        email: &str,
        name: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut store = self.store.lock().unwrap();
        if store.users.iter().any(|(u, _)| u.email == email) {
            return Err(PortError::InvalidInput("email already registered".to_string()));
        }
        let user_id = Uuid::new_v4();
        store.users.push((
            UserCredentials {
                user_id,
                email: email.to_string(),
                hashed_password: hashed_password.to_string(),
            },
            name.map(str::to_string),
        ));
        Ok(User {
            user_id,
            email: email.to_string(),
            name: name.map(str::to_string),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.store
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| PortError::NotFound(email.to_string()))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.store
            .lock()
            .unwrap()
            .auth_sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.store.lock().unwrap().auth_sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.store.lock().unwrap().auth_sessions.remove(session_id);
        Ok(())
    }

    async fn list_contacts(&self, user_id: Uuid) -> PortResult<Vec<Contact>> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .contacts
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_contact(&self, id: Uuid, user_id: Uuid) -> PortResult<Contact> {
        self.store
            .lock()
            .unwrap()
            .contacts
            .iter()
            .find(|c| c.id == id && c.user_id == user_id)
            .cloned()
            .ok_or_else(|| not_found("contact", id))
    }

    async fn create_contact(&self, user_id: Uuid, contact: NewContact) -> PortResult<Contact> {
        let now = Utc::now();
        let contact = Contact {
            id: Uuid::new_v4(),
            user_id,
            name: contact.name,
            title: contact.title,
            phone: contact.phone,
            tags: contact.tags,
            created_at: now,
            updated_at: now,
        };
        self.store.lock().unwrap().contacts.push(contact.clone());
        Ok(contact)
    }

    async fn update_contact(
        &self,
        id: Uuid,
        user_id: Uuid,
        update: ContactUpdate,
    ) -> PortResult<Contact> {
        let mut store = self.store.lock().unwrap();
        let contact = store
            .contacts
            .iter_mut()
            .find(|c| c.id == id && c.user_id == user_id)
            .ok_or_else(|| not_found("contact", id))?;
        if let Some(name) = update.name {
            contact.name = name;
        }
        if let Some(title) = update.title {
            contact.title = Some(title);
        }
        if let Some(phone) = update.phone {
            contact.phone = phone;
        }
        if let Some(tags) = update.tags {
            contact.tags = tags;
        }
        contact.updated_at = Utc::now();
        Ok(contact.clone())
    }

    async fn delete_contact(&self, id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut store = self.store.lock().unwrap();
        let before = store.contacts.len();
        store.contacts.retain(|c| !(c.id == id && c.user_id == user_id));
        if store.contacts.len() == before {
            return Err(not_found("contact", id));
        }
        store.replies.retain(|r| r.contact_id != id);
        Ok(())
    }

    async fn list_campaigns(&self, user_id: Uuid) -> PortResult<Vec<Campaign>> {
        let mut campaigns: Vec<Campaign> = self
            .store
            .lock()
            .unwrap()
            .campaigns
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(campaigns)
    }

    async fn get_campaign(&self, id: Uuid, user_id: Uuid) -> PortResult<Campaign> {
        self.store
            .lock()
            .unwrap()
            .campaigns
            .iter()
            .find(|c| c.id == id && c.user_id == user_id)
            .cloned()
            .ok_or_else(|| not_found("campaign", id))
    }

    async fn create_campaign(&self, user_id: Uuid, campaign: NewCampaign) -> PortResult<Campaign> {
        let campaign = Campaign {
            id: Uuid::new_v4(),
            user_id,
            name: campaign.name,
            message: campaign.message,
            selected_contacts: campaign.selected_contacts,
            scheduled_at: campaign.scheduled_at,
            status: campaign.status,
            autoreply_enabled: campaign.autoreply_enabled,
            reply_stats: ReplyStats::default(),
            created_at: Utc::now(),
        };
        self.store.lock().unwrap().campaigns.push(campaign.clone());
        Ok(campaign)
    }

    async fn update_campaign(
        &self,
        id: Uuid,
        user_id: Uuid,
        update: CampaignUpdate,
    ) -> PortResult<Campaign> {
        let mut store = self.store.lock().unwrap();
        let campaign = store
            .campaigns
            .iter_mut()
            .find(|c| c.id == id && c.user_id == user_id)
            .ok_or_else(|| not_found("campaign", id))?;
        if let Some(name) = update.name {
            campaign.name = name;
        }
        if let Some(message) = update.message {
            campaign.message = message;
        }
        if let Some(selected) = update.selected_contacts {
            campaign.selected_contacts = selected;
        }
        if let Some(at) = update.scheduled_at {
            campaign.scheduled_at = Some(at);
        }
        if let Some(status) = update.status {
            campaign.status = status;
        }
        if let Some(enabled) = update.autoreply_enabled {
            campaign.autoreply_enabled = enabled;
        }
        Ok(campaign.clone())
    }

    async fn delete_campaign(&self, id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut store = self.store.lock().unwrap();
        let before = store.campaigns.len();
        store.campaigns.retain(|c| !(c.id == id && c.user_id == user_id));
        if store.campaigns.len() == before {
            return Err(not_found("campaign", id));
        }
        store.replies.retain(|r| r.campaign_id != id);
        Ok(())
    }

    async fn record_reply_sentiment(
        &self,
        campaign_id: Uuid,
        sentiment: Sentiment,
    ) -> PortResult<()> {
        let mut store = self.store.lock().unwrap();
        let campaign = store
            .campaigns
            .iter_mut()
            .find(|c| c.id == campaign_id)
            .ok_or_else(|| not_found("campaign", campaign_id))?;
        campaign.reply_stats.record(sentiment);
        Ok(())
    }

    async fn list_replies_for_campaign(&self, campaign_id: Uuid) -> PortResult<Vec<Reply>> {
        let mut replies: Vec<Reply> = self
            .store
            .lock()
            .unwrap()
            .replies
            .iter()
            .filter(|r| r.campaign_id == campaign_id)
            .cloned()
            .collect();
        replies.reverse();
        Ok(replies)
    }

    async fn list_replies_for_contact(&self, contact_id: Uuid) -> PortResult<Vec<Reply>> {
        let mut replies: Vec<Reply> = self
            .store
            .lock()
            .unwrap()
            .replies
            .iter()
            .filter(|r| r.contact_id == contact_id)
            .cloned()
            .collect();
        replies.reverse();
        Ok(replies)
    }

    async fn get_reply(&self, id: Uuid) -> PortResult<Reply> {
        self.store
            .lock()
            .unwrap()
            .replies
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| not_found("reply", id))
    }

    async fn create_reply(&self, reply: NewReply) -> PortResult<Reply> {
        let reply = Reply {
            id: Uuid::new_v4(),
            campaign_id: reply.campaign_id,
            contact_id: reply.contact_id,
            message: reply.message,
            sentiment: reply.sentiment,
            received_at: Utc::now(),
            is_ai_responded: false,
            ai_response: None,
            ai_response_time: None,
            is_human_responded: false,
            human_response: None,
        };
        self.store.lock().unwrap().replies.push(reply.clone());
        Ok(reply)
    }

    async fn update_reply(&self, id: Uuid, update: ReplyUpdate) -> PortResult<Reply> {
        let mut store = self.store.lock().unwrap();
        let reply = store
            .replies
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("reply", id))?;
        if let Some(flag) = update.is_ai_responded {
            reply.is_ai_responded = flag;
        }
        if let Some(text) = update.ai_response {
            reply.ai_response = Some(text);
        }
        if let Some(at) = update.ai_response_time {
            reply.ai_response_time = Some(at);
        }
        if let Some(flag) = update.is_human_responded {
            reply.is_human_responded = flag;
        }
        if let Some(text) = update.human_response {
            reply.human_response = Some(text);
        }
        Ok(reply.clone())
    }

    async fn delete_reply(&self, id: Uuid) -> PortResult<()> {
        let mut store = self.store.lock().unwrap();
        let before = store.replies.len();
        store.replies.retain(|r| r.id != id);
        if store.replies.len() == before {
            return Err(not_found("reply", id));
        }
        store.pending.retain(|p| p.reply_id != id);
        Ok(())
    }

    async fn list_faqs(&self, user_id: Uuid) -> PortResult<Vec<Faq>> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .faqs
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_faq(&self, user_id: Uuid, faq: NewFaq) -> PortResult<Faq> {
        let faq = Faq {
            id: Uuid::new_v4(),
            user_id,
            question: faq.question,
            answer: faq.answer,
            category: faq.category,
            created_at: Utc::now(),
        };
        self.store.lock().unwrap().faqs.push(faq.clone());
        Ok(faq)
    }

    async fn update_faq(&self, id: Uuid, user_id: Uuid, update: FaqUpdate) -> PortResult<Faq> {
        let mut store = self.store.lock().unwrap();
        let faq = store
            .faqs
            .iter_mut()
            .find(|f| f.id == id && f.user_id == user_id)
            .ok_or_else(|| not_found("faq", id))?;
        if let Some(question) = update.question {
            faq.question = question;
        }
        if let Some(answer) = update.answer {
            faq.answer = answer;
        }
        if let Some(category) = update.category {
            faq.category = category;
        }
        Ok(faq.clone())
    }

    async fn delete_faq(&self, id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut store = self.store.lock().unwrap();
        let before = store.faqs.len();
        store.faqs.retain(|f| !(f.id == id && f.user_id == user_id));
        if store.faqs.len() == before {
            return Err(not_found("faq", id));
        }
        Ok(())
    }

    async fn list_pending_replies(&self) -> PortResult<Vec<PendingReply>> {
        Ok(self.store.lock().unwrap().pending.clone())
    }

    async fn create_pending_reply(&self, pending: NewPendingReply) -> PortResult<PendingReply> {
        let pending = PendingReply {
            id: Uuid::new_v4(),
            reply_id: pending.reply_id,
            phone: pending.phone,
            message: pending.message,
            queued_at: Utc::now(),
            attempt_count: 0,
        };
        self.store.lock().unwrap().pending.push(pending.clone());
        Ok(pending)
    }

    async fn increment_pending_attempts(&self, id: Uuid) -> PortResult<PendingReply> {
        let mut store = self.store.lock().unwrap();
        let pending = store
            .pending
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("pending reply", id))?;
        pending.attempt_count += 1;
        Ok(pending.clone())
    }

    async fn delete_pending_reply(&self, id: Uuid) -> PortResult<()> {
        let mut store = self.store.lock().unwrap();
        let before = store.pending.len();
        store.pending.retain(|p| p.id != id);
        if store.pending.len() == before {
            return Err(not_found("pending reply", id));
        }
        Ok(())
    }
}

//=========================================================================================
// Messaging platform
//=========================================================================================

/// Everything the fake handles were asked to send, across all handles.
#[derive(Default)]
pub struct Outbox {
    pub texts: Mutex<Vec<(String, String)>>,
    pub files: Mutex<Vec<(String, String)>>,
    fail_all: AtomicBool,
    failing_chats: Mutex<HashSet<String>>,
}

impl Outbox {
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn fail_chat(&self, chat_id: &str) {
        self.failing_chats
            .lock()
            .unwrap()
            .insert(chat_id.to_string());
    }

    pub fn texts(&self) -> Vec<(String, String)> {
        self.texts.lock().unwrap().clone()
    }

    fn should_fail(&self, chat_id: &str) -> bool {
        self.fail_all.load(Ordering::SeqCst)
            || self.failing_chats.lock().unwrap().contains(chat_id)
    }
}

pub struct FakeHandle {
    outbox: Arc<Outbox>,
    pub closed: AtomicBool,
}

#[async_trait]
impl PlatformHandle for FakeHandle {
    async fn close(&self) -> PortResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send_text(&self, chat_id: &str, text: &str) -> PortResult<()> {
        if self.outbox.should_fail(chat_id) {
            return Err(PortError::Upstream(format!("send to {} failed", chat_id)));
        }
        self.outbox
            .texts
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_file(
        &self,
        chat_id: &str,
        _path: &Path,
        file_name: &str,
        _caption: &str,
    ) -> PortResult<()> {
        if self.outbox.should_fail(chat_id) {
            return Err(PortError::Upstream(format!("send to {} failed", chat_id)));
        }
        self.outbox
            .files
            .lock()
            .unwrap()
            .push((chat_id.to_string(), file_name.to_string()));
        Ok(())
    }

    async fn connection_state(&self) -> PortResult<String> {
        Ok("CONNECTED".to_string())
    }
}

#[derive(Default)]
pub struct FakePlatform {
    pub outbox: Arc<Outbox>,
    creates: AtomicUsize,
    launches: Mutex<Vec<tokio::time::Instant>>,
    fail_create: AtomicBool,
    sinks: Mutex<Vec<EventSink>>,
    handles: Mutex<Vec<Arc<FakeHandle>>>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// When every `create` call was made, failed ones included.
    pub fn launches(&self) -> Vec<tokio::time::Instant> {
        self.launches.lock().unwrap().clone()
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn closed_handles(&self) -> usize {
        self.handles
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.closed.load(Ordering::SeqCst))
            .count()
    }

    /// The sink handed to the n-th created handle (0-based).
    pub fn sink(&self, index: usize) -> EventSink {
        self.sinks.lock().unwrap()[index].clone()
    }

    pub fn latest_sink(&self) -> EventSink {
        self.sinks
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("a handle was created")
    }
}

#[async_trait]
impl MessagingPlatform for FakePlatform {
    async fn create(
        &self,
        _options: &LaunchOptions,
        events: EventSink,
    ) -> PortResult<Arc<dyn PlatformHandle>> {
        self.launches.lock().unwrap().push(tokio::time::Instant::now());
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(PortError::Upstream("browser failed to launch".to_string()));
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().unwrap().push(events);
        let handle = Arc::new(FakeHandle {
            outbox: self.outbox.clone(),
            closed: AtomicBool::new(false),
        });
        self.handles.lock().unwrap().push(handle.clone());
        Ok(handle)
    }
}

//=========================================================================================
// LLM
//=========================================================================================

/// Answers sentiment and autoreply prompts from fixed text; `None` means the
/// call fails as if no key were configured.
#[derive(Default)]
pub struct FakeLlm {
    pub sentiment: Option<String>,
    pub reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn offline() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answering(sentiment: &str, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            sentiment: Some(sentiment.to_string()),
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for FakeLlm {
    async fn complete(&self, prompt: &str, _model: Option<&str>) -> PortResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let answer = if prompt.contains("sentiment") {
            self.sentiment.clone()
        } else {
            self.reply.clone()
        };
        answer.ok_or_else(|| PortError::ServiceUnavailable("LLM API key not configured".to_string()))
    }
}

//=========================================================================================
// Session helpers
//=========================================================================================

pub fn session_config(credentials_dir: PathBuf, reconnect_interval: Duration) -> SessionConfig {
    SessionConfig {
        launch: LaunchOptions::new("test-session"),
        credentials_dir,
        reconnect_interval,
        pairing: PairingPolicy {
            timeout: Duration::from_secs(60),
            max_attempts: 5,
            retry_delay: Duration::from_millis(10),
        },
    }
}

/// Emits `event` through the newest handle's sink and applies it, retrying
/// while a concurrent reopen makes the event stale.
pub async fn deliver(
    platform: &FakePlatform,
    manager: &Arc<SessionManager>,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    event: PlatformEvent,
) -> api_lib::session::EventOutcome {
    use api_lib::session::EventOutcome;
    for _ in 0..50 {
        platform.latest_sink().emit(event.clone());
        let stamped = events.recv().await.expect("event channel open");
        let outcome = manager.apply_event(stamped).await;
        if outcome != EventOutcome::Ignored {
            return outcome;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    EventOutcome::Ignored
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
