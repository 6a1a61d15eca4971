//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Partial updates are assembled with `QueryBuilder` so that only the fields
//! present in an update struct are written; absent fields keep their value.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outreach_core::domain::{
    Campaign, CampaignStatus, CampaignUpdate, Contact, ContactUpdate, Faq, FaqUpdate,
    NewCampaign, NewContact, NewFaq, NewPendingReply, NewReply, PendingReply, Reply, ReplyStats,
    ReplyUpdate, Sentiment, User, UserCredentials,
};
use outreach_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const CONTACT_COLUMNS: &str = "id, user_id, name, title, phone, tags, created_at, updated_at";
const CAMPAIGN_COLUMNS: &str = "id, user_id, name, message, selected_contacts, scheduled_at, \
    status, autoreply_enabled, reply_total, reply_positive, reply_negative, reply_neutral, created_at";
const REPLY_COLUMNS: &str = "id, campaign_id, contact_id, message, sentiment, received_at, \
    is_ai_responded, ai_response, ai_response_time, is_human_responded, human_response";
const FAQ_COLUMNS: &str = "id, user_id, question, answer, category, created_at";
const PENDING_COLUMNS: &str = "id, reply_id, phone, message, queued_at, attempt_count";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found(entity: &str, id: Uuid) -> PortError {
    PortError::NotFound(format!("{} {} not found", entity, id))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    name: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
            name: self.name,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct ContactRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    title: Option<String>,
    phone: String,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ContactRecord {
    fn to_domain(self) -> Contact {
        Contact {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            title: self.title,
            phone: self.phone,
            tags: self.tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CampaignRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    message: String,
    selected_contacts: Vec<Uuid>,
    scheduled_at: Option<DateTime<Utc>>,
    status: String,
    autoreply_enabled: bool,
    reply_total: i32,
    reply_positive: i32,
    reply_negative: i32,
    reply_neutral: i32,
    created_at: DateTime<Utc>,
}
impl CampaignRecord {
    fn to_domain(self) -> Campaign {
        Campaign {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            message: self.message,
            selected_contacts: self.selected_contacts,
            scheduled_at: self.scheduled_at,
            status: CampaignStatus::parse(&self.status).unwrap_or(CampaignStatus::Draft),
            autoreply_enabled: self.autoreply_enabled,
            reply_stats: ReplyStats {
                total: self.reply_total,
                positive: self.reply_positive,
                negative: self.reply_negative,
                neutral: self.reply_neutral,
            },
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ReplyRecord {
    id: Uuid,
    campaign_id: Uuid,
    contact_id: Uuid,
    message: String,
    sentiment: String,
    received_at: DateTime<Utc>,
    is_ai_responded: bool,
    ai_response: Option<String>,
    ai_response_time: Option<DateTime<Utc>>,
    is_human_responded: bool,
    human_response: Option<String>,
}
impl ReplyRecord {
    fn to_domain(self) -> Reply {
        Reply {
            id: self.id,
            campaign_id: self.campaign_id,
            contact_id: self.contact_id,
            message: self.message,
            sentiment: Sentiment::parse_lenient(&self.sentiment),
            received_at: self.received_at,
            is_ai_responded: self.is_ai_responded,
            ai_response: self.ai_response,
            ai_response_time: self.ai_response_time,
            is_human_responded: self.is_human_responded,
            human_response: self.human_response,
        }
    }
}

#[derive(FromRow)]
struct FaqRecord {
    id: Uuid,
    user_id: Uuid,
    question: String,
    answer: String,
    category: String,
    created_at: DateTime<Utc>,
}
impl FaqRecord {
    fn to_domain(self) -> Faq {
        Faq {
            id: self.id,
            user_id: self.user_id,
            question: self.question,
            answer: self.answer,
            category: self.category,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct PendingReplyRecord {
    id: Uuid,
    reply_id: Uuid,
    phone: String,
    message: String,
    queued_at: DateTime<Utc>,
    attempt_count: i32,
}
impl PendingReplyRecord {
    fn to_domain(self) -> PendingReply {
        PendingReply {
            id: self.id,
            reply_id: self.reply_id,
            phone: self.phone,
            message: self.message,
            queued_at: self.queued_at,
            attempt_count: self.attempt_count,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Users & auth ---

    async fn create_user_with_email(
        &self,
        email: &str,
        name: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, name, hashed_password) VALUES ($1, $2, $3, $4) \
             RETURNING user_id, email, name",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::InvalidInput(format!("Email {} is already registered", email))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Contacts ---

    async fn list_contacts(&self, user_id: Uuid) -> PortResult<Vec<Contact>> {
        let records = sqlx::query_as::<_, ContactRecord>(&format!(
            "SELECT {} FROM contacts WHERE user_id = $1 ORDER BY created_at DESC",
            CONTACT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_contact(&self, id: Uuid, user_id: Uuid) -> PortResult<Contact> {
        sqlx::query_as::<_, ContactRecord>(&format!(
            "SELECT {} FROM contacts WHERE id = $1 AND user_id = $2",
            CONTACT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(|r| r.to_domain())
        .ok_or_else(|| not_found("Contact", id))
    }

    async fn create_contact(&self, user_id: Uuid, contact: NewContact) -> PortResult<Contact> {
        let record = sqlx::query_as::<_, ContactRecord>(&format!(
            "INSERT INTO contacts (id, user_id, name, title, phone, tags) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            CONTACT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(contact.name)
        .bind(contact.title)
        .bind(contact.phone)
        .bind(contact.tags)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_contact(
        &self,
        id: Uuid,
        user_id: Uuid,
        update: ContactUpdate,
    ) -> PortResult<Contact> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE contacts SET updated_at = NOW()");
        if let Some(name) = update.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(title) = update.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(phone) = update.phone {
            qb.push(", phone = ").push_bind(phone);
        }
        if let Some(tags) = update.tags {
            qb.push(", tags = ").push_bind(tags);
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" AND user_id = ")
            .push_bind(user_id)
            .push(" RETURNING ")
            .push(CONTACT_COLUMNS);

        qb.build_query_as::<ContactRecord>()
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(|r| r.to_domain())
            .ok_or_else(|| not_found("Contact", id))
    }

    async fn delete_contact(&self, id: Uuid, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Contact", id));
        }
        Ok(())
    }

    // --- Campaigns ---

    async fn list_campaigns(&self, user_id: Uuid) -> PortResult<Vec<Campaign>> {
        let records = sqlx::query_as::<_, CampaignRecord>(&format!(
            "SELECT {} FROM campaigns WHERE user_id = $1 ORDER BY created_at DESC",
            CAMPAIGN_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_campaign(&self, id: Uuid, user_id: Uuid) -> PortResult<Campaign> {
        sqlx::query_as::<_, CampaignRecord>(&format!(
            "SELECT {} FROM campaigns WHERE id = $1 AND user_id = $2",
            CAMPAIGN_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(|r| r.to_domain())
        .ok_or_else(|| not_found("Campaign", id))
    }

    async fn create_campaign(&self, user_id: Uuid, campaign: NewCampaign) -> PortResult<Campaign> {
        let record = sqlx::query_as::<_, CampaignRecord>(&format!(
            "INSERT INTO campaigns (id, user_id, name, message, selected_contacts, scheduled_at, \
             status, autoreply_enabled) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            CAMPAIGN_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(campaign.name)
        .bind(campaign.message)
        .bind(campaign.selected_contacts)
        .bind(campaign.scheduled_at)
        .bind(campaign.status.as_str())
        .bind(campaign.autoreply_enabled)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_campaign(
        &self,
        id: Uuid,
        user_id: Uuid,
        update: CampaignUpdate,
    ) -> PortResult<Campaign> {
        // `id = id` keeps the SET list valid when the update carries no fields.
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE campaigns SET id = id");
        if let Some(name) = update.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(message) = update.message {
            qb.push(", message = ").push_bind(message);
        }
        if let Some(selected) = update.selected_contacts {
            qb.push(", selected_contacts = ").push_bind(selected);
        }
        if let Some(scheduled_at) = update.scheduled_at {
            qb.push(", scheduled_at = ").push_bind(scheduled_at);
        }
        if let Some(status) = update.status {
            qb.push(", status = ").push_bind(status.as_str());
        }
        if let Some(enabled) = update.autoreply_enabled {
            qb.push(", autoreply_enabled = ").push_bind(enabled);
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" AND user_id = ")
            .push_bind(user_id)
            .push(" RETURNING ")
            .push(CAMPAIGN_COLUMNS);

        qb.build_query_as::<CampaignRecord>()
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(|r| r.to_domain())
            .ok_or_else(|| not_found("Campaign", id))
    }

    async fn delete_campaign(&self, id: Uuid, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Campaign", id));
        }
        Ok(())
    }

    async fn record_reply_sentiment(
        &self,
        campaign_id: Uuid,
        sentiment: Sentiment,
    ) -> PortResult<()> {
        let column = match sentiment {
            Sentiment::Positive => "reply_positive",
            Sentiment::Negative => "reply_negative",
            Sentiment::Neutral => "reply_neutral",
        };
        let result = sqlx::query(&format!(
            "UPDATE campaigns SET reply_total = reply_total + 1, {0} = {0} + 1 WHERE id = $1",
            column
        ))
        .bind(campaign_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Campaign", campaign_id));
        }
        Ok(())
    }

    // --- Replies ---

    async fn list_replies_for_campaign(&self, campaign_id: Uuid) -> PortResult<Vec<Reply>> {
        let records = sqlx::query_as::<_, ReplyRecord>(&format!(
            "SELECT {} FROM replies WHERE campaign_id = $1 ORDER BY received_at DESC",
            REPLY_COLUMNS
        ))
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_replies_for_contact(&self, contact_id: Uuid) -> PortResult<Vec<Reply>> {
        let records = sqlx::query_as::<_, ReplyRecord>(&format!(
            "SELECT {} FROM replies WHERE contact_id = $1 ORDER BY received_at DESC",
            REPLY_COLUMNS
        ))
        .bind(contact_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_reply(&self, id: Uuid) -> PortResult<Reply> {
        sqlx::query_as::<_, ReplyRecord>(&format!(
            "SELECT {} FROM replies WHERE id = $1",
            REPLY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(|r| r.to_domain())
        .ok_or_else(|| not_found("Reply", id))
    }

    async fn create_reply(&self, reply: NewReply) -> PortResult<Reply> {
        let record = sqlx::query_as::<_, ReplyRecord>(&format!(
            "INSERT INTO replies (id, campaign_id, contact_id, message, sentiment) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            REPLY_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(reply.campaign_id)
        .bind(reply.contact_id)
        .bind(reply.message)
        .bind(reply.sentiment.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_reply(&self, id: Uuid, update: ReplyUpdate) -> PortResult<Reply> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE replies SET id = id");
        if let Some(flag) = update.is_ai_responded {
            qb.push(", is_ai_responded = ").push_bind(flag);
        }
        if let Some(text) = update.ai_response {
            qb.push(", ai_response = ").push_bind(text);
        }
        if let Some(at) = update.ai_response_time {
            qb.push(", ai_response_time = ").push_bind(at);
        }
        if let Some(flag) = update.is_human_responded {
            qb.push(", is_human_responded = ").push_bind(flag);
        }
        if let Some(text) = update.human_response {
            qb.push(", human_response = ").push_bind(text);
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(REPLY_COLUMNS);

        qb.build_query_as::<ReplyRecord>()
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(|r| r.to_domain())
            .ok_or_else(|| not_found("Reply", id))
    }

    async fn delete_reply(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM replies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Reply", id));
        }
        Ok(())
    }

    // --- FAQs ---

    async fn list_faqs(&self, user_id: Uuid) -> PortResult<Vec<Faq>> {
        let records = sqlx::query_as::<_, FaqRecord>(&format!(
            "SELECT {} FROM faqs WHERE user_id = $1 ORDER BY created_at ASC",
            FAQ_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_faq(&self, user_id: Uuid, faq: NewFaq) -> PortResult<Faq> {
        let record = sqlx::query_as::<_, FaqRecord>(&format!(
            "INSERT INTO faqs (id, user_id, question, answer, category) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            FAQ_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(faq.question)
        .bind(faq.answer)
        .bind(faq.category)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_faq(&self, id: Uuid, user_id: Uuid, update: FaqUpdate) -> PortResult<Faq> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE faqs SET id = id");
        if let Some(question) = update.question {
            qb.push(", question = ").push_bind(question);
        }
        if let Some(answer) = update.answer {
            qb.push(", answer = ").push_bind(answer);
        }
        if let Some(category) = update.category {
            qb.push(", category = ").push_bind(category);
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" AND user_id = ")
            .push_bind(user_id)
            .push(" RETURNING ")
            .push(FAQ_COLUMNS);

        qb.build_query_as::<FaqRecord>()
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(|r| r.to_domain())
            .ok_or_else(|| not_found("FAQ", id))
    }

    async fn delete_faq(&self, id: Uuid, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM faqs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(not_found("FAQ", id));
        }
        Ok(())
    }

    // --- Pending replies ---

    async fn list_pending_replies(&self) -> PortResult<Vec<PendingReply>> {
        let records = sqlx::query_as::<_, PendingReplyRecord>(&format!(
            "SELECT {} FROM pending_replies ORDER BY seq ASC",
            PENDING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_pending_reply(&self, pending: NewPendingReply) -> PortResult<PendingReply> {
        let record = sqlx::query_as::<_, PendingReplyRecord>(&format!(
            "INSERT INTO pending_replies (id, reply_id, phone, message) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            PENDING_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(pending.reply_id)
        .bind(pending.phone)
        .bind(pending.message)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn increment_pending_attempts(&self, id: Uuid) -> PortResult<PendingReply> {
        sqlx::query_as::<_, PendingReplyRecord>(&format!(
            "UPDATE pending_replies SET attempt_count = attempt_count + 1 WHERE id = $1 RETURNING {}",
            PENDING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(|r| r.to_domain())
        .ok_or_else(|| not_found("Pending reply", id))
    }

    async fn delete_pending_reply(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM pending_replies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(not_found("Pending reply", id));
        }
        Ok(())
    }
}
