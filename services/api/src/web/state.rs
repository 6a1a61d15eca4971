//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::WebhookRelay;
use crate::assistant::Assistant;
use crate::autoreply::Autoresponder;
use crate::config::Config;
use crate::outreach::CampaignSender;
use crate::session::SessionManager;
use outreach_core::ports::DatabaseService;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub session: Arc<SessionManager>,
    pub assistant: Arc<Assistant>,
    pub autoresponder: Arc<Autoresponder>,
    pub outreach: Arc<CampaignSender>,
    /// Where sidecar webhook payloads are handed to the live session.
    pub webhooks: Arc<WebhookRelay>,
}
