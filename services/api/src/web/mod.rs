//! services/api/src/web/mod.rs
//!
//! The HTTP layer. `build_router` assembles every route; the binary adds CORS
//! and the Swagger UI on top.

pub mod ai;
pub mod auth;
pub mod campaigns;
pub mod contacts;
pub mod faqs;
pub mod messaging;
pub mod middleware;
pub mod replies;
pub mod rest;
pub mod state;
pub mod webhook;

pub use middleware::require_auth;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

pub fn build_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/webhooks/wppconnect", post(webhook::wppconnect_webhook_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        // Session
        .route("/api/start-session", post(rest::start_session_handler))
        .route("/api/disconnect-session", post(rest::disconnect_session_handler))
        .route("/api/delete-session", post(rest::delete_session_handler))
        .route("/api/qr", get(rest::qr_handler))
        .route("/api/session-status", get(rest::session_status_handler))
        // Messaging
        .route("/api/send-messages", post(messaging::send_messages_handler))
        .route("/api/send-reminder", post(messaging::send_reminder_handler))
        .route(
            "/api/reset-sent-campaigns",
            post(messaging::reset_sent_campaigns_handler),
        )
        // CRUD
        .route(
            "/api/contacts",
            get(contacts::list_contacts_handler).post(contacts::create_contact_handler),
        )
        .route(
            "/api/contacts/{id}",
            put(contacts::update_contact_handler).delete(contacts::delete_contact_handler),
        )
        .route(
            "/api/campaigns",
            get(campaigns::list_campaigns_handler).post(campaigns::create_campaign_handler),
        )
        .route(
            "/api/campaigns/{id}",
            get(campaigns::get_campaign_handler)
                .put(campaigns::update_campaign_handler)
                .delete(campaigns::delete_campaign_handler),
        )
        .route(
            "/api/faqs",
            get(faqs::list_faqs_handler).post(faqs::create_faq_handler),
        )
        .route(
            "/api/faqs/{id}",
            put(faqs::update_faq_handler).delete(faqs::delete_faq_handler),
        )
        .route(
            "/api/replies",
            get(replies::list_replies_handler).post(replies::create_reply_handler),
        )
        .route(
            "/api/replies/{id}",
            put(replies::update_reply_handler).delete(replies::delete_reply_handler),
        )
        // AI
        .route("/api/ai/generate-message-tone", post(ai::generate_tone_handler))
        .route("/api/ai/standardize-contact-name", post(ai::standardize_name_handler))
        .route("/api/ai/suggest-contact-title", post(ai::suggest_title_handler))
        .route("/api/ai/clean-phone-number", post(ai::clean_phone_handler))
        .route("/api/ai/process-csv", post(ai::process_csv_handler))
        .route("/api/ai/analyze-sentiment", post(ai::analyze_sentiment_handler))
        .route("/api/ai/generate-autoreply", post(ai::generate_autoreply_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(app_state)
}
