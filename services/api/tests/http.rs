mod common;

use api_lib::adapters::{FileLedger, WebhookRelay};
use api_lib::assistant::Assistant;
use api_lib::autoreply::{Autoresponder, PendingReplyQueue};
use api_lib::config::Config;
use api_lib::outreach::CampaignSender;
use api_lib::session::SessionManager;
use api_lib::web::{build_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration as Age, Utc};
use common::{session_config, FakeLlm, FakePlatform, InMemoryDb};
use outreach_core::ports::{DatabaseService, SessionEvent};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

const HOOK: &str = "/webhooks/wppconnect?token=hook-token";

struct App {
    router: Router,
    state: Arc<AppState>,
    db: Arc<InMemoryDb>,
    platform: Arc<FakePlatform>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    owner: Uuid,
    cookie: String,
    _dir: tempfile::TempDir,
}

fn test_config(dir: &std::path::Path) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        cors_origin: "http://localhost:5173".to_string(),
        openrouter_api_key: None,
        llm_base_url: "http://localhost:9".to_string(),
        llm_model: "test-model".to_string(),
        wppconnect_url: "http://localhost:21465".to_string(),
        wppconnect_secret: "secret".to_string(),
        webhook_url: "http://localhost:3000/webhooks/wppconnect".to_string(),
        webhook_token: "hook-token".to_string(),
        session_name: "test-session".to_string(),
        tokens_dir: dir.to_path_buf(),
        reconnect_interval: Duration::from_secs(3600),
        pairing_timeout: Duration::from_secs(60),
        pairing_max_attempts: 5,
        pairing_retry_delay: Duration::from_millis(10),
        send_delay: Duration::ZERO,
        sent_ledger_path: dir.join("sent.json"),
        media_attachment_path: None,
        company_info: "Acme Ltd".to_string(),
    }
}

async fn app() -> App {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(test_config(dir.path()));
    let db = InMemoryDb::new();
    let platform = FakePlatform::new();
    let (session, events) = SessionManager::new(
        platform.clone(),
        session_config(dir.path().join("s"), config.reconnect_interval),
    );

    let assistant = Arc::new(Assistant::new(FakeLlm::offline()));
    let queue = Arc::new(PendingReplyQueue::new(db.clone(), session.clone()));
    let autoresponder = Arc::new(Autoresponder::new(
        db.clone(),
        session.clone(),
        assistant.clone(),
        queue,
        Some(config.company_info.clone()),
    ));
    let outreach = Arc::new(CampaignSender::new(
        db.clone(),
        session.clone(),
        Arc::new(FileLedger::new(config.sent_ledger_path.clone())),
        config.send_delay,
        None,
    ));
    let state = Arc::new(AppState {
        db: db.clone(),
        config,
        session,
        assistant,
        autoresponder,
        outreach,
        webhooks: Arc::new(WebhookRelay::new()),
    });

    let owner = Uuid::new_v4();
    db.create_auth_session("test-token", owner, Utc::now() + Age::days(1))
        .await
        .unwrap();

    App {
        router: build_router(state.clone()),
        state,
        db,
        platform,
        events,
        owner,
        cookie: "session=test-token".to_string(),
        _dir: dir,
    }
}

impl App {
    async fn call(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn authed(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call(method, uri, Some(&self.cookie), body).await
    }
}

#[tokio::test]
async fn protected_routes_need_a_valid_cookie() {
    let app = app().await;

    let (status, _) = app.call("GET", "/api/contacts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call("GET", "/api/contacts", Some("session=forged"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.authed("GET", "/api/contacts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn signup_then_login_sets_a_session_cookie() {
    let app = app().await;
    let credentials = json!({"email": "ops@acme.test", "password": "hunter22"});

    let (status, body) = app
        .call("POST", "/auth/signup", None, Some(credentials.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "ops@acme.test");

    let (status, _) = app
        .call("POST", "/auth/signup", None, Some(credentials.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(credentials.to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session="));

    let (status, _) = app.call("GET", "/api/faqs", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let wrong = json!({"email": "ops@acme.test", "password": "nope"});
    let (status, _) = app.call("POST", "/auth/login", None, Some(wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn contacts_are_scoped_to_their_owner() {
    let app = app().await;
    let (status, created) = app
        .authed(
            "POST",
            "/api/contacts",
            Some(json!({"name": "Jane Doe", "phone": "+254 798 149 980"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Jane Doe");
    assert_eq!(created["tags"], json!([]));

    let id = created["id"].as_str().unwrap().to_string();
    let (status, updated) = app
        .authed(
            "PUT",
            &format!("/api/contacts/{}", id),
            Some(json!({"title": "CEO"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "CEO");
    assert_eq!(updated["phone"], "+254 798 149 980");

    let stranger = Uuid::new_v4();
    app.db
        .create_auth_session("other-token", stranger, Utc::now() + Age::days(1))
        .await
        .unwrap();
    let (_, theirs) = app
        .call("GET", "/api/contacts", Some("session=other-token"), None)
        .await;
    assert_eq!(theirs, json!([]));
    let (status, _) = app
        .call(
            "DELETE",
            &format!("/api/contacts/{}", id),
            Some("session=other-token"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .authed("POST", "/api/contacts", Some(json!({"name": "", "phone": "1"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_campaign_status_is_rejected() {
    let app = app().await;
    let (status, _) = app
        .authed(
            "POST",
            "/api/campaigns",
            Some(json!({"name": "Launch", "message": "Hi {{name}}", "status": "bogus"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = app
        .authed(
            "POST",
            "/api/campaigns",
            Some(json!({"name": "Launch", "message": "Hi {{name}}", "autoreplyEnabled": true})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "draft");
    assert_eq!(created["autoreplyEnabled"], true);
}

#[tokio::test]
async fn bulk_send_needs_a_session() {
    let app = app().await;
    let payload = json!({
        "contacts": [{"name": "Jane", "phone": "254798149980"}],
        "message": "Hi {{name}}",
        "campaignName": "Launch"
    });

    let (status, _) = app
        .authed("POST", "/api/send-messages", Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.authed("POST", "/api/start-session", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .authed("POST", "/api/send-messages", Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], 1);
    assert_eq!(body["duplicate"], false);
    assert_eq!(
        app.platform.outbox.texts(),
        vec![("254798149980@c.us".to_string(), "Hi Jane".to_string())]
    );

    let (_, body) = app
        .authed("POST", "/api/send-messages", Some(payload))
        .await;
    assert_eq!(body["duplicate"], true);
}

#[tokio::test]
async fn webhook_qr_reaches_the_dashboard() {
    let mut app = app().await;
    let qr_event = json!({"event": "qrcode", "qrcode": "data:image/png;base64,AAAA"});

    // Nothing attached yet.
    let (status, body) = app
        .call("POST", HOOK, None, Some(qr_event.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], false);

    let (_, started) = app.authed("POST", "/api/start-session", None).await;
    assert_eq!(started["success"], true);
    assert_eq!(app.state.session.owner().await, Some(app.owner));
    app.state.webhooks.attach(app.platform.latest_sink());

    let (_, body) = app
        .call("POST", HOOK, None, Some(qr_event))
        .await;
    assert_eq!(body["accepted"], true);

    let event = app.events.recv().await.unwrap();
    app.state.session.apply_event(event).await;

    let (status, qr) = app.authed("GET", "/api/qr", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(qr["hasQr"], true);
    assert_eq!(qr["qrType"], "image");
    assert_eq!(qr["status"], "awaitingScan");

    let (_, status_body) = app.authed("GET", "/api/session-status", None).await;
    assert_eq!(status_body["hasClient"], true);
    assert_eq!(status_body["connectionState"], "CONNECTED");
}

#[tokio::test]
async fn webhook_without_the_token_is_refused() {
    let app = app().await;
    app.authed("POST", "/api/start-session", None).await;
    app.state.webhooks.attach(app.platform.latest_sink());
    let forged = json!({"event": "status-find", "status": "browserClose"});

    for uri in [
        "/webhooks/wppconnect",
        "/webhooks/wppconnect?token=guess",
    ] {
        let (status, _) = app
            .call("POST", uri, Some(&app.cookie), Some(forged.clone()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (_, body) = app.authed("GET", "/api/session-status", None).await;
    assert_eq!(body["status"], "connecting");
}

#[tokio::test]
async fn disconnect_reports_a_closed_session() {
    let app = app().await;
    let (_, body) = app.authed("GET", "/api/session-status", None).await;
    assert_eq!(body["status"], "disconnected");
    assert_eq!(body["hasClient"], false);

    app.authed("POST", "/api/start-session", None).await;
    let (status, body) = app.authed("POST", "/api/disconnect-session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "disconnected");
    assert_eq!(app.platform.closed_handles(), 1);
}

#[tokio::test]
async fn ai_endpoints_report_a_missing_llm() {
    let app = app().await;
    let (status, _) = app
        .authed(
            "POST",
            "/api/ai/generate-message-tone",
            Some(json!({"message": "Hi", "tone": "friendly"})),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // Phone cleaning falls back to the local heuristic.
    let (status, body) = app
        .authed(
            "POST",
            "/api/ai/clean-phone-number",
            Some(json!({"phone": "0798 149 980"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "254798149980");
    assert_eq!(body["aiAssisted"], false);
}
