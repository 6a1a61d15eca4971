//! services/api/src/adapters/wppconnect.rs
//!
//! This module contains the messaging-platform adapter. It implements the
//! `MessagingPlatform` and `PlatformHandle` ports by driving a wppconnect-server
//! sidecar over HTTP. The sidecar reports QR codes, status changes and inbound
//! messages by posting to our webhook; `WebhookRelay` normalizes those payloads
//! into `PlatformEvent`s and forwards them to the sink of the current handle.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use outreach_core::domain::{InboundMessage, LaunchOptions, QrCode};
use outreach_core::ports::{
    EventSink, MessagingPlatform, PlatformEvent, PlatformHandle, PortError, PortResult,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

//=========================================================================================
// Webhook relay
//=========================================================================================

/// Forwards webhook payloads from the sidecar into the sink of the live handle.
#[derive(Default)]
pub struct WebhookRelay {
    sink: Mutex<Option<EventSink>>,
}

impl WebhookRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes subsequent webhook events to `sink`, replacing any previous one.
    pub fn attach(&self, sink: EventSink) {
        if let Ok(mut guard) = self.sink.lock() {
            *guard = Some(sink);
        }
    }

    /// Normalizes one webhook payload and emits it.
    ///
    /// Returns false when the payload carries nothing we act on or no handle
    /// is currently attached.
    pub fn relay(&self, payload: &Value) -> bool {
        let Some(event) = parse_webhook(payload) else {
            debug!("Ignoring webhook event {:?}", payload.get("event"));
            return false;
        };
        let sink = match self.sink.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        match sink {
            Some(sink) => sink.emit(event),
            None => {
                debug!("Webhook event arrived with no session attached");
                false
            }
        }
    }
}

/// Turns any QR representation the sidecar produces into a `QrCode`.
///
/// Strings are used as-is; objects contribute their `qrcode`, `urlcode` or `code`
/// string field; anything else is serialized verbatim.
pub fn qr_from_json(value: &Value) -> QrCode {
    match value {
        Value::String(s) => QrCode::from_text(s.clone()),
        Value::Object(map) => ["qrcode", "urlcode", "code"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(QrCode::from_text)
            .unwrap_or_else(|| QrCode::from_text(value.to_string())),
        other => QrCode::from_text(other.to_string()),
    }
}

/// Maps a sidecar webhook payload to a platform event.
pub fn parse_webhook(payload: &Value) -> Option<PlatformEvent> {
    let event = payload.get("event")?.as_str()?;
    match event {
        "qrcode" => Some(PlatformEvent::Qr(qr_from_json(payload))),
        "status-find" | "onstatechange" => {
            let status = payload
                .get("status")
                .or_else(|| payload.get("state"))?
                .as_str()?;
            Some(PlatformEvent::Status(status.to_string()))
        }
        "onmessage" => {
            if payload.get("fromMe").and_then(Value::as_bool).unwrap_or(false) {
                return None;
            }
            let from = payload.get("from")?.as_str()?;
            let body = payload.get("body").and_then(Value::as_str).unwrap_or_default();
            Some(PlatformEvent::Message(InboundMessage {
                from: from.to_string(),
                body: body.to_string(),
            }))
        }
        _ => None,
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `MessagingPlatform` against a wppconnect-server sidecar.
pub struct WppConnectBridge {
    http: reqwest::Client,
    base_url: String,
    secret: String,
    webhook_url: String,
    relay: Arc<WebhookRelay>,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

impl WppConnectBridge {
    /// Creates a new `WppConnectBridge`.
    pub fn new(
        base_url: &str,
        secret: String,
        webhook_url: String,
        relay: Arc<WebhookRelay>,
    ) -> PortResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| PortError::Unexpected(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret,
            webhook_url,
            relay,
        })
    }

    async fn generate_token(&self, session: &str) -> PortResult<String> {
        let url = format!(
            "{}/api/{}/{}/generate-token",
            self.base_url, session, self.secret
        );
        let response = self.http.post(&url).send().await.map_err(sidecar_unreachable)?;
        let body = check_status(response).await?;
        let parsed: TokenResponse = serde_json::from_value(body)
            .map_err(|e| PortError::Upstream(format!("unexpected token response: {e}")))?;
        Ok(parsed.token)
    }
}

#[async_trait]
impl MessagingPlatform for WppConnectBridge {
    async fn create(
        &self,
        options: &LaunchOptions,
        events: EventSink,
    ) -> PortResult<Arc<dyn PlatformHandle>> {
        let session = options.session_name.clone();
        let token = self.generate_token(&session).await?;

        // Attach first so the QR webhook that follows start-session is not lost.
        self.relay.attach(events.clone());

        let url = format!("{}/api/{}/start-session", self.base_url, session);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&json!({
                "webhook": self.webhook_url,
                "waitQrCode": false,
                "headless": options.headless,
                "autoClose": options.auto_close.as_millis() as u64,
                "protocolTimeout": options.protocol_timeout.as_millis() as u64,
                "browserArgs": options.browser_args,
            }))
            .send()
            .await
            .map_err(sidecar_unreachable)?;
        let body = check_status(response).await?;

        // The sidecar sometimes answers start-session with the QR already in hand.
        if body.get("qrcode").and_then(Value::as_str).is_some() {
            events.emit(PlatformEvent::Qr(qr_from_json(&body)));
        }
        info!(
            "Sidecar session '{}' started (generation {})",
            session,
            events.generation()
        );

        Ok(Arc::new(WppConnectHandle {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            session,
            token,
        }))
    }
}

//=========================================================================================
// `PlatformHandle` Implementation
//=========================================================================================

struct WppConnectHandle {
    http: reqwest::Client,
    base_url: String,
    session: String,
    token: String,
}

impl WppConnectHandle {
    fn url(&self, action: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, self.session, action)
    }

    async fn post(&self, action: &str, body: Value) -> PortResult<Value> {
        let response = self
            .http
            .post(self.url(action))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(sidecar_unreachable)?;
        check_status(response).await
    }
}

#[async_trait]
impl PlatformHandle for WppConnectHandle {
    async fn close(&self) -> PortResult<()> {
        self.post("close-session", json!({})).await?;
        Ok(())
    }

    async fn send_text(&self, chat_id: &str, text: &str) -> PortResult<()> {
        self.post(
            "send-message",
            json!({
                "phone": bare_phone(chat_id),
                "isGroup": false,
                "message": text,
            }),
        )
        .await?;
        Ok(())
    }

    async fn send_file(
        &self,
        chat_id: &str,
        path: &Path,
        file_name: &str,
        caption: &str,
    ) -> PortResult<()> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PortError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
        })?;
        let data_uri = format!("data:{};base64,{}", mime_for(path), STANDARD.encode(bytes));
        self.post(
            "send-file-base64",
            json!({
                "phone": bare_phone(chat_id),
                "isGroup": false,
                "filename": file_name,
                "caption": caption,
                "base64": data_uri,
            }),
        )
        .await?;
        Ok(())
    }

    async fn connection_state(&self) -> PortResult<String> {
        let response = self
            .http
            .get(self.url("check-connection-session"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(sidecar_unreachable)?;
        let body = check_status(response).await?;
        let connected = body.get("status").and_then(Value::as_bool).unwrap_or(false);
        Ok(if connected {
            "CONNECTED".to_string()
        } else {
            body.get("message")
                .and_then(Value::as_str)
                .map(|m| m.to_uppercase())
                .unwrap_or_else(|| "DISCONNECTED".to_string())
        })
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn sidecar_unreachable(e: reqwest::Error) -> PortError {
    PortError::Upstream(format!("messaging sidecar unreachable: {e}"))
}

async fn check_status(response: reqwest::Response) -> PortResult<Value> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    if !status.is_success() || body.get("status").and_then(Value::as_str) == Some("error") {
        warn!(status = %status, "Messaging sidecar rejected request: {}", body);
        return Err(PortError::Upstream(format!(
            "messaging sidecar returned {}: {}",
            status,
            body.get("message").and_then(Value::as_str).unwrap_or("no details")
        )));
    }
    Ok(body)
}

/// The sidecar wants the bare number; it adds the chat suffix itself.
fn bare_phone(chat_id: &str) -> &str {
    chat_id.split('@').next().unwrap_or(chat_id)
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("mp4") => "video/mp4",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
