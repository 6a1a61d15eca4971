//! services/api/src/adapters/ledger.rs
//!
//! A small JSON file recording which campaigns have already been bulk-sent, so
//! a retried send request does not message the same recipients twice.

use chrono::Utc;
use outreach_core::ports::{PortError, PortResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub campaign_id: Option<String>,
    pub campaign_name: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

pub struct FileLedger {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl FileLedger {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> PortResult<Vec<LedgerEntry>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(Vec::new()),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                PortError::Unexpected(format!("corrupt ledger {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }

    /// True when the campaign was already sent. The id is authoritative when
    /// present; the name is only consulted without one.
    pub async fn contains(
        &self,
        campaign_id: Option<&str>,
        campaign_name: Option<&str>,
    ) -> PortResult<bool> {
        let _guard = self.lock.lock().await;
        let entries = self.load().await?;
        let hit = match (campaign_id, campaign_name) {
            (Some(id), _) => entries
                .iter()
                .any(|e| e.campaign_id.as_deref() == Some(id)),
            (None, Some(name)) => entries
                .iter()
                .any(|e| e.campaign_name.as_deref() == Some(name)),
            (None, None) => false,
        };
        Ok(hit)
    }

    pub async fn record(
        &self,
        campaign_id: Option<&str>,
        campaign_name: Option<&str>,
    ) -> PortResult<()> {
        if campaign_id.is_none() && campaign_name.is_none() {
            return Ok(());
        }
        let _guard = self.lock.lock().await;
        let mut entries = match self.load().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Starting a fresh send ledger: {}", e);
                Vec::new()
            }
        };
        entries.push(LedgerEntry {
            campaign_id: campaign_id.map(str::to_string),
            campaign_name: campaign_name.map(str::to_string),
            timestamp: Utc::now().timestamp_millis(),
        });
        let text = serde_json::to_string_pretty(&entries)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(&self.path, text)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    /// Forgets every sent campaign.
    pub async fn reset(&self) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Sent campaigns history reset");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_and_detects_by_id_then_name() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("sent.json"));

        assert!(!ledger.contains(Some("c1"), None).await.unwrap());
        ledger.record(Some("c1"), Some("Launch")).await.unwrap();
        ledger.record(None, Some("Newsletter")).await.unwrap();

        assert!(ledger.contains(Some("c1"), None).await.unwrap());
        assert!(ledger.contains(None, Some("Newsletter")).await.unwrap());
        // An id that was never sent wins over a known name.
        assert!(!ledger.contains(Some("c2"), Some("Launch")).await.unwrap());
    }

    #[tokio::test]
    async fn reset_clears_history_and_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("sent.json"));
        ledger.reset().await.unwrap();

        ledger.record(Some("c1"), None).await.unwrap();
        ledger.reset().await.unwrap();
        assert!(!ledger.contains(Some("c1"), None).await.unwrap());
    }

    #[tokio::test]
    async fn anonymous_sends_are_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");
        let ledger = FileLedger::new(path.clone());
        ledger.record(None, None).await.unwrap();
        assert!(!path.exists());
    }
}
