mod common;

use api_lib::adapters::FileLedger;
use api_lib::outreach::{CampaignSend, CampaignSender, Recipient, SendReport};
use api_lib::session::SessionManager;
use chrono::Utc;
use common::{session_config, FakePlatform, InMemoryDb};
use outreach_core::domain::CampaignStatus;
use outreach_core::ports::PortError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

struct Setup {
    owner: Uuid,
    db: Arc<InMemoryDb>,
    platform: Arc<FakePlatform>,
    session: Arc<SessionManager>,
    sender: CampaignSender,
    dir: tempfile::TempDir,
}

async fn setup(attachment: Option<&str>, connected: bool) -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let db = InMemoryDb::new();
    let platform = FakePlatform::new();
    let (session, _events) = SessionManager::new(
        platform.clone(),
        session_config(dir.path().join("s"), Duration::from_secs(3600)),
    );
    let owner = Uuid::new_v4();
    if connected {
        session.connect(Some(owner)).await.unwrap();
    }

    let attachment = attachment.map(|name| {
        let path: PathBuf = dir.path().join(name);
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        path
    });
    let sender = CampaignSender::new(
        db.clone(),
        session.clone(),
        Arc::new(FileLedger::new(dir.path().join("sent.json"))),
        Duration::ZERO,
        attachment,
    );
    Setup {
        owner,
        db,
        platform,
        session,
        sender,
        dir,
    }
}

fn recipient(name: &str, phone: &str) -> Recipient {
    Recipient {
        name: name.to_string(),
        phone: phone.to_string(),
        title: Some("Director".to_string()),
    }
}

fn request(campaign_id: Option<String>) -> CampaignSend {
    CampaignSend {
        recipients: vec![
            recipient("Amina Wanjiru", "+254 700 000 001"),
            recipient("Brian Otieno", "254700000002"),
            recipient("Carol", "0700 000 003"),
        ],
        message: "Hi {{name}}, a note for our {{title}}s.".to_string(),
        campaign_id,
        campaign_name: Some("Launch".to_string()),
    }
}

#[tokio::test]
async fn partial_failure_is_counted_and_repeat_is_a_duplicate() {
    let s = setup(None, true).await;
    s.platform.outbox.fail_chat("254700000002@c.us");

    let report = s.sender.send(s.owner, request(None)).await.unwrap();
    assert_eq!(
        report,
        SendReport {
            success: 2,
            failed: 1,
            duplicate: false
        }
    );
    assert_eq!(
        s.platform.outbox.texts(),
        vec![
            (
                "254700000001@c.us".to_string(),
                "Hi Amina, a note for our Directors.".to_string()
            ),
            (
                "0700000003@c.us".to_string(),
                "Hi Carol, a note for our Directors.".to_string()
            ),
        ]
    );

    let again = s.sender.send(s.owner, request(None)).await.unwrap();
    assert!(again.duplicate);
    assert_eq!((again.success, again.failed), (0, 0));
    assert_eq!(s.platform.outbox.texts().len(), 2);
}

#[tokio::test]
async fn overlapping_sends_of_one_campaign_go_out_once() {
    let s = setup(None, true).await;
    let campaign = Some("camp-1".to_string());

    let (a, b) = tokio::join!(
        s.sender.send(s.owner, request(campaign.clone())),
        s.sender.send(s.owner, request(campaign.clone())),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.duplicate, b.duplicate);
    assert_eq!(a.success + b.success, 3);
    assert_eq!(s.platform.outbox.texts().len(), 3);
}

#[tokio::test]
async fn reset_ledger_allows_a_resend() {
    let s = setup(None, true).await;
    s.sender.send(s.owner, request(None)).await.unwrap();
    s.sender.ledger().reset().await.unwrap();

    let report = s.sender.send(s.owner, request(None)).await.unwrap();
    assert!(!report.duplicate);
    assert_eq!(s.platform.outbox.texts().len(), 6);
}

#[tokio::test]
async fn known_campaign_is_marked_sent() {
    let s = setup(None, true).await;
    let campaign = s
        .db
        .seed_campaign(s.owner, "Launch", &[], false, Utc::now());

    s.sender
        .send(s.owner, request(Some(campaign.id.to_string())))
        .await
        .unwrap();
    assert_eq!(s.db.campaign(campaign.id).status, CampaignStatus::Sent);
}

#[tokio::test]
async fn attachment_follows_each_text() {
    let s = setup(Some("brochure.pdf"), true).await;

    let report = s.sender.send(s.owner, request(None)).await.unwrap();
    assert_eq!(report.success, 3);
    let files = s.platform.outbox.files.lock().unwrap().clone();
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|(_, name)| name == "brochure.pdf"));
    assert!(s.dir.path().join("sent.json").exists());
}

#[tokio::test]
async fn blank_phone_fails_without_sending() {
    let s = setup(None, true).await;
    let mut req = request(Some("c-1".to_string()));
    req.recipients = vec![recipient("Nobody", " - ")];

    let report = s.sender.send(s.owner, req).await.unwrap();
    assert_eq!((report.success, report.failed), (0, 1));
    assert!(s.platform.outbox.texts().is_empty());
}

#[tokio::test]
async fn refuses_without_a_session() {
    let s = setup(None, false).await;
    assert!(!s.session.has_client().await);

    let err = s.sender.send(s.owner, request(None)).await.unwrap_err();
    assert!(matches!(err, PortError::InvalidInput(_)));
}

#[tokio::test]
async fn refuses_an_empty_request() {
    let s = setup(None, true).await;
    let mut req = request(None);
    req.message = "   ".to_string();
    assert!(matches!(
        s.sender.send(s.owner, req).await,
        Err(PortError::InvalidInput(_))
    ));

    let mut req = request(None);
    req.recipients.clear();
    assert!(matches!(
        s.sender.send(s.owner, req).await,
        Err(PortError::InvalidInput(_))
    ));
}
