pub mod db;
pub mod ledger;
pub mod llm;
pub mod wppconnect;

pub use db::DbAdapter;
pub use ledger::FileLedger;
pub use llm::OpenRouterAdapter;
pub use wppconnect::{WebhookRelay, WppConnectBridge};
