//! services/api/src/autoreply/mod.rs
//!
//! Inbound message routing and the pending-reply retry queue.

pub mod retry;
pub mod router;

pub use retry::{PendingReplyQueue, ReplayReport};
pub use router::{Autoresponder, IgnoreReason, RouteOutcome};
