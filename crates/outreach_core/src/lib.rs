pub mod domain;
pub mod faq;
pub mod phone;
pub mod ports;
pub mod routing;

pub use domain::{
    Campaign, CampaignStatus, CampaignUpdate, Contact, ContactUpdate, Faq,
    FaqUpdate, InboundMessage, LaunchOptions, NewCampaign, NewContact, NewFaq, NewPendingReply,
    NewReply, PendingReply, QrCode, QrKind, Reply, ReplyStats, ReplyUpdate, Sentiment, User,
    UserCredentials,
};
pub use faq::{find_matching_faq, FaqMatch, MATCH_THRESHOLD};
pub use ports::{
    CompletionService, DatabaseService, EventSink, MessagingPlatform, PlatformEvent,
    PlatformHandle, PortError, PortResult, SessionEvent,
};
