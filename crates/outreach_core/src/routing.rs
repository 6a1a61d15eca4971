//! crates/outreach_core/src/routing.rs
//!
//! Pure selection rules used when an inbound message arrives: which contact sent
//! it and which campaign, if any, it should be filed under.

use crate::domain::{Campaign, Contact};
use crate::phone;

/// First contact whose stored phone fuzzily matches the sender's number.
pub fn resolve_contact<'a>(sender_phone: &str, contacts: &'a [Contact]) -> Option<&'a Contact> {
    contacts
        .iter()
        .find(|contact| phone::phones_match(&contact.phone, sender_phone))
}

/// The most recently created autoreply-enabled campaign that targets the contact.
pub fn select_autoreply_campaign<'a>(
    contact: &Contact,
    campaigns: &'a [Campaign],
) -> Option<&'a Campaign> {
    let mut candidates: Vec<&Campaign> = campaigns
        .iter()
        .filter(|campaign| campaign.covers_for_autoreply(contact.id))
        .collect();
    candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    candidates.into_iter().next()
}
