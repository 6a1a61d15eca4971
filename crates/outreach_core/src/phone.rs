//! crates/outreach_core/src/phone.rs
//!
//! Phone-number handling shared by contact resolution and outbound sends.

const DIRECT_CHAT_SUFFIX: &str = "@c.us";
const GROUP_CHAT_SUFFIX: &str = "@g.us";
const BROADCAST_CHAT: &str = "status@broadcast";

/// Strips the formatting characters people type into phone fields.
pub fn normalize(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '+'))
        .collect()
}

/// Fuzzy phone equality: exact match after normalization, or one being a suffix
/// of the other (covers a missing or extra country code).
///
/// An empty normalized number never matches.
pub fn phones_match(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.ends_with(&b) || b.ends_with(&a)
}

/// True for senders the bot never answers: groups and the status broadcast.
pub fn is_ignored_sender(from: &str) -> bool {
    from.contains(GROUP_CHAT_SUFFIX) || from == BROADCAST_CHAT
}

/// `"254700000000@c.us"` -> `"254700000000"`.
pub fn sender_phone(from: &str) -> &str {
    from.split('@').next().unwrap_or(from)
}

/// The direct-chat id for a stored phone number.
pub fn chat_id(phone: &str) -> String {
    if phone.ends_with(DIRECT_CHAT_SUFFIX) {
        phone.to_string()
    } else {
        format!("{}{}", normalize(phone), DIRECT_CHAT_SUFFIX)
    }
}

/// Local clean-up heuristic used before (and instead of) the LLM.
///
/// Returns digits only. Numbers that already carry a recognised country code
/// are kept; Kenyan local formats (`7…`, `1…`, `0…` of 9-10 digits) get `254`.
pub fn clean_locally(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if has_country_code(&digits) {
        return digits;
    }

    let kenyan_local = matches!(digits.len(), 9 | 10)
        && matches!(digits.chars().next(), Some('7' | '1' | '0'));
    if kenyan_local {
        if digits.starts_with('1') && digits.len() == 9 {
            return format!("254{}", digits);
        }
        return format!("254{}", &digits[digits.len() - 9..]);
    }

    digits
}

fn has_country_code(digits: &str) -> bool {
    let prefix: Vec<u32> = digits.chars().take(3).filter_map(|c| c.to_digit(10)).collect();
    match prefix.as_slice() {
        [2, 5, d] => (4..=9).contains(d),
        [2, 6, _] | [2, 7, _] | [2, 8, _] | [2, 9, _] => true,
        [3, _, _] => true,
        _ => false,
    }
}
