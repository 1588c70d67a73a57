use regex::Regex;
use std::sync::LazyLock;

// Lowercase only: `A@b.com` is rejected.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,4}$").unwrap());

// Indonesian mobile numbers in local format.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^08[1-9][0-9]{7,13}$").unwrap());

const COUNTRY_CODE: &str = "62";

pub fn is_email_valid(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Returns the number in international format (`08…` becomes `628…`), or
/// `None` if it is not a local-format mobile number.
pub fn normalize_phone(phone: &str) -> Option<String> {
    if PHONE_RE.is_match(phone) {
        Some(format!("{COUNTRY_CODE}{}", &phone[1..]))
    } else {
        None
    }
}
