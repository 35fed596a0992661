//! Email address normalisation.
//!
//! Accounts and invitations compare email addresses case-insensitively, so
//! every email is stored in its normalised form.

/// Returns the canonical form of an email address: trimmed and lowercased.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Compares two addresses after normalisation.
pub fn emails_match(a: &str, b: &str) -> bool {
    normalize_email(a) == normalize_email(b)
}
