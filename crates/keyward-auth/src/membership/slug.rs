//! Workspace slug derivation.

use rand::Rng;

/// Longest slug base kept from a name.
const MAX_BASE_LEN: usize = 48;

/// Lowercase ASCII slug of `name`; runs of other characters become one `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
            if slug.len() >= MAX_BASE_LEN {
                break;
            }
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("workspace");
    }
    slug
}

/// `base` with a short random suffix, used after a slug collision.
pub fn with_suffix(base: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..0x100_0000);
    format!("{base}-{suffix:06x}")
}
