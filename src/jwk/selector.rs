//! Choosing the configured key a token refers to.

use super::key::{KeyRegistry, RsaPublicKey};
use super::token::JwtHeader;

/// Picks the key a token claims to be signed with.
///
/// A `kid` must match exactly; there is no fallback to another key. Without a
/// `kid` the registry's sole key is used, and with two or more keys nothing
/// is selected. `None` is an ordinary outcome, not an error.
pub fn select<'r>(header: &JwtHeader, registry: &'r KeyRegistry) -> Option<&'r RsaPublicKey> {
    match header.kid.as_deref() {
        Some(kid) => registry.get(kid),
        None => registry.sole_key(),
    }
}
