//! RSA signature checks over the received signing input.

use std::str::FromStr;

use jsonwebtoken::{crypto, Algorithm};

use super::key::RsaPublicKey;

/// RSA PKCS#1 v1.5 and RSA-PSS signature algorithms.
pub fn is_rsa_algorithm(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}

/// Checks `signature` over the literal `signing_input` bytes.
///
/// Any failure yields `false`: an unknown or non-RSA `header_alg`, an
/// algorithm other than the one the key is pinned to, a signature that is not
/// base64url, or one that does not verify.
pub fn verify(
    header_alg: &str,
    signing_input: &[u8],
    signature: &str,
    key: &RsaPublicKey,
) -> bool {
    let Ok(algorithm) = Algorithm::from_str(header_alg) else {
        return false;
    };

    if !is_rsa_algorithm(algorithm) {
        return false;
    }

    if key.alg().is_some_and(|pinned| pinned != algorithm) {
        return false;
    }

    crypto::verify(signature, signing_input, key.decoding_key(), algorithm).unwrap_or(false)
}
