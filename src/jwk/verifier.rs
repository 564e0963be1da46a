use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::Algorithm;
use tracing::debug;

use super::config::VerifierSettings;
use super::error::{FormatError, RejectReason};
use super::key::KeyRegistry;
use super::{selector, signature, token, validation};
use crate::claims::JwtClaims;

/// Outcome of verifying one token.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationResult {
    /// Every check passed.
    Accepted(JwtClaims),
    /// The first check that failed.
    Rejected(RejectReason),
}

impl VerificationResult {
    /// Whether the token was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, VerificationResult::Accepted(_))
    }

    /// Turns the outcome into a `Result`.
    pub fn into_result(self) -> Result<JwtClaims, RejectReason> {
        match self {
            VerificationResult::Accepted(claims) => Ok(claims),
            VerificationResult::Rejected(reason) => Err(reason),
        }
    }
}

/// Verifies bearer tokens against a fixed [`KeyRegistry`].
///
/// Each call runs parse, key selection, signature check and claim checks in
/// that order and stops at the first failure. Calls share nothing but the
/// read-only registry, so one verifier can serve any number of threads.
#[derive(Debug)]
pub struct JwkVerifier {
    keys: KeyRegistry,
    settings: VerifierSettings,
}

impl JwkVerifier {
    /// Verifier trusting `keys` and applying `settings`.
    pub fn new(keys: KeyRegistry, settings: VerifierSettings) -> JwkVerifier {
        JwkVerifier { keys, settings }
    }

    /// The trusted keys.
    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }

    /// The checks applied to every token.
    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// Verifies `token` against the current time.
    pub fn verify(&self, token: &str) -> VerificationResult {
        self.verify_at(token, SystemTime::now())
    }

    /// Like [`verify`](Self::verify) with an explicit current time.
    pub fn verify_at(&self, token: &str, now: SystemTime) -> VerificationResult {
        match self.check(token, now) {
            Ok(claims) => VerificationResult::Accepted(claims),
            Err(reason) => VerificationResult::Rejected(reason),
        }
    }

    fn check(&self, token: &str, now: SystemTime) -> Result<JwtClaims, RejectReason> {
        let limit = self.settings.max_token_bytes();
        if token.len() > limit {
            return Err(malformed(&FormatError::TooLarge {
                len: token.len(),
                limit,
            }));
        }

        let parsed = token::parse(token).map_err(|err| malformed(&err))?;
        let header = parsed.header();

        let Some(key) = selector::select(header, &self.keys) else {
            debug!(kid = ?header.kid, keys = self.keys.len(), "Rejected token: no matching key");
            return Err(RejectReason::UnknownKey);
        };

        let allowed = self
            .settings
            .algorithm()
            .is_none_or(|required| Algorithm::from_str(&header.alg).is_ok_and(|alg| alg == required));

        if !allowed
            || !signature::verify(
                &header.alg,
                parsed.signing_input().as_bytes(),
                parsed.signature(),
                key,
            )
        {
            debug!(kid = ?key.kid(), alg = %header.alg, "Rejected token: invalid signature");
            return Err(RejectReason::BadSignature);
        }

        let payload = parsed.payload().map_err(|_| {
            debug!(kid = ?key.kid(), "Rejected token: payload is not base64url");
            RejectReason::MalformedToken
        })?;
        let claims: JwtClaims = serde_json::from_slice(&payload).map_err(|err| {
            debug!(kid = ?key.kid(), error = %err, "Rejected token: payload is not a claims set");
            RejectReason::MalformedToken
        })?;

        validation::validate(
            &claims,
            self.settings.issuer(),
            unix_secs(now),
            self.settings.clock_skew(),
        )
        .inspect_err(|reason| debug!(kid = ?key.kid(), %reason, "Rejected token"))?;

        Ok(claims)
    }
}

fn malformed(err: &FormatError) -> RejectReason {
    debug!(error = %err, "Rejected token: malformed");
    RejectReason::MalformedToken
}

fn unix_secs(now: SystemTime) -> i64 {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());
    i64::try_from(secs).unwrap_or(i64::MAX)
}
