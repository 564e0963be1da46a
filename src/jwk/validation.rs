//! Issuer and expiry checks.

use std::time::Duration;

use super::error::RejectReason;
use crate::claims::JwtClaims;

/// Checks the claims of a token whose signature already verified.
///
/// `iss` must equal `expected_issuer` exactly. A present `exp` must be after
/// `now` (epoch seconds), widened by `clock_skew`; a missing `exp` is accepted.
pub fn validate(
    claims: &JwtClaims,
    expected_issuer: &str,
    now: i64,
    clock_skew: Duration,
) -> Result<(), RejectReason> {
    if claims.iss.as_deref() != Some(expected_issuer) {
        return Err(RejectReason::IssuerMismatch);
    }

    if let Some(exp) = claims.exp {
        let skew = i64::try_from(clock_skew.as_secs()).unwrap_or(i64::MAX);
        if exp.saturating_add(skew) <= now {
            return Err(RejectReason::Expired);
        }
    }

    Ok(())
}
