use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Claims of a token whose signature has been verified.
///
/// Registered claims this crate acts on are typed; everything else is kept
/// in [`JwtClaims::extra`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Issuer of the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration time (epoch seconds)
    #[serde(
        default,
        deserialize_with = "numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub exp: Option<i64>,

    /// Any other claims (`upn`, `groups`, `iat`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JwtClaims {
    /// The caller's name: `upn`, then `preferred_username`, then `sub`.
    pub fn principal_name(&self) -> Option<&str> {
        ["upn", "preferred_username"]
            .iter()
            .find_map(|claim| self.extra.get(*claim).and_then(Value::as_str))
            .or(self.sub.as_deref())
    }

    /// Group names from the `groups` claim.
    pub fn groups(&self) -> Vec<&str> {
        self.extra
            .get("groups")
            .and_then(Value::as_array)
            .map(|groups| groups.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// A NumericDate may carry a fraction; it is truncated to whole seconds.
#[expect(clippy::cast_possible_truncation)]
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };

    number
        .as_i64()
        .or_else(|| number.as_f64().map(|secs| secs.floor() as i64))
        .map(Some)
        .ok_or_else(|| de::Error::custom("'exp' is not a NumericDate"))
}

/// An accepted bearer token together with its claims.
#[derive(Clone, Debug)]
pub struct AuthenticatedToken {
    raw: String,
    claims: JwtClaims,
}

impl AuthenticatedToken {
    pub(crate) fn new(raw: impl Into<String>, claims: JwtClaims) -> AuthenticatedToken {
        AuthenticatedToken {
            raw: raw.into(),
            claims,
        }
    }

    /// The compact token exactly as presented.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Verified claims of the token.
    pub fn claims(&self) -> &JwtClaims {
        &self.claims
    }

    /// Drops the raw token and keeps its claims.
    pub fn into_claims(self) -> JwtClaims {
        self.claims
    }
}
