use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;

use super::error::ConfigError;
use super::signature::is_rsa_algorithm;

/// Inline key document, JSON or base64url-encoded JSON.
pub const PUBLIC_KEY: &str = "mp.jwt.verify.publickey";
/// Location of a key document: `http(s)://`, `file://` or a plain path.
pub const PUBLIC_KEY_LOCATION: &str = "mp.jwt.verify.publickey.location";
/// Expected `iss` claim.
pub const ISSUER: &str = "mp.jwt.verify.issuer";
/// Algorithm every token must be signed with.
pub const PUBLIC_KEY_ALGORITHM: &str = "mp.jwt.verify.publickey.algorithm";
/// Tolerance in seconds applied to `exp`.
pub const CLOCK_SKEW: &str = "mp.jwt.verify.clock.skew";

/// Upper bound on the size of a compact token.
pub const DEFAULT_MAX_TOKEN_BYTES: usize = 8 * 1024;

/// The issuer a token's `iss` claim must equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issuer(String);

impl Issuer {
    /// Wraps the expected `iss` value.
    pub fn new(issuer: impl Into<String>) -> Issuer {
        Issuer(issuer.into())
    }
}

impl Deref for Issuer {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

/// Where the key document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeySource {
    /// The document itself.
    Inline(String),
    /// A URL or path to read the document from.
    Location(String),
}

/// What a token must satisfy, besides verifying under a configured key.
///
/// Used by [`JwkVerifier`](super::JwkVerifier) on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSettings {
    issuer: Issuer,
    algorithm: Option<Algorithm>,
    clock_skew: Duration,
    max_token_bytes: usize,
}

impl VerifierSettings {
    /// Settings expecting `issuer`, with no clock skew and the default size limit.
    pub fn new(issuer: impl Into<String>) -> VerifierSettings {
        VerifierSettings {
            issuer: Issuer::new(issuer),
            algorithm: None,
            clock_skew: Duration::ZERO,
            max_token_bytes: DEFAULT_MAX_TOKEN_BYTES,
        }
    }

    /// Only accept tokens signed with `algorithm`.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> VerifierSettings {
        self.algorithm = Some(algorithm);
        self
    }

    /// Tolerance applied to `exp`.
    pub fn with_clock_skew(mut self, clock_skew: Duration) -> VerifierSettings {
        self.clock_skew = clock_skew;
        self
    }

    /// Larger tokens are rejected before any decoding.
    pub fn with_max_token_bytes(mut self, max_token_bytes: usize) -> VerifierSettings {
        self.max_token_bytes = max_token_bytes;
        self
    }

    /// The `iss` value tokens must carry.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The algorithm every token must use, if restricted.
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    /// Tolerance applied to `exp`.
    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Upper bound on the compact token length.
    pub fn max_token_bytes(&self) -> usize {
        self.max_token_bytes
    }
}

/// Where the trusted keys come from, and what tokens must satisfy.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    public_key: PublicKeySource,
    settings: VerifierSettings,
}

impl VerifierConfig {
    /// Config with default settings for `issuer`.
    pub fn new(public_key: PublicKeySource, issuer: impl Into<String>) -> VerifierConfig {
        VerifierConfig {
            public_key,
            settings: VerifierSettings::new(issuer),
        }
    }

    /// Config with an inline key document.
    pub fn inline(document: impl Into<String>, issuer: impl Into<String>) -> VerifierConfig {
        Self::new(PublicKeySource::Inline(document.into()), issuer)
    }

    /// Config reading its key document from `location` at startup.
    pub fn location(location: impl Into<String>, issuer: impl Into<String>) -> VerifierConfig {
        Self::new(PublicKeySource::Location(location.into()), issuer)
    }

    /// Only accept tokens signed with `algorithm`.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> VerifierConfig {
        self.settings = self.settings.with_algorithm(algorithm);
        self
    }

    /// See [`VerifierSettings::with_clock_skew`].
    pub fn with_clock_skew(mut self, clock_skew: Duration) -> VerifierConfig {
        self.settings = self.settings.with_clock_skew(clock_skew);
        self
    }

    /// See [`VerifierSettings::with_max_token_bytes`].
    pub fn with_max_token_bytes(mut self, max_token_bytes: usize) -> VerifierConfig {
        self.settings = self.settings.with_max_token_bytes(max_token_bytes);
        self
    }

    /// Resolves the `mp.jwt.verify.*` keys through `lookup`.
    ///
    /// Blank values count as absent. Exactly one of [`PUBLIC_KEY`] and
    /// [`PUBLIC_KEY_LOCATION`] must be set, and [`ISSUER`] is required.
    pub fn from_lookup<F>(lookup: F) -> Result<VerifierConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let public_key = match (get(PUBLIC_KEY), get(PUBLIC_KEY_LOCATION)) {
            (Some(document), None) => PublicKeySource::Inline(document),
            (None, Some(location)) => PublicKeySource::Location(location),
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingKeySources),
            (None, None) => return Err(ConfigError::MissingPublicKey),
        };

        let issuer = get(ISSUER).ok_or(ConfigError::MissingIssuer)?;
        let mut config = VerifierConfig::new(public_key, issuer);

        if let Some(alg) = get(PUBLIC_KEY_ALGORITHM) {
            let algorithm = Algorithm::from_str(&alg)
                .ok()
                .filter(|algorithm| is_rsa_algorithm(*algorithm))
                .ok_or(ConfigError::InvalidAlgorithm(alg))?;
            config = config.with_algorithm(algorithm);
        }

        if let Some(skew) = get(CLOCK_SKEW) {
            let secs = skew
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidClockSkew(skew))?;
            config = config.with_clock_skew(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Reads `microprofile-config.properties` style text.
    ///
    /// Lines are `key=value`; the value is everything after the first `=`, so
    /// padded base64 survives. Lines starting with `#` or `!` are comments.
    pub fn from_properties(properties: &str) -> Result<VerifierConfig, ConfigError> {
        let entries: Vec<(&str, &str)> = properties
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim(), value.trim()))
            .collect();

        Self::from_lookup(|key| {
            entries
                .iter()
                .rev()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_owned())
        })
    }

    /// Reads the environment, e.g. `MP_JWT_VERIFY_PUBLICKEY` for [`PUBLIC_KEY`].
    pub fn from_env() -> Result<VerifierConfig, ConfigError> {
        Self::from_lookup(|key| std::env::var(env_var_name(key)).ok())
    }

    /// Where the key document comes from.
    pub fn public_key(&self) -> &PublicKeySource {
        &self.public_key
    }

    /// The checks applied to every token.
    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    /// Splits the key source from the token settings.
    pub fn into_parts(self) -> (PublicKeySource, VerifierSettings) {
        (self.public_key, self.settings)
    }
}

/// Property name to environment variable name: non-alphanumerics become `_`,
/// letters are upper-cased.
fn env_var_name(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
