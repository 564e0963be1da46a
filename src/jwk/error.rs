use thiserror::Error;

/// Errors raised while turning configuration into a usable key registry.
///
/// These are fatal: a service whose configured key set cannot be loaded must
/// refuse to start rather than run with zero trusted keys.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The input is neither a JSON object nor base64url-encoded JSON.
    #[error("public key is neither a JSON document nor base64url-encoded JSON")]
    UndecodableInput,

    /// The document is neither a `{"keys": [...]}` set nor a single bare JWK.
    #[error("JWKS document has no 'keys' array")]
    MissingKeys,

    /// An entry of the `keys` array does not follow the JWK structure.
    #[error("key #{index} is not a valid JWK: {source}")]
    InvalidKey {
        /// Position of the entry in the `keys` array.
        index: usize,
        /// Underlying deserialization error.
        source: serde_json::Error,
    },

    /// The entry has a key type other than RSA.
    #[error("key #{index} has unsupported key type '{kty}'")]
    UnsupportedKeyType {
        /// Position of the entry in the `keys` array.
        index: usize,
        /// The declared `kty`.
        kty: String,
    },

    /// A required key-material member is absent.
    #[error("key #{index} is missing the '{field}' member")]
    MissingKeyMaterial {
        /// Position of the entry in the `keys` array.
        index: usize,
        /// Name of the absent member.
        field: &'static str,
    },

    /// A key-material member is not valid unpadded base64url.
    #[error("key #{index} has an invalid '{field}' member")]
    InvalidKeyMaterial {
        /// Position of the entry in the `keys` array.
        index: usize,
        /// Name of the invalid member.
        field: &'static str,
    },

    /// The RSA modulus is outside the range accepted for signature verification.
    #[error("key #{index} has a {bits}-bit modulus, expected 2048 to 8192 bits")]
    UnsupportedKeySize {
        /// Position of the entry in the `keys` array.
        index: usize,
        /// Bit length of the modulus.
        bits: usize,
    },

    /// A bare JWK, given without a `keys` wrapper, has no `kid`.
    #[error("key #{index} has no 'kid'")]
    MissingKeyId {
        /// Always zero, the bare JWK is the only entry.
        index: usize,
    },

    /// The entry names an algorithm that is not an RSA signature algorithm.
    #[error("key #{index} declares unsupported algorithm '{alg}'")]
    UnsupportedAlgorithm {
        /// Position of the entry in the `keys` array.
        index: usize,
        /// The declared `alg`.
        alg: String,
    },

    /// The entry is meant for something other than signatures.
    #[error("key #{index} has 'use' of '{key_use}', expected 'sig'")]
    UnsupportedKeyUse {
        /// Position of the entry in the `keys` array.
        index: usize,
        /// The declared `use`.
        key_use: String,
    },

    /// Neither an inline key document nor a location was configured.
    #[error("no public key configured, set 'mp.jwt.verify.publickey' or 'mp.jwt.verify.publickey.location'")]
    MissingPublicKey,

    /// Both an inline key document and a location were configured.
    #[error("'mp.jwt.verify.publickey' and 'mp.jwt.verify.publickey.location' are mutually exclusive")]
    ConflictingKeySources,

    /// The expected issuer was not configured.
    #[error("no issuer configured, set 'mp.jwt.verify.issuer'")]
    MissingIssuer,

    /// The configured algorithm is not an RSA signature algorithm.
    #[error("configured algorithm '{0}' is not supported")]
    InvalidAlgorithm(String),

    /// The configured clock skew is not a whole number of seconds.
    #[error("configured clock skew '{0}' is not a number of seconds")]
    InvalidClockSkew(String),
}

/// Structural problems with a compact-serialized token.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The token is larger than the configured limit.
    #[error("token is {len} bytes, limit is {limit}")]
    TooLarge {
        /// Size of the token.
        len: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The token does not have exactly three segments.
    #[error("expected 3 token segments, found {0}")]
    SegmentCount(usize),

    /// The header segment is not base64url.
    #[error("header is not base64url: {0}")]
    HeaderEncoding(#[from] base64::DecodeError),

    /// The header segment is not a JSON object with an `alg`.
    #[error("header is not valid JSON: {0}")]
    HeaderJson(#[from] serde_json::Error),
}

/// The reason a token was rejected.
///
/// Variants are listed in the order the pipeline checks them; the first
/// failing check decides the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum RejectReason {
    /// The token could not be parsed.
    #[error("malformed token")]
    MalformedToken,

    /// No configured key matches the token.
    #[error("no matching public key")]
    UnknownKey,

    /// The signature does not verify under the selected key.
    #[error("invalid signature")]
    BadSignature,

    /// The `iss` claim is absent or differs from the configured issuer.
    #[error("issuer mismatch")]
    IssuerMismatch,

    /// The `exp` claim is not after the current time.
    #[error("token expired")]
    Expired,
}

/// Errors reading a key document from a configured location.
#[derive(Debug, Error)]
pub enum PublicKeysError {
    /// The HTTP request failed or answered with an error status.
    #[error("failed to fetch public keys from '{url}': {source}")]
    FetchPublicKeys {
        /// The requested URL.
        url: url::Url,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },

    /// The local file could not be read.
    #[error("failed to read public keys from '{path}': {source}")]
    ReadPublicKeys {
        /// The file that was read.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The location uses a scheme other than `http`, `https` or `file`.
    #[error("unsupported public key location '{0}'")]
    UnsupportedLocation(String),
}
