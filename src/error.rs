/// A crate-wide result type alias using the custom [`Error`] enum.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for token verification.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured key set or settings are unusable.
    #[error(transparent)]
    ConfigError(#[from] crate::jwk::ConfigError),

    /// Errors that occur while reading the key document from its location.
    #[error(transparent)]
    PublicKeysError(#[from] crate::jwk::PublicKeysError),

    /// The presented token was rejected.
    #[error(transparent)]
    Rejected(#[from] crate::jwk::RejectReason),
}
