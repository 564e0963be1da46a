use std::path::PathBuf;
use std::sync::Arc;

use tracing::*;
use url::Url;

use crate::jwk::{
    JwkVerifier, KeyRegistry, PublicKeySource, PublicKeysError, VerificationResult,
    VerifierConfig, VerifierSettings,
};
use crate::{AuthenticatedToken, JwtClaims};

/// JwtAuth verifies bearer tokens against the key set it was configured with.
///
/// The key set is loaded once, when the instance is created, and never changes
/// afterwards. Cloning is cheap and every clone shares the same keys.
#[derive(Clone, Debug)]
pub struct JwtAuth {
    verifier: Arc<JwkVerifier>,
}

impl JwtAuth {
    /// Loads the configured key set, reading it from its location if needed.
    ///
    /// Fails if the key document cannot be read or parsed; a service should
    /// not start without its trusted keys.
    ///
    /// A file location is read with blocking I/O on the calling task. This
    /// happens once, before the server starts accepting requests.
    pub async fn new(config: VerifierConfig) -> crate::Result<Self> {
        let (public_key, settings) = config.into_parts();
        let document = match public_key {
            PublicKeySource::Inline(document) => document,
            PublicKeySource::Location(location) => Self::read_public_keys(&location).await?,
        };

        let keys = KeyRegistry::load(document)?;
        Ok(Self::with_keys(keys, settings))
    }

    /// Uses an already loaded key set.
    pub fn with_keys(keys: KeyRegistry, settings: VerifierSettings) -> Self {
        Self {
            verifier: Arc::new(JwkVerifier::new(keys, settings)),
        }
    }

    /// Verifies a compact token and returns its claims.
    pub fn verify(&self, token: &str) -> crate::Result<JwtClaims> {
        self.verifier
            .verify(token)
            .into_result()
            .map_err(crate::Error::Rejected)
    }

    /// Verifies a compact token and keeps it alongside its claims.
    pub fn authenticate(&self, token: &str) -> crate::Result<AuthenticatedToken> {
        self.verify(token)
            .map(|claims| AuthenticatedToken::new(token, claims))
    }

    /// Verifies a compact token, returning the outcome as a value.
    pub fn verification(&self, token: &str) -> VerificationResult {
        self.verifier.verify(token)
    }

    /// The shared verifier.
    pub fn verifier(&self) -> &JwkVerifier {
        &self.verifier
    }

    /// Reads a key document from an `http(s)://` or `file://` URL, or a plain path.
    pub(crate) async fn read_public_keys(location: &str) -> Result<String, PublicKeysError> {
        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                Self::fetch_public_keys(url).await
            }
            Ok(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| PublicKeysError::UnsupportedLocation(location.to_owned()))?;
                Self::read_public_keys_file(path)
            }
            Ok(_) => Err(PublicKeysError::UnsupportedLocation(location.to_owned())),
            Err(_) => Self::read_public_keys_file(PathBuf::from(location)),
        }
    }

    async fn fetch_public_keys(url: Url) -> Result<String, PublicKeysError> {
        debug!(%url, "Fetching public keys");

        let response = match reqwest::get(url.clone())
            .await
            .and_then(reqwest::Response::error_for_status)
        {
            Ok(response) => response,
            Err(source) => return Err(PublicKeysError::FetchPublicKeys { url, source }),
        };

        response
            .text()
            .await
            .map_err(|source| PublicKeysError::FetchPublicKeys { url, source })
    }

    /// Blocking read, only used while building a [`JwtAuth`].
    fn read_public_keys_file(path: PathBuf) -> Result<String, PublicKeysError> {
        debug!(path = %path.display(), "Reading public keys");

        std::fs::read_to_string(&path)
            .map_err(|source| PublicKeysError::ReadPublicKeys { path, source })
    }
}
