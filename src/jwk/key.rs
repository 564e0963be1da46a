use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use base64::alphabet::URL_SAFE;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::error::ConfigError;
use super::signature::is_rsa_algorithm;

/// Accepts the document with or without `=` padding.
const DOCUMENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const MIN_MODULUS_BITS: usize = 2048;
const MAX_MODULUS_BITS: usize = 8192;

/// How a key document was encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEncoding {
    /// The document as plain JSON text.
    Json,
    /// base64url-encoded JSON, padded or not.
    Base64UrlJson,
}

impl DocumentEncoding {
    /// Interpretations tried in turn; the first that yields a JSON object wins.
    pub const ATTEMPT_ORDER: [DocumentEncoding; 2] =
        [DocumentEncoding::Json, DocumentEncoding::Base64UrlJson];

    fn decode(self, input: &str) -> Option<Map<String, Value>> {
        match self {
            DocumentEncoding::Json => serde_json::from_str(input).ok(),
            DocumentEncoding::Base64UrlJson => {
                let bytes = DOCUMENT_BASE64.decode(input).ok()?;
                serde_json::from_slice(&bytes).ok()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JwksDocument {
    Set { keys: Vec<Value> },
    Single(JwkKey),
}

/// One entry of a key set, as written.
///
/// Only `kty` is structurally required; the remaining members are checked
/// afterwards so the error can name what is missing.
#[derive(Clone, Debug, Deserialize)]
pub struct JwkKey {
    pub(crate) kty: String,
    pub(crate) kid: Option<String>,
    pub(crate) alg: Option<String>,
    #[serde(rename = "use")]
    pub(crate) key_use: Option<String>,
    pub(crate) n: Option<String>,
    pub(crate) e: Option<String>,
}

/// A validated RSA public key, ready for signature verification.
#[derive(Clone)]
pub struct RsaPublicKey {
    kid: Option<String>,
    alg: Option<Algorithm>,
    modulus: Vec<u8>,
    exponent: Vec<u8>,
    decoding_key: DecodingKey,
}

impl RsaPublicKey {
    fn from_jwk(index: usize, jwk: JwkKey) -> Result<RsaPublicKey, ConfigError> {
        if jwk.kty != "RSA" {
            return Err(ConfigError::UnsupportedKeyType {
                index,
                kty: jwk.kty,
            });
        }

        if let Some(key_use) = jwk.key_use.filter(|key_use| key_use != "sig") {
            return Err(ConfigError::UnsupportedKeyUse { index, key_use });
        }

        let n = jwk
            .n
            .ok_or(ConfigError::MissingKeyMaterial { index, field: "n" })?;
        let e = jwk
            .e
            .ok_or(ConfigError::MissingKeyMaterial { index, field: "e" })?;

        let modulus = decode_component(index, "n", &n)?;
        let exponent = decode_component(index, "e", &e)?;

        let bits = bit_length(&modulus);
        if !(MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&bits) {
            return Err(ConfigError::UnsupportedKeySize { index, bits });
        }

        let alg = match jwk.alg {
            Some(alg) => Some(
                Algorithm::from_str(&alg)
                    .ok()
                    .filter(|algorithm| is_rsa_algorithm(*algorithm))
                    .ok_or(ConfigError::UnsupportedAlgorithm { index, alg })?,
            ),
            None => None,
        };

        let decoding_key = DecodingKey::from_rsa_components(&n, &e)
            .map_err(|_| ConfigError::InvalidKeyMaterial { index, field: "n" })?;

        Ok(RsaPublicKey {
            kid: jwk.kid,
            alg,
            modulus,
            exponent,
            decoding_key,
        })
    }

    /// Key identifier, absent for an anonymous entry of a set.
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// The algorithm the key is pinned to, if its JWK declared one.
    pub fn alg(&self) -> Option<Algorithm> {
        self.alg
    }

    /// Big-endian modulus with leading zeros stripped.
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// Big-endian public exponent.
    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    /// Size of the modulus in bits.
    pub fn modulus_bits(&self) -> usize {
        bit_length(&self.modulus)
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl PartialEq for RsaPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.kid == other.kid
            && self.alg == other.alg
            && self.modulus == other.modulus
            && self.exponent == other.exponent
    }
}

impl Eq for RsaPublicKey {}

impl fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPublicKey")
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .field("modulus_bits", &self.modulus_bits())
            .finish_non_exhaustive()
    }
}

fn decode_component(
    index: usize,
    field: &'static str,
    value: &str,
) -> Result<Vec<u8>, ConfigError> {
    let mut bytes = BASE64_URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| ConfigError::InvalidKeyMaterial { index, field })?;

    let leading_zeros = bytes.iter().take_while(|b| **b == 0).count();
    bytes.drain(..leading_zeros);

    if bytes.is_empty() {
        return Err(ConfigError::InvalidKeyMaterial { index, field });
    }
    Ok(bytes)
}

/// Bit length of a big-endian integer without leading zero bytes.
fn bit_length(bytes: &[u8]) -> usize {
    match bytes.first() {
        Some(first) => (bytes.len() - 1) * 8 + (8 - first.leading_zeros() as usize),
        None => 0,
    }
}

/// Trusted public keys, looked up by key identifier.
///
/// Built once from configuration and read-only afterwards, so it can be
/// shared across threads without locking. A `kid` carried by more than one
/// entry is ambiguous and never resolves to a key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRegistry {
    keys: Vec<RsaPublicKey>,
    ambiguous: HashSet<String>,
}

impl KeyRegistry {
    /// Parses a key document.
    ///
    /// `input` may be a JWKS (`{"keys": [...]}`) or a single bare JWK, either
    /// as JSON or as base64url-encoded JSON. Every entry must be a usable RSA
    /// signing key; one bad entry fails the whole load. A bare JWK must carry
    /// a `kid`, entries of a set may omit it.
    pub fn load(input: impl AsRef<[u8]>) -> Result<KeyRegistry, ConfigError> {
        let input = std::str::from_utf8(input.as_ref())
            .map_err(|_| ConfigError::UndecodableInput)?
            .trim();

        let (encoding, document) = DocumentEncoding::ATTEMPT_ORDER
            .iter()
            .find_map(|encoding| encoding.decode(input).map(|doc| (*encoding, doc)))
            .ok_or(ConfigError::UndecodableInput)?;

        let (entries, bare) = match serde_json::from_value(Value::Object(document)) {
            Ok(JwksDocument::Set { keys }) => {
                let entries = keys
                    .into_iter()
                    .enumerate()
                    .map(|(index, entry)| {
                        serde_json::from_value::<JwkKey>(entry)
                            .map_err(|source| ConfigError::InvalidKey { index, source })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                (entries, false)
            }
            Ok(JwksDocument::Single(jwk)) => (vec![jwk], true),
            Err(_) => return Err(ConfigError::MissingKeys),
        };

        let mut keys: Vec<RsaPublicKey> = Vec::with_capacity(entries.len());
        let mut ambiguous = HashSet::new();
        for (index, jwk) in entries.into_iter().enumerate() {
            let key = RsaPublicKey::from_jwk(index, jwk)?;
            if bare && key.kid.is_none() {
                return Err(ConfigError::MissingKeyId { index });
            }

            if let Some(kid) = key.kid() {
                if keys.iter().any(|loaded| loaded.kid() == Some(kid)) {
                    ambiguous.insert(kid.to_owned());
                }
            }

            debug!(kid = ?key.kid(), bits = key.modulus_bits(), "Loaded JWK");
            keys.push(key);
        }

        for kid in &ambiguous {
            warn!(%kid, "Key id appears more than once, tokens naming it will be rejected");
        }
        if keys.is_empty() {
            warn!("Key set is empty, every token will be rejected");
        }
        info!(keys = keys.len(), ?encoding, "Loaded public key set");

        Ok(KeyRegistry { keys, ambiguous })
    }

    /// The key with exactly this `kid`, unless several entries share it.
    pub fn get(&self, kid: &str) -> Option<&RsaPublicKey> {
        if self.ambiguous.contains(kid) {
            return None;
        }
        self.keys.iter().find(|key| key.kid() == Some(kid))
    }

    /// The only key, if there is exactly one.
    pub fn sole_key(&self) -> Option<&RsaPublicKey> {
        match self.keys.as_slice() {
            [key] => Some(key),
            _ => None,
        }
    }

    /// Whether `kid` is carried by more than one entry.
    pub fn is_ambiguous(&self, kid: &str) -> bool {
        self.ambiguous.contains(kid)
    }

    /// Identifiers of the loaded keys, in document order.
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().filter_map(RsaPublicKey::kid)
    }

    /// Number of loaded keys, with or without a `kid`.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no key was loaded.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{base64url, jwks, TestKey};
    use serde_json::json;

    #[test]
    fn loads_json_key_set() {
        let orange = TestKey::generate("orange-key");
        let blue = TestKey::generate("blue-key");

        let registry = KeyRegistry::load(jwks(&[&orange, &blue])).unwrap();

        assert_eq!(registry.len(), 2);
        let mut kids: Vec<_> = registry.key_ids().collect();
        kids.sort_unstable();
        assert_eq!(kids, ["blue-key", "orange-key"]);
        assert_eq!(registry.get("orange-key").unwrap().alg(), Some(Algorithm::RS256));
        assert_eq!(registry.get("blue-key").unwrap().modulus_bits(), 2048);
    }

    #[test]
    fn json_and_base64url_forms_load_the_same_keys() {
        let orange = TestKey::generate("orange-key");
        let blue = TestKey::generate("blue-key");
        let document = jwks(&[&orange, &blue]);

        let from_json = KeyRegistry::load(&document).unwrap();
        let from_padded = KeyRegistry::load(base64url(&document)).unwrap();
        let from_unpadded = KeyRegistry::load(BASE64_URL_SAFE_NO_PAD.encode(&document)).unwrap();

        assert_eq!(from_json, from_padded);
        assert_eq!(from_json, from_unpadded);
    }

    #[test]
    fn loads_single_bare_jwk() {
        let orange = TestKey::generate("orange-key");
        let document = orange.jwk().to_string();

        let from_json = KeyRegistry::load(&document).unwrap();
        let from_base64 = KeyRegistry::load(base64url(&document)).unwrap();

        assert_eq!(from_json.len(), 1);
        assert_eq!(from_json.sole_key().unwrap().kid(), Some("orange-key"));
        assert_eq!(from_json, from_base64);
    }

    #[test]
    fn loads_empty_key_set() {
        let registry = KeyRegistry::load(r#"{"keys": []}"#).unwrap();
        assert!(registry.is_empty());
        assert!(registry.sole_key().is_none());
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let orange = TestKey::generate("orange-key");
        let document = format!("\n  {}  \n", jwks(&[&orange]));
        assert_eq!(KeyRegistry::load(document).unwrap().len(), 1);
    }

    #[test]
    fn rejects_undecodable_input() {
        for input in ["", "not a key set", "%%%%", "bm90IGpzb24"] {
            let result = KeyRegistry::load(input);
            assert!(
                matches!(result, Err(ConfigError::UndecodableInput)),
                "Expected UndecodableInput for {input:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn rejects_document_without_keys() {
        for input in [r#"{"issuer": "x"}"#, r#"{"keys": "none"}"#] {
            let result = KeyRegistry::load(input);
            assert!(
                matches!(result, Err(ConfigError::MissingKeys)),
                "Expected MissingKeys for {input:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn rejects_entry_without_key_type() {
        let result = KeyRegistry::load(r#"{"keys": [{"kid": "a"}]}"#);
        assert!(matches!(result, Err(ConfigError::InvalidKey { index: 0, .. })));
    }

    #[test]
    fn rejects_non_rsa_entry() {
        let orange = TestKey::generate("orange-key");
        let document = json!({
            "keys": [
                orange.jwk(),
                {"kty": "EC", "kid": "ec-key", "crv": "P-256", "x": "AA", "y": "AA"}
            ]
        });

        let result = KeyRegistry::load(document.to_string());
        assert!(
            matches!(&result, Err(ConfigError::UnsupportedKeyType { index: 1, kty }) if kty == "EC"),
            "Expected UnsupportedKeyType, got {result:?}"
        );
    }

    #[test]
    fn rejects_missing_key_material() {
        let orange = TestKey::generate("orange-key");
        let mut jwk = orange.jwk();
        jwk.as_object_mut().unwrap().remove("e");

        let result = KeyRegistry::load(json!({ "keys": [jwk] }).to_string());
        assert!(matches!(
            result,
            Err(ConfigError::MissingKeyMaterial { index: 0, field: "e" })
        ));
    }

    #[test]
    fn rejects_invalid_key_material() {
        let orange = TestKey::generate("orange-key");
        let mut jwk = orange.jwk();
        jwk["n"] = json!("not*base64url");

        let result = KeyRegistry::load(json!({ "keys": [jwk] }).to_string());
        assert!(matches!(
            result,
            Err(ConfigError::InvalidKeyMaterial { index: 0, field: "n" })
        ));
    }

    #[test]
    fn rejects_bare_jwk_without_kid() {
        let orange = TestKey::generate("orange-key");
        let mut jwk = orange.jwk();
        jwk.as_object_mut().unwrap().remove("kid");

        let result = KeyRegistry::load(jwk.to_string());
        assert!(matches!(result, Err(ConfigError::MissingKeyId { index: 0 })));
    }

    #[test]
    fn loads_set_entry_without_kid() {
        let orange = TestKey::generate("orange-key");
        let mut jwk = orange.jwk();
        jwk.as_object_mut().unwrap().remove("kid");

        let registry = KeyRegistry::load(json!({ "keys": [jwk] }).to_string()).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.sole_key().unwrap().kid(), None);
        assert!(registry.get("orange-key").is_none());
        assert_eq!(registry.key_ids().count(), 0);
    }

    #[test]
    fn duplicate_kid_resolves_to_nothing() {
        let first = TestKey::generate("shared-key");
        let second = TestKey::generate("shared-key");
        let orange = TestKey::generate("orange-key");

        let registry = KeyRegistry::load(jwks(&[&first, &second, &orange])).unwrap();

        assert_eq!(registry.len(), 3);
        assert!(registry.is_ambiguous("shared-key"));
        assert!(registry.get("shared-key").is_none());
        assert!(!registry.is_ambiguous("orange-key"));
        assert_eq!(registry.get("orange-key").unwrap().kid(), Some("orange-key"));
    }

    #[test]
    fn rejects_non_rsa_algorithm() {
        let orange = TestKey::generate("orange-key");
        let mut jwk = orange.jwk();
        jwk["alg"] = json!("HS256");

        let result = KeyRegistry::load(jwk.to_string());
        assert!(
            matches!(&result, Err(ConfigError::UnsupportedAlgorithm { alg, .. }) if alg == "HS256"),
            "Expected UnsupportedAlgorithm, got {result:?}"
        );
    }

    #[test]
    fn rejects_encryption_key() {
        let orange = TestKey::generate("orange-key");
        let mut jwk = orange.jwk();
        jwk["use"] = json!("enc");

        let result = KeyRegistry::load(jwk.to_string());
        assert!(matches!(result, Err(ConfigError::UnsupportedKeyUse { .. })));
    }

    #[test]
    fn rejects_short_modulus() {
        let weak = TestKey::with_bits("weak-key", 1024);

        let result = KeyRegistry::load(jwks(&[&weak]));
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedKeySize { index: 0, bits: 1024 })
        ));
    }

    #[test]
    fn computes_bit_length() {
        assert_eq!(bit_length(&[]), 0);
        assert_eq!(bit_length(&[0x01]), 1);
        assert_eq!(bit_length(&[0x80, 0x00]), 16);
        assert_eq!(bit_length(&[0x01, 0x00, 0x01]), 17);
    }
}
