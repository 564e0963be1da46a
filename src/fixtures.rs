//! Key and token builders for tests. Every test constructs its own keys.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::prelude::{BASE64_URL_SAFE, BASE64_URL_SAFE_NO_PAD};
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use openssl::rsa::Rsa;
use serde::Serialize;
use serde_json::{json, Value};

pub(crate) const ISSUER: &str = "issuer";

/// An RSA key pair with its JWK components.
pub(crate) struct TestKey {
    kid: String,
    n: String,
    e: String,
    encoding_key: EncodingKey,
}

impl TestKey {
    pub(crate) fn generate(kid: &str) -> TestKey {
        TestKey::with_bits(kid, 2048)
    }

    pub(crate) fn with_bits(kid: &str, bits: u32) -> TestKey {
        let rsa = Rsa::generate(bits).expect("Failed to generate RSA key");
        let private_pem = rsa
            .private_key_to_pem()
            .expect("Failed to encode private key");

        TestKey {
            kid: kid.to_owned(),
            n: BASE64_URL_SAFE_NO_PAD.encode(rsa.n().to_vec()),
            e: BASE64_URL_SAFE_NO_PAD.encode(rsa.e().to_vec()),
            encoding_key: EncodingKey::from_rsa_pem(&private_pem)
                .expect("Failed to create encoding key"),
        }
    }

    pub(crate) fn kid(&self) -> &str {
        &self.kid
    }

    /// Public JWK pinned to RS256.
    pub(crate) fn jwk(&self) -> Value {
        json!({
            "kty": "RSA",
            "kid": self.kid,
            "use": "sig",
            "alg": "RS256",
            "n": self.n,
            "e": self.e,
        })
    }

    /// RS256 token carrying this key's `kid`.
    pub(crate) fn sign(&self, claims: &impl Serialize) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        self.sign_with_header(&header, claims)
    }

    /// RS256 token with no `kid` in its header.
    pub(crate) fn sign_without_kid(&self, claims: &impl Serialize) -> String {
        self.sign_with_header(&Header::new(Algorithm::RS256), claims)
    }

    pub(crate) fn sign_with_header(&self, header: &Header, claims: &impl Serialize) -> String {
        encode(header, claims, &self.encoding_key).expect("Failed to sign token")
    }
}

/// A `{"keys": [...]}` document in JSON.
pub(crate) fn jwks(keys: &[&TestKey]) -> String {
    let keys: Vec<Value> = keys.iter().map(|key| key.jwk()).collect();
    json!({ "keys": keys }).to_string()
}

/// Padded base64url, as `java.util.Base64.getUrlEncoder()` produces.
pub(crate) fn base64url(document: &str) -> String {
    BASE64_URL_SAFE.encode(document)
}

pub(crate) fn now_as_secs() -> i64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    i64::try_from(secs).unwrap()
}

/// Claims that pass validation for `issuer` for the next hour.
pub(crate) fn claims(issuer: &str) -> Value {
    let now = now_as_secs();
    json!({
        "iss": issuer,
        "sub": "24400320",
        "upn": "jdoe@example.com",
        "groups": ["Echoer"],
        "iat": now,
        "exp": now + 3600,
    })
}
