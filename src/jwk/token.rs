//! Compact token parsing.

use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use super::error::FormatError;

/// The JOSE header of a token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwtHeader {
    /// Signature algorithm as written, e.g. `RS256`.
    pub alg: String,
    /// Key identifier.
    #[serde(default)]
    pub kid: Option<String>,
    /// Media type, usually `JWT`.
    #[serde(default)]
    pub typ: Option<String>,
}

/// A compact token split into its segments, with the header decoded.
///
/// The payload stays encoded until the signature has been checked.
#[derive(Debug)]
pub struct ParsedToken<'a> {
    header: JwtHeader,
    signing_input: &'a str,
    payload: &'a str,
    signature: &'a str,
}

impl<'a> ParsedToken<'a> {
    pub fn header(&self) -> &JwtHeader {
        &self.header
    }

    /// `header.payload` exactly as received.
    pub fn signing_input(&self) -> &'a str {
        self.signing_input
    }

    /// The base64url signature segment.
    pub fn signature(&self) -> &'a str {
        self.signature
    }

    /// Decoded payload bytes.
    pub fn payload(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_URL_SAFE_NO_PAD.decode(self.payload)
    }
}

/// Splits `compact` into header, payload and signature and decodes the header.
pub fn parse(compact: &str) -> Result<ParsedToken<'_>, FormatError> {
    let segments = compact.split('.').count();
    if segments != 3 {
        return Err(FormatError::SegmentCount(segments));
    }

    let (signing_input, signature) = compact
        .rsplit_once('.')
        .ok_or(FormatError::SegmentCount(segments))?;
    let (header_segment, payload) = signing_input
        .split_once('.')
        .ok_or(FormatError::SegmentCount(segments))?;

    let header_bytes = BASE64_URL_SAFE_NO_PAD.decode(header_segment)?;
    let header: JwtHeader = serde_json::from_slice(&header_bytes)?;

    Ok(ParsedToken {
        header,
        signing_input,
        payload,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(json: &str) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(json)
    }

    #[test]
    fn splits_segments_and_decodes_header() {
        let header = encode(r#"{"alg":"RS256","kid":"orange-key","typ":"JWT"}"#);
        let payload = encode(r#"{"iss":"issuer"}"#);
        let token = format!("{header}.{payload}.c2ln");

        let parsed = parse(&token).unwrap();

        assert_eq!(parsed.header().alg, "RS256");
        assert_eq!(parsed.header().kid.as_deref(), Some("orange-key"));
        assert_eq!(parsed.header().typ.as_deref(), Some("JWT"));
        assert_eq!(parsed.signing_input(), format!("{header}.{payload}"));
        assert_eq!(parsed.signature(), "c2ln");
        assert_eq!(parsed.payload().unwrap(), br#"{"iss":"issuer"}"#);
    }

    #[test]
    fn header_without_kid() {
        let header = encode(r#"{"alg":"RS256"}"#);
        let token = format!("{header}.e30.");
        let parsed = parse(&token).unwrap();

        assert_eq!(parsed.header().kid, None);
        assert_eq!(parsed.signature(), "");
    }

    #[test]
    fn rejects_wrong_segment_count() {
        for token in ["", "abc", "a.b", "a.b.c.d", "a.b.c.d.e"] {
            let result = parse(token);
            assert!(
                matches!(result, Err(FormatError::SegmentCount(_))),
                "Expected SegmentCount for {token:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn rejects_header_that_is_not_base64url() {
        let result = parse("not+base64.e30.c2ln");
        assert!(matches!(result, Err(FormatError::HeaderEncoding(_))));
    }

    #[test]
    fn rejects_header_that_is_not_json() {
        let header = encode("alg=RS256");
        let token = format!("{header}.e30.c2ln");
        let result = parse(&token);
        assert!(matches!(result, Err(FormatError::HeaderJson(_))));
    }

    #[test]
    fn rejects_header_without_alg() {
        let header = encode(r#"{"kid":"orange-key"}"#);
        let token = format!("{header}.e30.c2ln");
        let result = parse(&token);
        assert!(matches!(result, Err(FormatError::HeaderJson(_))));
    }
}
