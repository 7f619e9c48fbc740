//! JWKS retrieval and signing-key extraction.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey};
use log::debug;
use serde::Deserialize;
use x509_parser::parse_x509_certificate;
use x509_parser::public_key::PublicKey;

use crate::error::AtlsError;

/// Key set served by a JWKS endpoint. Only the members needed to locate
/// signature-verification material are modeled; everything else is ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct JwkSet {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Jwk {
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub x5c: Option<Vec<String>>,
}

impl JwkSet {
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid.as_deref() == Some(kid))
    }
}

/// Fetch and parse the JWKS document at `url`.
///
/// All failures here are transport-level: the trust material could not be
/// obtained, so the document cannot be evaluated at all.
pub(crate) async fn fetch_jwks(url: &str) -> Result<JwkSet, AtlsError> {
    debug!("fetching JWKS from {url}");
    let response = reqwest::get(url)
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| AtlsError::Transport(format!("GET {url} failed: {e}")))?;
    response
        .json::<JwkSet>()
        .await
        .map_err(|e| AtlsError::Transport(format!("JWKS at {url} is unusable: {e}")))
}

/// Decode a base64 certificate the way the issuer pipeline does: either
/// alphabet, padding optional.
pub(crate) fn decode_cert_b64(input: &str) -> Option<Vec<u8>> {
    let normalized: String = input
        .trim()
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    URL_SAFE_NO_PAD.decode(normalized.trim_end_matches('=')).ok()
}

/// Extract the subject public key of the JWK's leaf certificate (`x5c[0]`)
/// as a [`DecodingKey`] usable under `alg`.
///
/// Returns `None` on any structural mismatch, including a key family that
/// cannot verify `alg` (which also forecloses algorithm-confusion tokens);
/// the caller treats that as a validation failure.
pub(crate) fn decoding_key_from_x5c(jwk: &Jwk, alg: Algorithm) -> Option<DecodingKey> {
    let leaf = jwk.x5c.as_ref()?.first()?;
    let cert_der = decode_cert_b64(leaf)?;
    let (_, cert) = parse_x509_certificate(&cert_der).ok()?;

    match cert.public_key().parsed().ok()? {
        PublicKey::RSA(rsa) => {
            if !matches!(
                alg,
                Algorithm::RS256
                    | Algorithm::RS384
                    | Algorithm::RS512
                    | Algorithm::PS256
                    | Algorithm::PS384
                    | Algorithm::PS512
            ) {
                debug!("JWKS key is RSA but token alg is {alg:?}");
                return None;
            }
            Some(DecodingKey::from_rsa_raw_components(rsa.modulus, rsa.exponent))
        }
        PublicKey::EC(point) => {
            if !matches!(alg, Algorithm::ES256 | Algorithm::ES384) {
                debug!("JWKS key is EC but token alg is {alg:?}");
                return None;
            }
            Some(DecodingKey::from_ec_der(point.data()))
        }
        other => {
            debug!("unsupported JWKS key type: {other:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_kid() {
        let set: JwkSet = serde_json::from_str(
            r#"{"keys": [
                {"kid": "a", "x5c": ["Zm9v"]},
                {"kid": "b"},
                {"alg": "RS256"}
            ]}"#,
        )
        .unwrap();

        assert!(set.find("a").is_some());
        assert!(set.find("b").is_some());
        assert!(set.find("c").is_none());
    }

    #[test]
    fn test_decode_cert_b64_accepts_both_alphabets() {
        // 0xfb 0xef 0xbe encodes to "++++" standard / "----" url-safe.
        let raw = [0xfbu8, 0xef, 0xbe];
        assert_eq!(decode_cert_b64("++--").as_deref(), Some(&raw[..]));
        assert_eq!(decode_cert_b64("----").as_deref(), Some(&raw[..]));

        // Padding is tolerated but not required.
        assert_eq!(decode_cert_b64("Zm9vYg==").as_deref(), Some(&b"foob"[..]));
        assert_eq!(decode_cert_b64("Zm9vYg").as_deref(), Some(&b"foob"[..]));

        assert!(decode_cert_b64("not base64!").is_none());
    }
}
