//! Shared test helpers: JWKS fixtures and AAS token minting.
#![allow(dead_code)]

use std::sync::Once;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// RSA key used to sign test tokens; the matching self-signed certificate
/// is served as `x5c[0]` by the mocked JWKS endpoint.
pub const SIGNER_KEY_PEM: &str = include_str!("../data/jwks_signer.key.pem");
pub const SIGNER_CERT_DER: &[u8] = include_bytes!("../data/jwks_signer.cert.der");

pub const KID: &str = "test-signer-01";

/// CCE policy the fixtures run under.
pub const POLICY: &str = "package policy\n\nallow := true";

// Far-future expiry so fixtures never age out.
const EXP: i64 = 4102444800;

/// Install the process-wide rustls crypto provider. Dependencies that build
/// their own TLS configs (reqwest) need one registered once per process.
pub fn init_crypto() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

/// Start a JWKS server carrying the test signer and return its `jku` URL.
pub async fn start_jwks_server() -> (MockServer, String) {
    init_crypto();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/certs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
        .mount(&server)
        .await;
    let jku = format!("{}/certs", server.uri());
    (server, jku)
}

pub fn jwks_body() -> Value {
    json!({
        "keys": [
            // A decoy entry the validator must skip over.
            { "kid": "unrelated-key", "kty": "RSA", "use": "sig" },
            {
                "kid": KID,
                "kty": "RSA",
                "use": "sig",
                "alg": "RS256",
                "x5c": [STANDARD.encode(SIGNER_CERT_DER)],
            },
        ]
    })
}

/// The 128-hex-char report-data claim binding (spki, nonce): SHA-256 of the
/// canonical runtime-data JSON, then the hardware field's zero padding.
pub fn report_data_hex(spki: &[u8], nonce: &[u8]) -> String {
    let canonical = format!(
        r#"{{"publicKey":"{}","nonce":"{}"}}"#,
        STANDARD.encode(spki),
        STANDARD.encode(nonce)
    );
    format!(
        "{}{}",
        hex::encode(Sha256::digest(canonical.as_bytes())),
        "0".repeat(64)
    )
}

/// Claim set of a compliant, non-debuggable SEV-SNP ACI workload bound to
/// (spki, nonce) and running under `policy`.
pub fn good_claims(spki: &[u8], nonce: &[u8], policy: &str) -> Value {
    json!({
        "exp": EXP,
        "x-ms-attestation-type": "sevsnpvm",
        "x-ms-compliance-status": "azure-compliant-uvm",
        "x-ms-sevsnpvm-is-debuggable": false,
        "x-ms-sevsnpvm-reportdata": report_data_hex(spki, nonce),
        "x-ms-sevsnpvm-hostdata": hex::encode(Sha256::digest(policy.as_bytes())),
        "x-ms-runtime": {
            "publicKey": STANDARD.encode(spki),
            "nonce": STANDARD.encode(nonce),
        },
    })
}

/// Mint an RS256 token over `claims` with the test signer.
pub fn sign_token(jku: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());
    header.jku = Some(jku.to_string());
    let key = EncodingKey::from_rsa_pem(SIGNER_KEY_PEM.as_bytes()).expect("fixture key is valid");
    encode(&header, claims, &key).expect("signing cannot fail")
}
