//! Validator for AAS documents issued to confidential ACI containers.

use std::future::Future;
use std::sync::Once;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{decode, decode_header, Validation};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use x509_parser::oid_registry::asn1_rs::Oid;

use super::jwks;
use crate::error::AtlsError;
use crate::validator::{Validator, OID_AAS_ACI};

static NO_POLICIES_WARNING: Once = Once::new();
static NO_JKUS_WARNING: Once = Once::new();

/// Claim set of an AAS ACI token. Deserialization is strict: a missing
/// claim fails the decode, which the validator reports the same way as a
/// wrong value.
#[derive(Debug, Deserialize)]
struct AciClaims {
    #[serde(rename = "x-ms-attestation-type")]
    attestation_type: String,
    #[serde(rename = "x-ms-compliance-status")]
    compliance_status: String,
    #[serde(rename = "x-ms-sevsnpvm-is-debuggable")]
    is_debuggable: bool,
    #[serde(rename = "x-ms-sevsnpvm-reportdata")]
    report_data: String,
    #[serde(rename = "x-ms-sevsnpvm-hostdata", default)]
    host_data: Option<String>,
    #[serde(rename = "x-ms-runtime")]
    runtime: RuntimeClaims,
}

#[derive(Debug, Deserialize)]
struct RuntimeClaims {
    #[serde(rename = "publicKey")]
    public_key: String,
    nonce: String,
}

/// Runtime-data object whose canonical JSON the attestation issuer hashes
/// into the SEV-SNP report-data field. Field order and compactness must
/// match the issuer's Go JSON marshaller byte-for-byte.
#[derive(Debug, Serialize)]
struct RuntimeData {
    #[serde(rename = "publicKey")]
    public_key: String,
    nonce: String,
}

impl RuntimeData {
    fn new(spki: &[u8], nonce: &[u8]) -> Self {
        Self {
            public_key: STANDARD.encode(spki),
            nonce: STANDARD.encode(nonce),
        }
    }
}

/// Validates attestation documents issued by the Azure Attestation Service
/// (AAS) for a confidential Azure ACI container running on AMD SEV-SNP.
///
/// The document is a compact JWT. Validation verifies its signature against
/// the JWKS endpoint named in the token header, checks the SEV-SNP report
/// data against the canonical runtime-data hash of (SPKI, nonce), enforces
/// the platform attributes of a compliant non-debuggable utility VM, and
/// optionally pins the workload's Confidential Computing Enforcement (CCE)
/// policy through the host-data claim.
#[derive(Debug, Clone)]
pub struct AasAciValidator {
    policies: Option<Vec<String>>,
    jkus: Option<Vec<String>>,
}

impl AasAciValidator {
    /// Create a validator with optional allow-lists.
    ///
    /// `policies` holds allowed plaintext CCE policies (Rego source); the
    /// token's host-data claim must equal the SHA-256 of one of them.
    /// `jkus` holds trusted JWKS URLs the token's `jku` header must name.
    /// Omitting either list disables the corresponding check and emits a
    /// one-time security warning. The lists are immutable once the
    /// validator is constructed.
    pub fn new(policies: Option<Vec<String>>, jkus: Option<Vec<String>>) -> Self {
        crate::logging::init();

        if is_unset(&policies) {
            NO_POLICIES_WARNING.call_once(|| {
                warn!(
                    "no CCE policy allow-list configured; any workload identity will pass \
                     validation. Provide at least one policy to pin the expected container"
                );
            });
        }
        if is_unset(&jkus) {
            NO_JKUS_WARNING.call_once(|| {
                warn!(
                    "no JKU allow-list configured; JWT signing keys will be fetched from \
                     whichever JWKS server the token names. Provide trusted JWKS URLs"
                );
            });
        }

        Self { policies, jkus }
    }

    /// Allowed CCE policies, if configured.
    pub fn policies(&self) -> Option<&[String]> {
        self.policies.as_deref()
    }

    /// Allowed JKU values, if configured.
    pub fn jkus(&self) -> Option<&[String]> {
        self.jkus.as_deref()
    }

    async fn validate_document(
        &self,
        document: &[u8],
        spki: &[u8],
        nonce: &[u8],
    ) -> Result<bool, AtlsError> {
        let token = match std::str::from_utf8(document) {
            Ok(token) => token,
            Err(_) => {
                debug!("attestation document is not UTF-8");
                return Ok(false);
            }
        };

        let header = match decode_header(token) {
            Ok(header) => header,
            Err(e) => {
                debug!("unparseable JWT header: {e}");
                return Ok(false);
            }
        };
        let (Some(jku), Some(kid)) = (header.jku.as_deref(), header.kid.as_deref()) else {
            debug!("JWT header lacks jku or kid");
            return Ok(false);
        };

        if let Some(allowed) = self.jkus() {
            if !allowed.iter().any(|url| url == jku) {
                return Err(AtlsError::UntrustedJku(jku.to_string()));
            }
        }

        let key_set = jwks::fetch_jwks(jku).await?;
        let Some(jwk) = key_set.find(kid) else {
            debug!("no key with kid {kid} in JWKS at {jku}");
            return Ok(false);
        };
        let Some(key) = jwks::decoding_key_from_x5c(jwk, header.alg) else {
            debug!("could not extract a verification key from x5c of kid {kid}");
            return Ok(false);
        };

        let claims = match decode::<AciClaims>(token, &key, &Validation::new(header.alg)) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!("JWT verification failed: {e}");
                return Ok(false);
            }
        };

        Ok(self.check_claims(&claims, spki, nonce))
    }

    /// Enforce the SEV-SNP claim set against the session binding.
    fn check_claims(&self, claims: &AciClaims, spki: &[u8], nonce: &[u8]) -> bool {
        let runtime_data = RuntimeData::new(spki, nonce);
        let Ok(canonical) = serde_json::to_string(&runtime_data) else {
            return false;
        };
        let expected_hex = hex::encode(Sha256::digest(canonical.as_bytes()));

        // The AAS SEV-SNP endpoint takes a SHA-256 of the runtime data while
        // the hardware report-data field is 512 bits wide; the trailing 64
        // hex characters are zero padding and carry no information.
        let Some(report_prefix) = claims.report_data.get(..64) else {
            debug!("report-data claim is shorter than a SHA-256 digest");
            return false;
        };
        if report_prefix != expected_hex {
            debug!("report-data does not bind the presented key and nonce");
            return false;
        }

        if claims.attestation_type != "sevsnpvm" {
            debug!("unexpected attestation type: {}", claims.attestation_type);
            return false;
        }
        if claims.compliance_status != "azure-compliant-uvm" {
            debug!("unexpected compliance status: {}", claims.compliance_status);
            return false;
        }
        if claims.is_debuggable {
            debug!("workload is running with debug features enabled");
            return false;
        }

        match STANDARD.decode(&claims.runtime.nonce) {
            Ok(echoed) if echoed == nonce => {}
            _ => {
                debug!("runtime nonce echo does not match the session nonce");
                return false;
            }
        }
        match STANDARD.decode(&claims.runtime.public_key) {
            Ok(echoed) if echoed == spki => {}
            _ => {
                debug!("runtime public key echo does not match the peer SPKI");
                return false;
            }
        }

        if let Some(policies) = self.policies() {
            let Some(host_data) = claims.host_data.as_deref() else {
                debug!("host-data claim absent but a policy allow-list is configured");
                return false;
            };
            return policies
                .iter()
                .any(|policy| hex::encode(Sha256::digest(policy.as_bytes())) == host_data);
        }

        true
    }
}

fn is_unset(list: &Option<Vec<String>>) -> bool {
    list.as_ref().map_or(true, |entries| entries.is_empty())
}

impl Validator for AasAciValidator {
    fn accepts(&self, oid: &Oid<'_>) -> bool {
        *oid == OID_AAS_ACI
    }

    fn validate(
        &self,
        document: &[u8],
        spki: &[u8],
        nonce: &[u8],
    ) -> impl Future<Output = Result<bool, AtlsError>> + Send {
        self.validate_document(document, spki, nonce)
    }
}
