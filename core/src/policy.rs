//! Validator configuration types.
//!
//! This module provides the `TrustPolicy` enum that describes which
//! validator to construct and its allow-lists. Policies can be
//! serialized/deserialized with serde, making them easy to load from JSON
//! configuration files.

use serde::{Deserialize, Serialize};

use crate::validator::{AasAciValidator, AasCvmValidator, AnyValidator, NullValidator};

/// Configuration for one attestation validator.
///
/// # Example
///
/// ```
/// use atls_rs::TrustPolicy;
///
/// let json = r#"{
///     "type": "aas_aci",
///     "jkus": ["https://sharedeus2.eus2.attest.azure.net/certs"]
/// }"#;
/// let policy: TrustPolicy = serde_json::from_str(json).unwrap();
/// let validator = policy.into_validator();
/// # let _ = validator;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrustPolicy {
    /// AAS document issued for a confidential ACI container.
    #[serde(rename = "aas_aci")]
    AasAci(AasAciPolicy),
    /// AAS document issued for a Confidential VM (scheme reserved).
    #[serde(rename = "aas_cvm")]
    AasCvm,
    /// Accept anything. Testing only.
    #[serde(rename = "null")]
    Null,
}

/// Allow-lists for the AAS-ACI validator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AasAciPolicy {
    /// Allowed plaintext CCE policies (Rego source). `None` disables the
    /// host-data check and triggers a one-time security warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<String>>,

    /// Allowed JWKS URLs for the token's `jku` header. `None` disables the
    /// check and triggers a one-time security warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jkus: Option<Vec<String>>,
}

impl TrustPolicy {
    /// Convert this configuration into a validator instance.
    pub fn into_validator(self) -> AnyValidator {
        match self {
            TrustPolicy::AasAci(policy) => {
                AnyValidator::AasAci(AasAciValidator::new(policy.policies, policy.jkus))
            }
            TrustPolicy::AasCvm => AnyValidator::AasCvm(AasCvmValidator::new()),
            TrustPolicy::Null => AnyValidator::Null(NullValidator::new()),
        }
    }
}
