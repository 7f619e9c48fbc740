//! Attestation document validators.
//!
//! A validator understands one attestation scheme: it recognizes the
//! certificate-extension OID that carries the scheme's documents and decides
//! whether a given document binds a (public key, nonce) pair to a genuine
//! TEE. The [`AtlsContext`](crate::AtlsContext) consults its validators in
//! caller order during the handshake; the first success wins.

pub mod aas;

use std::future::Future;

use log::warn;
use x509_parser::oid_registry::asn1_rs::{oid, Oid};

use crate::error::AtlsError;

pub use aas::{AasAciValidator, AasCvmValidator};

/// Certificate extension OID carrying an AAS Confidential VM document.
pub const OID_AAS_CVM: Oid<'static> = oid!(1.3.9999.2.1.1);

/// Certificate extension OID carrying an AAS ACI container document.
pub const OID_AAS_ACI: Oid<'static> = oid!(1.3.9999.2.1.2);

/// Contract for a single attestation scheme.
pub trait Validator {
    /// Whether this validator understands documents carried under `oid`.
    ///
    /// Pure and total; the context consults it before any document parsing.
    fn accepts(&self, oid: &Oid<'_>) -> bool;

    /// Whether `document` proves that the holder of the key whose
    /// DER-encoded SubjectPublicKeyInfo is `spki` is a legitimate TEE and
    /// that the document was generated fresh against `nonce`. May perform
    /// network I/O to fetch trust material.
    ///
    /// Integrity, policy, and parse failures all yield `Ok(false)`. `Err`
    /// is reserved for conditions under which the document could not be
    /// evaluated at all (untrusted trust configuration, transport failure,
    /// unimplemented scheme); the verification walk logs those and treats
    /// them as rejections.
    fn validate(
        &self,
        document: &[u8],
        spki: &[u8],
        nonce: &[u8],
    ) -> impl Future<Output = Result<bool, AtlsError>> + Send;
}

/// The closed set of validators an [`AtlsContext`](crate::AtlsContext) can
/// carry.
#[derive(Debug, Clone)]
pub enum AnyValidator {
    /// Azure Attestation Service, confidential ACI container.
    AasAci(AasAciValidator),
    /// Azure Attestation Service, Confidential VM (scheme reserved).
    AasCvm(AasCvmValidator),
    /// Accepts everything. Testing only.
    Null(NullValidator),
}

impl AnyValidator {
    /// Short scheme label for diagnostics.
    pub fn scheme(&self) -> &'static str {
        match self {
            AnyValidator::AasAci(_) => "aas-aci",
            AnyValidator::AasCvm(_) => "aas-cvm",
            AnyValidator::Null(_) => "null",
        }
    }
}

impl Validator for AnyValidator {
    fn accepts(&self, oid: &Oid<'_>) -> bool {
        match self {
            AnyValidator::AasAci(v) => v.accepts(oid),
            AnyValidator::AasCvm(v) => v.accepts(oid),
            AnyValidator::Null(v) => v.accepts(oid),
        }
    }

    fn validate(
        &self,
        document: &[u8],
        spki: &[u8],
        nonce: &[u8],
    ) -> impl Future<Output = Result<bool, AtlsError>> + Send {
        async move {
            match self {
                AnyValidator::AasAci(v) => v.validate(document, spki, nonce).await,
                AnyValidator::AasCvm(v) => v.validate(document, spki, nonce).await,
                AnyValidator::Null(v) => v.validate(document, spki, nonce).await,
            }
        }
    }
}

impl From<AasAciValidator> for AnyValidator {
    fn from(validator: AasAciValidator) -> Self {
        AnyValidator::AasAci(validator)
    }
}

impl From<AasCvmValidator> for AnyValidator {
    fn from(validator: AasCvmValidator) -> Self {
        AnyValidator::AasCvm(validator)
    }
}

impl From<NullValidator> for AnyValidator {
    fn from(validator: NullValidator) -> Self {
        AnyValidator::Null(validator)
    }
}

/// A validator that accepts any evidence, bypassing attestation entirely.
///
/// Useful to measure the overhead of the attestation round trips against a
/// plain handshake. Do not use in production.
#[derive(Debug, Clone, Default)]
pub struct NullValidator;

impl NullValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Validator for NullValidator {
    fn accepts(&self, _oid: &Oid<'_>) -> bool {
        true
    }

    fn validate(
        &self,
        _document: &[u8],
        _spki: &[u8],
        _nonce: &[u8],
    ) -> impl Future<Output = Result<bool, AtlsError>> + Send {
        async {
            warn!("skipping attestation validation (null validator)");
            Ok(true)
        }
    }
}
