//! Validator for AAS documents issued to Confidential VMs (reserved).

use std::future::Future;

use x509_parser::oid_registry::asn1_rs::Oid;

use crate::error::AtlsError;
use crate::validator::{Validator, OID_AAS_CVM};

/// Recognizes attestation documents issued by the Azure Attestation Service
/// for a Confidential Virtual Machine (CVM) running on AMD SEV-SNP.
///
/// The claim set for this scheme is not finalized. `validate` refuses every
/// document, so the scheme can never authorize a connection; only the OID
/// dispatch is live.
#[derive(Debug, Clone, Default)]
pub struct AasCvmValidator;

impl AasCvmValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Validator for AasCvmValidator {
    fn accepts(&self, oid: &Oid<'_>) -> bool {
        *oid == OID_AAS_CVM
    }

    fn validate(
        &self,
        _document: &[u8],
        _spki: &[u8],
        _nonce: &[u8],
    ) -> impl Future<Output = Result<bool, AtlsError>> + Send {
        async { Err(AtlsError::NotImplemented("AAS CVM document validation")) }
    }
}
