//! Azure Attestation Service (AAS) validators.
//!
//! AAS issues signed JWTs attesting a hardware-backed workload's identity.
//! The token's `jku` header names the JWKS endpoint holding the signing
//! key; claims carry the SEV-SNP hardware evidence and the echoed runtime
//! data that bind the TLS key and the session nonce.

mod aci;
mod cvm;
mod jwks;

pub use aci::AasAciValidator;
pub use cvm::AasCvmValidator;
