//! Attested TLS (aTLS) client library.
//!
//! Standard TLS proves which *name* you reached; attested TLS proves which
//! *environment* you reached. During the handshake the server presents an
//! attestation document inside an X.509 certificate extension, binding the
//! certificate's public key and a fresh per-connection client nonce to a
//! genuine hardware-isolated TEE. This crate provides:
//!
//! - [`AtlsContext`]: a TLS 1.2 client context that carries the nonce to
//!   the server (inside the SNI field) and replaces chain-to-CA trust with
//!   a walk over attestation validators.
//! - [`Validator`] implementations for Azure Attestation Service (AAS)
//!   documents: [`AasAciValidator`] for confidential ACI containers on AMD
//!   SEV-SNP, and [`AasCvmValidator`] for Confidential VMs (scheme
//!   reserved, never accepts).
//! - [`atls_connect`]: TCP connect plus attested handshake in one call.
//!
//! # Example
//!
//! ```no_run
//! use atls_rs::{atls_connect, AasAciValidator, AnyValidator, AtlsContext};
//!
//! # async fn example() -> Result<(), atls_rs::AtlsError> {
//! let cce_policy = std::fs::read_to_string("aci_policy.rego").unwrap();
//! let validator = AasAciValidator::new(
//!     Some(vec![cce_policy]),
//!     Some(vec!["https://sharedeus2.eus2.attest.azure.net/certs".into()]),
//! );
//!
//! let context = AtlsContext::new(vec![AnyValidator::AasAci(validator)])?;
//! let stream = atls_connect("tee.example.com", 443, context).await?;
//! // speak HTTP (or anything else) over `stream`
//! # let _ = stream;
//! # Ok(())
//! # }
//! ```
//!
//! Each context owns a fresh nonce and is consumed by its single
//! handshake; create one per connection.

pub mod connect;
pub mod context;
pub mod error;
mod logging;
pub mod policy;
pub mod validator;

pub use connect::{atls_connect, atls_connect_with, ConnectOptions, DEFAULT_PORT};
pub use context::{AtlsContext, Nonce, TlsStream};
pub use error::AtlsError;
pub use policy::{AasAciPolicy, TrustPolicy};
pub use validator::{
    AasAciValidator, AasCvmValidator, AnyValidator, NullValidator, Validator, OID_AAS_ACI,
    OID_AAS_CVM,
};
