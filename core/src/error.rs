//! aTLS error types.

use thiserror::Error;

/// Errors produced while establishing or validating an attested TLS session.
#[derive(Debug, Error)]
pub enum AtlsError {
    /// A caller-supplied argument was rejected before any I/O took place.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The nonce could not be encoded into a TLS server name.
    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    /// TCP-level connect or socket configuration failure.
    #[error("i/o error: {0}")]
    Io(String),

    /// Any TLS-layer failure during the handshake.
    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    /// The TLS session completed without presenting a peer certificate.
    #[error("no certificate received from peer")]
    MissingCertificate,

    /// The verification walk ran to completion and no (validator, extension)
    /// pair accepted the peer certificate's evidence.
    #[error("attestation rejected: no validator accepted the peer certificate's evidence")]
    AttestationRejected,

    /// The token named a JWKS URL outside the configured allow-list. The
    /// JWKS server is never contacted in this case.
    #[error("untrusted JKU in token: {0}")]
    UntrustedJku(String),

    /// The JWKS endpoint could not be fetched or returned an unusable body.
    #[error("JWKS transport failure: {0}")]
    Transport(String),

    /// The attestation scheme is declared but has no validation logic yet.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}
