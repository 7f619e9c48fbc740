//! Nonce-bearing attested TLS context.
//!
//! The context splices attestation-based trust into a standard rustls
//! client: the usual chain-to-CA decision is replaced, the per-connection
//! nonce rides to the server inside the SNI field, and the peer certificate
//! is accepted only if a (validator, extension) pair vouches for it.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use log::{debug, warn};
use rand::rngs::OsRng;
use rand::RngCore;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, Error as RustlsError, SignatureScheme};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsConnector;
use x509_parser::parse_x509_certificate;

use crate::error::AtlsError;
use crate::validator::{AnyValidator, Validator};

pub use tokio_rustls::client::TlsStream;

/// Per-connection freshness value bound into the attestation document.
///
/// 32 bytes drawn from the operating system's CSPRNG unless supplied by
/// the caller (e.g. for deterministic tests). A nonce belongs to exactly
/// one [`AtlsContext`]; contexts are consumed by their handshake, so a
/// nonce cannot be replayed across connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce([u8; Self::LEN]);

impl Nonce {
    /// Nonce length in bytes.
    pub const LEN: usize = 32;

    /// Draw a fresh nonce from the OS CSPRNG.
    ///
    /// The SNI field only admits DNS-shaped labels, which must not start or
    /// end with a hyphen; the rare draw whose base64 form violates that is
    /// resampled. Caller-supplied nonces are not adjusted and fail with
    /// [`AtlsError::InvalidServerName`] at [`AtlsContext::wrap`] time if
    /// they cannot be encoded.
    pub fn generate() -> Self {
        loop {
            let mut bytes = [0u8; Self::LEN];
            OsRng.fill_bytes(&mut bytes);
            let nonce = Self(bytes);
            if ServerName::try_from(nonce.to_sni()).is_ok() {
                return nonce;
            }
        }
    }

    /// Wrap caller-supplied bytes. Fails unless exactly 32 bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AtlsError> {
        let fixed: [u8; Self::LEN] = bytes.try_into().map_err(|_| {
            AtlsError::InvalidArgument(format!(
                "nonce must be {} bytes, got {}",
                Self::LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(fixed))
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// SNI rendition of the nonce: unpadded URL-safe base64, which is a
    /// single well-formed DNS label (43 characters for 32 bytes). The
    /// server decodes the label back into the nonce before requesting its
    /// attestation document.
    pub fn to_sni(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }
}

/// A TLS client context that accepts a peer on attestation evidence.
///
/// Holds an ordered, non-empty list of validators and a per-connection
/// [`Nonce`]. The TLS configuration is pinned to TLS 1.2 with peer
/// verification enabled, but the chain-to-CA trust decision is superseded:
/// TEE servers present self-signed certificates, so trust comes from the
/// validator walk over the certificate's attestation extensions, not from
/// a CA hierarchy. Handshake-signature verification is retained, so the
/// server must still prove possession of the certificate's private key.
///
/// A context is consumed by a single handshake. Create one per connection
/// so every handshake carries a fresh nonce.
pub struct AtlsContext {
    validators: Vec<AnyValidator>,
    nonce: Nonce,
    tls_config: Arc<ClientConfig>,
}

impl AtlsContext {
    /// Create a context with a freshly generated nonce.
    ///
    /// Fails with [`AtlsError::InvalidArgument`] if `validators` is empty;
    /// no I/O happens before that check.
    pub fn new(validators: Vec<AnyValidator>) -> Result<Self, AtlsError> {
        Self::with_nonce(validators, Nonce::generate())
    }

    /// Create a context with a caller-supplied nonce.
    pub fn with_nonce(validators: Vec<AnyValidator>, nonce: Nonce) -> Result<Self, AtlsError> {
        if validators.is_empty() {
            return Err(AtlsError::InvalidArgument(
                "at least one validator is required".to_string(),
            ));
        }

        let tls_config = Arc::new(build_tls_config()?);
        Ok(Self {
            validators,
            nonce,
            tls_config,
        })
    }

    /// The validators this context consults, in evaluation order.
    pub fn validators(&self) -> &[AnyValidator] {
        &self.validators
    }

    /// The nonce bound to this context's single handshake.
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// Perform the attested TLS handshake over `stream`.
    ///
    /// The nonce travels to the server in the SNI field. After the TLS 1.2
    /// handshake completes, the peer's leaf certificate is checked against
    /// the validator walk; the stream is released to the caller only once
    /// some (validator, extension) pair accepts, so no application data
    /// can flow over an unattested session.
    ///
    /// Consumes the context: a nonce is used for exactly one handshake.
    pub async fn wrap<S>(self, stream: S) -> Result<TlsStream<S>, AtlsError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        crate::logging::init();

        let sni = self.nonce.to_sni();
        debug!("starting aTLS handshake, nonce carried in SNI ({sni})");

        let server_name = ServerName::try_from(sni)
            .map_err(|e| AtlsError::InvalidServerName(e.to_string()))?;
        let connector = TlsConnector::from(self.tls_config.clone());
        let tls_stream = connector
            .connect(server_name, stream)
            .await
            .map_err(|e| AtlsError::Handshake(e.to_string()))?;

        let peer_cert = {
            let (_, conn) = tls_stream.get_ref();
            conn.peer_certificates()
                .and_then(|certs| certs.first())
                .map(|cert| cert.as_ref().to_vec())
                .ok_or(AtlsError::MissingCertificate)?
        };
        debug!(
            "TLS handshake complete, certificate received ({} bytes)",
            peer_cert.len()
        );

        verify_peer_certificate(&self.validators, &peer_cert, &self.nonce).await?;
        debug!("attestation verification successful");

        Ok(tls_stream)
    }
}

/// Walk (validator × extension) pairs over the peer's leaf certificate.
///
/// Validators are tried in caller order and extensions in certificate
/// order; the first success wins. `accepts` is consulted before any
/// document parsing, and a validator error never aborts the walk: it is
/// logged and the search continues, so the handshake fails exactly when no
/// pair accepts.
async fn verify_peer_certificate(
    validators: &[AnyValidator],
    cert_der: &[u8],
    nonce: &Nonce,
) -> Result<(), AtlsError> {
    let (_, cert) = parse_x509_certificate(cert_der)
        .map_err(|e| AtlsError::Handshake(format!("unparseable peer certificate: {e}")))?;
    let spki = cert.tbs_certificate.subject_pki.raw;

    for validator in validators {
        for extension in cert.extensions() {
            if !validator.accepts(&extension.oid) {
                continue;
            }
            let document = extension.value;
            if document.is_empty() {
                continue;
            }
            match validator.validate(document, spki, nonce.as_bytes()).await {
                Ok(true) => {
                    debug!(
                        "validator {} accepted the document under OID {}",
                        validator.scheme(),
                        extension.oid
                    );
                    return Ok(());
                }
                Ok(false) => {
                    debug!(
                        "validator {} rejected the document under OID {}",
                        validator.scheme(),
                        extension.oid
                    );
                }
                Err(e) => {
                    warn!(
                        "validator {} could not evaluate the document under OID {}: {e}",
                        validator.scheme(),
                        extension.oid
                    );
                }
            }
        }
    }

    Err(AtlsError::AttestationRejected)
}

/// TLS 1.2-pinned client configuration with the aTLS trust model installed.
fn build_tls_config() -> Result<ClientConfig, AtlsError> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS12])
        .map_err(|e| AtlsError::Handshake(format!("unusable TLS configuration: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AtlsCertVerifier::new()))
        .with_no_client_auth();
    Ok(config)
}

/// Certificate verifier that defers trust to the attestation walk.
///
/// Chain-to-CA validation would always fail against a TEE's self-signed
/// certificate and is superseded here: every chain is accepted at this
/// layer and trust is decided by [`verify_peer_certificate`] before the
/// stream leaves [`AtlsContext::wrap`]. Handshake-signature verification
/// still delegates to the crypto provider, so the server must hold the
/// private key for the certificate it presented.
#[derive(Debug)]
struct AtlsCertVerifier {
    supported_algs: rustls::crypto::WebPkiSupportedAlgorithms,
}

impl AtlsCertVerifier {
    fn new() -> Self {
        let supported_algs =
            rustls::crypto::aws_lc_rs::default_provider().signature_verification_algorithms;
        Self { supported_algs }
    }
}

impl ServerCertVerifier for AtlsCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.supported_algs)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.supported_algs)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.supported_algs.supported_schemes()
    }
}
