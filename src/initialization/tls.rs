//! TLS client configuration.
//!
//! Builds the rustls configuration shared by `https` targets and `https` proxies.
//! The ring provider is passed explicitly, so no process-wide provider has to be
//! installed first.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::ring::default_provider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::config::TlsPolicy;
use crate::error_handling::InitializationError;

/// Builds a rustls client configuration for the given policy.
///
/// Only HTTP/1.1 is offered through ALPN since the transport speaks nothing else.
///
/// # Arguments
///
/// * `policy` - Server certificate policy
///
/// # Returns
///
/// A shareable rustls configuration. `TlsPolicy::Custom` is returned as is.
///
/// # Errors
///
/// Returns `InitializationError::TlsConfigError` if the provider rejects the
/// default protocol versions.
pub fn init_tls_config(
    policy: &TlsPolicy,
) -> Result<Arc<rustls::ClientConfig>, InitializationError> {
    let builder = rustls::ClientConfig::builder_with_provider(Arc::new(default_provider()))
        .with_safe_default_protocol_versions()?;

    let mut config = match policy {
        TlsPolicy::Custom(config) => return Ok(Arc::clone(config)),
        TlsPolicy::Verified => {
            let mut root_store = RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder
                .with_root_certificates(root_store)
                .with_no_client_auth()
        }
        TlsPolicy::InsecureSkipVerify => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification))
            .with_no_client_auth(),
    };
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

/// Accepts every server certificate and signature.
#[derive(Debug)]
struct SkipServerVerification;

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
