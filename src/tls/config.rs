use super::verifier::NoVerifier;
use crate::error::Result;
use rustls::{ClientConfig, RootCertStore, crypto::CryptoProvider, version};
use std::{
    fmt,
    sync::{Arc, OnceLock},
};

static CRYPTO_PROVIDER: OnceLock<Arc<CryptoProvider>> = OnceLock::new();

/// The ring crypto provider shared by every client configuration
#[must_use]
pub fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::clone(CRYPTO_PROVIDER.get_or_init(|| Arc::new(rustls::crypto::ring::default_provider())))
}

/// Certificate verification mode for outgoing connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerifyMode {
    /// Verify the chain against the WebPKI roots and the host name
    #[default]
    Verify,
    /// Skip chain and host name verification
    Insecure,
}

impl VerifyMode {
    #[must_use]
    pub const fn from_insecure(insecure: bool) -> Self {
        if insecure { Self::Insecure } else { Self::Verify }
    }
}

impl fmt::Display for VerifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verify => f.write_str("verify"),
            Self::Insecure => f.write_str("insecure"),
        }
    }
}

/// Build the client configuration used to dial targets.
///
/// Only TLS 1.2 and 1.3 are offered.
///
/// # Errors
///
/// Returns an error if the crypto provider does not support the requested
/// protocol versions.
pub fn client_config(mode: VerifyMode) -> Result<Arc<ClientConfig>> {
    let provider = crypto_provider();
    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_protocol_versions(&[&version::TLS13, &version::TLS12])?;

    let config = match mode {
        VerifyMode::Verify => {
            let roots: RootCertStore = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
            builder
                .with_root_certificates(roots)
                .with_no_client_auth()
        }
        VerifyMode::Insecure => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerifier::new(provider)))
            .with_no_client_auth(),
    };

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_verify_mode_from_insecure() {
        assert_eq!(VerifyMode::from_insecure(false), VerifyMode::Verify);
        assert_eq!(VerifyMode::from_insecure(true), VerifyMode::Insecure);
        assert_eq!(VerifyMode::default(), VerifyMode::Verify);
        assert_eq!(VerifyMode::Insecure.to_string(), "insecure");
    }

    #[test]
    fn test_crypto_provider_shared() {
        let a = crypto_provider();
        let b = crypto_provider();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_client_config_both_modes() {
        for mode in [VerifyMode::Verify, VerifyMode::Insecure] {
            let config = client_config(mode).unwrap();
            assert!(config.alpn_protocols.is_empty());
        }
    }
}
