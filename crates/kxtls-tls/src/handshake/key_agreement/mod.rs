//! The key agreement step of a TLS 1.0-1.2 handshake.
//!
//! A handshake driver picks the variant from the negotiated cipher suite and
//! drives it through at most four calls, in protocol order:
//!
//! | step | server | client |
//! |---|---|---|
//! | 1 | `generate_server_key_exchange` | |
//! | 2 | | `process_server_key_exchange` |
//! | 3 | | `generate_client_key_exchange` |
//! | 4 | `process_client_key_exchange` | |
//!
//! Generated messages are complete handshake messages (header included);
//! processed messages are handshake bodies.

mod dhe;
mod ecdhe;
mod static_rsa;

pub use dhe::DheKeyAgreement;
pub use ecdhe::EcdheKeyAgreement;
pub use static_rsa::RsaKeyAgreement;

use crate::config::TlsConfig;
use crate::crypt::keys::{PeerPublicKey, PrivateKey};
use crate::crypt::{KeyExchangeAlg, Tls12CipherSuiteParams};
use crate::handshake::ClientHelloInfo;
use crate::{CipherSuite, ProtocolVersion};
use kxtls_types::TlsError;
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

/// The secret key agreement hands to master secret derivation.
pub type PreMasterSecret = Zeroizing<Vec<u8>>;

/// Per-connection key agreement state, one variant per key exchange family.
#[derive(Debug)]
pub enum KeyAgreement {
    Rsa(RsaKeyAgreement),
    Ecdhe(EcdheKeyAgreement),
    Dhe(DheKeyAgreement),
}

impl KeyAgreement {
    /// Instantiate the key agreement a negotiated cipher suite calls for.
    pub fn for_suite(suite: CipherSuite, version: ProtocolVersion) -> Result<Self, TlsError> {
        let params = Tls12CipherSuiteParams::from_suite(suite)?;
        Ok(match params.kx_alg {
            KeyExchangeAlg::Rsa => KeyAgreement::Rsa(RsaKeyAgreement),
            KeyExchangeAlg::Ecdhe => {
                KeyAgreement::Ecdhe(EcdheKeyAgreement::new(version, params.auth_alg))
            }
            KeyExchangeAlg::Dhe => KeyAgreement::Dhe(DheKeyAgreement::new(version, params.auth_alg)),
        })
    }

    pub fn kx_alg(&self) -> KeyExchangeAlg {
        match self {
            KeyAgreement::Rsa(_) => KeyExchangeAlg::Rsa,
            KeyAgreement::Ecdhe(_) => KeyExchangeAlg::Ecdhe,
            KeyAgreement::Dhe(_) => KeyExchangeAlg::Dhe,
        }
    }

    /// Server: build the ServerKeyExchange, if the key exchange sends one.
    pub fn generate_server_key_exchange(
        &mut self,
        config: &TlsConfig,
        private_key: &dyn PrivateKey,
        client_hello: &ClientHelloInfo,
        server_random: &[u8; 32],
        rng: &mut dyn CryptoRngCore,
    ) -> Result<Option<Vec<u8>>, TlsError> {
        match self {
            KeyAgreement::Rsa(ka) => ka.generate_server_key_exchange(),
            KeyAgreement::Ecdhe(ka) => ka
                .generate_server_key_exchange(config, private_key, client_hello, server_random, rng)
                .map(Some),
            KeyAgreement::Dhe(ka) => ka
                .generate_server_key_exchange(config, private_key, client_hello, server_random, rng)
                .map(Some),
        }
    }

    /// Server: consume the ClientKeyExchange body and derive the pre-master
    /// secret.
    pub fn process_client_key_exchange(
        &mut self,
        private_key: &dyn PrivateKey,
        body: &[u8],
        version: ProtocolVersion,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<PreMasterSecret, TlsError> {
        match self {
            KeyAgreement::Rsa(ka) => ka.process_client_key_exchange(private_key, body, version, rng),
            KeyAgreement::Ecdhe(ka) => ka.process_client_key_exchange(body),
            KeyAgreement::Dhe(ka) => ka.process_client_key_exchange(body),
        }
    }

    /// Client: consume the ServerKeyExchange body and verify its signature.
    pub fn process_server_key_exchange(
        &mut self,
        config: &TlsConfig,
        client_hello: &ClientHelloInfo,
        server_random: &[u8; 32],
        peer_key: &PeerPublicKey,
        body: &[u8],
    ) -> Result<(), TlsError> {
        match self {
            KeyAgreement::Rsa(ka) => ka.process_server_key_exchange(),
            KeyAgreement::Ecdhe(ka) => {
                ka.process_server_key_exchange(config, client_hello, server_random, peer_key, body)
            }
            KeyAgreement::Dhe(ka) => {
                ka.process_server_key_exchange(config, client_hello, server_random, peer_key, body)
            }
        }
    }

    /// Client: derive the pre-master secret and build the ClientKeyExchange.
    pub fn generate_client_key_exchange(
        &mut self,
        client_hello: &ClientHelloInfo,
        peer_key: &PeerPublicKey,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<(PreMasterSecret, Vec<u8>), TlsError> {
        match self {
            KeyAgreement::Rsa(ka) => ka.generate_client_key_exchange(client_hello, peer_key, rng),
            KeyAgreement::Ecdhe(ka) => ka.generate_client_key_exchange(rng),
            KeyAgreement::Dhe(ka) => ka.generate_client_key_exchange(rng),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypt::keys::tests::{p256_key, rsa_key};
    use crate::crypt::{NamedGroup, SignatureScheme};
    use crate::handshake::codec12::parse_handshake_header;
    use rand_core::{CryptoRng, OsRng, RngCore};

    /// An entropy source that always fails.
    pub(crate) struct FailingRng;

    impl RngCore for FailingRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            panic!("FailingRng::fill_bytes");
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand_core::Error> {
            Err(rand_core::Error::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "entropy source unavailable",
            )))
        }
    }

    impl CryptoRng for FailingRng {}

    pub(crate) fn client_hello(
        version: ProtocolVersion,
        groups: &[NamedGroup],
        schemes: &[SignatureScheme],
    ) -> ClientHelloInfo {
        ClientHelloInfo {
            version,
            random: [0xC1; 32],
            supported_groups: groups.to_vec(),
            signature_algorithms: schemes.to_vec(),
        }
    }

    pub(crate) const SERVER_RANDOM: [u8; 32] = [0x5E; 32];

    pub(crate) fn body(msg: &[u8]) -> &[u8] {
        parse_handshake_header(msg).unwrap().1
    }

    #[test]
    fn test_for_suite_selects_variant() {
        let cases = [
            (CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256, KeyExchangeAlg::Rsa),
            (CipherSuite::TLS_DHE_RSA_WITH_AES_128_GCM_SHA256, KeyExchangeAlg::Dhe),
            (CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256, KeyExchangeAlg::Ecdhe),
            (CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA, KeyExchangeAlg::Ecdhe),
        ];
        for (suite, kx) in cases {
            let ka = KeyAgreement::for_suite(suite, ProtocolVersion::TLS12).unwrap();
            assert_eq!(ka.kx_alg(), kx);
        }
        assert!(KeyAgreement::for_suite(CipherSuite(0x0000), ProtocolVersion::TLS12).is_err());
    }

    #[test]
    fn test_dispatch_ecdhe_ecdsa_round_trip() {
        let suite = CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256;
        let config = TlsConfig::default();
        let key = p256_key();
        let hello = client_hello(
            ProtocolVersion::TLS12,
            &[NamedGroup::SECP256R1],
            &[SignatureScheme::ECDSA_SECP256R1_SHA256],
        );

        let mut server = KeyAgreement::for_suite(suite, ProtocolVersion::TLS12).unwrap();
        let mut client = KeyAgreement::for_suite(suite, ProtocolVersion::TLS12).unwrap();
        let ske = server
            .generate_server_key_exchange(&config, &key, &hello, &SERVER_RANDOM, &mut OsRng)
            .unwrap()
            .unwrap();
        client
            .process_server_key_exchange(&config, &hello, &SERVER_RANDOM, &key.public_key(), body(&ske))
            .unwrap();
        let (client_pms, cke) = client
            .generate_client_key_exchange(&hello, &key.public_key(), &mut OsRng)
            .unwrap();
        let server_pms = server
            .process_client_key_exchange(&key, body(&cke), ProtocolVersion::TLS12, &mut OsRng)
            .unwrap();
        assert_eq!(client_pms, server_pms);
        assert_eq!(server_pms.len(), 32);
    }

    #[test]
    fn test_dispatch_rsa_sends_no_server_key_exchange() {
        let mut ka =
            KeyAgreement::for_suite(CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA, ProtocolVersion::TLS12)
                .unwrap();
        let hello = client_hello(ProtocolVersion::TLS12, &[], &[]);
        let out = ka
            .generate_server_key_exchange(
                &TlsConfig::default(),
                &rsa_key(),
                &hello,
                &SERVER_RANDOM,
                &mut OsRng,
            )
            .unwrap();
        assert!(out.is_none());
    }
}
