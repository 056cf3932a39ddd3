//! Ephemeral finite-field Diffie-Hellman signed with an RSA certificate.

use super::PreMasterSecret;
use crate::config::TlsConfig;
use crate::crypt::dh::{DhParams, DhSecret};
use crate::crypt::keys::{PeerPublicKey, PrivateKey};
use crate::crypt::AuthAlg;
use crate::handshake::codec12::{
    build_dhe_params, decode_dhe_client_key_exchange, decode_dhe_server_key_exchange,
    encode_dhe_client_key_exchange, encode_server_key_exchange,
};
use crate::handshake::signing::SignedParams;
use crate::handshake::ClientHelloInfo;
use crate::ProtocolVersion;
use kxtls_types::TlsError;
use rand_core::CryptoRngCore;
use tracing::{debug, warn};

#[derive(Debug)]
enum DheState {
    Start,
    ServerKeySent {
        params: DhParams,
        secret: DhSecret,
    },
    ServerKeyReceived {
        params: DhParams,
        server_public: Vec<u8>,
    },
    Done,
}

/// DHE key agreement.
#[derive(Debug)]
pub struct DheKeyAgreement {
    version: ProtocolVersion,
    auth: AuthAlg,
    state: DheState,
}

impl DheKeyAgreement {
    pub fn new(version: ProtocolVersion, auth: AuthAlg) -> Self {
        Self {
            version,
            auth,
            state: DheState::Start,
        }
    }

    fn require_rsa(&self) -> Result<(), TlsError> {
        if self.auth != AuthAlg::Rsa {
            return Err(TlsError::ConfigError(
                "DHE key exchange is only supported with RSA signatures".into(),
            ));
        }
        Ok(())
    }

    /// Publish the configured group and a fresh public value, signed.
    pub fn generate_server_key_exchange(
        &mut self,
        config: &TlsConfig,
        private_key: &dyn PrivateKey,
        client_hello: &ClientHelloInfo,
        server_random: &[u8; 32],
        rng: &mut dyn CryptoRngCore,
    ) -> Result<Vec<u8>, TlsError> {
        self.require_rsa()?;
        if !matches!(self.state, DheState::Start) {
            return Err(TlsError::UnexpectedMessage(
                "ServerKeyExchange already generated".into(),
            ));
        }
        let params = config
            .dh_params
            .clone()
            .ok_or_else(|| TlsError::ConfigError("no DH parameters configured".into()))?;
        debug!(prime_bits = params.prime_bits(), "using DHE group");

        let secret = DhSecret::generate(&params, rng)?;
        let block = build_dhe_params(
            &params.p().to_bytes_be(),
            &params.g().to_bytes_be(),
            &secret.public_value(&params),
        )?;
        let signed = SignedParams {
            version: self.version,
            auth: self.auth,
            client_random: &client_hello.random,
            server_random,
            params: &block,
        }
        .sign(
            private_key,
            &config.signature_algorithms,
            &client_hello.signature_algorithms,
            rng,
        )?;

        let msg = encode_server_key_exchange(&block, &signed)?;
        self.state = DheState::ServerKeySent { params, secret };
        Ok(msg)
    }

    /// Range-check the client's public value and agree with it.
    pub fn process_client_key_exchange(&mut self, body: &[u8]) -> Result<PreMasterSecret, TlsError> {
        let DheState::ServerKeySent { params, secret } = &self.state else {
            return Err(TlsError::UnexpectedMessage(
                "ClientKeyExchange before ServerKeyExchange".into(),
            ));
        };
        let client_public = decode_dhe_client_key_exchange(body)?;
        let pms = secret.agree(params, client_public)?;
        debug!(prime_bits = params.prime_bits(), "DHE pre-master secret derived");
        self.state = DheState::Done;
        Ok(pms)
    }

    /// Verify the server's signature over the group and public value.
    pub fn process_server_key_exchange(
        &mut self,
        config: &TlsConfig,
        client_hello: &ClientHelloInfo,
        server_random: &[u8; 32],
        peer_key: &PeerPublicKey,
        body: &[u8],
    ) -> Result<(), TlsError> {
        self.require_rsa()?;
        if !matches!(self.state, DheState::Start) {
            return Err(TlsError::UnexpectedMessage(
                "duplicate ServerKeyExchange".into(),
            ));
        }
        let ske = decode_dhe_server_key_exchange(body, self.version)?;
        SignedParams {
            version: self.version,
            auth: self.auth,
            client_random: &client_hello.random,
            server_random,
            params: ske.params,
        }
        .verify(peer_key, &config.signature_algorithms, &ske.signed)?;

        let params = DhParams::from_peer(ske.p, ske.g)?;
        if params.prime_bits() < config.min_dh_bits {
            warn!(
                prime_bits = params.prime_bits(),
                min_bits = config.min_dh_bits,
                "server DH group too small"
            );
            return Err(TlsError::InsufficientSecurity(format!(
                "server DH prime is {} bits, need at least {}",
                params.prime_bits(),
                config.min_dh_bits
            )));
        }
        self.state = DheState::ServerKeyReceived {
            params,
            server_public: ske.public.to_vec(),
        };
        Ok(())
    }

    /// Pick our exponent, range-check the server's public value and agree.
    pub fn generate_client_key_exchange(
        &mut self,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<(PreMasterSecret, Vec<u8>), TlsError> {
        let DheState::ServerKeyReceived {
            params,
            server_public,
        } = &self.state
        else {
            return Err(TlsError::UnexpectedMessage(
                "missing ServerKeyExchange".into(),
            ));
        };
        let secret = DhSecret::generate(params, rng)?;
        let pms = secret.agree(params, server_public)?;
        let msg = encode_dhe_client_key_exchange(&secret.public_value(params))?;
        self.state = DheState::Done;
        Ok((pms, msg))
    }
}
