//! Ephemeral elliptic-curve Diffie-Hellman (RFC 8422), over X25519 and the
//! NIST prime curves.

use super::PreMasterSecret;
use crate::config::TlsConfig;
use crate::crypt::ecdh::{EphemeralSecret, PeerPoint};
use crate::crypt::keys::{PeerPublicKey, PrivateKey};
use crate::crypt::{AuthAlg, NamedCurve};
use crate::handshake::codec12::{
    build_ecdhe_params, decode_ecdhe_client_key_exchange, decode_ecdhe_server_key_exchange,
    encode_ecdhe_client_key_exchange, encode_server_key_exchange,
};
use crate::handshake::signing::SignedParams;
use crate::handshake::ClientHelloInfo;
use crate::ProtocolVersion;
use kxtls_types::TlsError;
use rand_core::CryptoRngCore;
use tracing::{debug, warn};

#[derive(Debug)]
enum EcdheState {
    Start,
    /// Server: ServerKeyExchange sent, awaiting the client's public value.
    ServerKeySent(EphemeralSecret),
    /// Client: server's public value verified.
    ServerKeyReceived(PeerPoint),
    Done,
}

/// ECDHE key agreement signed with an RSA or ECDSA certificate.
#[derive(Debug)]
pub struct EcdheKeyAgreement {
    version: ProtocolVersion,
    auth: AuthAlg,
    state: EcdheState,
}

impl EcdheKeyAgreement {
    pub fn new(version: ProtocolVersion, auth: AuthAlg) -> Self {
        Self {
            version,
            auth,
            state: EcdheState::Start,
        }
    }

    /// The curve in use, once one side has chosen it.
    pub fn curve(&self) -> Option<NamedCurve> {
        match &self.state {
            EcdheState::ServerKeySent(secret) => Some(secret.curve()),
            EcdheState::ServerKeyReceived(peer) => Some(peer.curve()),
            EcdheState::Start | EcdheState::Done => None,
        }
    }

    /// Choose a curve, generate an ephemeral key and sign its public value.
    pub fn generate_server_key_exchange(
        &mut self,
        config: &TlsConfig,
        private_key: &dyn PrivateKey,
        client_hello: &ClientHelloInfo,
        server_random: &[u8; 32],
        rng: &mut dyn CryptoRngCore,
    ) -> Result<Vec<u8>, TlsError> {
        if !matches!(self.state, EcdheState::Start) {
            return Err(TlsError::UnexpectedMessage(
                "ServerKeyExchange already generated".into(),
            ));
        }
        // Server preference order decides.
        let curve = config
            .curve_preferences
            .iter()
            .copied()
            .filter(|group| client_hello.supported_groups.contains(group))
            .find_map(NamedCurve::from_group)
            .ok_or_else(|| {
                TlsError::HandshakeFailed("no supported elliptic curves offered".into())
            })?;
        debug!(?curve, "selected ECDHE curve");

        let secret = EphemeralSecret::generate(curve, rng)?;
        let params = build_ecdhe_params(curve.group(), &secret.public_bytes())?;
        let signed = SignedParams {
            version: self.version,
            auth: self.auth,
            client_random: &client_hello.random,
            server_random,
            params: &params,
        }
        .sign(
            private_key,
            &config.signature_algorithms,
            &client_hello.signature_algorithms,
            rng,
        )?;

        let msg = encode_server_key_exchange(&params, &signed)?;
        self.state = EcdheState::ServerKeySent(secret);
        Ok(msg)
    }

    /// Agree with the client's public value.
    pub fn process_client_key_exchange(&mut self, body: &[u8]) -> Result<PreMasterSecret, TlsError> {
        let EcdheState::ServerKeySent(secret) = &self.state else {
            return Err(TlsError::UnexpectedMessage(
                "ClientKeyExchange before ServerKeyExchange".into(),
            ));
        };
        let public = decode_ecdhe_client_key_exchange(body)?;
        let pms = secret.agree(public)?;
        debug!(curve = ?secret.curve(), "ECDHE pre-master secret derived");
        self.state = EcdheState::Done;
        Ok(pms)
    }

    /// Validate the server's curve and public value and verify the signature
    /// over them.
    pub fn process_server_key_exchange(
        &mut self,
        config: &TlsConfig,
        client_hello: &ClientHelloInfo,
        server_random: &[u8; 32],
        peer_key: &PeerPublicKey,
        body: &[u8],
    ) -> Result<(), TlsError> {
        if !matches!(self.state, EcdheState::Start) {
            return Err(TlsError::UnexpectedMessage(
                "duplicate ServerKeyExchange".into(),
            ));
        }
        let ske = decode_ecdhe_server_key_exchange(body, self.version)?;
        let curve = NamedCurve::from_group(ske.named_curve).ok_or_else(|| {
            TlsError::HandshakeFailed(format!(
                "server selected unsupported curve 0x{:04x}",
                ske.named_curve.0
            ))
        })?;
        if !client_hello.supported_groups.contains(&ske.named_curve) {
            warn!(?curve, "server selected a curve the client did not offer");
            return Err(TlsError::IllegalParameter(
                "server selected a curve the client did not offer".into(),
            ));
        }
        let peer = PeerPoint::decode(curve, ske.public)?;

        SignedParams {
            version: self.version,
            auth: self.auth,
            client_random: &client_hello.random,
            server_random,
            params: ske.params,
        }
        .verify(peer_key, &config.signature_algorithms, &ske.signed)?;

        debug!(?curve, "verified ECDHE ServerKeyExchange");
        self.state = EcdheState::ServerKeyReceived(peer);
        Ok(())
    }

    /// Generate our key on the server's curve and agree with its public value.
    pub fn generate_client_key_exchange(
        &mut self,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<(PreMasterSecret, Vec<u8>), TlsError> {
        let EcdheState::ServerKeyReceived(peer) = &self.state else {
            return Err(TlsError::UnexpectedMessage(
                "missing ServerKeyExchange".into(),
            ));
        };
        let (public, pms) = peer.agree(rng)?;
        let msg = encode_ecdhe_client_key_exchange(&public)?;
        self.state = EcdheState::Done;
        Ok((pms, msg))
    }
}
