//! RSA key transport: the client encrypts the pre-master secret to the
//! server certificate key.

use super::PreMasterSecret;
use crate::crypt::fill_random;
use crate::crypt::keys::{PeerPublicKey, PrivateKey};
use crate::handshake::codec12::{decode_rsa_client_key_exchange, encode_rsa_client_key_exchange};
use crate::handshake::ClientHelloInfo;
use crate::ProtocolVersion;
use kxtls_types::TlsError;
use rand_core::CryptoRngCore;
use tracing::trace;
use zeroize::Zeroizing;

const PRE_MASTER_SECRET_LEN: usize = 48;

/// RSA key transport. Carries no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaKeyAgreement;

impl RsaKeyAgreement {
    /// RSA key transport sends no ServerKeyExchange.
    pub fn generate_server_key_exchange(&self) -> Result<Option<Vec<u8>>, TlsError> {
        Ok(None)
    }

    /// Decrypt the client's pre-master secret.
    ///
    /// A ciphertext with bad padding still yields a random 48-byte secret;
    /// the handshake then fails at Finished. The version bytes inside the
    /// secret are not checked.
    pub fn process_client_key_exchange(
        &self,
        private_key: &dyn PrivateKey,
        body: &[u8],
        version: ProtocolVersion,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<PreMasterSecret, TlsError> {
        let ciphertext = decode_rsa_client_key_exchange(body, version)?;
        trace!(len = ciphertext.len(), "RSA ClientKeyExchange");
        let mut pms = Zeroizing::new(vec![0u8; PRE_MASTER_SECRET_LEN]);
        private_key.decrypt_session_key(rng, ciphertext, &mut pms)?;
        Ok(pms)
    }

    pub fn process_server_key_exchange(&self) -> Result<(), TlsError> {
        Err(TlsError::UnexpectedMessage(
            "unexpected ServerKeyExchange with RSA key exchange".into(),
        ))
    }

    /// Pick a pre-master secret and encrypt it to the server.
    pub fn generate_client_key_exchange(
        &self,
        client_hello: &ClientHelloInfo,
        peer_key: &PeerPublicKey,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<(PreMasterSecret, Vec<u8>), TlsError> {
        let mut pms = Zeroizing::new(vec![0u8; PRE_MASTER_SECRET_LEN]);
        pms[..2].copy_from_slice(&client_hello.version.0.to_be_bytes());
        fill_random(rng, &mut pms[2..])?;
        let ciphertext = peer_key.encrypt(rng, &pms)?;
        let msg = encode_rsa_client_key_exchange(&ciphertext, client_hello.version)?;
        Ok((pms, msg))
    }
}
