//! ServerKeyExchange signing and verification (RFC 5246 §7.4.3).

use super::codec12::DigitallySigned;
use crate::crypt::hash::digest_slices;
use crate::crypt::keys::{PeerPublicKey, PrivateKey};
use crate::crypt::{hash_ids, AuthAlg, SignatureScheme};
use crate::ProtocolVersion;
use kxtls_types::{HashAlgId, TlsError};
use rand_core::CryptoRngCore;
use tracing::{debug, warn};

/// Pick the signature-and-hash pair to sign ServerKeyExchange with under
/// TLS 1.2: the first pair the client offers for our signature type that is
/// also in `supported`.
///
/// A client that sent no `signature_algorithms` extension gets SHA-1
/// (RFC 5246 §7.4.1.4.1).
pub fn pick_tls12_hash_for_signature(
    auth: AuthAlg,
    client_schemes: &[SignatureScheme],
    supported: &[SignatureScheme],
) -> Result<SignatureScheme, TlsError> {
    if client_schemes.is_empty() {
        return Ok(SignatureScheme::new(hash_ids::SHA1, auth.wire_id()));
    }
    client_schemes
        .iter()
        .copied()
        .filter(|s| s.signature() == auth.wire_id())
        .find(|s| supported.contains(s))
        .ok_or_else(|| {
            TlsError::HandshakeFailed("client doesn't support any common hash functions".into())
        })
}

/// Digest the signed content of a ServerKeyExchange.
///
/// With an explicit pair (TLS 1.2) the pair must be in `supported`; without
/// one the digest is SHA-1 for ECDSA and MD5 || SHA-1 for RSA.
pub fn hash_for_server_key_exchange(
    scheme: Option<SignatureScheme>,
    auth: AuthAlg,
    supported: &[SignatureScheme],
    slices: &[&[u8]],
) -> Result<(Vec<u8>, HashAlgId), TlsError> {
    let hash = match scheme {
        Some(scheme) => {
            if !supported.contains(&scheme) {
                return Err(TlsError::HandshakeFailed(format!(
                    "unsupported signature algorithm 0x{:04x}",
                    scheme.0
                )));
            }
            scheme.hash_alg().ok_or_else(|| {
                TlsError::HandshakeFailed(format!("unknown hash id {}", scheme.hash()))
            })?
        }
        None if auth == AuthAlg::Ecdsa => HashAlgId::Sha1,
        None => HashAlgId::Md5Sha1,
    };
    Ok((digest_slices(hash, slices), hash))
}

/// The content a ServerKeyExchange signature covers.
#[derive(Debug, Clone, Copy)]
pub struct SignedParams<'a> {
    pub version: ProtocolVersion,
    pub auth: AuthAlg,
    pub client_random: &'a [u8; 32],
    pub server_random: &'a [u8; 32],
    /// The key exchange parameter block, byte for byte as on the wire.
    pub params: &'a [u8],
}

impl SignedParams<'_> {
    fn digest(
        &self,
        scheme: Option<SignatureScheme>,
        supported: &[SignatureScheme],
    ) -> Result<(Vec<u8>, HashAlgId), TlsError> {
        hash_for_server_key_exchange(
            scheme,
            self.auth,
            supported,
            &[self.client_random, self.server_random, self.params],
        )
    }

    /// Sign with the certificate key, negotiating the pair under TLS 1.2.
    pub fn sign(
        &self,
        key: &dyn PrivateKey,
        supported: &[SignatureScheme],
        client_schemes: &[SignatureScheme],
        rng: &mut dyn CryptoRngCore,
    ) -> Result<DigitallySigned, TlsError> {
        if key.auth_alg() != self.auth {
            return Err(TlsError::ConfigError(format!(
                "{:?} signature requires a {:?} certificate key, have {:?}",
                self.auth,
                self.auth,
                key.auth_alg()
            )));
        }
        let scheme = if self.version.has_signature_algorithms() {
            Some(pick_tls12_hash_for_signature(
                self.auth,
                client_schemes,
                supported,
            )?)
        } else {
            None
        };
        let (digest, hash) = self.digest(scheme, supported)?;
        debug!(?scheme, ?hash, "signing ServerKeyExchange");
        let signature = key.sign(rng, &digest, hash)?;
        Ok(DigitallySigned { scheme, signature })
    }

    /// Verify the server's signature with the certificate public key.
    pub fn verify(
        &self,
        peer_key: &PeerPublicKey,
        supported: &[SignatureScheme],
        signed: &DigitallySigned,
    ) -> Result<(), TlsError> {
        if peer_key.auth_alg() != self.auth {
            return Err(TlsError::HandshakeFailed(format!(
                "{:?} key exchange requires a {:?} server public key",
                self.auth, self.auth
            )));
        }
        if let Some(scheme) = signed.scheme {
            if scheme.signature() != self.auth.wire_id() {
                return Err(TlsError::HandshakeFailed(format!(
                    "signature algorithm 0x{:04x} does not match the {:?} certificate",
                    scheme.0, self.auth
                )));
            }
        }
        let (digest, hash) = self.digest(signed.scheme, supported)?;
        peer_key
            .verify(&digest, hash, &signed.signature)
            .map_err(|e| {
                warn!(auth = ?self.auth, ?hash, "ServerKeyExchange signature rejected");
                e
            })
    }
}
