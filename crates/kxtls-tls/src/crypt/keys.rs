//! Certificate keys as seen by key agreement.
//!
//! The server holds a [`PrivateKey`] capability for its certificate key; the
//! client holds the [`PeerPublicKey`] taken from the server certificate.

use super::{fill_random, pkcs1, AuthAlg};
use kxtls_types::{CryptoError, EccCurveId, HashAlgId, TlsError};
use kxtls_utils::asn1::EcdsaSigValue;
use md5::Md5;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rand_core::CryptoRngCore;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// The server certificate's private key.
///
/// Implementations provide whichever of signing and session-key decryption
/// the key type supports; the other reports a configuration error.
pub trait PrivateKey: Send + Sync + fmt::Debug {
    /// The algorithm family of the key.
    fn auth_alg(&self) -> AuthAlg;

    /// Sign a precomputed `digest` produced by `hash`.
    fn sign(
        &self,
        _rng: &mut dyn CryptoRngCore,
        _digest: &[u8],
        _hash: HashAlgId,
    ) -> Result<Vec<u8>, TlsError> {
        Err(TlsError::ConfigError(
            "certificate private key does not implement signing".into(),
        ))
    }

    /// Decrypt an RSA-encrypted session key into `key`.
    ///
    /// `key` is overwritten with random bytes first and then, only when the
    /// ciphertext carries a well-formed message of exactly `key.len()`
    /// bytes, with that message. Padding failures are not reported.
    fn decrypt_session_key(
        &self,
        _rng: &mut dyn CryptoRngCore,
        _ciphertext: &[u8],
        _key: &mut [u8],
    ) -> Result<(), TlsError> {
        Err(TlsError::ConfigError(
            "certificate private key does not implement decryption".into(),
        ))
    }
}

fn pkcs1v15_sign_scheme(hash: HashAlgId) -> Pkcs1v15Sign {
    match hash {
        HashAlgId::Md5 => Pkcs1v15Sign::new::<Md5>(),
        HashAlgId::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
        HashAlgId::Sha224 => Pkcs1v15Sign::new::<Sha224>(),
        HashAlgId::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        HashAlgId::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        HashAlgId::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        // TLS 1.0/1.1 sign the bare 36-byte digest without a DigestInfo
        HashAlgId::Md5Sha1 => Pkcs1v15Sign::new_unprefixed(),
    }
}

/// An RSA certificate key.
#[derive(Clone)]
pub struct RsaServerKey {
    key: RsaPrivateKey,
}

impl RsaServerKey {
    pub fn new(key: RsaPrivateKey) -> Self {
        Self { key }
    }

    /// The public half, as a client would take it from the certificate.
    pub fn public_key(&self) -> PeerPublicKey {
        PeerPublicKey::Rsa(self.key.to_public_key())
    }
}

impl fmt::Debug for RsaServerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaServerKey")
            .field("bits", &(self.key.size() * 8))
            .finish_non_exhaustive()
    }
}

impl PrivateKey for RsaServerKey {
    fn auth_alg(&self) -> AuthAlg {
        AuthAlg::Rsa
    }

    fn sign(
        &self,
        mut rng: &mut dyn CryptoRngCore,
        digest: &[u8],
        hash: HashAlgId,
    ) -> Result<Vec<u8>, TlsError> {
        self.key
            .sign_with_rng(&mut rng, pkcs1v15_sign_scheme(hash), digest)
            .map_err(|_| TlsError::CryptoError(CryptoError::RsaSignFail))
    }

    fn decrypt_session_key(
        &self,
        mut rng: &mut dyn CryptoRngCore,
        ciphertext: &[u8],
        key: &mut [u8],
    ) -> Result<(), TlsError> {
        let k = self.key.size();
        if k < key.len() + 11 {
            return Err(TlsError::CryptoError(CryptoError::InvalidKey));
        }
        fill_random(rng, key)?;
        if ciphertext.len() != k {
            debug!(
                got = ciphertext.len(),
                expected = k,
                "RSA ciphertext length does not match the modulus"
            );
            return Err(TlsError::CryptoError(CryptoError::RsaDecryptFail));
        }

        let c = rsa::BigUint::from_bytes_be(ciphertext);
        let m = rsa::hazmat::rsa_decrypt_and_check(&self.key, Some(&mut rng), &c)
            .map_err(|_| TlsError::CryptoError(CryptoError::RsaDecryptFail))?;
        let m = Zeroizing::new(m.to_bytes_be());

        let mut em = Zeroizing::new(vec![0u8; k]);
        em[k - m.len()..].copy_from_slice(&m);
        pkcs1::unpad_session_key(&em, key);
        Ok(())
    }
}

/// An ECDSA certificate key on P-256 or P-384.
#[derive(Clone)]
pub enum EcdsaServerKey {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
}

impl EcdsaServerKey {
    pub fn public_key(&self) -> PeerPublicKey {
        match self {
            EcdsaServerKey::P256(sk) => PeerPublicKey::EcdsaP256(p256::ecdsa::VerifyingKey::from(sk)),
            EcdsaServerKey::P384(sk) => PeerPublicKey::EcdsaP384(p384::ecdsa::VerifyingKey::from(sk)),
        }
    }
}

impl fmt::Debug for EcdsaServerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let curve = match self {
            EcdsaServerKey::P256(_) => "P-256",
            EcdsaServerKey::P384(_) => "P-384",
        };
        f.debug_tuple("EcdsaServerKey").field(&curve).finish()
    }
}

impl PrivateKey for EcdsaServerKey {
    fn auth_alg(&self) -> AuthAlg {
        AuthAlg::Ecdsa
    }

    fn sign(
        &self,
        _rng: &mut dyn CryptoRngCore,
        digest: &[u8],
        _hash: HashAlgId,
    ) -> Result<Vec<u8>, TlsError> {
        let der = match self {
            EcdsaServerKey::P256(sk) => {
                let sig: p256::ecdsa::Signature = sk
                    .sign_prehash(&field_prehash(digest, EccCurveId::NistP256))
                    .map_err(|_| TlsError::CryptoError(CryptoError::EcdsaSignFail))?;
                sig.to_der().as_bytes().to_vec()
            }
            EcdsaServerKey::P384(sk) => {
                let sig: p384::ecdsa::Signature = sk
                    .sign_prehash(&field_prehash(digest, EccCurveId::NistP384))
                    .map_err(|_| TlsError::CryptoError(CryptoError::EcdsaSignFail))?;
                sig.to_der().as_bytes().to_vec()
            }
        };
        Ok(der)
    }
}

/// The public key from the server certificate.
#[derive(Debug, Clone)]
pub enum PeerPublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(p256::ecdsa::VerifyingKey),
    EcdsaP384(p384::ecdsa::VerifyingKey),
}

impl PeerPublicKey {
    pub fn auth_alg(&self) -> AuthAlg {
        match self {
            PeerPublicKey::Rsa(_) => AuthAlg::Rsa,
            PeerPublicKey::EcdsaP256(_) | PeerPublicKey::EcdsaP384(_) => AuthAlg::Ecdsa,
        }
    }

    /// RSA PKCS#1 v1.5 encryption of a session key.
    pub fn encrypt(
        &self,
        mut rng: &mut dyn CryptoRngCore,
        msg: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        match self {
            PeerPublicKey::Rsa(key) => key
                .encrypt(&mut rng, Pkcs1v15Encrypt, msg)
                .map_err(|_| TlsError::CryptoError(CryptoError::RsaEncryptFail)),
            _ => Err(TlsError::HandshakeFailed(
                "RSA key exchange requires an RSA server certificate".into(),
            )),
        }
    }

    /// Verify `signature` over a precomputed `digest` produced by `hash`.
    pub fn verify(&self, digest: &[u8], hash: HashAlgId, signature: &[u8]) -> Result<(), TlsError> {
        match self {
            PeerPublicKey::Rsa(key) => key
                .verify(pkcs1v15_sign_scheme(hash), digest, signature)
                .map_err(|_| {
                    TlsError::SignatureVerifyFailed("invalid RSA PKCS#1 v1.5 signature".into())
                }),
            PeerPublicKey::EcdsaP256(key) => {
                check_ecdsa_der(signature)?;
                let sig = p256::ecdsa::Signature::from_der(signature)
                    .map_err(|_| bad_ecdsa_signature())?;
                key.verify_prehash(&field_prehash(digest, EccCurveId::NistP256), &sig)
                    .map_err(|_| bad_ecdsa_signature())
            }
            PeerPublicKey::EcdsaP384(key) => {
                check_ecdsa_der(signature)?;
                let sig = p384::ecdsa::Signature::from_der(signature)
                    .map_err(|_| bad_ecdsa_signature())?;
                key.verify_prehash(&field_prehash(digest, EccCurveId::NistP384), &sig)
                    .map_err(|_| bad_ecdsa_signature())
            }
        }
    }
}

/// Left-pad a digest shorter than the curve's field to the field size.
///
/// ECDSA reads a short digest as an integer, so the padded value yields the
/// same `e`. The prehash APIs refuse digests under half the field size
/// (SHA-1 on P-384), hence the explicit padding.
fn field_prehash(digest: &[u8], curve: EccCurveId) -> Vec<u8> {
    let field_len = curve.field_len();
    if digest.len() >= field_len {
        return digest.to_vec();
    }
    let mut padded = vec![0u8; field_len - digest.len()];
    padded.extend_from_slice(digest);
    padded
}

fn bad_ecdsa_signature() -> TlsError {
    TlsError::SignatureVerifyFailed("invalid ECDSA signature".into())
}

/// Strict DER parse of `ECDSA-Sig-Value` with both components positive.
fn check_ecdsa_der(signature: &[u8]) -> Result<(), TlsError> {
    let value = EcdsaSigValue::from_der(signature)
        .map_err(|_| TlsError::DecodeError("malformed ECDSA signature".into()))?;
    if !value.is_positive() {
        return Err(TlsError::IllegalParameter(
            "ECDSA signature contained zero or negative values".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypt::hash::digest_slices;
    use rand_core::OsRng;
    use std::sync::OnceLock;

    pub(crate) fn rsa_key() -> RsaServerKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        let key = KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 1024).unwrap());
        RsaServerKey::new(key.clone())
    }

    pub(crate) fn p256_key() -> EcdsaServerKey {
        EcdsaServerKey::P256(p256::ecdsa::SigningKey::random(&mut OsRng))
    }

    pub(crate) fn p384_key() -> EcdsaServerKey {
        EcdsaServerKey::P384(p384::ecdsa::SigningKey::random(&mut OsRng))
    }

    #[test]
    fn test_rsa_sign_verify_all_hashes() {
        let key = rsa_key();
        let public = key.public_key();
        for hash in [
            HashAlgId::Sha1,
            HashAlgId::Sha256,
            HashAlgId::Sha384,
            HashAlgId::Sha512,
            HashAlgId::Md5Sha1,
        ] {
            let digest = digest_slices(hash, &[b"server params"]);
            let sig = key.sign(&mut OsRng, &digest, hash).unwrap();
            public.verify(&digest, hash, &sig).unwrap();

            let other = digest_slices(hash, &[b"tampered params"]);
            let err = public.verify(&other, hash, &sig).unwrap_err();
            assert!(matches!(err, TlsError::SignatureVerifyFailed(_)));
        }
    }

    #[test]
    fn test_ecdsa_sign_verify() {
        for (key, hash) in [(p256_key(), HashAlgId::Sha256), (p384_key(), HashAlgId::Sha384)] {
            let public = key.public_key();
            assert_eq!(public.auth_alg(), AuthAlg::Ecdsa);
            let digest = digest_slices(hash, &[b"server params"]);
            let sig = key.sign(&mut OsRng, &digest, hash).unwrap();
            assert_eq!(sig[0], 0x30);
            public.verify(&digest, hash, &sig).unwrap();

            let mut bad = digest.clone();
            bad[0] ^= 0xFF;
            assert!(public.verify(&bad, hash, &sig).is_err());
        }
    }

    #[test]
    fn test_ecdsa_sha1_on_every_curve() {
        for key in [p256_key(), p384_key()] {
            let public = key.public_key();
            let digest = digest_slices(HashAlgId::Sha1, &[b"legacy params"]);
            let sig = key.sign(&mut OsRng, &digest, HashAlgId::Sha1).unwrap();
            public.verify(&digest, HashAlgId::Sha1, &sig).unwrap();
        }
    }

    #[test]
    fn test_p384_accepts_sha1_signature_over_padded_digest() {
        let sk = p384::ecdsa::SigningKey::random(&mut OsRng);
        let public = PeerPublicKey::EcdsaP384(p384::ecdsa::VerifyingKey::from(&sk));
        let digest = digest_slices(HashAlgId::Sha1, &[b"server params"]);
        let mut padded = vec![0u8; 48 - digest.len()];
        padded.extend_from_slice(&digest);
        let sig: p384::ecdsa::Signature = sk.sign_prehash(&padded).unwrap();
        public
            .verify(&digest, HashAlgId::Sha1, sig.to_der().as_bytes())
            .unwrap();
    }

    #[test]
    fn test_field_prehash_padding() {
        let short = [0xAB; 20];
        let padded = field_prehash(&short, EccCurveId::NistP384);
        assert_eq!(padded.len(), 48);
        assert!(padded[..28].iter().all(|&b| b == 0));
        assert_eq!(&padded[28..], &short);
        let long = [0xCD; 64];
        assert_eq!(field_prehash(&long, EccCurveId::NistP256), long.to_vec());
    }

    #[test]
    fn test_ecdsa_non_positive_component() {
        let public = p256_key().public_key();
        let digest = digest_slices(HashAlgId::Sha256, &[b"x"]);
        // SEQUENCE { INTEGER 0, INTEGER 1 }
        let zero_r = [0x30, 0x06, 0x02, 0x01, 0x00, 0x02, 0x01, 0x01];
        let err = public.verify(&digest, HashAlgId::Sha256, &zero_r).unwrap_err();
        assert!(matches!(err, TlsError::IllegalParameter(_)));
        // SEQUENCE { INTEGER 1, INTEGER -1 }
        let neg_s = [0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0xFF];
        let err = public.verify(&digest, HashAlgId::Sha256, &neg_s).unwrap_err();
        assert!(err.is_security_failure());
    }

    #[test]
    fn test_ecdsa_trailing_data_rejected() {
        let key = p256_key();
        let digest = digest_slices(HashAlgId::Sha256, &[b"x"]);
        let mut sig = key.sign(&mut OsRng, &digest, HashAlgId::Sha256).unwrap();
        sig.push(0x00);
        let err = key.public_key().verify(&digest, HashAlgId::Sha256, &sig).unwrap_err();
        assert!(matches!(err, TlsError::DecodeError(_)));
    }

    #[test]
    fn test_rsa_session_key_round_trip() {
        let key = rsa_key();
        let pms = [0x03u8; 48];
        let ct = key.public_key().encrypt(&mut OsRng, &pms).unwrap();
        let mut out = [0u8; 48];
        key.decrypt_session_key(&mut OsRng, &ct, &mut out).unwrap();
        assert_eq!(out, pms);
    }

    #[test]
    fn test_rsa_bad_padding_yields_random_key() {
        let key = rsa_key();
        let public = match key.public_key() {
            PeerPublicKey::Rsa(pk) => pk,
            _ => unreachable!(),
        };
        // Raw encryption of a block that is not PKCS#1 v1.5 type 2.
        let mut em = vec![0x00, 0x01];
        em.resize(public.size(), 0x55);
        let m = rsa::BigUint::from_bytes_be(&em);
        let c = rsa::hazmat::rsa_encrypt(&public, &m).unwrap().to_bytes_be();
        let mut ct = vec![0u8; public.size() - c.len()];
        ct.extend_from_slice(&c);

        let mut out = [0u8; 48];
        key.decrypt_session_key(&mut OsRng, &ct, &mut out).unwrap();
        assert_ne!(out, [0u8; 48]);
        assert_ne!(out[..], em[em.len() - 48..]);
    }

    #[test]
    fn test_rsa_ciphertext_length_checked() {
        let key = rsa_key();
        let mut out = [0u8; 48];
        let err = key.decrypt_session_key(&mut OsRng, &[1u8; 12], &mut out).unwrap_err();
        assert!(matches!(err, TlsError::CryptoError(CryptoError::RsaDecryptFail)));
    }

    #[test]
    fn test_wrong_capability_is_config_error() {
        let key = p256_key();
        let mut out = [0u8; 48];
        let err = key.decrypt_session_key(&mut OsRng, &[0u8; 64], &mut out).unwrap_err();
        assert!(matches!(err, TlsError::ConfigError(_)));
        let err = key.public_key().encrypt(&mut OsRng, &[0u8; 48]).unwrap_err();
        assert!(matches!(err, TlsError::HandshakeFailed(_)));
    }
}
