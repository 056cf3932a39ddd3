//! Ephemeral ECDH over X25519 and the NIST prime curves.

use super::{fill_random, NamedCurve};
use elliptic_curve::sec1::{FromEncodedPoint, ModulusSize, ToEncodedPoint};
use elliptic_curve::{AffinePoint, CurveArithmetic, FieldBytesSize, PublicKey, SecretKey};
use kxtls_types::TlsError;
use p256::NistP256;
use p384::NistP384;
use p521::NistP521;
use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;
use tracing::warn;
use x25519_dalek::{x25519, X25519_BASEPOINT_BYTES};
use zeroize::Zeroizing;

/// An ephemeral private key on one of the supported curves.
pub enum EphemeralSecret {
    X25519(Zeroizing<[u8; 32]>),
    P256(SecretKey<NistP256>),
    P384(SecretKey<NistP384>),
    P521(SecretKey<NistP521>),
}

impl std::fmt::Debug for EphemeralSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EphemeralSecret").field(&self.curve()).finish()
    }
}

impl EphemeralSecret {
    /// Generate a fresh private key on `curve`.
    pub fn generate(curve: NamedCurve, rng: &mut dyn CryptoRngCore) -> Result<Self, TlsError> {
        Ok(match curve {
            NamedCurve::X25519 => EphemeralSecret::X25519(random_x25519_scalar(rng)?),
            NamedCurve::P256 => EphemeralSecret::P256(random_secret(curve, rng)?),
            NamedCurve::P384 => EphemeralSecret::P384(random_secret(curve, rng)?),
            NamedCurve::P521 => EphemeralSecret::P521(random_secret(curve, rng)?),
        })
    }

    /// Wrap a caller-chosen X25519 scalar.
    pub fn x25519_from_bytes(scalar: [u8; 32]) -> Self {
        EphemeralSecret::X25519(Zeroizing::new(scalar))
    }

    pub fn curve(&self) -> NamedCurve {
        match self {
            EphemeralSecret::X25519(_) => NamedCurve::X25519,
            EphemeralSecret::P256(_) => NamedCurve::P256,
            EphemeralSecret::P384(_) => NamedCurve::P384,
            EphemeralSecret::P521(_) => NamedCurve::P521,
        }
    }

    /// The public value as it travels in key exchange messages.
    pub fn public_bytes(&self) -> Vec<u8> {
        match self {
            EphemeralSecret::X25519(scalar) => x25519(**scalar, X25519_BASEPOINT_BYTES).to_vec(),
            EphemeralSecret::P256(sk) => encode_public(sk),
            EphemeralSecret::P384(sk) => encode_public(sk),
            EphemeralSecret::P521(sk) => encode_public(sk),
        }
    }

    /// Decode the peer's public value on our curve and compute the shared
    /// secret (the x-coordinate, left-padded to the field size).
    pub fn agree(&self, peer_public: &[u8]) -> Result<Zeroizing<Vec<u8>>, TlsError> {
        match self {
            EphemeralSecret::X25519(scalar) => x25519_agree(scalar, &decode_x25519(peer_public)?),
            EphemeralSecret::P256(sk) => {
                Ok(shared_secret(sk, &decode_point(NamedCurve::P256, peer_public)?))
            }
            EphemeralSecret::P384(sk) => {
                Ok(shared_secret(sk, &decode_point(NamedCurve::P384, peer_public)?))
            }
            EphemeralSecret::P521(sk) => {
                Ok(shared_secret(sk, &decode_point(NamedCurve::P521, peer_public)?))
            }
        }
    }
}

/// A validated public value received from the peer.
#[derive(Debug, Clone)]
pub enum PeerPoint {
    X25519([u8; 32]),
    P256(PublicKey<NistP256>),
    P384(PublicKey<NistP384>),
    P521(PublicKey<NistP521>),
}

impl PeerPoint {
    /// Decode `bytes` as a public value on `curve`.
    ///
    /// A wrong length or a non-uncompressed encoding is a decode error; a
    /// well-formed point that is not on the curve is an illegal parameter.
    pub fn decode(curve: NamedCurve, bytes: &[u8]) -> Result<Self, TlsError> {
        Ok(match curve {
            NamedCurve::X25519 => PeerPoint::X25519(decode_x25519(bytes)?),
            NamedCurve::P256 => PeerPoint::P256(decode_point(curve, bytes)?),
            NamedCurve::P384 => PeerPoint::P384(decode_point(curve, bytes)?),
            NamedCurve::P521 => PeerPoint::P521(decode_point(curve, bytes)?),
        })
    }

    pub fn curve(&self) -> NamedCurve {
        match self {
            PeerPoint::X25519(_) => NamedCurve::X25519,
            PeerPoint::P256(_) => NamedCurve::P256,
            PeerPoint::P384(_) => NamedCurve::P384,
            PeerPoint::P521(_) => NamedCurve::P521,
        }
    }

    /// Generate an ephemeral key on the peer's curve and agree with it.
    ///
    /// Returns our encoded public value and the shared secret.
    pub fn agree(
        &self,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>), TlsError> {
        match self {
            PeerPoint::X25519(peer) => {
                let scalar = random_x25519_scalar(rng)?;
                let public = x25519(*scalar, X25519_BASEPOINT_BYTES).to_vec();
                Ok((public, x25519_agree(&scalar, peer)?))
            }
            PeerPoint::P256(peer) => {
                let sk = random_secret::<NistP256>(NamedCurve::P256, rng)?;
                Ok((encode_public(&sk), shared_secret(&sk, peer)))
            }
            PeerPoint::P384(peer) => {
                let sk = random_secret::<NistP384>(NamedCurve::P384, rng)?;
                Ok((encode_public(&sk), shared_secret(&sk, peer)))
            }
            PeerPoint::P521(peer) => {
                let sk = random_secret::<NistP521>(NamedCurve::P521, rng)?;
                Ok((encode_public(&sk), shared_secret(&sk, peer)))
            }
        }
    }
}

fn random_x25519_scalar(rng: &mut dyn CryptoRngCore) -> Result<Zeroizing<[u8; 32]>, TlsError> {
    let mut scalar = Zeroizing::new([0u8; 32]);
    fill_random(rng, &mut scalar[..])?;
    Ok(scalar)
}

fn decode_x25519(bytes: &[u8]) -> Result<[u8; 32], TlsError> {
    bytes.try_into().map_err(|_| {
        TlsError::DecodeError(format!(
            "X25519 public value must be 32 bytes, got {}",
            bytes.len()
        ))
    })
}

fn x25519_agree(scalar: &[u8; 32], peer: &[u8; 32]) -> Result<Zeroizing<Vec<u8>>, TlsError> {
    let shared = Zeroizing::new(x25519(*scalar, *peer));
    if bool::from(shared[..].ct_eq(&[0u8; 32][..])) {
        warn!("X25519 peer sent a low-order point");
        return Err(TlsError::IllegalParameter(
            "X25519 shared secret is all zero".into(),
        ));
    }
    Ok(Zeroizing::new(shared.to_vec()))
}

/// Rejection-sample a scalar in `[1, n)` from field-sized random strings,
/// masking the excess top bits so the loop terminates quickly on P-521.
fn random_secret<C>(curve: NamedCurve, rng: &mut dyn CryptoRngCore) -> Result<SecretKey<C>, TlsError>
where
    C: CurveArithmetic,
{
    let id = curve.curve_id();
    let top_mask = match id.bit_size() % 8 {
        0 => 0xFF,
        bits => (1u8 << bits) - 1,
    };
    let mut bytes = Zeroizing::new(vec![0u8; id.field_len()]);
    loop {
        fill_random(rng, &mut bytes)?;
        bytes[0] &= top_mask;
        if let Ok(sk) = SecretKey::<C>::from_slice(&bytes) {
            return Ok(sk);
        }
    }
}

fn encode_public<C>(sk: &SecretKey<C>) -> Vec<u8>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    sk.public_key().to_encoded_point(false).as_bytes().to_vec()
}

fn decode_point<C>(curve: NamedCurve, bytes: &[u8]) -> Result<PublicKey<C>, TlsError>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    if bytes.len() != curve.public_len() || bytes[0] != 0x04 {
        return Err(TlsError::DecodeError(format!(
            "{:?} public value is not an uncompressed point",
            curve
        )));
    }
    PublicKey::<C>::from_sec1_bytes(bytes).map_err(|_| {
        warn!(curve = ?curve, "peer public value is not on the curve");
        TlsError::IllegalParameter(format!("{:?} point is not on the curve", curve))
    })
}

fn shared_secret<C>(sk: &SecretKey<C>, peer: &PublicKey<C>) -> Zeroizing<Vec<u8>>
where
    C: CurveArithmetic,
{
    let shared = elliptic_curve::ecdh::diffie_hellman(sk.to_nonzero_scalar(), peer.as_affine());
    Zeroizing::new(shared.raw_secret_bytes().to_vec())
}
