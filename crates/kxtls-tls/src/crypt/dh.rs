//! Finite-field Diffie-Hellman for DHE key agreement.

use super::fill_random;
use kxtls_types::TlsError;
use num_bigint::BigUint;
use rand_core::CryptoRngCore;
use tracing::warn;
use zeroize::Zeroizing;

/// Finite-field Diffie-Hellman group parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhParams {
    p: BigUint,
    g: BigUint,
}

impl DhParams {
    /// Build a group from big-endian `p` and `g`.
    ///
    /// The prime must be odd and at least 512 bits; the generator must lie
    /// in `(1, p - 1)`.
    pub fn new(p: &[u8], g: &[u8]) -> Result<Self, TlsError> {
        let p = BigUint::from_bytes_be(p);
        let g = BigUint::from_bytes_be(g);
        if p.bits() < 512 || !p.bit(0) {
            return Err(TlsError::ConfigError(
                "DH prime must be odd and at least 512 bits".into(),
            ));
        }
        if !Self::generator_in_range(&p, &g) {
            return Err(TlsError::ConfigError(
                "DH generator out of range".into(),
            ));
        }
        Ok(Self { p, g })
    }

    /// Parameters received from a server, checked only for a usable shape.
    pub(crate) fn from_peer(p: &[u8], g: &[u8]) -> Result<Self, TlsError> {
        let p = BigUint::from_bytes_be(p);
        let g = BigUint::from_bytes_be(g);
        if p.bits() < 2 || !p.bit(0) || !Self::generator_in_range(&p, &g) {
            warn!(prime_bits = p.bits(), "server sent degenerate DH group");
            return Err(TlsError::IllegalParameter(
                "server DH group is degenerate".into(),
            ));
        }
        Ok(Self { p, g })
    }

    /// The RFC 7919 ffdhe2048 group.
    pub fn ffdhe2048() -> Self {
        Self {
            p: BigUint::from_bytes_be(&FFDHE2048_P),
            g: BigUint::from(2u32),
        }
    }

    fn generator_in_range(p: &BigUint, g: &BigUint) -> bool {
        *g > BigUint::from(1u32) && g + 1u32 < *p
    }

    pub fn p(&self) -> &BigUint {
        &self.p
    }

    pub fn g(&self) -> &BigUint {
        &self.g
    }

    pub fn prime_bits(&self) -> u64 {
        self.p.bits()
    }

    /// `p - 1`; never underflows since `p > g + 1 > 2`.
    fn p_minus_one(&self) -> BigUint {
        &self.p - 1u32
    }

    /// Check that a received public value lies strictly inside `(1, p - 1)`.
    pub fn check_public(&self, y: &BigUint) -> Result<(), TlsError> {
        if *y <= BigUint::from(1u32) || *y >= self.p_minus_one() {
            warn!(prime_bits = self.p.bits(), "peer DH public value out of range");
            return Err(TlsError::IllegalParameter(
                "DH public value out of range".into(),
            ));
        }
        Ok(())
    }
}

/// An ephemeral DH exponent `x` in `[1, p - 1)`.
pub struct DhSecret {
    x: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for DhSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DhSecret").finish_non_exhaustive()
    }
}

impl DhSecret {
    pub fn generate(params: &DhParams, rng: &mut dyn CryptoRngCore) -> Result<Self, TlsError> {
        let max = params.p_minus_one();
        loop {
            let x = random_below(&max, rng)?;
            if x.bits() > 0 {
                return Ok(Self {
                    x: Zeroizing::new(x.to_bytes_be()),
                });
            }
        }
    }

    fn exponent(&self) -> BigUint {
        BigUint::from_bytes_be(&self.x)
    }

    /// `g^x mod p`, big-endian without leading zeros.
    pub fn public_value(&self, params: &DhParams) -> Vec<u8> {
        params.g.modpow(&self.exponent(), &params.p).to_bytes_be()
    }

    /// Range-check the peer's public value and compute `y^x mod p`,
    /// big-endian without leading zeros.
    pub fn agree(&self, params: &DhParams, peer_public: &[u8]) -> Result<Zeroizing<Vec<u8>>, TlsError> {
        let y = BigUint::from_bytes_be(peer_public);
        params.check_public(&y)?;
        Ok(Zeroizing::new(
            y.modpow(&self.exponent(), &params.p).to_bytes_be(),
        ))
    }
}

/// Uniform integer in `[0, max)` by masked rejection sampling.
fn random_below(max: &BigUint, rng: &mut dyn CryptoRngCore) -> Result<BigUint, TlsError> {
    let bits = max.bits();
    let len = ((bits + 7) / 8) as usize;
    let top_mask = match bits % 8 {
        0 => 0xFF,
        b => (1u8 << b) - 1,
    };
    let mut buf = Zeroizing::new(vec![0u8; len]);
    loop {
        fill_random(rng, &mut buf)?;
        buf[0] &= top_mask;
        let n = BigUint::from_bytes_be(&buf);
        if n < *max {
            return Ok(n);
        }
    }
}

// RFC 7919 §A.1 ffdhe2048 prime
const FFDHE2048_P: [u8; 256] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xad, 0xf8, 0x54, 0x58,
    0xa2, 0xbb, 0x4a, 0x9a, 0xaf, 0xdc, 0x56, 0x20, 0x27, 0x3d, 0x3c, 0xf1,
    0xd8, 0xb9, 0xc5, 0x83, 0xce, 0x2d, 0x36, 0x95, 0xa9, 0xe1, 0x36, 0x41,
    0x14, 0x64, 0x33, 0xfb, 0xcc, 0x93, 0x9d, 0xce, 0x24, 0x9b, 0x3e, 0xf9,
    0x7d, 0x2f, 0xe3, 0x63, 0x63, 0x0c, 0x75, 0xd8, 0xf6, 0x81, 0xb2, 0x02,
    0xae, 0xc4, 0x61, 0x7a, 0xd3, 0xdf, 0x1e, 0xd5, 0xd5, 0xfd, 0x65, 0x61,
    0x24, 0x33, 0xf5, 0x1f, 0x5f, 0x06, 0x6e, 0xd0, 0x85, 0x63, 0x65, 0x55,
    0x3d, 0xed, 0x1a, 0xf3, 0xb5, 0x57, 0x13, 0x5e, 0x7f, 0x57, 0xc9, 0x35,
    0x98, 0x4f, 0x0c, 0x70, 0xe0, 0xe6, 0x8b, 0x77, 0xe2, 0xa6, 0x89, 0xda,
    0xf3, 0xef, 0xe8, 0x72, 0x1d, 0xf1, 0x58, 0xa1, 0x36, 0xad, 0xe7, 0x35,
    0x30, 0xac, 0xca, 0x4f, 0x48, 0x3a, 0x79, 0x7a, 0xbc, 0x0a, 0xb1, 0x82,
    0xb3, 0x24, 0xfb, 0x61, 0xd1, 0x08, 0xa9, 0x4b, 0xb2, 0xc8, 0xe3, 0xfb,
    0xb9, 0x6a, 0xda, 0xb7, 0x60, 0xd7, 0xf4, 0x68, 0x1d, 0x4f, 0x42, 0xa3,
    0xde, 0x39, 0x4d, 0xf4, 0xae, 0x56, 0xed, 0xe7, 0x63, 0x72, 0xbb, 0x19,
    0x0b, 0x07, 0xa7, 0xc8, 0xee, 0x0a, 0x6d, 0x70, 0x9e, 0x02, 0xfc, 0xe1,
    0xcd, 0xf7, 0xe2, 0xec, 0xc0, 0x34, 0x04, 0xcd, 0x28, 0x34, 0x2f, 0x61,
    0x91, 0x72, 0xfe, 0x9c, 0xe9, 0x85, 0x83, 0xff, 0x8e, 0x4f, 0x12, 0x32,
    0xee, 0xf2, 0x81, 0x83, 0xc3, 0xfe, 0x3b, 0x1b, 0x4c, 0x6f, 0xad, 0x73,
    0x3b, 0xb5, 0xfc, 0xbc, 0x2e, 0xc2, 0x20, 0x05, 0xc5, 0x8e, 0xf1, 0x83,
    0x7d, 0x16, 0x83, 0xb2, 0xc6, 0xf3, 0x4a, 0x26, 0xc1, 0xb2, 0xef, 0xfa,
    0x88, 0x6b, 0x42, 0x38, 0x61, 0x28, 0x5c, 0x97, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff,
];
