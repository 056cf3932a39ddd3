//! TLS cryptographic identifiers and primitive wrappers.
//!
//! Bridges the key agreement state machines with the RustCrypto primitives.

pub mod dh;
pub mod ecdh;
pub mod hash;
pub mod keys;
mod pkcs1;

use crate::CipherSuite;
use kxtls_types::{EccCurveId, HashAlgId, TlsError};
use rand_core::CryptoRngCore;

/// TLS named group identifiers (for key exchange).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamedGroup(pub u16);

impl NamedGroup {
    pub const SECP256R1: Self = Self(0x0017);
    pub const SECP384R1: Self = Self(0x0018);
    pub const SECP521R1: Self = Self(0x0019);
    pub const X25519: Self = Self(0x001D);
}

/// Hash identifiers from the TLS 1.2 `HashAlgorithm` registry.
pub mod hash_ids {
    pub const MD5: u8 = 1;
    pub const SHA1: u8 = 2;
    pub const SHA224: u8 = 3;
    pub const SHA256: u8 = 4;
    pub const SHA384: u8 = 5;
    pub const SHA512: u8 = 6;
}

/// TLS 1.2 signature-and-hash pair, encoded as `hash << 8 | signature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureScheme(pub u16);

impl SignatureScheme {
    pub const RSA_PKCS1_SHA1: Self = Self(0x0201);
    pub const ECDSA_SHA1: Self = Self(0x0203);
    pub const RSA_PKCS1_SHA256: Self = Self(0x0401);
    pub const ECDSA_SECP256R1_SHA256: Self = Self(0x0403);
    pub const RSA_PKCS1_SHA384: Self = Self(0x0501);
    pub const ECDSA_SECP384R1_SHA384: Self = Self(0x0503);
    pub const RSA_PKCS1_SHA512: Self = Self(0x0601);
    pub const ECDSA_SECP521R1_SHA512: Self = Self(0x0603);

    pub fn new(hash: u8, signature: u8) -> Self {
        Self(u16::from(hash) << 8 | u16::from(signature))
    }

    pub fn hash(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn signature(self) -> u8 {
        self.0 as u8
    }

    /// The digest this pair names, if it is one we can compute.
    pub fn hash_alg(self) -> Option<HashAlgId> {
        match self.hash() {
            hash_ids::MD5 => Some(HashAlgId::Md5),
            hash_ids::SHA1 => Some(HashAlgId::Sha1),
            hash_ids::SHA224 => Some(HashAlgId::Sha224),
            hash_ids::SHA256 => Some(HashAlgId::Sha256),
            hash_ids::SHA384 => Some(HashAlgId::Sha384),
            hash_ids::SHA512 => Some(HashAlgId::Sha512),
            _ => None,
        }
    }
}

/// Signature algorithms a server signs ServerKeyExchange with by default.
pub const DEFAULT_SIGNATURE_ALGORITHMS: &[SignatureScheme] = &[
    SignatureScheme::RSA_PKCS1_SHA256,
    SignatureScheme::ECDSA_SECP256R1_SHA256,
    SignatureScheme::RSA_PKCS1_SHA384,
    SignatureScheme::ECDSA_SECP384R1_SHA384,
    SignatureScheme::RSA_PKCS1_SHA1,
    SignatureScheme::ECDSA_SHA1,
];

/// TLS 1.0-1.2 key exchange algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExchangeAlg {
    /// Static RSA key exchange (client encrypts PMS with server's RSA cert key).
    Rsa,
    /// Ephemeral Diffie-Hellman key exchange (server sends DH params in SKE).
    Dhe,
    Ecdhe,
}

/// Authentication algorithm of the server certificate.
///
/// Doubles as the signature identifier in TLS 1.2 signature-and-hash pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAlg {
    Rsa,
    Ecdsa,
}

impl AuthAlg {
    /// Wire value in the TLS 1.2 `SignatureAlgorithm` registry.
    pub fn wire_id(self) -> u8 {
        match self {
            AuthAlg::Rsa => 1,
            AuthAlg::Ecdsa => 3,
        }
    }
}

/// Key exchange parameters of a TLS 1.0-1.2 cipher suite.
#[derive(Debug, Clone)]
pub struct Tls12CipherSuiteParams {
    /// The cipher suite identifier.
    pub suite: CipherSuite,
    /// Key exchange algorithm.
    pub kx_alg: KeyExchangeAlg,
    /// Authentication algorithm.
    pub auth_alg: AuthAlg,
}

impl Tls12CipherSuiteParams {
    /// Look up parameters for a TLS 1.0-1.2 cipher suite.
    pub fn from_suite(suite: CipherSuite) -> Result<Self, TlsError> {
        let (kx_alg, auth_alg) = match suite {
            CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA
            | CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA
            | CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256
            | CipherSuite::TLS_RSA_WITH_AES_256_GCM_SHA384 => (KeyExchangeAlg::Rsa, AuthAlg::Rsa),

            CipherSuite::TLS_DHE_RSA_WITH_AES_128_CBC_SHA
            | CipherSuite::TLS_DHE_RSA_WITH_AES_256_CBC_SHA
            | CipherSuite::TLS_DHE_RSA_WITH_AES_128_GCM_SHA256
            | CipherSuite::TLS_DHE_RSA_WITH_AES_256_GCM_SHA384 => (KeyExchangeAlg::Dhe, AuthAlg::Rsa),

            CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA
            | CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA
            | CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256
            | CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384
            | CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256 => {
                (KeyExchangeAlg::Ecdhe, AuthAlg::Rsa)
            }

            CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA
            | CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA
            | CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
            | CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384
            | CipherSuite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256 => {
                (KeyExchangeAlg::Ecdhe, AuthAlg::Ecdsa)
            }

            _ => {
                return Err(TlsError::HandshakeFailed(format!(
                    "unsupported cipher suite 0x{:04x}",
                    suite.0
                )))
            }
        };
        Ok(Self {
            suite,
            kx_alg,
            auth_alg,
        })
    }
}

/// A named group this crate can run ECDHE over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedCurve {
    X25519,
    P256,
    P384,
    P521,
}

impl NamedCurve {
    pub fn from_group(group: NamedGroup) -> Option<Self> {
        match group {
            NamedGroup::X25519 => Some(NamedCurve::X25519),
            NamedGroup::SECP256R1 => Some(NamedCurve::P256),
            NamedGroup::SECP384R1 => Some(NamedCurve::P384),
            NamedGroup::SECP521R1 => Some(NamedCurve::P521),
            _ => None,
        }
    }

    pub fn group(self) -> NamedGroup {
        match self {
            NamedCurve::X25519 => NamedGroup::X25519,
            NamedCurve::P256 => NamedGroup::SECP256R1,
            NamedCurve::P384 => NamedGroup::SECP384R1,
            NamedCurve::P521 => NamedGroup::SECP521R1,
        }
    }

    pub fn curve_id(self) -> EccCurveId {
        match self {
            NamedCurve::X25519 => EccCurveId::Curve25519,
            NamedCurve::P256 => EccCurveId::NistP256,
            NamedCurve::P384 => EccCurveId::NistP384,
            NamedCurve::P521 => EccCurveId::NistP521,
        }
    }

    /// Length of an encoded public value: the raw u-coordinate for X25519,
    /// an uncompressed SEC1 point otherwise.
    pub fn public_len(self) -> usize {
        match self {
            NamedCurve::X25519 => 32,
            _ => 1 + 2 * self.curve_id().field_len(),
        }
    }
}

/// Fill `buf` from `rng`, reporting entropy failure as an I/O error.
pub(crate) fn fill_random(rng: &mut dyn CryptoRngCore, buf: &mut [u8]) -> Result<(), TlsError> {
    rng.try_fill_bytes(buf)
        .map_err(|e| TlsError::IoError(e.into()))
}
