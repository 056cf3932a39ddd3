/// Hash algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgId {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    /// Concatenated MD5 || SHA-1 digest (36 bytes) used by TLS 1.0/1.1
    /// RSA signatures.
    Md5Sha1,
}

impl HashAlgId {
    /// Digest output length in bytes.
    pub fn output_len(self) -> usize {
        match self {
            HashAlgId::Md5 => 16,
            HashAlgId::Sha1 => 20,
            HashAlgId::Sha224 => 28,
            HashAlgId::Sha256 => 32,
            HashAlgId::Sha384 => 48,
            HashAlgId::Sha512 => 64,
            HashAlgId::Md5Sha1 => 36,
        }
    }
}

/// Elliptic curve identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EccCurveId {
    NistP256,
    NistP384,
    NistP521,
    Curve25519,
}

impl EccCurveId {
    /// Size of a field element (and of an ECDH shared secret) in bytes.
    pub fn field_len(self) -> usize {
        match self {
            EccCurveId::NistP256 | EccCurveId::Curve25519 => 32,
            EccCurveId::NistP384 => 48,
            EccCurveId::NistP521 => 66,
        }
    }

    /// Order bit length.
    pub fn bit_size(self) -> usize {
        match self {
            EccCurveId::NistP256 => 256,
            EccCurveId::NistP384 => 384,
            EccCurveId::NistP521 => 521,
            EccCurveId::Curve25519 => 255,
        }
    }
}
