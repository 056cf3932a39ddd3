/// Cryptographic primitive errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key")]
    InvalidKey,

    // Buffer errors
    #[error("input data too long")]
    InputOverflow,

    // RSA errors
    #[error("rsa: encryption failed")]
    RsaEncryptFail,
    #[error("rsa: decryption failed")]
    RsaDecryptFail,
    #[error("rsa: signing failed")]
    RsaSignFail,

    // ECDSA errors
    #[error("ecdsa: signing failed")]
    EcdsaSignFail,

    // Encoding/Decoding errors
    #[error("decode: asn1 buffer failed")]
    DecodeAsn1Fail,
}

/// TLS key agreement errors.
///
/// Every variant is fatal for the handshake attempt that produced it.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// A length-prefixed field disagrees with the bytes available.
    #[error("decode error: {0}")]
    DecodeError(String),
    /// No mutually supported curve, hash or signature algorithm.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),
    /// An exchange message arrived that the negotiated key agreement never
    /// carries.
    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),
    /// The peer offered parameters weaker than local policy accepts.
    #[error("insufficient security: {0}")]
    InsufficientSecurity(String),
    /// A received public value failed validation (off-curve point, DH value
    /// out of range, non-positive ECDSA component).
    #[error("illegal parameter: {0}")]
    IllegalParameter(String),
    /// The ServerKeyExchange signature did not verify.
    #[error("signature verification failed: {0}")]
    SignatureVerifyFailed(String),
    /// Local configuration cannot serve the negotiated key agreement.
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("crypto error: {0}")]
    CryptoError(#[from] CryptoError),
}

impl TlsError {
    /// Returns true for failures that indicate corruption or an active
    /// attack on the exchanged key material.
    pub fn is_security_failure(&self) -> bool {
        matches!(
            self,
            TlsError::IllegalParameter(_) | TlsError::SignatureVerifyFailed(_)
        )
    }
}
