//! TLS alerts raised by key agreement failures.

use kxtls_types::TlsError;

/// Alert severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertLevel {
    Warning = 1,
    Fatal = 2,
}

/// Alert description codes (RFC 5246 §7.2) that a key agreement failure
/// can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertDescription {
    UnexpectedMessage = 10,
    HandshakeFailure = 40,
    IllegalParameter = 47,
    DecodeError = 50,
    DecryptError = 51,
    InsufficientSecurity = 71,
    InternalError = 80,
}

/// A TLS alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub description: AlertDescription,
}

impl Alert {
    /// The fatal alert a handshake driver sends when a key agreement
    /// operation fails with `err`.
    pub fn fatal_for(err: &TlsError) -> Self {
        Alert {
            level: AlertLevel::Fatal,
            description: AlertDescription::from(err),
        }
    }

    /// Wire encoding: level(1) || description(1).
    pub fn to_bytes(self) -> [u8; 2] {
        [self.level as u8, self.description as u8]
    }
}

impl From<&TlsError> for AlertDescription {
    fn from(err: &TlsError) -> Self {
        match err {
            TlsError::DecodeError(_) => AlertDescription::DecodeError,
            TlsError::HandshakeFailed(_) => AlertDescription::HandshakeFailure,
            TlsError::UnexpectedMessage(_) => AlertDescription::UnexpectedMessage,
            TlsError::InsufficientSecurity(_) => AlertDescription::InsufficientSecurity,
            TlsError::IllegalParameter(_) => AlertDescription::IllegalParameter,
            TlsError::SignatureVerifyFailed(_) => AlertDescription::DecryptError,
            TlsError::ConfigError(_) | TlsError::IoError(_) | TlsError::CryptoError(_) => {
                AlertDescription::InternalError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kxtls_types::CryptoError;

    #[test]
    fn test_alert_mapping() {
        let cases = [
            (TlsError::DecodeError("x".into()), AlertDescription::DecodeError),
            (
                TlsError::HandshakeFailed("x".into()),
                AlertDescription::HandshakeFailure,
            ),
            (
                TlsError::UnexpectedMessage("x".into()),
                AlertDescription::UnexpectedMessage,
            ),
            (
                TlsError::IllegalParameter("x".into()),
                AlertDescription::IllegalParameter,
            ),
            (
                TlsError::SignatureVerifyFailed("x".into()),
                AlertDescription::DecryptError,
            ),
            (
                TlsError::CryptoError(CryptoError::RsaSignFail),
                AlertDescription::InternalError,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(AlertDescription::from(&err), expected, "{err}");
        }
    }

    #[test]
    fn test_fatal_alert_bytes() {
        let alert = Alert::fatal_for(&TlsError::IllegalParameter("dh".into()));
        assert_eq!(alert.to_bytes(), [2, 47]);
    }
}
