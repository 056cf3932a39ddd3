//! Key exchange handshake messages and the key agreement state machines.

pub mod codec12;
pub mod key_agreement;
pub mod signing;

use crate::crypt::{NamedGroup, SignatureScheme};
use crate::ProtocolVersion;

/// Handshake message types carried by key agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandshakeType {
    ServerKeyExchange = 12,
    ClientKeyExchange = 16,
}

/// What the server learned from the ClientHello.
#[derive(Debug, Clone)]
pub struct ClientHelloInfo {
    /// Negotiated protocol version.
    pub version: ProtocolVersion,
    pub random: [u8; 32],
    /// Curves offered in the `supported_groups` extension.
    pub supported_groups: Vec<NamedGroup>,
    /// Pairs offered in the `signature_algorithms` extension (TLS 1.2).
    pub signature_algorithms: Vec<SignatureScheme>,
}
