//! Wire codec for the TLS 1.0-1.2 key exchange messages.
//!
//! ```text
//! ServerKeyExchange (ECDHE): curve_type(1)=3 || named_curve(2) || len(1) || point || signed
//! ServerKeyExchange (DHE):   len(2) || p || len(2) || g || len(2) || Ys || signed
//! signed:                    [hash(1) || sig(1)]  (TLS 1.2+) || len(2) || signature
//! ClientKeyExchange (RSA):   [len(2)] (TLS 1.0+) || ciphertext
//! ClientKeyExchange (ECDHE): len(1) || point
//! ClientKeyExchange (DHE):   len(2) || Yc
//! ```

use super::HandshakeType;
use crate::crypt::{NamedGroup, SignatureScheme};
use crate::ProtocolVersion;
use kxtls_types::{CryptoError, TlsError};

/// `ECCurveType.named_curve`.
pub const NAMED_CURVE_TYPE: u8 = 3;

/// A cursor over a received message that fails on any short read.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> Reader<'a> {
    /// `what` names the message in decode errors.
    pub fn new(data: &'a [u8], what: &'static str) -> Self {
        Self { data, pos: 0, what }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Everything read so far.
    pub fn consumed(&self) -> &'a [u8] {
        &self.data[..self.pos]
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], TlsError> {
        if len > self.remaining() {
            return Err(TlsError::DecodeError(format!(
                "{}: need {} bytes at offset {}, {} left",
                self.what,
                len,
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, TlsError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, TlsError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u8_prefixed(&mut self) -> Result<&'a [u8], TlsError> {
        let len = self.read_u8()? as usize;
        self.read_bytes(len)
    }

    pub fn read_u16_prefixed(&mut self) -> Result<&'a [u8], TlsError> {
        let len = self.read_u16()? as usize;
        self.read_bytes(len)
    }

    /// Take whatever is left.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    /// The message must end exactly here.
    pub fn expect_empty(&self) -> Result<(), TlsError> {
        if self.remaining() != 0 {
            return Err(TlsError::DecodeError(format!(
                "{}: {} trailing bytes",
                self.what,
                self.remaining()
            )));
        }
        Ok(())
    }
}

/// Builder for an outgoing message.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn put_u8_prefixed(&mut self, data: &[u8]) -> Result<(), TlsError> {
        let len = u8::try_from(data.len()).map_err(|_| CryptoError::InputOverflow)?;
        self.put_u8(len);
        self.put_bytes(data);
        Ok(())
    }

    pub fn put_u16_prefixed(&mut self, data: &[u8]) -> Result<(), TlsError> {
        let len = u16::try_from(data.len()).map_err(|_| CryptoError::InputOverflow)?;
        self.put_u16(len);
        self.put_bytes(data);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// The signature that closes a ServerKeyExchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitallySigned {
    /// Explicit from TLS 1.2 on, implied by the suite before.
    pub scheme: Option<SignatureScheme>,
    pub signature: Vec<u8>,
}

impl DigitallySigned {
    pub fn encode(&self, w: &mut Writer) -> Result<(), TlsError> {
        if let Some(scheme) = self.scheme {
            w.put_u16(scheme.0);
        }
        w.put_u16_prefixed(&self.signature)
    }

    /// Decode the signature tail; it must end the message.
    pub fn decode(r: &mut Reader<'_>, version: ProtocolVersion) -> Result<Self, TlsError> {
        let scheme = if version.has_signature_algorithms() {
            Some(SignatureScheme(r.read_u16()?))
        } else {
            None
        };
        let signature = r.read_u16_prefixed()?.to_vec();
        r.expect_empty()?;
        Ok(Self { scheme, signature })
    }
}

/// Decoded ECDHE ServerKeyExchange.
#[derive(Debug, Clone)]
pub struct EcdheServerKeyExchange<'a> {
    /// The signed parameter block, exactly as received.
    pub params: &'a [u8],
    pub named_curve: NamedGroup,
    pub public: &'a [u8],
    pub signed: DigitallySigned,
}

/// Decoded DHE ServerKeyExchange.
#[derive(Debug, Clone)]
pub struct DheServerKeyExchange<'a> {
    /// The signed parameter block, exactly as received.
    pub params: &'a [u8],
    pub p: &'a [u8],
    pub g: &'a [u8],
    pub public: &'a [u8],
    pub signed: DigitallySigned,
}

/// Build the ECDHE `ServerECDHParams` block.
pub fn build_ecdhe_params(named_curve: NamedGroup, public: &[u8]) -> Result<Vec<u8>, TlsError> {
    let mut w = Writer::with_capacity(4 + public.len());
    w.put_u8(NAMED_CURVE_TYPE);
    w.put_u16(named_curve.0);
    w.put_u8_prefixed(public)?;
    Ok(w.into_inner())
}

/// Build the DHE `ServerDHParams` block.
pub fn build_dhe_params(p: &[u8], g: &[u8], public: &[u8]) -> Result<Vec<u8>, TlsError> {
    let mut w = Writer::with_capacity(6 + p.len() + g.len() + public.len());
    w.put_u16_prefixed(p)?;
    w.put_u16_prefixed(g)?;
    w.put_u16_prefixed(public)?;
    Ok(w.into_inner())
}

/// Encode a ServerKeyExchange handshake message from a parameter block and
/// its signature.
pub fn encode_server_key_exchange(
    params: &[u8],
    signed: &DigitallySigned,
) -> Result<Vec<u8>, TlsError> {
    let mut w = Writer::with_capacity(params.len() + 4 + signed.signature.len());
    w.put_bytes(params);
    signed.encode(&mut w)?;
    wrap_handshake(HandshakeType::ServerKeyExchange, w.as_slice())
}

/// Decode an ECDHE ServerKeyExchange body.
pub fn decode_ecdhe_server_key_exchange(
    body: &[u8],
    version: ProtocolVersion,
) -> Result<EcdheServerKeyExchange<'_>, TlsError> {
    let mut r = Reader::new(body, "ECDHE ServerKeyExchange");
    let curve_type = r.read_u8()?;
    if curve_type != NAMED_CURVE_TYPE {
        return Err(TlsError::DecodeError(format!(
            "unsupported curve type: {curve_type} (expected 3=named_curve)"
        )));
    }
    let named_curve = NamedGroup(r.read_u16()?);
    let public = r.read_u8_prefixed()?;
    let params = r.consumed();
    let signed = DigitallySigned::decode(&mut r, version)?;
    Ok(EcdheServerKeyExchange {
        params,
        named_curve,
        public,
        signed,
    })
}

/// Decode a DHE ServerKeyExchange body.
pub fn decode_dhe_server_key_exchange(
    body: &[u8],
    version: ProtocolVersion,
) -> Result<DheServerKeyExchange<'_>, TlsError> {
    let mut r = Reader::new(body, "DHE ServerKeyExchange");
    let p = r.read_u16_prefixed()?;
    let g = r.read_u16_prefixed()?;
    let public = r.read_u16_prefixed()?;
    let params = r.consumed();
    let signed = DigitallySigned::decode(&mut r, version)?;
    Ok(DheServerKeyExchange {
        params,
        p,
        g,
        public,
        signed,
    })
}

/// Encode a ClientKeyExchange carrying an RSA-encrypted pre-master secret.
pub fn encode_rsa_client_key_exchange(
    ciphertext: &[u8],
    version: ProtocolVersion,
) -> Result<Vec<u8>, TlsError> {
    let mut w = Writer::with_capacity(2 + ciphertext.len());
    // SSL 3.0 sends the ciphertext bare
    if version == ProtocolVersion::SSL30 {
        w.put_bytes(ciphertext);
    } else {
        w.put_u16_prefixed(ciphertext)?;
    }
    wrap_handshake(HandshakeType::ClientKeyExchange, w.as_slice())
}

pub fn decode_rsa_client_key_exchange(
    body: &[u8],
    version: ProtocolVersion,
) -> Result<&[u8], TlsError> {
    let mut r = Reader::new(body, "RSA ClientKeyExchange");
    let ciphertext = if version == ProtocolVersion::SSL30 {
        r.read_rest()
    } else {
        r.read_u16_prefixed()?
    };
    r.expect_empty()?;
    Ok(ciphertext)
}

/// Encode an ECDHE ClientKeyExchange.
pub fn encode_ecdhe_client_key_exchange(public: &[u8]) -> Result<Vec<u8>, TlsError> {
    let mut w = Writer::with_capacity(1 + public.len());
    w.put_u8_prefixed(public)?;
    wrap_handshake(HandshakeType::ClientKeyExchange, w.as_slice())
}

pub fn decode_ecdhe_client_key_exchange(body: &[u8]) -> Result<&[u8], TlsError> {
    let mut r = Reader::new(body, "ECDHE ClientKeyExchange");
    let public = r.read_u8_prefixed()?;
    r.expect_empty()?;
    Ok(public)
}

/// Encode a DHE ClientKeyExchange.
pub fn encode_dhe_client_key_exchange(public: &[u8]) -> Result<Vec<u8>, TlsError> {
    let mut w = Writer::with_capacity(2 + public.len());
    w.put_u16_prefixed(public)?;
    wrap_handshake(HandshakeType::ClientKeyExchange, w.as_slice())
}

pub fn decode_dhe_client_key_exchange(body: &[u8]) -> Result<&[u8], TlsError> {
    let mut r = Reader::new(body, "DHE ClientKeyExchange");
    let public = r.read_u16_prefixed()?;
    r.expect_empty()?;
    Ok(public)
}

/// Prepend the 4-byte handshake header (type + uint24 length).
pub fn wrap_handshake(msg_type: HandshakeType, body: &[u8]) -> Result<Vec<u8>, TlsError> {
    let len = body.len();
    if len > 0x00FF_FFFF {
        return Err(CryptoError::InputOverflow.into());
    }
    let mut out = Vec::with_capacity(4 + len);
    out.push(msg_type as u8);
    out.push((len >> 16) as u8);
    out.push((len >> 8) as u8);
    out.push(len as u8);
    out.extend_from_slice(body);
    Ok(out)
}

/// Parse a handshake header and return (type, body, total length consumed).
pub fn parse_handshake_header(data: &[u8]) -> Result<(HandshakeType, &[u8], usize), TlsError> {
    if data.len() < 4 {
        return Err(TlsError::DecodeError("handshake header too short".into()));
    }
    let msg_type = match data[0] {
        12 => HandshakeType::ServerKeyExchange,
        16 => HandshakeType::ClientKeyExchange,
        other => {
            return Err(TlsError::UnexpectedMessage(format!(
                "handshake type {other} is not a key exchange message"
            )))
        }
    };
    let len = (data[1] as usize) << 16 | (data[2] as usize) << 8 | data[3] as usize;
    if data.len() < 4 + len {
        return Err(TlsError::DecodeError(format!(
            "handshake body truncated: need {len}, have {}",
            data.len() - 4
        )));
    }
    Ok((msg_type, &data[4..4 + len], 4 + len))
}
