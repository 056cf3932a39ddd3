//! ASN.1 DER decoder.

use super::{tags, Tag, Tlv};
use kxtls_types::CryptoError;

/// A streaming ASN.1 DER decoder.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder over the given data.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the remaining undecoded bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Parse the next TLV element.
    pub fn read_tlv(&mut self) -> Result<Tlv<'a>, CryptoError> {
        let tag = Tag::from_bytes(self.remaining())?;
        self.pos += 1;

        let length = self.read_length()?;
        let end = self
            .pos
            .checked_add(length)
            .ok_or(CryptoError::DecodeAsn1Fail)?;
        if end > self.data.len() {
            return Err(CryptoError::DecodeAsn1Fail);
        }

        let value = &self.data[self.pos..end];
        self.pos = end;
        Ok(Tlv { tag, value })
    }

    /// Parse a definite DER length with minimal encoding.
    fn read_length(&mut self) -> Result<usize, CryptoError> {
        let first = *self
            .data
            .get(self.pos)
            .ok_or(CryptoError::DecodeAsn1Fail)?;
        self.pos += 1;

        if first < 0x80 {
            return Ok(first as usize);
        }
        // 0x80 is the BER indefinite form
        let num_bytes = (first & 0x7F) as usize;
        if num_bytes == 0 || num_bytes > 4 || self.pos + num_bytes > self.data.len() {
            return Err(CryptoError::DecodeAsn1Fail);
        }
        let bytes = &self.data[self.pos..self.pos + num_bytes];
        if bytes[0] == 0 {
            return Err(CryptoError::DecodeAsn1Fail);
        }
        let length = bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
        if length < 0x80 {
            return Err(CryptoError::DecodeAsn1Fail);
        }
        self.pos += num_bytes;
        Ok(length)
    }

    /// Read an INTEGER and return its content octets (two's complement,
    /// big-endian). Non-minimal encodings are rejected.
    pub fn read_integer(&mut self) -> Result<&'a [u8], CryptoError> {
        let tlv = self.read_tlv()?;
        if !tlv.tag.is_universal(tags::INTEGER) || tlv.tag.constructed {
            return Err(CryptoError::DecodeAsn1Fail);
        }
        let v = tlv.value;
        match v {
            [] => Err(CryptoError::DecodeAsn1Fail),
            [0x00, next, ..] if next & 0x80 == 0 => Err(CryptoError::DecodeAsn1Fail),
            [0xFF, next, ..] if next & 0x80 != 0 => Err(CryptoError::DecodeAsn1Fail),
            _ => Ok(v),
        }
    }

    /// Read a SEQUENCE, returning a sub-decoder over its contents.
    pub fn read_sequence(&mut self) -> Result<Decoder<'a>, CryptoError> {
        let tlv = self.read_tlv()?;
        if !tlv.tag.is_universal(tags::SEQUENCE) || !tlv.tag.constructed {
            return Err(CryptoError::DecodeAsn1Fail);
        }
        Ok(Decoder::new(tlv.value))
    }
}

/// Returns true if DER INTEGER content octets encode a value > 0.
pub fn integer_is_positive(content: &[u8]) -> bool {
    match content.first() {
        Some(&b) if b & 0x80 == 0 => content.iter().any(|&b| b != 0),
        _ => false,
    }
}

/// An ECDSA signature value, `SEQUENCE { r INTEGER, s INTEGER }`.
#[derive(Debug, Clone, Copy)]
pub struct EcdsaSigValue<'a> {
    pub r: &'a [u8],
    pub s: &'a [u8],
}

impl<'a> EcdsaSigValue<'a> {
    /// Decode a DER `ECDSA-Sig-Value`. Trailing bytes after the
    /// SEQUENCE are rejected.
    pub fn from_der(der: &'a [u8]) -> Result<Self, CryptoError> {
        let mut outer = Decoder::new(der);
        let mut seq = outer.read_sequence()?;
        if !outer.is_empty() {
            return Err(CryptoError::DecodeAsn1Fail);
        }
        let r = seq.read_integer()?;
        let s = seq.read_integer()?;
        if !seq.is_empty() {
            return Err(CryptoError::DecodeAsn1Fail);
        }
        Ok(Self { r, s })
    }

    /// Both components strictly positive.
    pub fn is_positive(&self) -> bool {
        integer_is_positive(self.r) && integer_is_positive(self.s)
    }
}
