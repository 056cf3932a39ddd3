//! ASN.1 identifier octet parsing.

use super::{Tag, TagClass};
use kxtls_types::CryptoError;

impl Tag {
    /// Parse a single-octet tag from the front of `input`.
    ///
    /// High tag numbers (low five bits all set) never occur in the
    /// structures decoded here and are rejected.
    pub fn from_bytes(input: &[u8]) -> Result<Self, CryptoError> {
        let first = *input.first().ok_or(CryptoError::DecodeAsn1Fail)?;
        let class = match first >> 6 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        };
        let number = (first & 0x1F) as u32;
        if number == 0x1F {
            return Err(CryptoError::DecodeAsn1Fail);
        }
        Ok(Tag {
            class,
            constructed: first & 0x20 != 0,
            number,
        })
    }

    /// Returns true if this is the universal tag `number`.
    pub fn is_universal(&self, number: u32) -> bool {
        self.class == TagClass::Universal && self.number == number
    }
}
