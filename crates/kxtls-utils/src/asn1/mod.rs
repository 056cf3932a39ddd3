//! ASN.1 DER decoding, restricted to what TLS signature handling needs.

mod decoder;
mod tag;

pub use decoder::{integer_is_positive, Decoder, EcdsaSigValue};

/// ASN.1 universal tag numbers.
pub mod tags {
    pub const INTEGER: u32 = 0x02;
    pub const SEQUENCE: u32 = 0x10;
}

/// Represents a parsed ASN.1 identifier octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub class: TagClass,
    pub constructed: bool,
    pub number: u32,
}

/// ASN.1 tag class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

/// A borrowed ASN.1 TLV element.
#[derive(Debug, Clone)]
pub struct Tlv<'a> {
    pub tag: Tag,
    pub value: &'a [u8],
}
