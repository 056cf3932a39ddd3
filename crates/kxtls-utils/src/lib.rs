#![forbid(unsafe_code)]
#![doc = "Encoding helpers for kxtls: ASN.1 DER."]

#[cfg(feature = "asn1")]
pub mod asn1;
