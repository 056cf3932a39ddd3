//! Key agreement configuration.

use crate::crypt::dh::DhParams;
use crate::crypt::{NamedGroup, SignatureScheme, DEFAULT_SIGNATURE_ALGORITHMS};

/// Smallest DH prime a client accepts by default.
pub const DEFAULT_MIN_DH_BITS: u64 = 1024;

/// Local policy consulted by the key agreement operations.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Server ECDHE curve preference, most preferred first.
    pub curve_preferences: Vec<NamedGroup>,
    /// Signature-and-hash pairs this endpoint signs and verifies with.
    pub signature_algorithms: Vec<SignatureScheme>,
    /// Group a server uses for DHE suites. Without one, DHE is refused.
    pub dh_params: Option<DhParams>,
    /// Smallest DH prime, in bits, a client accepts. A shorter server prime
    /// is refused as insufficient security.
    ///
    /// Defaults to 1024, so exchanges over small test groups such as a
    /// 512-bit prime only succeed with `min_dh_bits(512)` on the client.
    pub min_dh_bits: u64,
}

impl Default for TlsConfig {
    fn default() -> Self {
        TlsConfig::builder().build()
    }
}

impl TlsConfig {
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::default()
    }
}

/// Builder for `TlsConfig`.
#[derive(Debug)]
pub struct TlsConfigBuilder {
    curve_preferences: Vec<NamedGroup>,
    signature_algorithms: Vec<SignatureScheme>,
    dh_params: Option<DhParams>,
    min_dh_bits: u64,
}

impl Default for TlsConfigBuilder {
    fn default() -> Self {
        Self {
            curve_preferences: vec![
                NamedGroup::X25519,
                NamedGroup::SECP256R1,
                NamedGroup::SECP384R1,
                NamedGroup::SECP521R1,
            ],
            signature_algorithms: DEFAULT_SIGNATURE_ALGORITHMS.to_vec(),
            dh_params: None,
            min_dh_bits: DEFAULT_MIN_DH_BITS,
        }
    }
}

impl TlsConfigBuilder {
    pub fn curve_preferences(mut self, groups: &[NamedGroup]) -> Self {
        self.curve_preferences = groups.to_vec();
        self
    }

    pub fn signature_algorithms(mut self, schemes: &[SignatureScheme]) -> Self {
        self.signature_algorithms = schemes.to_vec();
        self
    }

    pub fn dh_params(mut self, params: DhParams) -> Self {
        self.dh_params = Some(params);
        self
    }

    /// Lower the client's DH prime floor, e.g. to 512 for test groups.
    pub fn min_dh_bits(mut self, bits: u64) -> Self {
        self.min_dh_bits = bits;
        self
    }

    pub fn build(self) -> TlsConfig {
        TlsConfig {
            curve_preferences: self.curve_preferences,
            signature_algorithms: self.signature_algorithms,
            dh_params: self.dh_params,
            min_dh_bits: self.min_dh_bits,
        }
    }
}
