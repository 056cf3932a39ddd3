//! One-shot digests over the pieces of a signed exchange.

use kxtls_types::HashAlgId;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

fn hash_with<D: Digest>(slices: &[&[u8]]) -> Vec<u8> {
    let mut hasher = D::new();
    for slice in slices {
        hasher.update(slice);
    }
    hasher.finalize().to_vec()
}

/// Digest the concatenation of `slices` with `alg`.
///
/// `Md5Sha1` yields the 36-byte MD5 || SHA-1 value TLS 1.0/1.1 signs with RSA.
pub fn digest_slices(alg: HashAlgId, slices: &[&[u8]]) -> Vec<u8> {
    match alg {
        HashAlgId::Md5 => hash_with::<Md5>(slices),
        HashAlgId::Sha1 => hash_with::<Sha1>(slices),
        HashAlgId::Sha224 => hash_with::<Sha224>(slices),
        HashAlgId::Sha256 => hash_with::<Sha256>(slices),
        HashAlgId::Sha384 => hash_with::<Sha384>(slices),
        HashAlgId::Sha512 => hash_with::<Sha512>(slices),
        HashAlgId::Md5Sha1 => {
            let mut out = hash_with::<Md5>(slices);
            out.extend_from_slice(&hash_with::<Sha1>(slices));
            out
        }
    }
}
