//! Constant-time PKCS#1 v1.5 unpadding of an RSA-encrypted session key.

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq, ConstantTimeLess};

/// Copy the message carried by the encryption block `em` into `key` when the
/// padding is well formed and the message is exactly `key.len()` bytes.
/// Otherwise `key` keeps its prior contents.
///
/// Runs in time independent of the block contents.
pub(crate) fn unpad_session_key(em: &[u8], key: &mut [u8]) {
    let k = em.len() as u32;
    let (valid, index) = unpad(em);
    let valid = valid & (k.wrapping_sub(index)).ct_eq(&(key.len() as u32));

    let start = em.len().saturating_sub(key.len());
    for (dst, src) in key.iter_mut().zip(&em[start..]) {
        dst.conditional_assign(src, valid);
    }
}

/// Returns whether `em` is `00 02 PS 00 M` with at least eight padding bytes,
/// and the index of the first byte of `M`.
fn unpad(em: &[u8]) -> (Choice, u32) {
    if em.len() < 11 {
        return (Choice::from(0), 0);
    }
    let first_zero = em[0].ct_eq(&0u8);
    let second_two = em[1].ct_eq(&2u8);

    let mut looking = Choice::from(1u8);
    let mut index = 0u32;
    for (i, byte) in em.iter().enumerate().skip(2) {
        let is_zero = byte.ct_eq(&0u8);
        index.conditional_assign(&(i as u32), looking & is_zero);
        looking &= !is_zero;
    }

    let valid_ps = !index.ct_lt(&10);
    let valid = first_zero & second_two & !looking & valid_ps;
    let index = u32::conditional_select(&0, &(index + 1), valid);
    (valid, index)
}
