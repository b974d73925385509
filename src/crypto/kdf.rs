//! HMAC-SHA256 (RFC 2104) and PBKDF2-HMAC-SHA256 (RFC 8018).

use super::secure_zero;
use super::sha256::{self, Sha256, BLOCK_SIZE, DIGEST_SIZE};

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// HMAC keyed once, then reused for many messages.
///
/// The inner and outer hashers are primed with the padded key block, so each
/// MAC costs two compressions for short messages instead of four. Those
/// primed states are as sensitive as the key and are wiped when dropped.
#[derive(Clone)]
pub struct HmacSha256 {
    inner: Sha256,
    outer: Sha256,
}

impl HmacSha256 {
    pub fn new(key: &[u8]) -> Self {
        let mut block = [0u8; BLOCK_SIZE];
        if key.len() > BLOCK_SIZE {
            let mut hashed = sha256::sha256(key);
            block[..DIGEST_SIZE].copy_from_slice(&hashed);
            secure_zero(&mut hashed);
        } else {
            block[..key.len()].copy_from_slice(key);
        }

        let mut pad = [0u8; BLOCK_SIZE];
        for (p, k) in pad.iter_mut().zip(&block) {
            *p = k ^ IPAD;
        }
        let mut inner = Sha256::new();
        inner.update(&pad);

        for (p, k) in pad.iter_mut().zip(&block) {
            *p = k ^ OPAD;
        }
        let mut outer = Sha256::new();
        outer.update(&pad);

        secure_zero(&mut pad);
        secure_zero(&mut block);
        Self { inner, outer }
    }

    pub fn mac(&self, msg: &[u8]) -> [u8; DIGEST_SIZE] {
        self.mac_parts(&[msg])
    }

    /// MAC over the concatenation of `parts` without building it.
    pub fn mac_parts(&self, parts: &[&[u8]]) -> [u8; DIGEST_SIZE] {
        let mut inner = self.inner.clone();
        for part in parts {
            inner.update(part);
        }
        let mut inner_digest = inner.finalize();

        let mut outer = self.outer.clone();
        outer.update(&inner_digest);
        secure_zero(&mut inner_digest);
        outer.finalize()
    }
}

pub fn hmac_sha256(key: &[u8], msg: &[u8]) -> [u8; DIGEST_SIZE] {
    HmacSha256::new(key).mac(msg)
}

/// PBKDF2 with HMAC-SHA256 as the PRF.
///
/// Block `i` (1-based) is `U1 ^ U2 ^ ... ^ Uc` with
/// `U1 = HMAC(password, salt || BE32(i))` and `Uj = HMAC(password, Uj-1)`.
/// An iteration count of zero behaves like one.
pub fn pbkdf2_hmac_sha256(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Vec<u8> {
    let prf = HmacSha256::new(password);
    let mut output = Vec::with_capacity(output_len);
    let blocks = output_len.div_ceil(DIGEST_SIZE);

    for block_index in 1..=blocks as u32 {
        let mut u = prf.mac_parts(&[salt, block_index.to_be_bytes().as_slice()]);
        let mut t = u;
        for _ in 1..iterations {
            u = prf.mac(&u);
            for (acc, x) in t.iter_mut().zip(&u) {
                *acc ^= x;
            }
        }

        let take = (output_len - output.len()).min(DIGEST_SIZE);
        output.extend_from_slice(&t[..take]);
        secure_zero(&mut u);
        secure_zero(&mut t);
    }

    output
}
