//! SHA-256 (FIPS 180-4).

use std::ptr;
use std::sync::atomic::{fence, Ordering};

use byteorder::{BigEndian, ByteOrder};

use super::secure_zero;

pub const DIGEST_SIZE: usize = 32;
pub const BLOCK_SIZE: usize = 64;

const K: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

const H0: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// Incremental hasher. Cloning snapshots the running state, which HMAC uses
/// to reuse its keyed inner/outer prefixes. Every copy is wiped on drop.
#[derive(Clone)]
pub struct Sha256 {
    state: [u32; 8],
    buffer: [u8; BLOCK_SIZE],
    buffered: usize,
    length: u64,
}

impl Default for Sha256 {
    fn default() -> Self {
        Self::new()
    }
}

impl Sha256 {
    pub fn new() -> Self {
        Self {
            state: H0,
            buffer: [0u8; BLOCK_SIZE],
            buffered: 0,
            length: 0,
        }
    }

    pub fn update(&mut self, mut data: &[u8]) {
        self.length = self.length.wrapping_add(data.len() as u64);

        if self.buffered > 0 {
            let take = (BLOCK_SIZE - self.buffered).min(data.len());
            self.buffer[self.buffered..self.buffered + take].copy_from_slice(&data[..take]);
            self.buffered += take;
            data = &data[take..];
            if self.buffered < BLOCK_SIZE {
                return;
            }
            compress(&mut self.state, &self.buffer);
            self.buffered = 0;
        }

        while data.len() >= BLOCK_SIZE {
            compress(&mut self.state, &data[..BLOCK_SIZE]);
            data = &data[BLOCK_SIZE..];
        }

        if !data.is_empty() {
            self.buffer[..data.len()].copy_from_slice(data);
            self.buffered = data.len();
        }
    }

    pub fn finalize(mut self) -> [u8; DIGEST_SIZE] {
        let bit_len = self.length.wrapping_mul(8);

        // 0x80, zeros up to 56 mod 64, then the 64-bit big-endian bit length.
        let pad_len = if self.buffered < 56 {
            56 - self.buffered
        } else {
            120 - self.buffered
        };
        let mut padding = [0u8; BLOCK_SIZE + 8];
        padding[0] = 0x80;
        BigEndian::write_u64(&mut padding[pad_len..pad_len + 8], bit_len);
        self.update(&padding[..pad_len + 8]);
        debug_assert_eq!(self.buffered, 0);

        let mut digest = [0u8; DIGEST_SIZE];
        BigEndian::write_u32_into(&self.state, &mut digest);
        digest
    }

    /// Overwrite the chaining state and any buffered input.
    fn wipe(&mut self) {
        wipe_words(&mut self.state);
        secure_zero(&mut self.buffer);
        self.buffered = 0;
        self.length = 0;
    }
}

impl Drop for Sha256 {
    fn drop(&mut self) {
        self.wipe();
    }
}

/// [`secure_zero`] for 32-bit words.
fn wipe_words(words: &mut [u32]) {
    for word in words.iter_mut() {
        unsafe {
            ptr::write_volatile(word, 0);
        }
    }
    fence(Ordering::SeqCst);
}

fn compress(state: &mut [u32; 8], block: &[u8]) {
    let mut w = [0u32; 64];
    BigEndian::read_u32_into(&block[..BLOCK_SIZE], &mut w[..16]);
    for i in 16..64 {
        let s0 = w[i - 15].rotate_right(7) ^ w[i - 15].rotate_right(18) ^ (w[i - 15] >> 3);
        let s1 = w[i - 2].rotate_right(17) ^ w[i - 2].rotate_right(19) ^ (w[i - 2] >> 10);
        w[i] = w[i - 16]
            .wrapping_add(s0)
            .wrapping_add(w[i - 7])
            .wrapping_add(s1);
    }

    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;

    for i in 0..64 {
        let s1 = e.rotate_right(6) ^ e.rotate_right(11) ^ e.rotate_right(25);
        let ch = (e & f) ^ (!e & g);
        let t1 = h
            .wrapping_add(s1)
            .wrapping_add(ch)
            .wrapping_add(K[i])
            .wrapping_add(w[i]);
        let s0 = a.rotate_right(2) ^ a.rotate_right(13) ^ a.rotate_right(22);
        let maj = (a & b) ^ (a & c) ^ (b & c);
        let t2 = s0.wrapping_add(maj);

        h = g;
        g = f;
        f = e;
        e = d.wrapping_add(t1);
        d = c;
        c = b;
        b = a;
        a = t1.wrapping_add(t2);
    }

    for (s, v) in state.iter_mut().zip([a, b, c, d, e, f, g, h]) {
        *s = s.wrapping_add(v);
    }
    wipe_words(&mut w);
}

/// One-shot SHA-256.
pub fn sha256(data: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;
    use sha2::Digest;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn test_wipe_clears_state_and_buffer() {
        let mut hasher = Sha256::new();
        hasher.update(&[0x5a; BLOCK_SIZE + 10]);
        assert_ne!(hasher.state, H0);
        assert_eq!(hasher.buffered, 10);

        hasher.wipe();
        assert_eq!(hasher.state, [0u32; 8]);
        assert_eq!(hasher.buffer, [0u8; BLOCK_SIZE]);
        assert_eq!(hasher.buffered, 0);
        assert_eq!(hasher.length, 0);
    }

    #[test]
    fn test_clone_survives_original_drop() {
        let mut primed = Sha256::new();
        primed.update(b"ab");
        let snapshot = primed.clone();
        drop(primed);

        let mut resumed = snapshot;
        resumed.update(b"c");
        assert_eq!(resumed.finalize(), sha256(b"abc"));
    }

    #[test]
    fn test_empty() {
        assert_eq!(
            hex(&sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_abc() {
        assert_eq!(
            hex(&sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_two_block_message() {
        assert_eq!(
            hex(&sha256(b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq")),
            "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1"
        );
    }

    #[test]
    fn test_hello() {
        assert_eq!(
            hex(&sha256(b"hello")),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_matches_sha2_across_padding_boundaries() {
        let mut data = vec![0u8; 300];
        rand::thread_rng().fill_bytes(&mut data);
        for len in [0, 1, 55, 56, 57, 63, 64, 65, 119, 120, 128, 200, 300] {
            let expected = sha2::Sha256::digest(&data[..len]);
            assert_eq!(sha256(&data[..len]).as_slice(), expected.as_slice(), "len {}", len);
        }
    }

    #[test]
    fn test_incremental_updates_match_one_shot() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();
        let mut hasher = Sha256::new();
        for piece in data.chunks(37) {
            hasher.update(piece);
        }
        assert_eq!(hasher.finalize(), sha256(&data));
    }
}
