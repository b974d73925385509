//! AES-256 block cipher (FIPS 197) and CBC chaining.
//!
//! The S-boxes are derived at compile time from the GF(2^8) inverse and the
//! affine map rather than written out by hand.

use super::secure_zero;
use crate::config::{AES_BLOCK_SIZE, IV_SIZE, KEY_LEN};

const ROUNDS: usize = 14;

const fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            product ^= a;
        }
        let carry = a & 0x80;
        a <<= 1;
        if carry != 0 {
            a ^= 0x1b;
        }
        b >>= 1;
    }
    product
}

/// Multiplicative inverse as x^254; zero maps to zero.
const fn gf_inv(x: u8) -> u8 {
    let mut result = 1u8;
    let mut base = x;
    let mut exp = 254u8;
    while exp != 0 {
        if exp & 1 != 0 {
            result = gf_mul(result, base);
        }
        base = gf_mul(base, base);
        exp >>= 1;
    }
    if x == 0 {
        0
    } else {
        result
    }
}

const fn build_sboxes() -> ([u8; 256], [u8; 256]) {
    let mut sbox = [0u8; 256];
    let mut inv_sbox = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let b = gf_inv(i as u8);
        let s = b
            ^ b.rotate_left(1)
            ^ b.rotate_left(2)
            ^ b.rotate_left(3)
            ^ b.rotate_left(4)
            ^ 0x63;
        sbox[i] = s;
        inv_sbox[s as usize] = i as u8;
        i += 1;
    }
    (sbox, inv_sbox)
}

const SBOXES: ([u8; 256], [u8; 256]) = build_sboxes();
static SBOX: [u8; 256] = SBOXES.0;
static INV_SBOX: [u8; 256] = SBOXES.1;

type Block = [u8; AES_BLOCK_SIZE];

/// Expanded AES-256 key. Round keys are wiped on drop.
pub struct Aes256 {
    round_keys: [Block; ROUNDS + 1],
}

impl Drop for Aes256 {
    fn drop(&mut self) {
        for rk in self.round_keys.iter_mut() {
            secure_zero(rk);
        }
    }
}

impl Aes256 {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        let mut w = [[0u8; 4]; 4 * (ROUNDS + 1)];
        for (i, word) in w.iter_mut().take(8).enumerate() {
            word.copy_from_slice(&key[4 * i..4 * i + 4]);
        }

        let mut rcon = 1u8;
        for i in 8..w.len() {
            let mut temp = w[i - 1];
            if i % 8 == 0 {
                temp.rotate_left(1);
                for b in temp.iter_mut() {
                    *b = SBOX[*b as usize];
                }
                temp[0] ^= rcon;
                rcon = gf_mul(rcon, 2);
            } else if i % 8 == 4 {
                for b in temp.iter_mut() {
                    *b = SBOX[*b as usize];
                }
            }
            for j in 0..4 {
                w[i][j] = w[i - 8][j] ^ temp[j];
            }
        }

        let mut round_keys = [[0u8; AES_BLOCK_SIZE]; ROUNDS + 1];
        for (r, rk) in round_keys.iter_mut().enumerate() {
            for c in 0..4 {
                rk[4 * c..4 * c + 4].copy_from_slice(&w[4 * r + c]);
            }
        }
        for word in w.iter_mut() {
            secure_zero(word);
        }

        Self { round_keys }
    }

    /// Encrypt one 16-byte block in place.
    pub fn encrypt_block(&self, block: &mut [u8]) {
        debug_assert_eq!(block.len(), AES_BLOCK_SIZE);
        add_round_key(block, &self.round_keys[0]);
        for round in 1..ROUNDS {
            sub_bytes(block, &SBOX);
            shift_rows(block);
            mix_columns(block);
            add_round_key(block, &self.round_keys[round]);
        }
        sub_bytes(block, &SBOX);
        shift_rows(block);
        add_round_key(block, &self.round_keys[ROUNDS]);
    }

    /// Decrypt one 16-byte block in place.
    pub fn decrypt_block(&self, block: &mut [u8]) {
        debug_assert_eq!(block.len(), AES_BLOCK_SIZE);
        add_round_key(block, &self.round_keys[ROUNDS]);
        for round in (1..ROUNDS).rev() {
            inv_shift_rows(block);
            sub_bytes(block, &INV_SBOX);
            add_round_key(block, &self.round_keys[round]);
            inv_mix_columns(block);
        }
        inv_shift_rows(block);
        sub_bytes(block, &INV_SBOX);
        add_round_key(block, &self.round_keys[0]);
    }
}

// State is column-major: byte `4 * col + row`.

fn add_round_key(state: &mut [u8], rk: &Block) {
    for (s, k) in state.iter_mut().zip(rk) {
        *s ^= k;
    }
}

fn sub_bytes(state: &mut [u8], table: &[u8; 256]) {
    for s in state.iter_mut() {
        *s = table[*s as usize];
    }
}

fn shift_rows(state: &mut [u8]) {
    let old: Block = [
        state[0], state[1], state[2], state[3], state[4], state[5], state[6], state[7],
        state[8], state[9], state[10], state[11], state[12], state[13], state[14], state[15],
    ];
    for c in 0..4 {
        for r in 1..4 {
            state[4 * c + r] = old[4 * ((c + r) % 4) + r];
        }
    }
}

fn inv_shift_rows(state: &mut [u8]) {
    let old: Block = [
        state[0], state[1], state[2], state[3], state[4], state[5], state[6], state[7],
        state[8], state[9], state[10], state[11], state[12], state[13], state[14], state[15],
    ];
    for c in 0..4 {
        for r in 1..4 {
            state[4 * ((c + r) % 4) + r] = old[4 * c + r];
        }
    }
}

fn mix_columns(state: &mut [u8]) {
    for col in state.chunks_exact_mut(4) {
        let [a0, a1, a2, a3] = [col[0], col[1], col[2], col[3]];
        col[0] = gf_mul(a0, 2) ^ gf_mul(a1, 3) ^ a2 ^ a3;
        col[1] = a0 ^ gf_mul(a1, 2) ^ gf_mul(a2, 3) ^ a3;
        col[2] = a0 ^ a1 ^ gf_mul(a2, 2) ^ gf_mul(a3, 3);
        col[3] = gf_mul(a0, 3) ^ a1 ^ a2 ^ gf_mul(a3, 2);
    }
}

fn inv_mix_columns(state: &mut [u8]) {
    for col in state.chunks_exact_mut(4) {
        let [a0, a1, a2, a3] = [col[0], col[1], col[2], col[3]];
        col[0] = gf_mul(a0, 14) ^ gf_mul(a1, 11) ^ gf_mul(a2, 13) ^ gf_mul(a3, 9);
        col[1] = gf_mul(a0, 9) ^ gf_mul(a1, 14) ^ gf_mul(a2, 11) ^ gf_mul(a3, 13);
        col[2] = gf_mul(a0, 13) ^ gf_mul(a1, 9) ^ gf_mul(a2, 14) ^ gf_mul(a3, 11);
        col[3] = gf_mul(a0, 11) ^ gf_mul(a1, 13) ^ gf_mul(a2, 9) ^ gf_mul(a3, 14);
    }
}

/// CBC-encrypt `buf` in place. `buf.len()` must be a multiple of 16.
pub fn cbc_encrypt(cipher: &Aes256, iv: &[u8; IV_SIZE], buf: &mut [u8]) {
    debug_assert_eq!(buf.len() % AES_BLOCK_SIZE, 0);
    let mut prev = *iv;
    for block in buf.chunks_exact_mut(AES_BLOCK_SIZE) {
        for (b, p) in block.iter_mut().zip(&prev) {
            *b ^= p;
        }
        cipher.encrypt_block(block);
        prev.copy_from_slice(block);
    }
}

/// CBC-decrypt `buf` in place. `buf.len()` must be a multiple of 16.
pub fn cbc_decrypt(cipher: &Aes256, iv: &[u8; IV_SIZE], buf: &mut [u8]) {
    debug_assert_eq!(buf.len() % AES_BLOCK_SIZE, 0);
    let mut prev = *iv;
    let mut saved: Block = [0u8; AES_BLOCK_SIZE];
    for block in buf.chunks_exact_mut(AES_BLOCK_SIZE) {
        saved.copy_from_slice(block);
        cipher.decrypt_block(block);
        for (b, p) in block.iter_mut().zip(&prev) {
            *b ^= p;
        }
        prev = saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unhex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_sbox_known_entries() {
        assert_eq!(SBOX[0x00], 0x63);
        assert_eq!(SBOX[0x01], 0x7c);
        assert_eq!(SBOX[0x53], 0xed);
        assert_eq!(SBOX[0xff], 0x16);
        for i in 0..256 {
            assert_eq!(INV_SBOX[SBOX[i] as usize] as usize, i);
        }
    }

    #[test]
    fn test_fips197_aes256_block() {
        let key: [u8; 32] = core::array::from_fn(|i| i as u8);
        let cipher = Aes256::new(&key);
        let mut block = unhex("00112233445566778899aabbccddeeff");

        cipher.encrypt_block(&mut block);
        assert_eq!(block, unhex("8ea2b7ca516745bfeafc49904b496089"));

        cipher.decrypt_block(&mut block);
        assert_eq!(block, unhex("00112233445566778899aabbccddeeff"));
    }

    #[test]
    fn test_sp800_38a_cbc_aes256() {
        let key: [u8; 32] = unhex("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4")
            .try_into()
            .unwrap();
        let iv: [u8; 16] = core::array::from_fn(|i| i as u8);
        let plaintext = unhex("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51");
        let cipher = Aes256::new(&key);

        let mut buf = plaintext.clone();
        cbc_encrypt(&cipher, &iv, &mut buf);
        assert_eq!(
            buf,
            unhex("f58c4c04d6e5f1ba779eabfb5f7bfbd69cfc4e967edb808d679f777bc6702c7d")
        );

        cbc_decrypt(&cipher, &iv, &mut buf);
        assert_eq!(buf, plaintext);
    }

    #[test]
    fn test_cbc_chains_identical_blocks() {
        let cipher = Aes256::new(&[0x42; 32]);
        let mut buf = vec![0u8; 32];
        cbc_encrypt(&cipher, &[0u8; 16], &mut buf);
        assert_ne!(buf[..16], buf[16..]);
    }
}
