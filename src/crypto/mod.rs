pub mod aes;
pub mod kdf;
pub mod sha256;

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use crate::config::{self, AES_BLOCK_SIZE, ENCRYPTED_HEADER_SIZE, IV_SIZE, KEY_LEN, SALT_SIZE};
use crate::payload::Payload;
use aes::Aes256;

pub use kdf::{hmac_sha256, pbkdf2_hmac_sha256, HmacSha256};
pub use sha256::{sha256, Sha256};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("decryption failed (wrong password or corrupted data): {len}-byte blob is not salt + iv + whole blocks")]
    MalformedCiphertext { len: usize },
    #[error("decryption failed (wrong password or corrupted data)")]
    BadPadding,
    #[error("secure random source failed: {0}")]
    RandomSourceFailure(String),
}

/// A 256-bit key derived from a password, wiped on drop.
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        secure_zero(&mut self.0);
    }
}

/// Fill an `N`-byte array from the OS CSPRNG. Failure is not retried.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], CryptoError> {
    let mut buf = [0u8; N];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| CryptoError::RandomSourceFailure(e.to_string()))?;
    Ok(buf)
}

/// Derive a 32-byte key with PBKDF2-HMAC-SHA256.
pub fn derive_key(password: &[u8], salt: &[u8; SALT_SIZE], iterations: u32) -> DerivedKey {
    let mut derived = pbkdf2_hmac_sha256(password, salt, iterations, KEY_LEN);
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&derived);
    secure_zero(&mut derived);
    DerivedKey(key)
}

/// Encrypt with AES-256-CBC under a fresh salt and IV.
///
/// The plaintext payload is consumed and wiped. Output layout is
/// `salt[16] || iv[16] || ciphertext`, with PKCS#7 padding always applied.
pub fn encrypt(plaintext: Payload, password: &str, iterations: u32) -> Result<Payload, CryptoError> {
    let salt: [u8; SALT_SIZE] = random_bytes()?;
    let iv: [u8; IV_SIZE] = random_bytes()?;

    let cipher = {
        let key = derive_key(password.as_bytes(), &salt, iterations);
        Aes256::new(key.as_bytes())
    };

    // Exact capacity so the plaintext copy is never left behind by a realloc.
    let pad = pkcs7_pad_len(plaintext.len());
    let mut buf = Vec::with_capacity(config::encrypted_len(plaintext.len()));
    buf.extend_from_slice(&salt);
    buf.extend_from_slice(&iv);
    buf.extend_from_slice(plaintext.as_bytes());
    drop(plaintext);
    buf.resize(buf.len() + pad, pad as u8);

    aes::cbc_encrypt(&cipher, &iv, &mut buf[ENCRYPTED_HEADER_SIZE..]);
    Ok(Payload::encrypted(buf))
}

/// Decrypt a `salt || iv || ciphertext` blob.
///
/// A wrong password almost always surfaces as [`CryptoError::BadPadding`],
/// but there is no authentication tag, so it is not guaranteed to.
pub fn decrypt(blob: &Payload, password: &str, iterations: u32) -> Result<Payload, CryptoError> {
    let data = blob.as_bytes();
    let len = data.len();
    if len < ENCRYPTED_HEADER_SIZE || (len - ENCRYPTED_HEADER_SIZE) % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::MalformedCiphertext { len });
    }

    let mut salt = [0u8; SALT_SIZE];
    salt.copy_from_slice(&data[..SALT_SIZE]);
    let mut iv = [0u8; IV_SIZE];
    iv.copy_from_slice(&data[SALT_SIZE..ENCRYPTED_HEADER_SIZE]);

    let cipher = {
        let key = derive_key(password.as_bytes(), &salt, iterations);
        Aes256::new(key.as_bytes())
    };

    let mut buf = data[ENCRYPTED_HEADER_SIZE..].to_vec();
    aes::cbc_decrypt(&cipher, &iv, &mut buf);

    match pkcs7_unpad_len(&buf) {
        Ok(keep) => {
            secure_zero(&mut buf[keep..]);
            buf.truncate(keep);
            Ok(Payload::plain(buf))
        }
        Err(e) => {
            secure_zero(&mut buf);
            Err(e)
        }
    }
}

/// Pad length for `len` bytes: 1..=16, a full block when already aligned.
fn pkcs7_pad_len(len: usize) -> usize {
    AES_BLOCK_SIZE - len % AES_BLOCK_SIZE
}

/// Length of the data once valid PKCS#7 padding is removed.
fn pkcs7_unpad_len(buf: &[u8]) -> Result<usize, CryptoError> {
    let pad = *buf.last().ok_or(CryptoError::BadPadding)? as usize;
    if pad == 0 || pad > AES_BLOCK_SIZE || pad > buf.len() {
        return Err(CryptoError::BadPadding);
    }
    if !buf[buf.len() - pad..].iter().all(|&b| b as usize == pad) {
        return Err(CryptoError::BadPadding);
    }
    Ok(buf.len() - pad)
}

/// Securely zero a buffer.
pub fn secure_zero(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        unsafe {
            std::ptr::write_volatile(byte, 0);
        }
    }
    std::sync::atomic::fence(std::sync::atomic::Ordering::SeqCst);
}
