use std::fs;
use std::io;
use std::path::Path;

use crate::crypto::secure_zero;

/// Bytes to embed or that were extracted, zeroed when dropped.
///
/// When `encrypted` is set the buffer is `salt || iv || ciphertext`.
pub struct Payload {
    data: Vec<u8>,
    encrypted: bool,
}

impl Payload {
    pub fn plain(data: Vec<u8>) -> Self {
        Self {
            data,
            encrypted: false,
        }
    }

    pub fn encrypted(data: Vec<u8>) -> Self {
        Self {
            data,
            encrypted: true,
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::plain(text.as_bytes().to_vec())
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::plain(fs::read(path)?))
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, &self.data)
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Hand the buffer to the caller, who becomes responsible for wiping it.
    pub fn into_bytes(mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }
}

impl Drop for Payload {
    fn drop(&mut self) {
        secure_zero(&mut self.data);
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payload")
            .field("len", &self.data.len())
            .field("encrypted", &self.encrypted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text() {
        let p = Payload::from_text("hi there");
        assert_eq!(p.as_bytes(), b"hi there");
        assert_eq!(p.len(), 8);
        assert!(!p.is_encrypted());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        let data: Vec<u8> = (0..=255).collect();
        fs::write(&path, &data).unwrap();

        let p = Payload::load(&path).unwrap();
        assert_eq!(p.as_bytes(), data.as_slice());

        let out = dir.path().join("copy.bin");
        p.write_to(&out).unwrap();
        assert_eq!(fs::read(&out).unwrap(), data);
    }

    #[test]
    fn test_into_bytes_moves_buffer() {
        let p = Payload::encrypted(vec![1, 2, 3]);
        assert!(p.is_encrypted());
        assert_eq!(p.into_bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn test_debug_hides_contents() {
        let p = Payload::from_text("secret");
        let shown = format!("{:?}", p);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("len: 6"));
    }
}
