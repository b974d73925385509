pub const MAGIC: [u8; 4] = *b"STEG";

// Embedding depth (low bits per channel byte)
pub const MIN_LSB_DEPTH: u8 = 1;
pub const MAX_LSB_DEPTH: u8 = 3;
pub const DEFAULT_LSB_DEPTH: u8 = 3;

// Channels required for a usable cover (RGB or RGBA)
pub const MIN_CHANNELS: u8 = 3;

// Metadata record layout (273 bytes total)
pub const FILENAME_FIELD_SIZE: usize = 256;
pub const MAX_FILENAME_LEN: usize = FILENAME_FIELD_SIZE - 1;
pub const METADATA_SIZE: usize = 4 + FILENAME_FIELD_SIZE + 8 + 4 + 1;
pub const DEFAULT_FILENAME: &str = "payload.bin";

// Container stream: u32 length prefix, then metadata, then payload
pub const LENGTH_PREFIX_SIZE: usize = 4;
pub const CONTAINER_HEADER_SIZE: usize = LENGTH_PREFIX_SIZE + METADATA_SIZE;

/// Upper bound on a probed metadata length. Anything larger is treated as
/// noise from a cover that carries no container.
pub const MAX_METADATA_LEN: u32 = 1024;

// AES-256-CBC
pub const AES_BLOCK_SIZE: usize = 16;
pub const KEY_LEN: usize = 32;
pub const SALT_SIZE: usize = 16;
pub const IV_SIZE: usize = 16;
pub const ENCRYPTED_HEADER_SIZE: usize = SALT_SIZE + IV_SIZE;

// PBKDF2-HMAC-SHA256
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Largest payload that fits in `capacity` bytes once the container header is
/// accounted for.
pub fn max_payload_len(capacity: usize) -> usize {
    capacity.saturating_sub(CONTAINER_HEADER_SIZE)
}

/// Size of the encrypted blob produced for a plaintext of `len` bytes.
pub fn encrypted_len(len: usize) -> usize {
    ENCRYPTED_HEADER_SIZE + (len / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE
}

/// Runtime configuration for an embed/decode operation.
#[derive(Debug, Clone)]
pub struct StegConfig {
    /// Low bits per channel used when embedding (1..=3). Decoding probes instead.
    pub lsb_depth: u8,
    /// PBKDF2 iteration count. Both sides must agree; the blob does not record it.
    pub kdf_iterations: u32,
    /// Accept JPEG covers by embedding into their decoded pixels.
    pub auto_convert_jpeg: bool,
}

impl Default for StegConfig {
    fn default() -> Self {
        Self {
            lsb_depth: DEFAULT_LSB_DEPTH,
            kdf_iterations: PBKDF2_ITERATIONS,
            auto_convert_jpeg: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_size_matches_layout() {
        assert_eq!(METADATA_SIZE, 273);
        assert_eq!(CONTAINER_HEADER_SIZE, 277);
    }

    #[test]
    fn test_encrypted_len_always_pads() {
        assert_eq!(encrypted_len(0), 48);
        assert_eq!(encrypted_len(15), 48);
        assert_eq!(encrypted_len(16), 64);
    }

    #[test]
    fn test_max_payload_len_saturates() {
        assert_eq!(max_payload_len(100), 0);
        assert_eq!(max_payload_len(4608), 4608 - 277);
    }
}
