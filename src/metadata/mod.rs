use byteorder::{ByteOrder, LittleEndian};
use log::warn;
use thiserror::Error;

use crate::config;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MetadataError {
    #[error("bad magic: expected {expected:02X?}, got {got:02X?}")]
    BadMagic { expected: [u8; 4], got: [u8; 4] },
    #[error("metadata truncated: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
    #[error("invalid LSB depth {0} (expected 1..=3)")]
    InvalidDepth(u32),
}

// Record field offsets (273 bytes total)
const OFF_MAGIC: usize = 0;
const OFF_FILENAME: usize = 4;
const OFF_FILE_SIZE: usize = OFF_FILENAME + config::FILENAME_FIELD_SIZE;
const OFF_LSB_DEPTH: usize = OFF_FILE_SIZE + 8;
const OFF_ENCRYPTED: usize = OFF_LSB_DEPTH + 4;

/// Header embedded ahead of the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub filename: String,
    /// Size of the embedded payload, i.e. the ciphertext blob when encrypted.
    pub file_size: u64,
    pub lsb_depth: u32,
    pub encrypted: bool,
}

impl Metadata {
    /// Build a record for an embed at `lsb_depth`. Empty names fall back to
    /// the default; names longer than 255 bytes are cut on a char boundary.
    pub fn new(
        filename: &str,
        file_size: u64,
        lsb_depth: u8,
        encrypted: bool,
    ) -> Result<Self, MetadataError> {
        if !(config::MIN_LSB_DEPTH..=config::MAX_LSB_DEPTH).contains(&lsb_depth) {
            return Err(MetadataError::InvalidDepth(lsb_depth as u32));
        }

        let filename = if filename.is_empty() {
            config::DEFAULT_FILENAME.to_string()
        } else if filename.len() > config::MAX_FILENAME_LEN {
            let cut = truncate_to_boundary(filename, config::MAX_FILENAME_LEN);
            warn!(
                "filename is {} bytes, truncating to {}",
                filename.len(),
                cut.len()
            );
            cut.to_string()
        } else {
            filename.to_string()
        };

        Ok(Self {
            filename,
            file_size,
            lsb_depth: lsb_depth as u32,
            encrypted,
        })
    }

    /// Serialize to the fixed 273-byte little-endian record.
    pub fn serialize(&self) -> [u8; config::METADATA_SIZE] {
        let mut buf = [0u8; config::METADATA_SIZE];

        buf[OFF_MAGIC..OFF_FILENAME].copy_from_slice(&config::MAGIC);

        // At most 255 name bytes, so the field always ends in a zero.
        let name = truncate_to_boundary(&self.filename, config::MAX_FILENAME_LEN).as_bytes();
        buf[OFF_FILENAME..OFF_FILENAME + name.len()].copy_from_slice(name);

        LittleEndian::write_u64(&mut buf[OFF_FILE_SIZE..], self.file_size);
        LittleEndian::write_u32(&mut buf[OFF_LSB_DEPTH..], self.lsb_depth);
        buf[OFF_ENCRYPTED] = u8::from(self.encrypted);
        buf
    }

    /// Parse a serialized record. Only the magic is validated; the remaining
    /// fields are taken as stored.
    pub fn parse(data: &[u8]) -> Result<Self, MetadataError> {
        if data.len() < config::METADATA_SIZE {
            return Err(MetadataError::Truncated {
                need: config::METADATA_SIZE,
                have: data.len(),
            });
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&data[OFF_MAGIC..OFF_FILENAME]);
        if magic != config::MAGIC {
            return Err(MetadataError::BadMagic {
                expected: config::MAGIC,
                got: magic,
            });
        }

        let field = &data[OFF_FILENAME..OFF_FILE_SIZE];
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        let filename = String::from_utf8_lossy(&field[..end]).into_owned();

        Ok(Self {
            filename,
            file_size: LittleEndian::read_u64(&data[OFF_FILE_SIZE..]),
            lsb_depth: LittleEndian::read_u32(&data[OFF_LSB_DEPTH..]),
            encrypted: data[OFF_ENCRYPTED] != 0,
        })
    }
}

fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
