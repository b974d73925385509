//! Length-prefixed metadata + payload stream, and depth-blind recovery.
//!
//! Stream layout: `u32_le(metadata_len) || metadata || payload`, written with
//! the bit codec at a single depth. Decoding does not know that depth; it
//! probes 3, 2, 1 in that order and takes the first depth whose metadata
//! carries the magic. Two depths share the low bit planes, and the fixed
//! length prefix and magic cannot both read back valid at two depths, so for
//! any `metadata_len` the decoder accepts at most one depth can match.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};
use thiserror::Error;

use crate::bitcodec::{self, CodecError};
use crate::config;
use crate::crypto::CryptoError;
use crate::metadata::{Metadata, MetadataError};
use crate::payload::Payload;
use crate::raster::Image;

#[derive(Error, Debug)]
pub enum StegError {
    #[error("capacity exceeded: need {need} bytes, have {have}")]
    CapacityExceeded { need: usize, have: usize },
    #[error("no embedded data found at any LSB depth")]
    NotAStegoImage,
    #[error("embedded data truncated: need {need} bytes, image holds {have} at depth {depth}")]
    Truncated { need: u64, have: usize, depth: u8 },
    #[error("invalid LSB depth {0} (expected 1..=3)")]
    InvalidDepth(u8),
    #[error("payload is encrypted but no password was provided")]
    PasswordRequired,
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<CodecError> for StegError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::CapacityExceeded { need, have } => StegError::CapacityExceeded { need, have },
            CodecError::InvalidDepth(d) => StegError::InvalidDepth(d),
        }
    }
}

/// Metadata located by probing, with the depth it was found at.
#[derive(Debug, Clone)]
pub struct Located {
    pub depth: u8,
    pub metadata_len: usize,
    pub metadata: Metadata,
}

/// Everything recovered from a stego image.
#[derive(Debug)]
pub struct Extracted {
    pub depth: u8,
    pub metadata: Metadata,
    pub payload: Payload,
}

/// Why a probed depth was passed over.
#[derive(Error, Debug)]
enum Rejection {
    #[error("too small for a length prefix")]
    LengthUnreadable,
    #[error("metadata length {0} out of range")]
    LengthOutOfRange(u32),
    #[error("too small for the metadata block")]
    MetadataUnreadable,
    #[error("{0}")]
    Invalid(MetadataError),
}

enum ProbeState {
    Probing(u8),
    Found(Located),
    NotFound,
}

/// Build the container stream for `metadata` and `payload`.
pub fn build_stream(metadata: &Metadata, payload: &[u8]) -> Vec<u8> {
    let record = metadata.serialize();
    let mut stream = Vec::with_capacity(config::LENGTH_PREFIX_SIZE + record.len() + payload.len());
    let mut prefix = [0u8; config::LENGTH_PREFIX_SIZE];
    LittleEndian::write_u32(&mut prefix, record.len() as u32);
    stream.extend_from_slice(&prefix);
    stream.extend_from_slice(&record);
    stream.extend_from_slice(payload);
    stream
}

/// Embed `metadata` and `payload` into a copy of `cover` at `depth`.
pub fn embed(cover: &Image, metadata: &Metadata, payload: &[u8], depth: u8) -> Result<Image, StegError> {
    bitcodec::check_depth(depth)?;

    let need = config::CONTAINER_HEADER_SIZE + payload.len();
    let have = bitcodec::capacity_bytes(cover, depth);
    if need > have {
        return Err(StegError::CapacityExceeded { need, have });
    }

    let mut stream = build_stream(metadata, payload);
    let result = bitcodec::embed(cover, &stream, depth);
    crate::crypto::secure_zero(&mut stream);
    Ok(result?)
}

/// Find the embed depth by probing from the highest depth down.
pub fn locate(stego: &Image) -> Result<Located, StegError> {
    let mut state = ProbeState::Probing(config::MAX_LSB_DEPTH);
    loop {
        state = match state {
            ProbeState::Probing(depth) => match probe_depth(stego, depth) {
                Ok(found) => ProbeState::Found(found),
                Err(reason) => {
                    debug!("depth {} rejected: {}", depth, reason);
                    if depth > config::MIN_LSB_DEPTH {
                        ProbeState::Probing(depth - 1)
                    } else {
                        ProbeState::NotFound
                    }
                }
            },
            ProbeState::Found(found) => return Ok(found),
            ProbeState::NotFound => return Err(StegError::NotAStegoImage),
        };
    }
}

fn probe_depth(stego: &Image, depth: u8) -> Result<Located, Rejection> {
    let prefix = bitcodec::extract(stego, config::LENGTH_PREFIX_SIZE, depth)
        .map_err(|_| Rejection::LengthUnreadable)?;
    let metadata_len = LittleEndian::read_u32(&prefix);
    if metadata_len == 0 || metadata_len > config::MAX_METADATA_LEN {
        return Err(Rejection::LengthOutOfRange(metadata_len));
    }
    let metadata_len = metadata_len as usize;

    let head = bitcodec::extract(stego, config::LENGTH_PREFIX_SIZE + metadata_len, depth)
        .map_err(|_| Rejection::MetadataUnreadable)?;
    let metadata = Metadata::parse(&head[config::LENGTH_PREFIX_SIZE..]).map_err(Rejection::Invalid)?;

    Ok(Located {
        depth,
        metadata_len,
        metadata,
    })
}

/// Recover metadata and payload without knowing the embed depth.
pub fn extract(stego: &Image) -> Result<Extracted, StegError> {
    let Located {
        depth,
        metadata_len,
        metadata,
    } = locate(stego)?;
    debug!(
        "found metadata at depth {} ({} bytes, payload {} bytes)",
        depth, metadata_len, metadata.file_size
    );
    if metadata.lsb_depth != depth as u32 {
        warn!(
            "metadata records depth {} but data was found at depth {}",
            metadata.lsb_depth, depth
        );
    }

    let payload_size = metadata.file_size;
    let encrypted = metadata.encrypted;
    let wrap = |bytes: Vec<u8>| {
        if encrypted {
            Payload::encrypted(bytes)
        } else {
            Payload::plain(bytes)
        }
    };

    if payload_size == 0 {
        let payload = wrap(Vec::new());
        return Ok(Extracted {
            depth,
            metadata,
            payload,
        });
    }

    let have = bitcodec::capacity_bytes(stego, depth);
    let header = (config::LENGTH_PREFIX_SIZE + metadata_len) as u64;
    let total = header
        .checked_add(payload_size)
        .filter(|&t| t <= have as u64)
        .ok_or(StegError::Truncated {
            need: header.saturating_add(payload_size),
            have,
            depth,
        })?;

    let mut stream = bitcodec::extract(stego, total as usize, depth)?;
    let payload = wrap(stream[header as usize..].to_vec());
    crate::crypto::secure_zero(&mut stream);

    Ok(Extracted {
        depth,
        metadata,
        payload,
    })
}
