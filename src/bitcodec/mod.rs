//! LSB bit packing over an interleaved pixel buffer.
//!
//! Traversal order is the wire contract: pixel bytes in buffer order (pixels
//! row-major, channels interleaved), and within each byte the low `depth` bits
//! from bit 0 upwards. Source data is consumed MSB-first within each byte.

use thiserror::Error;

use crate::config;
use crate::raster::Image;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("capacity exceeded: need {need} bytes, have {have}")]
    CapacityExceeded { need: usize, have: usize },
    #[error("invalid LSB depth {0} (expected 1..=3)")]
    InvalidDepth(u8),
}

pub fn check_depth(depth: u8) -> Result<(), CodecError> {
    if (config::MIN_LSB_DEPTH..=config::MAX_LSB_DEPTH).contains(&depth) {
        Ok(())
    } else {
        Err(CodecError::InvalidDepth(depth))
    }
}

/// Maximum whole bytes that fit in `image` at `depth` bits per channel.
/// Images with fewer than three channels cannot carry data.
pub fn capacity_bytes(image: &Image, depth: u8) -> usize {
    if image.channels() < config::MIN_CHANNELS {
        return 0;
    }
    let slots = image.width() as usize * image.height() as usize * image.channels() as usize;
    slots * depth as usize / 8
}

/// Write `data` into a copy of `image`. The source is left untouched and
/// nothing is returned unless every bit was written.
pub fn embed(image: &Image, data: &[u8], depth: u8) -> Result<Image, CodecError> {
    check_depth(depth)?;
    let have = capacity_bytes(image, depth);
    if data.len() > have {
        return Err(CodecError::CapacityExceeded {
            need: data.len(),
            have,
        });
    }

    let mut out = image.clone();
    let total_bits = data.len() * 8;
    let mut bit_index = 0usize;

    for byte in out.pixels_mut() {
        if bit_index >= total_bits {
            break;
        }
        for b in 0..depth {
            if bit_index >= total_bits {
                break;
            }
            let bit = (data[bit_index / 8] >> (7 - bit_index % 8)) & 1;
            *byte = (*byte & !(1 << b)) | (bit << b);
            bit_index += 1;
        }
    }

    Ok(out)
}

/// Read `len` bytes back out of `image` using the same traversal as [`embed`].
pub fn extract(image: &Image, len: usize, depth: u8) -> Result<Vec<u8>, CodecError> {
    check_depth(depth)?;
    let have = capacity_bytes(image, depth);
    if len > have {
        return Err(CodecError::CapacityExceeded { need: len, have });
    }

    let mut out = vec![0u8; len];
    let total_bits = len * 8;
    let mut bit_index = 0usize;

    'pixels: for &byte in image.pixels() {
        for b in 0..depth {
            if bit_index >= total_bits {
                break 'pixels;
            }
            out[bit_index / 8] |= ((byte >> b) & 1) << (7 - bit_index % 8);
            bit_index += 1;
        }
    }

    Ok(out)
}
