pub mod io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("pixel buffer size mismatch: expected {expected} bytes, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u8),
    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cover is JPEG (lossy); enable auto-convert to embed into its decoded pixels")]
    LossyCover,
}

/// An 8-bit interleaved pixel buffer.
///
/// `pixels.len() == width * height * channels` always holds; the fields are
/// private so the only way in is through [`Image::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Image {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, channels: u8) -> Result<Self, RasterError> {
        if !(1..=4).contains(&channels) {
            return Err(RasterError::UnsupportedChannels(channels));
        }
        let expected = width as usize * height as usize * channels as usize;
        if pixels.len() != expected {
            return Err(RasterError::BufferSizeMismatch {
                expected,
                got: pixels.len(),
            });
        }
        Ok(Self {
            pixels,
            width,
            height,
            channels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Mutable access for the bit codec. Length stays fixed, so the size
    /// invariant cannot be broken through a slice.
    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_matching_buffer() {
        let img = Image::new(vec![0u8; 4 * 2 * 3], 4, 2, 3).unwrap();
        assert_eq!(img.width(), 4);
        assert_eq!(img.height(), 2);
        assert_eq!(img.channels(), 3);
        assert_eq!(img.pixels().len(), 24);
    }

    #[test]
    fn test_new_rejects_size_mismatch() {
        let result = Image::new(vec![0u8; 23], 4, 2, 3);
        assert!(matches!(
            result,
            Err(RasterError::BufferSizeMismatch { expected: 24, got: 23 })
        ));
    }

    #[test]
    fn test_new_rejects_bad_channels() {
        assert!(matches!(
            Image::new(Vec::new(), 0, 0, 5),
            Err(RasterError::UnsupportedChannels(5))
        ));
        assert!(matches!(
            Image::new(Vec::new(), 0, 0, 0),
            Err(RasterError::UnsupportedChannels(0))
        ));
    }
}
