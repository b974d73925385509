use std::path::Path;

use image::{ColorType, DynamicImage, ImageFormat, ImageReader};
use log::debug;

use super::{Image, RasterError};

/// Sniff the container format from the file contents.
pub fn detect_format(path: &Path) -> Result<Option<ImageFormat>, RasterError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    Ok(reader.format())
}

/// `true` when the file decodes as JPEG, whose recompression destroys LSB data.
pub fn is_jpeg(path: &Path) -> Result<bool, RasterError> {
    Ok(detect_format(path)? == Some(ImageFormat::Jpeg))
}

/// Decode a PNG/BMP/JPEG file into an 8-bit interleaved buffer.
///
/// Sources with an alpha channel come back as RGBA, everything else as RGB.
pub fn load(path: &Path) -> Result<Image, RasterError> {
    let decoded = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let image = from_dynamic(decoded)?;
    debug!(
        "loaded {} ({}x{}, {} channels)",
        path.display(),
        image.width(),
        image.height(),
        image.channels()
    );
    Ok(image)
}

fn from_dynamic(decoded: DynamicImage) -> Result<Image, RasterError> {
    let (width, height) = (decoded.width(), decoded.height());
    if decoded.color().has_alpha() {
        Image::new(decoded.into_rgba8().into_raw(), width, height, 4)
    } else {
        Image::new(decoded.into_rgb8().into_raw(), width, height, 3)
    }
}

/// Write `image` as PNG regardless of the extension on `path`.
pub fn save_png(path: &Path, image: &Image) -> Result<(), RasterError> {
    let color = match image.channels() {
        3 => ColorType::Rgb8,
        4 => ColorType::Rgba8,
        other => return Err(RasterError::UnsupportedChannels(other)),
    };
    image::save_buffer_with_format(
        path,
        image.pixels(),
        image.width(),
        image.height(),
        color,
        ImageFormat::Png,
    )?;
    Ok(())
}
