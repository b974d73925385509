pub mod batch;
pub mod decode;
pub mod encode;
pub mod hook;

use log::{info, warn};

use crate::bitcodec;
use crate::config::{self, StegConfig};
use crate::container::{self, Extracted, StegError};
use crate::crypto;
use crate::metadata::Metadata;
use crate::payload::Payload;
use crate::raster::Image;
use hook::{NoopHook, ProgressHook, Stage};

/// Result of a successful decode.
#[derive(Debug)]
pub struct Decoded {
    /// Filename stored at embed time, as written (not sanitized).
    pub filename: String,
    /// Depth the container was found at.
    pub depth: u8,
    pub payload: Payload,
}

/// Hide `payload` in a copy of `cover` at `depth`, encrypting it first when a
/// password is given.
///
/// # Example
///
/// ```rust
/// use lsbvault::{decode, embed, Image};
///
/// let cover = Image::new(vec![0x80; 64 * 64 * 3], 64, 64, 3).unwrap();
/// let stego = embed(&cover, b"attack at dawn", "orders.txt", 2, None).unwrap();
///
/// let (name, bytes) = decode(&stego, None).unwrap();
/// assert_eq!(name, "orders.txt");
/// assert_eq!(bytes, b"attack at dawn");
/// ```
pub fn embed(
    cover: &Image,
    payload: &[u8],
    filename: &str,
    depth: u8,
    password: Option<&str>,
) -> Result<Image, StegError> {
    let cfg = StegConfig {
        lsb_depth: depth,
        ..Default::default()
    };
    embed_with(cover, Payload::plain(payload.to_vec()), filename, password, &cfg, &NoopHook)
}

/// Recover `(filename, payload)` from a stego image without knowing the
/// embed depth. A password is required only if the payload was encrypted.
pub fn decode(stego: &Image, password: Option<&str>) -> Result<(String, Vec<u8>), StegError> {
    let decoded = decode_with(stego, password, &StegConfig::default(), &NoopHook)?;
    Ok((decoded.filename, decoded.payload.into_bytes()))
}

/// [`embed`] with explicit configuration and progress reporting.
///
/// An empty password is treated as no password.
pub fn embed_with<H: ProgressHook>(
    cover: &Image,
    payload: Payload,
    filename: &str,
    password: Option<&str>,
    cfg: &StegConfig,
    hook: &H,
) -> Result<Image, StegError> {
    let depth = cfg.lsb_depth;
    bitcodec::check_depth(depth)?;
    let password = password.filter(|pw| !pw.is_empty());

    // Fail before paying for key derivation.
    let embedded_len = match password {
        Some(_) => config::encrypted_len(payload.len()),
        None => payload.len(),
    };
    let need = config::CONTAINER_HEADER_SIZE + embedded_len;
    let have = bitcodec::capacity_bytes(cover, depth);
    if need > have {
        return Err(StegError::CapacityExceeded { need, have });
    }

    let payload = match password {
        Some(pw) => {
            hook.on_progress(Stage::Encrypt);
            crypto::encrypt(payload, pw, cfg.kdf_iterations)?
        }
        None => payload,
    };

    hook.on_progress(Stage::BuildMetadata);
    let metadata = Metadata::new(filename, payload.len() as u64, depth, payload.is_encrypted())?;

    hook.on_progress(Stage::Embed);
    let stego = container::embed(cover, &metadata, payload.as_bytes(), depth)?;
    info!(
        "embedded {} bytes ({}) at depth {}, {} of {} bytes used",
        payload.len(),
        if payload.is_encrypted() { "encrypted" } else { "plain" },
        depth,
        need,
        have
    );
    Ok(stego)
}

/// [`decode`] with explicit configuration and progress reporting.
pub fn decode_with<H: ProgressHook>(
    stego: &Image,
    password: Option<&str>,
    cfg: &StegConfig,
    hook: &H,
) -> Result<Decoded, StegError> {
    let password = password.filter(|pw| !pw.is_empty());

    hook.on_progress(Stage::Extract);
    let Extracted {
        depth,
        metadata,
        payload,
    } = container::extract(stego)?;
    info!(
        "found '{}' at depth {} ({} bytes{})",
        metadata.filename,
        depth,
        payload.len(),
        if payload.is_encrypted() { ", encrypted" } else { "" }
    );

    let payload = if payload.is_encrypted() {
        let pw = password.ok_or(StegError::PasswordRequired)?;
        hook.on_progress(Stage::Decrypt);
        crypto::decrypt(&payload, pw, cfg.kdf_iterations)?
    } else {
        if password.is_some() {
            warn!("payload is not encrypted; ignoring password");
        }
        payload
    };

    Ok(Decoded {
        filename: metadata.filename,
        depth,
        payload,
    })
}
