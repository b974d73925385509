use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::{self, StegConfig};
use crate::raster::io;

use super::hook::{ProgressHook, Stage};
use super::Decoded;

/// File decode: stego image -> `output_dir/<stored filename>`.
///
/// Returns the path written.
pub fn decode_file<H: ProgressHook>(
    stego_path: &Path,
    output_dir: &Path,
    password: Option<&str>,
    cfg: &StegConfig,
    hook: &H,
) -> Result<PathBuf> {
    let result = run(stego_path, output_dir, password, cfg, hook);
    match &result {
        Ok(path) => hook.on_finished(true, &format!("extracted to {}", path.display())),
        Err(e) => hook.on_finished(false, &format!("{:#}", e)),
    }
    result
}

fn run<H: ProgressHook>(
    stego_path: &Path,
    output_dir: &Path,
    password: Option<&str>,
    cfg: &StegConfig,
    hook: &H,
) -> Result<PathBuf> {
    let decoded = load_and_decode(stego_path, password, cfg, hook)?;
    let out_path = output_dir.join(safe_filename(&decoded.filename));
    write_decoded(&decoded, &out_path, hook)?;
    Ok(out_path)
}

/// Load a stego image and recover its payload, decrypting when flagged.
pub(crate) fn load_and_decode<H: ProgressHook>(
    stego_path: &Path,
    password: Option<&str>,
    cfg: &StegConfig,
    hook: &H,
) -> Result<Decoded> {
    hook.on_progress(Stage::LoadStego);
    info!("loading stego image: {}", stego_path.display());
    if io::is_jpeg(stego_path).unwrap_or(false) {
        warn!(
            "{} is JPEG; lossy compression usually destroys embedded data",
            stego_path.display()
        );
    }
    let stego = io::load(stego_path)
        .with_context(|| format!("failed to load stego image {}", stego_path.display()))?;

    super::decode_with(&stego, password, cfg, hook)
        .with_context(|| format!("failed to extract from {}", stego_path.display()))
}

/// Write a recovered payload to `out_path`, creating its directory.
pub(crate) fn write_decoded<H: ProgressHook>(
    decoded: &Decoded,
    out_path: &Path,
    hook: &H,
) -> Result<()> {
    hook.on_progress(Stage::WritePayload);
    if let Some(dir) = out_path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    decoded
        .payload
        .write_to(out_path)
        .with_context(|| format!("failed to write {}", out_path.display()))?;

    hook.on_progress(Stage::Done);
    info!(
        "wrote {} bytes to {}",
        decoded.payload.len(),
        out_path.display()
    );
    Ok(())
}

/// Reduce a stored filename to a single path component inside the output dir.
pub(crate) fn safe_filename(stored: &str) -> String {
    let last = Path::new(stored)
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name),
            _ => None,
        })
        .last();
    match last {
        Some(name) => {
            let name = name.to_string_lossy().into_owned();
            if name != stored {
                warn!("stored filename '{}' reduced to '{}'", stored, name);
            }
            name
        }
        None => config::DEFAULT_FILENAME.to_string(),
    }
}
