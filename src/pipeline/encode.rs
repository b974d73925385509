use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::{self, StegConfig};
use crate::payload::Payload;
use crate::raster::{io, Image, RasterError};

use super::hook::{ProgressHook, Stage};

/// File encode: cover image + payload file -> PNG stego image.
///
/// The stored filename is the payload's base name. Output is always PNG
/// whatever `output_path` is called.
pub fn encode_file<H: ProgressHook>(
    cover_path: &Path,
    payload_path: &Path,
    output_path: &Path,
    password: Option<&str>,
    cfg: &StegConfig,
    hook: &H,
) -> Result<()> {
    let result = run(cover_path, payload_path, output_path, password, cfg, hook);
    match &result {
        Ok(()) => hook.on_finished(true, "embedding complete"),
        Err(e) => hook.on_finished(false, &format!("{:#}", e)),
    }
    result
}

fn run<H: ProgressHook>(
    cover_path: &Path,
    payload_path: &Path,
    output_path: &Path,
    password: Option<&str>,
    cfg: &StegConfig,
    hook: &H,
) -> Result<()> {
    hook.on_progress(Stage::LoadCover);
    info!("loading cover image: {}", cover_path.display());
    let cover = load_cover(cover_path, cfg)?;

    hook.on_progress(Stage::LoadPayload);
    let payload = Payload::load(payload_path)
        .with_context(|| format!("failed to read payload {}", payload_path.display()))?;
    let filename = payload_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| config::DEFAULT_FILENAME.to_string());
    info!("payload: {} ({} bytes)", filename, payload.len());

    let stego = super::embed_with(&cover, payload, &filename, password, cfg, hook)
        .context("failed to embed payload")?;

    hook.on_progress(Stage::Save);
    info!("writing stego image: {}", output_path.display());
    save_atomic(output_path, &stego)?;

    hook.on_progress(Stage::Done);
    info!("encode complete!");
    Ok(())
}

/// Load a cover, applying the lossy-format policy.
fn load_cover(path: &Path, cfg: &StegConfig) -> Result<Image> {
    let jpeg = io::is_jpeg(path)
        .with_context(|| format!("failed to open cover image {}", path.display()))?;
    if jpeg {
        if !cfg.auto_convert_jpeg {
            return Err(RasterError::LossyCover)
                .with_context(|| format!("refusing cover {}", path.display()));
        }
        warn!("cover is JPEG; embedding into its decoded pixels and writing PNG");
    }
    io::load(path).with_context(|| format!("failed to decode cover image {}", path.display()))
}

/// Write to a sibling temp file, then rename over the target.
fn save_atomic(path: &Path, image: &Image) -> Result<()> {
    let tmp = temp_sibling(path);
    if let Err(e) = io::save_png(&tmp, image) {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("failed to write {}", tmp.display()));
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("failed to move stego image to {}", path.display()));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
