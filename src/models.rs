//! Download-once cache for model files

use crate::error::AnprError;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory holding downloaded models, created on demand
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("anpr-server")
}

/// Ensure model is downloaded into the default cache and return its path
pub fn ensure_model_downloaded(url: &str, filename: &str) -> Result<PathBuf, AnprError> {
    ensure_model_in(&cache_dir(), url, filename)
}

/// Ensure `dir/filename` exists, downloading it from `url` if it does not
pub fn ensure_model_in(dir: &Path, url: &str, filename: &str) -> Result<PathBuf, AnprError> {
    fs::create_dir_all(dir).map_err(|e| {
        AnprError::InitializationError(format!("Failed to create cache directory: {}", e))
    })?;

    let model_path = dir.join(filename);

    if model_path.exists() {
        tracing::info!("Using cached model from {:?}", model_path);
        return Ok(model_path);
    }

    tracing::info!("Downloading {} (this may take a moment)...", filename);
    download_file(url, &model_path)?;
    tracing::info!("Downloaded {} to {:?}", filename, model_path);

    Ok(model_path)
}

/// Download a file from URL to path using ureq.
/// The body lands in a `.part` file first so an interrupted download is
/// never mistaken for a cached model.
fn download_file(url: &str, path: &Path) -> Result<(), AnprError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| AnprError::InitializationError(format!("Failed to download {}: {}", url, e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        AnprError::InitializationError(format!("Failed to read response body: {}", e))
    })?;

    let partial = path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        AnprError::InitializationError(format!("Failed to create model file: {}", e))
    })?;

    file.write_all(&buffer)
        .map_err(|e| AnprError::InitializationError(format!("Failed to write model file: {}", e)))?;

    fs::rename(&partial, path)
        .map_err(|e| AnprError::InitializationError(format!("Failed to move model file: {}", e)))?;

    Ok(())
}
