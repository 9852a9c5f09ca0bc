use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ModelConfig;
use crate::log;

/// Where the model file lives, as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// File on disk
    Local(PathBuf),
    /// http(s) URL, downloaded once into the model cache
    Remote(String),
}

impl ModelSource {
    /// Parses a configured source string.
    ///
    /// Relative paths resolve against `base_dir` (the executable directory).
    pub fn parse(source: &str, base_dir: &Path) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            return ModelSource::Remote(source.to_string());
        }
        let path = PathBuf::from(source);
        if path.is_absolute() {
            ModelSource::Local(path)
        } else {
            ModelSource::Local(base_dir.join(path))
        }
    }
}

/// Returns a local path to the configured model, downloading it if needed.
pub fn resolve_model(config: &ModelConfig) -> Result<PathBuf> {
    match ModelSource::parse(&config.source, crate::paths::get_exe_dir()) {
        ModelSource::Local(path) => {
            if !path.exists() {
                return Err(anyhow!("Model file not found: {}", path.display()));
            }
            log(&format!("Model found at: {}", path.display()));
            Ok(path)
        }
        ModelSource::Remote(url) => ensure_downloaded(&url, &crate::paths::get_model_cache_dir()),
    }
}

/// File name a downloaded model is cached under.
fn cache_file_name(url: &str) -> String {
    let name = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .rsplit('/')
        .next()
        .unwrap_or("");
    if name.is_empty() {
        "model.onnx".to_string()
    } else {
        name.to_string()
    }
}

/// Downloads `url` into `cache_dir` unless a cached copy exists.
fn ensure_downloaded(url: &str, cache_dir: &Path) -> Result<PathBuf> {
    let target = cache_dir.join(cache_file_name(url));
    if target.exists() {
        log(&format!("Using cached model: {}", target.display()));
        return Ok(target);
    }

    log(&format!("Model not cached, downloading {}...", url));
    fs::create_dir_all(cache_dir).context("Failed to create model cache directory")?;

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;

    let response = client
        .get(url)
        .header("User-Agent", "digit-volume")
        .send()
        .with_context(|| format!("Failed to request {}", url))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download model: HTTP {}",
            response.status()
        ));
    }

    let bytes = response.bytes()?;

    // Write next to the target so the final rename stays on one filesystem
    let mut temp = tempfile::NamedTempFile::new_in(cache_dir)?;
    temp.write_all(&bytes)?;
    temp.persist(&target)
        .map_err(|e| anyhow!("Failed to store downloaded model: {}", e))?;

    log(&format!(
        "Downloaded model ({} bytes) to {}",
        bytes.len(),
        target.display()
    ));

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_remote() {
        let base = Path::new("/opt/app");
        assert_eq!(
            ModelSource::parse("https://example.com/models/mnist_cnn.onnx", base),
            ModelSource::Remote("https://example.com/models/mnist_cnn.onnx".to_string())
        );
    }

    #[test]
    fn test_parse_relative_resolves_against_base() {
        let base = Path::new("/opt/app");
        assert_eq!(
            ModelSource::parse("mnist_cnn.onnx", base),
            ModelSource::Local(PathBuf::from("/opt/app/mnist_cnn.onnx"))
        );
    }

    #[test]
    fn test_cache_file_name() {
        assert_eq!(
            cache_file_name("https://example.com/a/mnist_cnn.onnx?download=1"),
            "mnist_cnn.onnx"
        );
        assert_eq!(cache_file_name("https://example.com/"), "model.onnx");
    }

    #[test]
    fn test_cached_model_skips_download() {
        let dir = tempdir().unwrap();
        let cached = dir.path().join("mnist_cnn.onnx");
        std::fs::write(&cached, b"onnx").unwrap();

        // Unroutable host: any network access would fail the test
        let path = ensure_downloaded("http://invalid.invalid/mnist_cnn.onnx", dir.path()).unwrap();
        assert_eq!(path, cached);
    }

    #[test]
    fn test_missing_local_model_is_an_error() {
        let dir = tempdir().unwrap();
        let config = ModelConfig {
            source: dir.path().join("absent.onnx").display().to_string(),
            ..ModelConfig::default()
        };

        let err = resolve_model(&config).unwrap_err();
        assert!(err.to_string().contains("Model file not found"));
    }
}
