//! Utility functions and helpers

use crate::error::{FetchError, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// URL validation and parsing utilities
pub struct UrlUtils;

impl UrlUtils {
    /// Validate and normalize URL
    pub fn validate_url(input: &str) -> Result<Url> {
        // Add http:// if no scheme is provided
        let url_str = if input.contains("://") {
            input.to_string()
        } else {
            format!("http://{}", input)
        };

        Url::parse(&url_str)
            .map_err(|e| FetchError::InvalidUrl(format!("Invalid URL '{}': {}", input, e)))
    }
}

/// File system utilities
pub struct FileUtils;

impl FileUtils {
    /// Expand tilde (~) in file paths
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        let rest = match path.strip_prefix('~') {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
            _ => return Ok(PathBuf::from(path)),
        };

        match dirs::home_dir() {
            Some(home_dir) if rest.is_empty() => Ok(home_dir),
            Some(home_dir) => Ok(home_dir.join(rest)),
            None => Err(FetchError::Config(
                "Cannot determine home directory".to_string(),
            )),
        }
    }

    /// Directory a file path lives in; a bare file name lives in `.`
    pub fn parent_dir(path: &Path) -> PathBuf {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Check that the directory holding `path` exists and accepts new files.
    ///
    /// Writability is checked by creating and dropping a temporary file.
    pub fn check_parent_writable(path: &Path) -> Result<PathBuf> {
        let dir = Self::parent_dir(path);

        if !dir.is_dir() {
            return Err(FetchError::NotFound(format!(
                "Directory `{}` does not exist",
                dir.display()
            )));
        }

        tempfile::Builder::new()
            .prefix(".easyfetch-write-check")
            .tempfile_in(&dir)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => FetchError::NotFound(format!(
                    "Directory `{}` does not exist",
                    dir.display()
                )),
                _ => FetchError::PermissionDenied(format!(
                    "Directory `{}` is not writable: {}",
                    dir.display(),
                    e
                )),
            })?;

        Ok(dir)
    }
}

/// String utilities
pub struct StringUtils;

impl StringUtils {
    /// Parse `key: value` header lines
    pub fn parse_header(input: &str) -> Result<(String, String)> {
        let parts: Vec<&str> = input.splitn(2, ':').collect();
        match parts.as_slice() {
            [key, value] if !key.trim().is_empty() => {
                let key = key.trim().to_string();
                let value = value.trim().to_string();
                Ok((key, value))
            }
            _ => Err(FetchError::InvalidArgument(format!(
                "Invalid header format: '{}'. Expected 'key: value'",
                input
            ))),
        }
    }

    /// Parse timeout values (supports suffixes like 'ms', 's', 'm', 'h')
    pub fn parse_timeout(input: &str) -> Result<Duration> {
        let input = input.trim();
        if let Ok(seconds) = input.parse::<u64>() {
            return Ok(Duration::from_secs(seconds));
        }

        if let Some(stripped) = input.strip_suffix("ms") {
            let millis: u64 = stripped.parse().map_err(|_| {
                FetchError::InvalidArgument(format!("Invalid timeout number: '{}'", stripped))
            })?;
            return Ok(Duration::from_millis(millis));
        }

        let (number_part, suffix) = if let Some(stripped) = input.strip_suffix('s') {
            (stripped, 1)
        } else if let Some(stripped) = input.strip_suffix('m') {
            (stripped, 60)
        } else if let Some(stripped) = input.strip_suffix('h') {
            (stripped, 3600)
        } else {
            return Err(FetchError::InvalidArgument(format!(
                "Invalid timeout format: '{}'. Use number with optional suffix (ms/s/m/h)",
                input
            )));
        };

        let number: u64 = number_part.parse().map_err(|_| {
            FetchError::InvalidArgument(format!("Invalid timeout number: '{}'", number_part))
        })?;

        let seconds = number.checked_mul(suffix).ok_or_else(|| {
            FetchError::InvalidArgument(format!("Timeout out of range: '{}'", input))
        })?;

        Ok(Duration::from_secs(seconds))
    }

    /// Parse curl-style boolean switches (`1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`)
    pub fn parse_bool(input: &str) -> Result<bool> {
        match input.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(FetchError::InvalidArgument(format!(
                "Invalid boolean value: '{}'",
                other
            ))),
        }
    }
}
