//! Loading JSON documents (schemas and instances) from various sources.

use std::path::Path;

use serde_json::Value;

use crate::error::StructureError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `StructureError::FileNotFound` if the file doesn't exist,
/// or a `ParseError::MalformedJson` if the file isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, StructureError> {
    if !path.exists() {
        return Err(StructureError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| StructureError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_json_str(&content)
}

/// Parse a JSON document from a string.
pub fn load_json_str(content: &str) -> Result<Value, StructureError> {
    serde_json::from_str(content)
        .map_err(|source| crate::error::ParseError::MalformedJson { source }.into())
}

/// Fetch a JSON document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default). Used for `$import`
/// URIs that are not covered by an import map.
#[cfg(feature = "remote")]
pub fn load_json_url(url: &str) -> Result<Value, StructureError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| StructureError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|source| StructureError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    response.json().map_err(|source| StructureError::NetworkError {
        url: url.to_string(),
        source,
    })
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}
