//! Result keys.
//!
//! A key is `{yyyyMMdd_HHmmss}_{stem}`: the request time at second
//! resolution followed by the sanitized stem of the uploaded filename. Two
//! uploads with the same stem inside the same second map to the same key,
//! and the later write replaces the earlier artifacts.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timestamp layout used as the key prefix.
pub const KEY_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Longest stem kept in a key.
pub const MAX_STEM_LEN: usize = 64;

/// Stem used when the upload name has no usable characters.
const FALLBACK_STEM: &str = "image";

/// Errors for keys received from clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Result key is empty")]
    Empty,

    #[error("Result key contains invalid characters: {0}")]
    InvalidCharacters(String),
}

/// Identifier for one persisted detection outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ResultKey(String);

impl ResultKey {
    /// Derive the key for an upload received at `timestamp`.
    pub fn derive(timestamp: DateTime<Utc>, filename: &str) -> Self {
        Self(format!(
            "{}_{}",
            timestamp.format(KEY_TIMESTAMP_FORMAT),
            sanitize_stem(filename)
        ))
    }

    /// Validate a key supplied by a client.
    ///
    /// Only `[A-Za-z0-9_-]` is accepted so a key can never name a path
    /// outside the output directory.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        if raw.is_empty() {
            return Err(KeyError::Empty);
        }
        if !raw.chars().all(is_key_char) {
            return Err(KeyError::InvalidCharacters(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Reduce an uploaded filename to a stem that is safe inside a key.
///
/// Directory components (either separator) and the extension are dropped,
/// other characters outside `[A-Za-z0-9_-]` become `_`.
pub fn sanitize_stem(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };

    let sanitized: String = stem
        .chars()
        .map(|c| if is_key_char(c) { c } else { '_' })
        .take(MAX_STEM_LEN)
        .collect();

    if sanitized.trim_matches('_').is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        sanitized
    }
}
