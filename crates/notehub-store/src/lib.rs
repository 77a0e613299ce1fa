#![allow(async_fn_in_trait)]
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod error;
pub mod file_store;

pub use error::{StoreError, StoreResult};
pub use file_store::FileStore;

const MAX_NAME_LEN: usize = 255;
const NAME_INVALID_CHARS: &str = r#"/\:"#;

fn validate_name(name: &str) -> StoreResult<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(StoreError::InvalidName);
    }
    if name.starts_with('.') {
        return Err(StoreError::InvalidName);
    }
    let invalid = name
        .chars()
        .any(|c| NAME_INVALID_CHARS.contains(c) || c.is_ascii_control());
    if invalid {
        Err(StoreError::InvalidName)
    } else {
        Ok(())
    }
}

/// File name within the store - single path segment, no separators,
/// no leading dot. Uploads get a millisecond timestamp prefix so that
/// repeated uploads of the same file name do not clash.
#[derive(Debug, Clone)]
pub struct ValidatedName(String);

impl ValidatedName {
    pub fn new(name: impl Into<String>) -> StoreResult<Self> {
        let name = name.into();
        validate_name(name.as_str()).inspect_err(|_| debug!("Invalid file name: {name}"))?;
        Ok(ValidatedName(name))
    }

    pub fn for_upload(original: impl AsRef<str>) -> StoreResult<Self> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self::new(format!("{millis}-{}", original.as_ref()))
    }
}

impl AsRef<str> for ValidatedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreInfo {
    /// name under which the file was stored
    pub file_name: String,
    pub size: u64,
    /// SHA256 hash
    pub hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        assert!(ValidatedName::new("notes.pdf").is_ok());
        assert!(ValidatedName::new("my lecture (2).pdf").is_ok());
        assert!(ValidatedName::new("").is_err());
        assert!(ValidatedName::new(".hidden").is_err());
        assert!(ValidatedName::new("../escape.pdf").is_err());
        assert!(ValidatedName::new("dir/file.pdf").is_err());
        assert!(ValidatedName::new("back\\slash").is_err());
        assert!(ValidatedName::new("evil\u{0}.pdf").is_err());
        assert!(ValidatedName::new("x".repeat(256)).is_err());
    }

    #[test]
    fn test_upload_name_prefix() {
        let name = ValidatedName::for_upload("calculus.pdf").unwrap();
        let (prefix, rest) = name.as_ref().split_once('-').unwrap();
        assert!(prefix.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(rest, "calculus.pdf");
    }
}
