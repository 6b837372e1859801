//! Storage keys
//!
//! Keys are `/`-separated paths such as `<sectionId>/recording.wav` or
//! `<userId>/<tutorialId>/<role>/layout.json`. Every backend validates keys
//! through this module before touching the disk or the network.

use std::fmt;

use crate::error::StorageError;

/// Maximum accepted key length in bytes
pub const MAX_KEY_LENGTH: usize = 1024;

/// A validated storage key.
///
/// Segments are non-empty, contain only ASCII alphanumerics, `-`, `_` and `.`,
/// and never start with a dot. The last rule rules out `.`, `..` and the
/// hidden temp files the local backend writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    /// Parse and validate a raw key
    pub fn parse(key: &str) -> Result<Self, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("key is empty".to_string()));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(StorageError::InvalidKey(format!(
                "key exceeds {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        for segment in key.split('/') {
            validate_segment(segment, key)?;
        }

        Ok(Self(key.to_string()))
    }

    /// Build a key from individual segments
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Result<Self, StorageError> {
        let joined = segments
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join("/");
        Self::parse(&joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// The last segment of the key
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate a listing prefix.
///
/// The empty prefix lists everything. A trailing `/` is allowed; the remaining
/// segments follow the same rules as key segments, so a prefix can never
/// address anything outside the root.
pub fn validate_prefix(prefix: &str) -> Result<(), StorageError> {
    if prefix.is_empty() {
        return Ok(());
    }
    if prefix.len() > MAX_KEY_LENGTH {
        return Err(StorageError::InvalidKey(format!(
            "prefix exceeds {} bytes",
            MAX_KEY_LENGTH
        )));
    }

    let trimmed = prefix.strip_suffix('/').unwrap_or(prefix);
    for segment in trimmed.split('/') {
        validate_segment(segment, prefix)?;
    }
    Ok(())
}

fn validate_segment(segment: &str, key: &str) -> Result<(), StorageError> {
    if segment.is_empty() {
        return Err(StorageError::InvalidKey(format!("empty segment in {:?}", key)));
    }
    if segment.starts_with('.') {
        return Err(StorageError::InvalidKey(format!(
            "segment {:?} in {:?} starts with a dot",
            segment, key
        )));
    }
    if let Some(c) = segment
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(StorageError::InvalidKey(format!(
            "character {:?} not allowed in {:?}",
            c, key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_valid_keys() {
        let key = StorageKey::parse("3f2a9c/recording.wav").unwrap();
        assert_eq!(key.as_str(), "3f2a9c/recording.wav");
        assert_eq!(key.file_name(), "recording.wav");
        assert_eq!(key.segments().count(), 2);

        let layout = StorageKey::parse("42/tutorial-1/learner/layout.json").unwrap();
        assert_eq!(layout.segments().collect::<Vec<_>>(), vec!["42", "tutorial-1", "learner", "layout.json"]);
    }

    #[test]
    fn test_parse_rejects_traversal() {
        for key in ["../etc/passwd", "abc/../../x", "abc/..", "..", "abc/./x"] {
            let err = StorageKey::parse(key).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidKey, "{}", key);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for key in ["", "/abs/path", "abc//x", "abc/", "a\\b", "abc/x y", "abc/.hidden"] {
            assert!(StorageKey::parse(key).is_err(), "{}", key);
        }
        let long = "a".repeat(MAX_KEY_LENGTH + 1);
        assert!(StorageKey::parse(&long).is_err());
    }

    #[test]
    fn test_from_segments() {
        let key = StorageKey::from_segments(&["7", "tut", "author", "layout.json"]).unwrap();
        assert_eq!(key.as_str(), "7/tut/author/layout.json");
        assert!(StorageKey::from_segments(&["7", "..", "layout.json"]).is_err());
    }

    #[test]
    fn test_validate_prefix() {
        assert!(validate_prefix("").is_ok());
        assert!(validate_prefix("abc/").is_ok());
        assert!(validate_prefix("abc/rec").is_ok());
        assert!(validate_prefix("../").is_err());
        assert!(validate_prefix("abc/../").is_err());
        assert!(validate_prefix("/abc").is_err());
        assert!(validate_prefix("abc//").is_err());
    }
}
