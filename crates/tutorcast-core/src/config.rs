//! Upload limits shared by the services and the HTTP layer

use crate::error::CoreError;

/// Default maximum upload size (100 MB)
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 100;

/// Extensions accepted when no list is configured
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["wav", "json", "txt", "md", "mp3", "png", "jpg", "jpeg"];

#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Maximum size of a single artifact in bytes
    pub max_bytes: u64,
    /// Lowercase extensions without the dot
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_UPLOAD_MB,
            DEFAULT_ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        )
    }
}

impl UploadLimits {
    pub fn new(max_size_mb: u64, allowed_extensions: Vec<String>) -> Self {
        Self {
            max_bytes: max_size_mb.saturating_mul(1024 * 1024),
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated extension list such as `wav,json,txt`
    pub fn parse_extensions(list: &str) -> Vec<String> {
        list.split(',')
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }

    pub fn check_extension(&self, file_name: &str) -> Result<(), CoreError> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        if self.allowed_extensions.iter().any(|allowed| *allowed == extension) {
            Ok(())
        } else {
            Err(CoreError::BadRequest(format!(
                "File type not allowed: {} (allowed: {})",
                file_name,
                self.allowed_extensions.join(", ")
            )))
        }
    }

    pub fn check_size(&self, file_name: &str, len: usize) -> Result<(), CoreError> {
        if len as u64 > self.max_bytes {
            return Err(CoreError::BadRequest(format!(
                "{} is {} bytes, the limit is {} bytes",
                file_name, len, self.max_bytes
            )));
        }
        Ok(())
    }

    pub fn check(&self, file_name: &str, len: usize) -> Result<(), CoreError> {
        self.check_extension(file_name)?;
        self.check_size(file_name, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits = UploadLimits::default();
        assert_eq!(limits.max_bytes, 100 * 1024 * 1024);
        assert_eq!(limits.allowed_extensions.len(), 8);
    }

    #[test]
    fn test_parse_extensions() {
        assert_eq!(
            UploadLimits::parse_extensions(" WAV, .json,,txt "),
            vec!["wav", "json", "txt"]
        );
    }

    #[test]
    fn test_check_extension() {
        let limits = UploadLimits::default();
        assert!(limits.check_extension("recording.wav").is_ok());
        assert!(limits.check_extension("Screenshot.PNG").is_ok());
        assert!(limits.check_extension("script.sh").is_err());
        assert!(limits.check_extension("noextension").is_err());
    }

    #[test]
    fn test_check_size() {
        let limits = UploadLimits::new(1, vec!["wav".to_string()]);
        assert!(limits.check("recording.wav", 1024 * 1024).is_ok());
        assert!(matches!(
            limits.check("recording.wav", 1024 * 1024 + 1),
            Err(CoreError::BadRequest(_))
        ));
    }
}
