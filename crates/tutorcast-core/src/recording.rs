//! Recording service for tutorial section artifacts

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tutorcast_storage::{StorageBackend, StorageObject};

use crate::artifact::{ArtifactName, recording_key, section_prefix};
use crate::config::UploadLimits;
use crate::error::CoreError;
use crate::transcript::{parse_transcript, search_sentences, validate_transcript};

/// Form body an author submits when saving a recording.
///
/// Action streams arrive as JSON text and are stored as a JSON string literal
/// wrapping that text. The recording is base64 encoded.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordingUpload {
    pub tutorial_section_id: String,
    pub keystroke: String,
    #[serde(rename = "consoleAction")]
    pub console_action: String,
    #[serde(rename = "consoleScrollAction")]
    pub console_scroll_action: String,
    #[serde(rename = "layoutAction")]
    pub layout_action: String,
    #[serde(rename = "selectAction")]
    pub select_action: String,
    #[serde(rename = "scrollAction")]
    pub scroll_action: String,
    #[serde(rename = "editorScrollAction")]
    pub editor_scroll_action: String,
    #[serde(rename = "inputKeystrokes")]
    pub input_keystrokes: String,
    #[serde(rename = "inputScrollAction")]
    pub input_scroll_action: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub code_content: Option<String>,
    /// Base64-encoded WAV audio
    #[serde(default)]
    pub file: Option<String>,
    /// JSON array of transcript sentences
    #[serde(default)]
    pub transcript: Option<String>,
}

impl RecordingUpload {
    fn action_streams(&self) -> [(ArtifactName, &str); 9] {
        [
            (ArtifactName::Keystroke, self.keystroke.as_str()),
            (ArtifactName::InputKeystrokes, self.input_keystrokes.as_str()),
            (ArtifactName::InputScrollAction, self.input_scroll_action.as_str()),
            (ArtifactName::ConsoleAction, self.console_action.as_str()),
            (ArtifactName::ConsoleScrollAction, self.console_scroll_action.as_str()),
            (ArtifactName::LayoutAction, self.layout_action.as_str()),
            (ArtifactName::ScrollAction, self.scroll_action.as_str()),
            (ArtifactName::EditorScrollAction, self.editor_scroll_action.as_str()),
            (ArtifactName::SelectAction, self.select_action.as_str()),
        ]
    }
}

/// Lifetime of presigned artifact URLs
pub const FILE_URL_EXPIRY: Duration = Duration::from_secs(3600);

/// Reads and writes the artifacts of tutorial sections
pub struct RecordingService {
    storage: Arc<dyn StorageBackend>,
    limits: UploadLimits,
}

impl RecordingService {
    pub fn new(storage: Arc<dyn StorageBackend>, limits: UploadLimits) -> Self {
        Self { storage, limits }
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Store a single artifact after checking the upload limits
    pub async fn save_artifact(
        &self,
        section_id: &str,
        file_name: &str,
        data: Bytes,
        content_type: Option<String>,
    ) -> Result<String, CoreError> {
        let key = recording_key(section_id, file_name)?;
        self.limits.check(file_name, data.len())?;

        let mut object = StorageObject::new(data);
        object.content_type = content_type;

        debug!("Saving artifact {} ({} bytes)", key, object.len());
        Ok(self.storage.put(key.as_str(), object).await?)
    }

    pub async fn get_artifact(&self, section_id: &str, file_name: &str) -> Result<StorageObject, CoreError> {
        let key = recording_key(section_id, file_name)?;
        Ok(self.storage.get(key.as_str()).await?)
    }

    /// Where a client can download an artifact, if the backend can say
    pub async fn file_url(&self, section_id: &str, file_name: &str) -> Result<Option<String>, CoreError> {
        let key = recording_key(section_id, file_name)?;
        Ok(self.storage.file_url(key.as_str(), FILE_URL_EXPIRY).await?)
    }

    /// File names stored for a section, sorted
    pub async fn list_artifacts(&self, section_id: &str) -> Result<Vec<String>, CoreError> {
        let prefix = section_prefix(section_id)?;
        let keys = self.storage.list(&prefix).await?;

        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(prefix.as_str()).map(str::to_string))
            .collect())
    }

    /// Delete every artifact of a section, returning how many were removed.
    ///
    /// Copies held only by a local mirror are removed too but not counted.
    pub async fn delete_section(&self, section_id: &str) -> Result<usize, CoreError> {
        let prefix = section_prefix(section_id)?;
        let keys = self.storage.list_all(&prefix).await?;

        let mut deleted = 0;
        for key in &keys {
            if self.storage.delete(key).await? {
                deleted += 1;
            }
        }

        info!("Deleted {} artifacts of section {}", deleted, section_id);
        Ok(deleted)
    }

    /// Copy every artifact of `source` into `destination`
    pub async fn copy_section(&self, source: &str, destination: &str) -> Result<usize, CoreError> {
        let files = self.list_artifacts(source).await?;
        if files.is_empty() {
            return Err(CoreError::NotFound(format!("section {}", source)));
        }
        section_prefix(destination)?;

        for file_name in &files {
            let object = self.get_artifact(source, file_name).await?;
            let key = recording_key(destination, file_name)?;
            self.storage.put(key.as_str(), object).await?;
        }

        info!("Copied {} artifacts from section {} to {}", files.len(), source, destination);
        Ok(files.len())
    }

    /// Replace a section's artifacts with a new recording, returning the keys written
    pub async fn upload_recording(&self, upload: RecordingUpload) -> Result<Vec<String>, CoreError> {
        let section_id = upload.tutorial_section_id.as_str();
        section_prefix(section_id)?;

        // Validate everything before the section is cleared
        let recording = match &upload.file {
            Some(encoded) => {
                let data = STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| CoreError::BadRequest(format!("Recording is not valid base64: {}", e)))?;
                self.limits.check_size(ArtifactName::Recording.file_name(), data.len())?;
                Some(Bytes::from(data))
            }
            None => None,
        };
        if let Some(transcript) = &upload.transcript {
            validate_transcript(transcript)?;
        }

        let mut artifacts: Vec<(ArtifactName, Bytes)> = Vec::new();
        if let Some(description) = &upload.description {
            artifacts.push((ArtifactName::Description, Bytes::from(description.clone())));
        }
        if let Some(code_content) = &upload.code_content {
            artifacts.push((ArtifactName::CodeContent, Bytes::from(code_content.clone())));
        }
        if let Some(recording) = recording {
            artifacts.push((ArtifactName::Recording, recording));
        }
        for (artifact, stream) in upload.action_streams() {
            artifacts.push((artifact, Bytes::from(serde_json::to_vec(stream)?)));
        }
        if let Some(transcript) = &upload.transcript {
            artifacts.push((ArtifactName::Transcript, Bytes::from(serde_json::to_vec(transcript)?)));
        }

        let cleared = self.delete_section(section_id).await?;
        if cleared > 0 {
            debug!("Cleared {} stale artifacts of section {}", cleared, section_id);
        }

        let mut written = Vec::with_capacity(artifacts.len());
        for (artifact, data) in artifacts {
            let key = recording_key(section_id, artifact.file_name())?;
            let object = StorageObject::new(data).with_content_type(artifact.content_type());
            self.storage.put(key.as_str(), object).await?;
            written.push(key.to_string());
        }

        info!("Saved recording for section {} ({} artifacts)", section_id, written.len());
        Ok(written)
    }

    /// Transcript sentences of a section that mention `keyword`.
    ///
    /// A section without a transcript, or with one that cannot be decoded,
    /// yields no matches.
    pub async fn search_transcript(&self, section_id: &str, keyword: &str) -> Result<Vec<Value>, CoreError> {
        let object = match self
            .get_artifact(section_id, ArtifactName::Transcript.file_name())
            .await
        {
            Ok(object) => object,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        match parse_transcript(&object.data) {
            Ok(sentences) => Ok(search_sentences(sentences, keyword)),
            Err(e) => {
                warn!("Unreadable transcript for section {}: {}", section_id, e);
                Ok(Vec::new())
            }
        }
    }
}
