//! Artifact names, layout roles and the keys they are stored under

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tutorcast_storage::{StorageError, StorageKey};

use crate::error::CoreError;

/// One recorded file belonging to a tutorial section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactName {
    CodeContent,
    Description,
    Recording,
    Keystroke,
    ConsoleAction,
    LayoutAction,
    ScrollAction,
    SelectAction,
    Transcript,
    InputKeystrokes,
    InputScrollAction,
    ConsoleScrollAction,
    EditorScrollAction,
    Question,
}

impl ArtifactName {
    pub const ALL: [ArtifactName; 14] = [
        ArtifactName::CodeContent,
        ArtifactName::Description,
        ArtifactName::Recording,
        ArtifactName::Keystroke,
        ArtifactName::ConsoleAction,
        ArtifactName::LayoutAction,
        ArtifactName::ScrollAction,
        ArtifactName::SelectAction,
        ArtifactName::Transcript,
        ArtifactName::InputKeystrokes,
        ArtifactName::InputScrollAction,
        ArtifactName::ConsoleScrollAction,
        ArtifactName::EditorScrollAction,
        ArtifactName::Question,
    ];

    /// File name under the section directory
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactName::CodeContent => "code_content.txt",
            ArtifactName::Description => "description.md",
            ArtifactName::Recording => "recording.wav",
            ArtifactName::Keystroke => "keystroke.json",
            ArtifactName::ConsoleAction => "consoleAction.json",
            ArtifactName::LayoutAction => "layoutAction.json",
            ArtifactName::ScrollAction => "scrollAction.json",
            ArtifactName::SelectAction => "selectAction.json",
            ArtifactName::Transcript => "transcript.json",
            ArtifactName::InputKeystrokes => "inputKeystrokes.json",
            ArtifactName::InputScrollAction => "inputScrollAction.json",
            ArtifactName::ConsoleScrollAction => "consoleScrollAction.json",
            ArtifactName::EditorScrollAction => "editorScrollAction.json",
            ArtifactName::Question => "question.json",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.file_name() == name)
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactName::CodeContent => "text/plain",
            ArtifactName::Description => "text/markdown",
            ArtifactName::Recording => "audio/wav",
            _ => "application/json",
        }
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Whose copy of a layout is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutRole {
    Author,
    Learner,
}

impl LayoutRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutRole::Author => "author",
            LayoutRole::Learner => "learner",
        }
    }
}

impl fmt::Display for LayoutRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "author" => Ok(LayoutRole::Author),
            "learner" => Ok(LayoutRole::Learner),
            other => Err(CoreError::BadRequest(format!(
                "Invalid layout role: {} (expected author or learner)",
                other
            ))),
        }
    }
}

/// A single path segment, such as a section or user id
fn segment(value: &str) -> Result<&str, CoreError> {
    if value.contains('/') {
        return Err(StorageError::InvalidKey(format!("{:?} must be a single path segment", value)).into());
    }
    StorageKey::parse(value)?;
    Ok(value)
}

/// `<sectionId>/<fileName>`
pub fn recording_key(section_id: &str, file_name: &str) -> Result<StorageKey, CoreError> {
    Ok(StorageKey::from_segments(&[segment(section_id)?, segment(file_name)?])?)
}

/// `<sectionId>/`, the listing prefix of one section
pub fn section_prefix(section_id: &str) -> Result<String, CoreError> {
    Ok(format!("{}/", segment(section_id)?))
}

/// `<userId>/<tutorialId>/<role>/layout.json`
pub fn layout_key(user_id: &str, tutorial_id: &str, role: LayoutRole) -> Result<StorageKey, CoreError> {
    Ok(StorageKey::from_segments(&[
        segment(user_id)?,
        segment(tutorial_id)?,
        role.as_str(),
        "layout.json",
    ])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorcast_storage::ErrorKind;

    #[test]
    fn test_artifact_file_names() {
        assert_eq!(ArtifactName::Recording.file_name(), "recording.wav");
        assert_eq!(ArtifactName::ConsoleAction.to_string(), "consoleAction.json");
        assert_eq!(
            ArtifactName::from_file_name("selectAction.json"),
            Some(ArtifactName::SelectAction)
        );
        assert_eq!(ArtifactName::from_file_name("SelectAction.json"), None);
        assert_eq!(ArtifactName::from_file_name("notes.txt"), None);
    }

    #[test]
    fn test_recording_key() {
        let key = recording_key("3f2a9c", ArtifactName::Keystroke.file_name()).unwrap();
        assert_eq!(key.as_str(), "3f2a9c/keystroke.json");

        let err = recording_key("..", "recording.wav").unwrap_err();
        assert_eq!(err.storage_kind(), Some(ErrorKind::InvalidKey));
        let err = recording_key("abc/def", "recording.wav").unwrap_err();
        assert_eq!(err.storage_kind(), Some(ErrorKind::InvalidKey));
    }

    #[test]
    fn test_layout_key() {
        let key = layout_key("42", "tutorial-7", LayoutRole::Learner).unwrap();
        assert_eq!(key.as_str(), "42/tutorial-7/learner/layout.json");
        assert!(layout_key("42", "../x", LayoutRole::Author).is_err());
    }

    #[test]
    fn test_section_prefix() {
        assert_eq!(section_prefix("abc").unwrap(), "abc/");
        assert!(section_prefix("").is_err());
    }

    #[test]
    fn test_parse_layout_role() {
        assert_eq!("author".parse::<LayoutRole>().unwrap(), LayoutRole::Author);
        assert!(matches!("admin".parse::<LayoutRole>(), Err(CoreError::BadRequest(_))));
    }
}
