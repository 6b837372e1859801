//! Transcript decoding and keyword search
//!
//! Transcripts are persisted as a JSON string literal whose content is itself a
//! JSON array of `{"text": ..., ...}` sentences. Plain arrays are accepted too.

use serde_json::Value;

use crate::error::CoreError;

/// Decode a stored transcript into its sentences
pub fn parse_transcript(data: &[u8]) -> Result<Vec<Value>, CoreError> {
    let outer: Value = serde_json::from_slice(data)
        .map_err(|e| CoreError::BadRequest(format!("Transcript is not valid JSON: {}", e)))?;

    let sentences = match outer {
        Value::String(inner) => serde_json::from_str(&inner)
            .map_err(|e| CoreError::BadRequest(format!("Transcript content is not valid JSON: {}", e)))?,
        other => other,
    };

    match sentences {
        Value::Array(sentences) => Ok(sentences),
        _ => Err(CoreError::BadRequest("Transcript must be a JSON array".to_string())),
    }
}

/// Check that an uploaded transcript form value is a JSON array
pub fn validate_transcript(raw: &str) -> Result<(), CoreError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(_)) => Ok(()),
        Ok(_) => Err(CoreError::BadRequest("Transcript must be a JSON array".to_string())),
        Err(e) => Err(CoreError::BadRequest(format!("Transcript is not valid JSON: {}", e))),
    }
}

/// Sentences whose `text` contains `keyword`, ignoring case
pub fn search_sentences(sentences: Vec<Value>, keyword: &str) -> Vec<Value> {
    let keyword = keyword.to_lowercase();
    sentences
        .into_iter()
        .filter(|sentence| {
            sentence
                .get("text")
                .and_then(Value::as_str)
                .is_some_and(|text| text.to_lowercase().contains(&keyword))
        })
        .collect()
}
