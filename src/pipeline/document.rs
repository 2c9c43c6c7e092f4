//! Persisted result document

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::transcribe::Transcript;

/// Format of `created_ts`
pub const CREATED_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of processing one recording
///
/// Field order and names are part of the stored format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDocument {
    /// Full transcript text
    pub transcription: String,
    /// Rendered time-coded segments
    pub detailed_transcription: Vec<String>,
    /// `whisper[<model>]`
    pub model_name: String,
    /// Local creation time, `%Y-%m-%d %H:%M:%S`
    pub created_ts: String,
    /// Base name of the source recording
    pub filename: String,
    /// Identifier of the source recording in the audio store
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_items: Option<Value>,
}

impl ResultDocument {
    /// Start a document from a fresh transcript
    pub fn new(
        transcript: &Transcript,
        whisper_model: &str,
        filename: &str,
        file_path: &str,
        created: DateTime<Local>,
    ) -> Self {
        Self {
            transcription: transcript.text.clone(),
            detailed_transcription: transcript.detailed(),
            model_name: model_label(whisper_model),
            created_ts: created.format(CREATED_TS_FORMAT).to_string(),
            filename: filename.to_string(),
            file_path: file_path.to_string(),
            summary: None,
            action_items: None,
        }
    }
}

/// Label recorded in `model_name`
pub fn model_label(whisper_model: &str) -> String {
    format!("whisper[{}]", whisper_model)
}
