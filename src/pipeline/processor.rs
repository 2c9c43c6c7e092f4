//! Processing workflow
//!
//! Fetches a recording, transcribes it, and writes a result document that is
//! extended with a summary and action items, saving after every step.

use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use tracing::{info, instrument};
use uuid::Uuid;

use super::action_items::parse_action_items;
use super::document::ResultDocument;
use super::language_model::{LanguageModel, LanguageModelError};
use super::prompts::PromptTemplate;
use super::transcribe::{AudioSource, TranscriptionError, Transcriber};
use crate::store::{save_document, ContentStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Language model failed: {0}")]
    LanguageModel(#[from] LanguageModelError),

    #[error("Failed to stage audio for transcription: {0}")]
    Staging(#[source] std::io::Error),
}

/// Which optional steps to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    pub summarize: bool,
    pub extract_action_items: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            summarize: true,
            extract_action_items: true,
        }
    }
}

/// Saved result of one run
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    /// Identifier of the document in the result store
    pub result_id: String,
    pub document: ResultDocument,
}

/// Drives transcription and note extraction for stored recordings
pub struct Processor {
    transcriber: Arc<dyn Transcriber>,
    language_model: Arc<dyn LanguageModel>,
    whisper_model: String,
    summary_prompt: PromptTemplate,
    action_items_prompt: PromptTemplate,
}

impl Processor {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        language_model: Arc<dyn LanguageModel>,
        whisper_model: &str,
    ) -> Self {
        Self {
            transcriber,
            language_model,
            whisper_model: whisper_model.to_string(),
            summary_prompt: PromptTemplate::summary(),
            action_items_prompt: PromptTemplate::action_items(),
        }
    }

    /// Replace the default prompts
    pub fn with_prompts(mut self, summary: PromptTemplate, action_items: PromptTemplate) -> Self {
        self.summary_prompt = summary;
        self.action_items_prompt = action_items;
        self
    }

    /// Process the recording stored under `audio_id`
    ///
    /// The document is saved as soon as the transcript exists, so a failing
    /// language model still leaves the transcript behind.
    #[instrument(skip(self, audio, results), fields(whisper = %self.whisper_model))]
    pub async fn process<A, R>(
        &self,
        audio: &A,
        results: &mut R,
        audio_id: &str,
        options: ProcessOptions,
    ) -> Result<ProcessOutcome, PipelineError>
    where
        A: ContentStore<Content = Vec<u8>> + ?Sized,
        R: ContentStore<Content = serde_json::Value> + ?Sized,
    {
        let bytes = audio.get_contents(audio_id).await?;
        let staged = stage_audio(audio_id, &bytes).await?;

        let transcript = self
            .transcriber
            .transcribe(
                &AudioSource::File(staged.path().to_path_buf()),
                &self.whisper_model,
            )
            .await?;
        drop(staged);

        let filename = audio_id.rsplit('/').next().unwrap_or(audio_id);
        let mut document = ResultDocument::new(
            &transcript,
            &self.whisper_model,
            filename,
            audio_id,
            Local::now(),
        );
        let result_id = format!("{}.json", Uuid::new_v4());
        save_document(results, &result_id, &document).await?;
        info!(result_id = %result_id, "Saved transcript");

        if options.summarize {
            let prompt = self.summary_prompt.render(&document.transcription);
            let summary = self.language_model.complete(&prompt).await?;
            document.summary = Some(summary.trim().to_string());
            save_document(results, &result_id, &document).await?;
            info!(result_id = %result_id, model = self.language_model.model(), "Saved summary");
        }

        if options.extract_action_items {
            let prompt = self.action_items_prompt.render(&document.transcription);
            let response = self.language_model.complete(&prompt).await?;
            document.action_items = Some(parse_action_items(&response));
            save_document(results, &result_id, &document).await?;
            info!(result_id = %result_id, model = self.language_model.model(), "Saved action items");
        }

        Ok(ProcessOutcome {
            result_id,
            document,
        })
    }
}

/// Write audio bytes to a temporary file keeping the original extension
async fn stage_audio(
    audio_id: &str,
    bytes: &[u8],
) -> Result<tempfile::NamedTempFile, PipelineError> {
    let suffix = Path::new(audio_id)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let staged = tempfile::Builder::new()
        .prefix("audionotes-")
        .suffix(&suffix)
        .tempfile()
        .map_err(PipelineError::Staging)?;
    tokio::fs::write(staged.path(), bytes)
        .await
        .map_err(PipelineError::Staging)?;
    Ok(staged)
}
