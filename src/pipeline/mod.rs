//! Transcription and note-extraction pipeline

pub mod action_items;
pub mod document;
pub mod language_model;
pub mod processor;
pub mod prompts;
pub mod transcribe;

pub use document::ResultDocument;
pub use language_model::{ChatClient, LanguageModel, LanguageModelError};
pub use processor::{PipelineError, ProcessOptions, ProcessOutcome, Processor};
pub use prompts::PromptTemplate;
pub use transcribe::{AudioSource, Transcriber, Transcript, TranscriptionError, WhisperClient};
