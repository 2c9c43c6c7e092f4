//! Transcription boundary
//!
//! The `Transcriber` trait turns an audio file into a time-coded transcript.
//! `WhisperClient` implements it against an OpenAI-compatible
//! `/audio/transcriptions` endpoint, which also covers self-hosted Whisper
//! servers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

/// Transcriptions of long recordings can take minutes
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Where the audio to transcribe lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// A file on the local filesystem
    File(PathBuf),
    /// An object-store path; not supported yet
    Remote(String),
}

/// Transcription errors
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("Transcribing from {0} is not implemented")]
    NotImplemented(String),

    #[error("Audio file not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(String),
}

/// One time-coded piece of a transcript
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Segment {
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
    /// Text spoken in this segment
    pub text: String,
}

impl Segment {
    /// Render as `[HH:MM:SS.mmm --> HH:MM:SS.mmm] text`
    pub fn render(&self) -> String {
        format!(
            "[{} --> {}] {}",
            format_timestamp(self.start),
            format_timestamp(self.end),
            self.text
        )
    }
}

/// Result of transcribing one recording
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    /// Segment texts joined by a single space
    pub text: String,
    /// Segments in playback order
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// Build a transcript from its segments
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self { text, segments }
    }

    /// Rendered segment lines
    pub fn detailed(&self) -> Vec<String> {
        self.segments.iter().map(Segment::render).collect()
    }
}

/// Format seconds as `HH:MM:SS.mmm`
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let hours = (seconds / 3600.0).floor() as u64;
    let minutes = ((seconds % 3600.0) / 60.0).floor() as u64;
    let rest = seconds % 60.0;
    format!("{:02}:{:02}:{:06.3}", hours, minutes, rest)
}

/// Speech-to-text engine
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one recording with the named model
    async fn transcribe(
        &self,
        source: &AudioSource,
        model: &str,
    ) -> Result<Transcript, TranscriptionError>;
}

/// `verbose_json` response body
#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<Segment>,
}

/// OpenAI-compatible transcription client
#[derive(Clone)]
pub struct WhisperClient {
    http_client: Client,
    /// API base URL, e.g. `https://api.openai.com/v1`
    base_url: String,
    api_key: Option<String>,
}

impl WhisperClient {
    /// Create a client for an API base URL
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, TranscriptionError> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TranscriptionError::Api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn transcription_url(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }

    async fn build_form(&self, path: &Path, model: &str) -> Result<Form, TranscriptionError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                TranscriptionError::FileNotFound(path.display().to_string())
            }
            _ => TranscriptionError::Io(e),
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.as_ref())
            .map_err(|e| TranscriptionError::Api(format!("Failed to create audio part: {}", e)))?;

        Ok(Form::new()
            .part("file", part)
            .text("model", model.to_string())
            .text("response_format", "verbose_json")
            .text("temperature", "0.0"))
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(
        &self,
        source: &AudioSource,
        model: &str,
    ) -> Result<Transcript, TranscriptionError> {
        let path = match source {
            AudioSource::File(path) => path,
            AudioSource::Remote(uri) => {
                return Err(TranscriptionError::NotImplemented(uri.clone()));
            }
        };

        info!(path = %path.display(), model = model, "Transcribing audio");
        let form = self.build_form(path, model).await?;

        let mut request = self.http_client.post(self.transcription_url());
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.multipart(form).send().await.map_err(|e| {
            error!(error = %e, "Transcription request failed");
            TranscriptionError::Api(format!("Request failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Transcription API error");
            return Err(TranscriptionError::Api(format!(
                "API returned status {}: {}",
                status, body
            )));
        }

        let body: VerboseTranscription = response
            .json()
            .await
            .map_err(|e| TranscriptionError::Api(format!("Failed to parse response: {}", e)))?;

        let transcript = if body.segments.is_empty() {
            // Servers that ignore verbose_json only return the text
            debug!("Response carried no segments");
            Transcript {
                text: body.text,
                segments: Vec::new(),
            }
        } else {
            Transcript::from_segments(body.segments)
        };

        info!(
            segments = transcript.segments.len(),
            chars = transcript.text.len(),
            "Transcription complete"
        );
        Ok(transcript)
    }
}
