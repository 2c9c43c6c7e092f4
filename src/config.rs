//! Configuration
//!
//! Command-line flags (with environment fallbacks) are validated into typed
//! settings before any store or client is built.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};

use crate::pipeline::prompts::{PromptError, PromptTemplate};

/// Default local root for audio recordings
pub const DEFAULT_AUDIO_ROOT: &str = "audio_files";

/// Default local root for result documents
pub const DEFAULT_RESULTS_ROOT: &str = "processed_files";

/// Default OpenAI-compatible API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("S3 backend selected but no {store} bucket configured (use {flag} or set {env})")]
    MissingBucket {
        store: &'static str,
        flag: &'static str,
        env: &'static str,
    },

    #[error("Failed to read prompt file {path}: {source}")]
    PromptFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid prompt in {path}: {source}")]
    Prompt {
        path: PathBuf,
        #[source]
        source: PromptError,
    },
}

/// Storage medium
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Local directories
    Local,
    /// Amazon S3 or an S3-compatible endpoint
    S3,
}

/// Bucket binding for a remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    /// Key prefix, possibly empty
    pub prefix: String,
    pub region: Option<String>,
    /// Named credential profile
    pub profile: Option<String>,
    /// Custom endpoint (MinIO and other S3-compatible stores)
    pub endpoint_url: Option<String>,
}

/// Validated location of one store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Local { root: PathBuf },
    S3(S3Settings),
}

/// Storage flags
#[derive(Debug, Clone, Args)]
pub struct StorageArgs {
    /// Storage backend
    #[arg(long, value_enum, env = "AUDIONOTES_BACKEND", default_value = "local", global = true)]
    pub backend: BackendKind,

    /// Local directory holding audio recordings (created when left at the default)
    #[arg(long, default_value = DEFAULT_AUDIO_ROOT, global = true)]
    pub audio_root: PathBuf,

    /// Local directory holding result documents (created when missing)
    #[arg(long, default_value = DEFAULT_RESULTS_ROOT, global = true)]
    pub results_root: PathBuf,

    /// Bucket holding audio recordings
    #[arg(long, env = "MY_S3_AUDIO_BUCKET", global = true)]
    pub audio_bucket: Option<String>,

    /// Bucket holding result documents
    #[arg(long, env = "MY_S3_RESULTS_BUCKET", global = true)]
    pub results_bucket: Option<String>,

    /// Key prefix for audio recordings
    #[arg(long, default_value = "", global = true)]
    pub audio_prefix: String,

    /// Key prefix for result documents
    #[arg(long, default_value = "", global = true)]
    pub results_prefix: String,

    /// AWS region
    #[arg(long, env = "AWS_REGION", global = true)]
    pub region: Option<String>,

    /// AWS credential profile
    #[arg(long, env = "AWS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Custom S3 endpoint URL
    #[arg(long, global = true)]
    pub endpoint_url: Option<String>,
}

impl StorageArgs {
    /// Location of the audio store
    pub fn audio(&self) -> Result<StorageConfig, ConfigError> {
        self.resolve(
            &self.audio_root,
            self.audio_bucket.as_deref(),
            &self.audio_prefix,
            ("audio", "--audio-bucket", "MY_S3_AUDIO_BUCKET"),
        )
    }

    /// Location of the result-document store
    pub fn results(&self) -> Result<StorageConfig, ConfigError> {
        self.resolve(
            &self.results_root,
            self.results_bucket.as_deref(),
            &self.results_prefix,
            ("results", "--results-bucket", "MY_S3_RESULTS_BUCKET"),
        )
    }

    /// Local roots left at their defaults, which the binary creates on startup
    ///
    /// Roots given explicitly are not included, so a mistyped path still fails.
    pub fn default_local_roots(&self) -> Vec<&Path> {
        if self.backend != BackendKind::Local {
            return Vec::new();
        }
        [
            (&self.audio_root, DEFAULT_AUDIO_ROOT),
            (&self.results_root, DEFAULT_RESULTS_ROOT),
        ]
        .into_iter()
        .filter(|(root, default)| root.as_path() == Path::new(default))
        .map(|(root, _)| root.as_path())
        .collect()
    }

    fn resolve(
        &self,
        root: &Path,
        bucket: Option<&str>,
        prefix: &str,
        (store, flag, env): (&'static str, &'static str, &'static str),
    ) -> Result<StorageConfig, ConfigError> {
        match self.backend {
            BackendKind::Local => Ok(StorageConfig::Local {
                root: root.to_path_buf(),
            }),
            BackendKind::S3 => {
                let bucket = bucket
                    .map(str::trim)
                    .filter(|b| !b.is_empty())
                    .ok_or(ConfigError::MissingBucket { store, flag, env })?;

                Ok(StorageConfig::S3(S3Settings {
                    bucket: bucket.to_string(),
                    prefix: prefix.to_string(),
                    region: non_empty(&self.region),
                    profile: non_empty(&self.profile),
                    endpoint_url: non_empty(&self.endpoint_url),
                }))
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

/// Transcription and language-model flags
#[derive(Debug, Clone, Args)]
pub struct PipelineArgs {
    /// Whisper model name sent to the transcription endpoint
    #[arg(long, env = "AUDIONOTES_WHISPER_MODEL", default_value = "base")]
    pub whisper_model: String,

    /// Base URL of the transcription API
    #[arg(long, env = "AUDIONOTES_WHISPER_URL", default_value = DEFAULT_API_BASE_URL)]
    pub whisper_base_url: String,

    /// Chat model used for summaries and action items
    #[arg(long, env = "AUDIONOTES_LLM_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,

    /// Base URL of the chat completion API
    #[arg(long, env = "AUDIONOTES_LLM_URL", default_value = DEFAULT_API_BASE_URL)]
    pub llm_base_url: String,

    /// API key sent as a bearer token to both endpoints
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// File holding a custom summary prompt (must contain {text})
    #[arg(long)]
    pub summary_prompt_file: Option<PathBuf>,

    /// File holding a custom action-item prompt (must contain {text})
    #[arg(long)]
    pub action_items_prompt_file: Option<PathBuf>,
}

/// Validated pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub whisper_model: String,
    pub whisper_base_url: String,
    pub llm_model: String,
    pub llm_base_url: String,
    pub api_key: Option<String>,
    pub summary_prompt: PromptTemplate,
    pub action_items_prompt: PromptTemplate,
}

impl PipelineArgs {
    /// Validate flags and load prompt files
    pub fn resolve(&self) -> Result<PipelineConfig, ConfigError> {
        let summary_prompt = match &self.summary_prompt_file {
            Some(path) => load_prompt(path)?,
            None => PromptTemplate::summary(),
        };
        let action_items_prompt = match &self.action_items_prompt_file {
            Some(path) => load_prompt(path)?,
            None => PromptTemplate::action_items(),
        };

        Ok(PipelineConfig {
            whisper_model: self.whisper_model.clone(),
            whisper_base_url: self.whisper_base_url.clone(),
            llm_model: self.llm_model.clone(),
            llm_base_url: self.llm_base_url.clone(),
            api_key: non_empty(&self.api_key),
            summary_prompt,
            action_items_prompt,
        })
    }
}

fn load_prompt(path: &Path) -> Result<PromptTemplate, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::PromptFile {
        path: path.to_path_buf(),
        source,
    })?;
    PromptTemplate::new(text).map_err(|source| ConfigError::Prompt {
        path: path.to_path_buf(),
        source,
    })
}
