//! Command-line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use audionotes::config::{PipelineArgs, StorageArgs};

/// Store, transcribe and summarize audio recordings
#[derive(Debug, Parser)]
#[command(name = "audionotes", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub storage: StorageArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Save a local audio file into the audio store
    Upload {
        /// File to upload
        file: PathBuf,
        /// Identifier to store it under (defaults to the file name)
        #[arg(long)]
        id: Option<String>,
    },

    /// Browse the audio store
    Audio {
        #[command(subcommand)]
        command: AudioCommand,
    },

    /// Transcribe a stored recording and extract notes
    Process {
        /// Identifier of the recording in the audio store
        id: String,
        /// Skip the summary step
        #[arg(long)]
        no_summary: bool,
        /// Skip the action-item step
        #[arg(long)]
        no_action_items: bool,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Browse result documents
    Results {
        #[command(subcommand)]
        command: ResultsCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum AudioCommand {
    /// List recordings
    List(ListArgs),
    /// Count recordings
    Count,
    /// Write a recording to disk
    Fetch {
        id: String,
        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum ResultsCommand {
    /// List result documents, most recent first
    List(ListArgs),
    /// Count result documents
    Count,
    /// Print one result document
    Show { id: String },
}

/// Pagination flags
#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Items per page
    #[arg(long, default_value_t = 100, allow_negative_numbers = true)]
    pub page_size: i64,
    /// Zero-based page number
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub page: i64,
    /// Rescan the store before listing
    #[arg(long)]
    pub refresh: bool,
    /// Print records as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use audionotes::config::BackendKind;

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from([
            "audionotes",
            "audio",
            "list",
            "--page-size",
            "10",
            "--page",
            "2",
            "--refresh",
            "--backend",
            "local",
        ])
        .unwrap();

        assert_eq!(cli.storage.backend, BackendKind::Local);
        match cli.command {
            Command::Audio {
                command: AudioCommand::List(args),
            } => {
                assert_eq!(args.page_size, 10);
                assert_eq!(args.page, 2);
                assert!(args.refresh);
                assert!(!args.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_negative_page_reaches_store() {
        let cli = Cli::try_parse_from(["audionotes", "results", "list", "--page", "-1"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Results {
                command: ResultsCommand::List(ListArgs { page: -1, .. })
            }
        ));
    }

    #[test]
    fn test_parse_process() {
        let cli = Cli::try_parse_from([
            "audionotes",
            "process",
            "team/call.mp3",
            "--no-summary",
            "--whisper-model",
            "medium",
        ])
        .unwrap();

        match cli.command {
            Command::Process {
                id,
                no_summary,
                no_action_items,
                pipeline,
            } => {
                assert_eq!(id, "team/call.mp3");
                assert!(no_summary);
                assert!(!no_action_items);
                assert_eq!(pipeline.whisper_model, "medium");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
