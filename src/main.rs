//! audionotes - store, transcribe and summarize audio recordings

mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use audionotes::config::StorageArgs;
use audionotes::pipeline::{ChatClient, ProcessOptions, Processor, WhisperClient};
use audionotes::store::{open_audio_store, open_json_store, ContentStore, FileMetadata, StoreError};
use cli::{AudioCommand, Cli, Command, ListArgs, ResultsCommand};

#[tokio::main]
async fn main() {
    // Logs go to stderr so listings on stdout stay pipeable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        let message = match e.downcast_ref::<StoreError>() {
            Some(store_error) => store_error.user_message(),
            None => format!("{:#}", e),
        };
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    for root in cli.storage.default_local_roots() {
        tokio::fs::create_dir_all(root)
            .await
            .with_context(|| format!("Failed to create {}", root.display()))?;
    }

    match cli.command {
        Command::Upload { file, id } => upload(&cli.storage, &file, id).await,
        Command::Audio { command } => {
            let mut store = open_audio_store(&cli.storage.audio()?).await?;
            match command {
                AudioCommand::List(args) => list(store.as_mut(), &args).await,
                AudioCommand::Count => {
                    println!("{}", store.file_count().await?);
                    Ok(())
                }
                AudioCommand::Fetch { id, output } => {
                    let bytes = store.get_contents(&id).await?;
                    tokio::fs::write(&output, &bytes)
                        .await
                        .with_context(|| format!("Failed to write {}", output.display()))?;
                    info!(id = %id, output = %output.display(), size = bytes.len(), "Fetched recording");
                    Ok(())
                }
            }
        }
        Command::Process {
            id,
            no_summary,
            no_action_items,
            pipeline,
        } => {
            let config = pipeline.resolve()?;
            let audio = open_audio_store(&cli.storage.audio()?).await?;
            let mut results = open_json_store(&cli.storage.results()?).await?;

            let transcriber = WhisperClient::new(&config.whisper_base_url, config.api_key.clone())?;
            let language_model =
                ChatClient::new(&config.llm_base_url, config.api_key.clone(), &config.llm_model)?;
            let processor = Processor::new(
                Arc::new(transcriber),
                Arc::new(language_model),
                &config.whisper_model,
            )
            .with_prompts(config.summary_prompt, config.action_items_prompt);

            let outcome = processor
                .process(
                    audio.as_ref(),
                    results.as_mut(),
                    &id,
                    ProcessOptions {
                        summarize: !no_summary,
                        extract_action_items: !no_action_items,
                    },
                )
                .await?;

            println!("{}", outcome.result_id);
            Ok(())
        }
        Command::Results { command } => {
            let mut store = open_json_store(&cli.storage.results()?).await?;
            match command {
                ResultsCommand::List(args) => list(store.as_mut(), &args).await,
                ResultsCommand::Count => {
                    println!("{}", store.file_count().await?);
                    Ok(())
                }
                ResultsCommand::Show { id } => {
                    let document = store.get_contents(&id).await?;
                    println!("{}", serde_json::to_string_pretty(&document)?);
                    Ok(())
                }
            }
        }
    }
}

async fn upload(storage: &StorageArgs, file: &Path, id: Option<String>) -> Result<()> {
    let id = match id {
        Some(id) => id,
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Cannot derive an identifier from {}", file.display()))?,
    };
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut store = open_audio_store(&storage.audio()?).await?;
    store.save(&id, bytes).await?;
    println!("{}", id);
    Ok(())
}

async fn list<S>(store: &mut S, args: &ListArgs) -> Result<()>
where
    S: ContentStore + ?Sized,
{
    if args.refresh {
        store.refresh().await?;
    }
    let files = store.list(args.page_size, args.page).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else {
        for file in &files {
            println!("{}", format_row(file));
        }
    }
    Ok(())
}

fn format_row(file: &FileMetadata) -> String {
    let mut row = format!(
        "{:<48} {:>12} {} {}",
        file.id,
        file.size_bytes,
        file.modified_at.format("%Y-%m-%d %H:%M:%S"),
        file.content_type
    );
    if let Some(source) = &file.source_filename {
        row.push_str(&format!(" ({})", source));
    }
    row
}
