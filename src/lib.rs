//! audionotes
//!
//! Stores audio recordings and their transcription results on a local
//! directory tree or in S3, and turns recordings into transcripts, summaries
//! and action items.

pub mod config;
pub mod pipeline;
pub mod s3;
pub mod store;
