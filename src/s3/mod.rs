//! S3 object store client

pub mod client;
pub mod errors;
#[cfg(test)]
pub mod memory;
pub mod types;

pub use client::{ObjectClient, S3Client};
pub use errors::ObjectError;
pub use types::*;
