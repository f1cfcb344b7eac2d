//! Storage module for the on-disk mirror
//!
//! This module handles everything that is persisted during a crawl:
//! - Mapping URLs to paths inside the mirror directory
//! - The resource store that deduplicates downloads across workers
//! - Writing resources to disk without leaving partial files behind

mod local_path;
mod resource;
mod store;

pub use local_path::{local_path, INDEX_FILE};
pub use resource::{is_html_content_type, Resource};
pub use store::{clean_dir, ResourceStore, SaveOutcome};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing the mirror
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create mirror directory {}: {source}", .path.display())]
    CreateRoot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
