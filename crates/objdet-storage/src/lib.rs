//! Result store for detection outcomes.
//!
//! This crate provides:
//! - Per-artifact atomic writes (temp file + rename) of annotated images and records
//! - Listing of stored artifacts, most recent key first
//! - Point lookup of records and images by result key

pub mod artifact;
pub mod error;
pub mod store;

pub use artifact::{classify_artifact, image_filename, record_filename, ArtifactKind};
pub use error::{StorageError, StorageResult};
pub use store::{ResultStore, StoredArtifact, StoredPaths};
