//! Client for the detection service.
//!
//! The gateway uses this crate to forward uploads and poll health. Every
//! call carries an explicit timeout and is never retried.

pub mod client;
pub mod error;
pub mod types;

pub use client::{DetectionClient, DetectionClientConfig};
pub use error::{ClientError, ClientResult};
pub use types::ImageUpload;
