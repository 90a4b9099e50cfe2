#![warn(missing_docs)]

//! Here you can find the building blocks of the `devicefarm-runner`: the Device Farm
//! adapter, the status poller, the transfers and the artifact tree reconstruction.

pub use devicefarm_runner_common::*;
pub use reqwest::Url;

pub mod artifacts;
pub mod builder;
pub mod farm;
pub mod orchestrator;
pub mod package;
pub mod poll;
pub mod report;
pub mod transfer;

use std::path::PathBuf;

/// Error definitions for the runner.
///
/// Every error ends the current invocation, [`FarmError::exit_code`] tells `main`
/// how to exit.
#[derive(thiserror::Error, Debug)]
pub enum FarmError {
    /// No device pool with the requested name exists in the project.
    #[error("DevicePool '{0}' not found")]
    DevicePoolNotFound(String),
    /// The features directory does not exist.
    #[error("Directory '{}' not found", .0.display())]
    FeaturesDirNotFound(PathBuf),
    /// Reusing the last package was requested but there is none.
    #[error("Package not found or failed to upload")]
    NoAppUpload,
    /// Device Farm rejected an upload.
    #[error("Failed to upload {0}")]
    UploadFailed(String),
    /// The run completed without passing.
    #[error("Test run failed")]
    RunFailed(ExecutionResult),
    /// An artifact belongs to a test that is not part of the path mapping.
    #[error("No directory found for test '{0}'")]
    MissingTestPath(String),
    /// Device Farm returned something unusable.
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    /// The run request is incomplete.
    #[error(transparent)]
    Schedule(#[from] builder::Error),
    /// Polling gave up.
    #[error(transparent)]
    Poll(#[from] poll::PollError),
    /// A Device Farm API call failed.
    #[error("Device Farm request failed: {0}")]
    Remote(String),
    /// A transfer to or from a pre-signed URL failed.
    #[error("A request failed")]
    Request(#[from] reqwest::Error),
    /// Local file system error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The test package could not be written.
    #[error("Unable to create the test package")]
    Zip(#[from] zip::result::ZipError),
    /// Generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FarmError {
    /// Process exit code for this error.
    ///
    /// * `2`: configuration (device pool, features directory, missing package)
    /// * `3`: remote failure (rejected upload, failed run, polling gave up)
    /// * `1`: anything else
    pub fn exit_code(&self) -> i32 {
        match self {
            FarmError::DevicePoolNotFound(_)
            | FarmError::FeaturesDirNotFound(_)
            | FarmError::NoAppUpload => 2,
            FarmError::UploadFailed(_) | FarmError::RunFailed(_) | FarmError::Poll(_) => 3,
            _ => 1,
        }
    }
}

/// Result alias used throughout the runner.
pub type Result<T> = core::result::Result<T, FarmError>;

/// Unrolls errors.
pub fn unroll_error(e: &dyn std::error::Error) -> String {
    let mut s = String::new();
    let mut level = 0;

    s.push_str(&format!("{}", e));

    let mut source = e.source();

    if source.is_some() {
        s.push_str("\n\nCaused by:");
    }

    while let Some(e) = source {
        s.push_str(&format!("\n    {}: {}", level, e));
        source = e.source();
        level += 1;
    }

    s
}
