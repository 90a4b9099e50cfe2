#![warn(missing_docs)]

//! Here the data model of the `devicefarm-runner` is available: the Device Farm
//! resources the runner reads and the helpers used to rebuild the artifact tree.

pub mod tree;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use std::str::FromStr;

/// Amazon Resource Name wrapper.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Arn(pub String);

impl Arn {
    /// The resource identifier, i.e. the last `/` separated segment of the ARN.
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// All `/` separated segments of the ARN.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Raw ARN string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Arn {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Arn {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

/// Defines a status enum that parses from its wire spelling and keeps
/// values it does not know about.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $wire:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// A value this version of the runner does not know about.
            Unknown(String),
        }

        impl $name {
            /// Wire spelling of the value.
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Unknown(v) => v,
                }
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(param: &str) -> Result<Self, Self::Err> {
                let v: &str = &param.to_ascii_uppercase();
                Ok(match v {
                    $($wire => Self::$variant,)+
                    _ => Self::Unknown(param.into()),
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Processing state of an upload.
    UploadStatus {
        /// Created, waiting for the file.
        Initialized => "INITIALIZED",
        /// The file is being validated.
        Processing => "PROCESSING",
        /// Validated and ready to use.
        Succeeded => "SUCCEEDED",
        /// Rejected by Device Farm.
        Failed => "FAILED",
    }
}

impl UploadStatus {
    /// No transition happens after these.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Succeeded | UploadStatus::Failed)
    }
}

wire_enum! {
    /// What an upload contains.
    UploadType {
        /// Android application package.
        AndroidApp => "ANDROID_APP",
        /// iOS application archive.
        IosApp => "IOS_APP",
        /// Zipped Calabash features directory.
        CalabashTestPackage => "CALABASH_TEST_PACKAGE",
    }
}

wire_enum! {
    /// Progress of a scheduled run.
    ExecutionStatus {
        #[allow(missing_docs)]
        Pending => "PENDING",
        #[allow(missing_docs)]
        PendingConcurrency => "PENDING_CONCURRENCY",
        #[allow(missing_docs)]
        PendingDevice => "PENDING_DEVICE",
        #[allow(missing_docs)]
        Processing => "PROCESSING",
        #[allow(missing_docs)]
        Scheduling => "SCHEDULING",
        #[allow(missing_docs)]
        Preparing => "PREPARING",
        #[allow(missing_docs)]
        Running => "RUNNING",
        /// Finished, the result is available.
        Completed => "COMPLETED",
        #[allow(missing_docs)]
        Stopping => "STOPPING",
    }
}

impl ExecutionStatus {
    /// No transition happens after this.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed)
    }
}

wire_enum! {
    /// Outcome of a run.
    ExecutionResult {
        #[allow(missing_docs)]
        Pending => "PENDING",
        #[allow(missing_docs)]
        Passed => "PASSED",
        #[allow(missing_docs)]
        Warned => "WARNED",
        #[allow(missing_docs)]
        Failed => "FAILED",
        #[allow(missing_docs)]
        Skipped => "SKIPPED",
        #[allow(missing_docs)]
        Errored => "ERRORED",
        #[allow(missing_docs)]
        Stopped => "STOPPED",
    }
}

/// The kinds of artifacts a run produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactCategory {
    /// Screenshots taken by the tests.
    Screenshot,
    /// Any other file, e.g. videos or reports.
    File,
    /// Device and test logs.
    Log,
}

impl ArtifactCategory {
    /// All categories, in download order.
    pub const ALL: [ArtifactCategory; 3] = [
        ArtifactCategory::Screenshot,
        ArtifactCategory::File,
        ArtifactCategory::Log,
    ];

    /// Wire spelling of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactCategory::Screenshot => "SCREENSHOT",
            ArtifactCategory::File => "FILE",
            ArtifactCategory::Log => "LOG",
        }
    }
}

impl FromStr for ArtifactCategory {
    type Err = anyhow::Error;

    fn from_str(param: &str) -> Result<Self, Self::Err> {
        let v: &str = &param.to_ascii_uppercase();
        Ok(match v {
            "SCREENSHOT" => ArtifactCategory::Screenshot,
            "FILE" => ArtifactCategory::File,
            "LOG" => ArtifactCategory::Log,
            _ => return Err(anyhow!("Unable to parse '{}' to ArtifactCategory", param)),
        })
    }
}

impl std::fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named group of devices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DevicePool {
    #[allow(missing_docs)]
    pub arn: Arn,
    #[allow(missing_docs)]
    pub name: String,
    #[allow(missing_docs)]
    pub description: Option<String>,
}

/// An uploaded file (application or test package).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upload {
    #[allow(missing_docs)]
    pub arn: Arn,
    #[allow(missing_docs)]
    pub name: String,
    /// Content type of the upload.
    pub kind: UploadType,
    #[allow(missing_docs)]
    pub status: UploadStatus,
    /// Pre-signed URL the file has to be `PUT` to.
    ///
    /// Only present while the upload is waiting for its file.
    pub url: Option<String>,
    #[allow(missing_docs)]
    pub created: Option<DateTime<Utc>>,
}

/// A test run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Run {
    #[allow(missing_docs)]
    pub arn: Arn,
    #[allow(missing_docs)]
    pub name: String,
    #[allow(missing_docs)]
    pub status: ExecutionStatus,
    /// Only meaningful once `status` is [`ExecutionStatus::Completed`].
    pub result: ExecutionResult,
    #[allow(missing_docs)]
    pub created: Option<DateTime<Utc>>,
}

/// A job, suite or test of a run.
///
/// Only the ARN and the name are used to rebuild the artifact tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    #[allow(missing_docs)]
    pub arn: Arn,
    #[allow(missing_docs)]
    pub name: String,
}

/// A file produced by a test of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// Encodes the owning job, suite and test, see [`tree::TestKey::from_artifact`].
    pub arn: Arn,
    #[allow(missing_docs)]
    pub name: String,
    /// File extension, without the leading period.
    pub extension: String,
    /// Pre-signed download URL.
    pub url: Option<String>,
    #[allow(missing_docs)]
    pub category: ArtifactCategory,
}
