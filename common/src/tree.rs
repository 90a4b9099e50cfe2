//! Module mapping the job/suite/test hierarchy of a run onto local directories.

use crate::{Arn, Artifact};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Characters that are not allowed in a file name on any platform we run on.
const INVALID_FILE_NAME_CHARS: &[char] = &['"', '<', '>', '|', ':', '*', '?', '\\', '/'];

/// Turn a resource name into something usable as a single path segment.
///
/// Invalid characters split the name, empty pieces are dropped and the rest is
/// joined with `_`. Trailing periods are stripped.
pub fn sanitize_file_name(name: &str) -> String {
    name.split(|c: char| c.is_ascii_control() && c != '\u{7f}' || INVALID_FILE_NAME_CHARS.contains(&c))
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .trim_end_matches('.')
        .to_string()
}

/// Identifies a single test of a run: `jobId/suiteId/testId`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestKey(String);

impl TestKey {
    /// Build the key from the ARNs of a job, one of its suites and one of its tests.
    pub fn new(job: &Arn, suite: &Arn, test: &Arn) -> Self {
        Self(format!("{}/{}/{}", job.id(), suite.id(), test.id()))
    }

    /// Recover the key of the test owning an artifact.
    ///
    /// Artifact ARNs look like
    /// `arn:aws:devicefarm:<region>:<account>:artifact:<project>/<run>/<job>/<suite>/<test>/<artifact>`,
    /// the job, suite and test ids are segments 2, 3 and 4. Returns `None` when
    /// the ARN has fewer segments.
    pub fn from_artifact(arn: &Arn) -> Option<Self> {
        let p: Vec<&str> = arn.segments().collect();
        if p.len() < 5 {
            return None;
        }
        Some(Self(format!("{}/{}/{}", p[2], p[3], p[4])))
    }
}

impl std::fmt::Display for TestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Directories of every test of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMapping {
    paths: HashMap<TestKey, PathBuf>,
}

impl PathMapping {
    /// Constructor
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory for the test `key`, replacing any previous one.
    pub fn insert(&mut self, key: TestKey, dir: PathBuf) {
        self.paths.insert(key, dir);
    }

    /// Directory of the test identified by `key`.
    pub fn get(&self, key: &TestKey) -> Option<&Path> {
        self.paths.get(key).map(PathBuf::as_path)
    }

    /// Directory of the test owning `artifact`.
    pub fn dir_for(&self, artifact: &Artifact) -> Option<&Path> {
        TestKey::from_artifact(&artifact.arn).and_then(|key| self.get(&key))
    }

    /// Number of tests.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True if no test was found.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterate over all tests and their directories.
    pub fn iter(&self) -> impl Iterator<Item = (&TestKey, &Path)> {
        self.paths.iter().map(|(k, v)| (k, v.as_path()))
    }
}

/// Path of the file an artifact is saved to inside its test directory.
///
/// Name and extension are both sanitized, the result is always a single path
/// segment.
pub fn artifact_file_name(artifact: &Artifact) -> String {
    let name = sanitize_file_name(&artifact.name);
    match sanitize_file_name(&artifact.extension) {
        extension if extension.is_empty() => name,
        extension => format!("{}.{}", name, extension),
    }
}
