//! Retrieval of run artifacts into a `job/suite/test` directory tree.

use crate::farm::DeviceFarm;
use crate::report::Reporter;
use crate::transfer;
use crate::{FarmError, Result};
use devicefarm_runner_common::tree::{artifact_file_name, sanitize_file_name, PathMapping, TestKey};
use devicefarm_runner_common::{Arn, ArtifactCategory};
use log::*;
use std::path::Path;

/// Create `root/job/suite/test` for every test of the run and map each test
/// key to its directory.
///
/// Has to complete before any download starts, artifacts are only located
/// through this mapping.
pub async fn build_tree(farm: &dyn DeviceFarm, run: &Arn, root: &Path) -> Result<PathMapping> {
    let mut mapping = PathMapping::new();

    for job in farm.list_jobs(run).await? {
        let job_dir = root.join(sanitize_file_name(&job.name));

        for suite in farm.list_suites(&job.arn).await? {
            let suite_dir = job_dir.join(sanitize_file_name(&suite.name));

            for test in farm.list_tests(&suite.arn).await? {
                let test_dir = suite_dir.join(sanitize_file_name(&test.name));
                tokio::fs::create_dir_all(&test_dir).await?;

                let key = TestKey::new(&job.arn, &suite.arn, &test.arn);
                trace!("{} -> {}", key, test_dir.display());
                mapping.insert(key, test_dir);
            }
        }
    }

    debug!("Artifact tree for {} has {} tests", run, mapping.len());
    Ok(mapping)
}

/// Download every artifact of `category` into the directory of its test.
///
/// Returns the number of downloaded artifacts.
pub async fn download_artifacts(
    farm: &dyn DeviceFarm,
    http: &reqwest::Client,
    run: &Arn,
    category: ArtifactCategory,
    mapping: &PathMapping,
    reporter: &Reporter,
) -> Result<usize> {
    let artifacts = farm.list_artifacts(run, category).await?;
    let total = artifacts.len();

    for (i, artifact) in artifacts.iter().enumerate() {
        reporter.progress(&format!(
            "Downloading artifact {} {}/{}",
            category,
            i + 1,
            total
        ));

        let dir = mapping
            .dir_for(artifact)
            .ok_or_else(|| FarmError::MissingTestPath(artifact.arn.to_string()))?;
        let url = artifact.url.as_deref().ok_or_else(|| {
            FarmError::InvalidResponse(format!("artifact '{}' has no URL", artifact.arn))
        })?;

        let file = dir.join(artifact_file_name(artifact));
        transfer::download_file(http, url, &file).await?;
        debug!("Saved {}", file.display());
    }

    Ok(total)
}

/// Rebuild the tree of the run under `root` and download all categories into it.
pub async fn download_all(
    farm: &dyn DeviceFarm,
    http: &reqwest::Client,
    run: &Arn,
    root: &Path,
    reporter: &Reporter,
) -> Result<()> {
    let mapping = build_tree(farm, run, root).await?;

    for category in ArtifactCategory::ALL {
        let count = download_artifacts(farm, http, run, category, &mapping, reporter).await?;
        info!("Downloaded {} {} artifacts", count, category);
    }

    Ok(())
}
