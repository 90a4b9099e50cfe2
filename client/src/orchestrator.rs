//! Sequencing of a whole invocation: listing pools, cleaning runs, or uploading,
//! running and collecting a test run.

use crate::artifacts;
use crate::builder::ScheduleRunBuilder;
use crate::farm::DeviceFarm;
use crate::package;
use crate::poll::{poll_until, PollPolicy};
use crate::report::Reporter;
use crate::transfer;
use crate::{FarmError, Result};
use devicefarm_runner_common::{
    Arn, ExecutionResult, ExecutionStatus, Run, Upload, UploadStatus, UploadType,
};
use log::*;
use std::path::{Path, PathBuf};

/// Upload name of the application package.
pub const APP_UPLOAD_NAME: &str = "android.apk";

/// Where the application under test comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppSource {
    /// The most recently created Android app upload of the project.
    ReuseLatest,
    /// Upload this package.
    Upload(PathBuf),
}

/// Options of a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Exact name of the device pool.
    pub device_pool: String,
    /// Calabash features, `<working dir>/features` when `None`.
    pub features_dir: Option<PathBuf>,
    #[allow(missing_docs)]
    pub app: AppSource,
    /// Name of the run, defaults to the current time.
    pub run_name: Option<String>,
    /// Where to save the artifacts, nothing is downloaded when `None`.
    pub artifacts_dir: Option<PathBuf>,
}

/// What an invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Print the device pools of the project.
    ListDevicePools,
    /// Delete every completed run of the project.
    DeleteCompletedRuns,
    /// Upload, run and collect.
    Run(RunOptions),
}

/// Holds everything an invocation works with.
///
/// Set once at construction, never mutated afterwards.
pub struct Orchestrator<'a> {
    farm: &'a dyn DeviceFarm,
    http: reqwest::Client,
    project: Arn,
    reporter: Reporter,
    working_dir: PathBuf,
    upload_poll: PollPolicy,
    run_poll: PollPolicy,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator working on `project` with the default poll policies.
    pub fn new(
        farm: &'a dyn DeviceFarm,
        http: reqwest::Client,
        project: Arn,
        reporter: Reporter,
        working_dir: PathBuf,
    ) -> Self {
        Self {
            farm,
            http,
            project,
            reporter,
            working_dir,
            upload_poll: PollPolicy::uploads(),
            run_poll: PollPolicy::runs(),
        }
    }

    /// Replace the poll policies, used to run without delays.
    pub fn with_poll_policies(mut self, upload_poll: PollPolicy, run_poll: PollPolicy) -> Self {
        self.upload_poll = upload_poll;
        self.run_poll = run_poll;
        self
    }

    /// Run the invocation to completion.
    ///
    /// An error ending the invocation is reported before it is returned.
    pub async fn execute(&self, mode: &Mode) -> Result<()> {
        let result = match mode {
            Mode::ListDevicePools => self.list_device_pools().await,
            Mode::DeleteCompletedRuns => self.delete_completed_runs().await.map(|_| ()),
            Mode::Run(options) => self.run(options).await.map(|_| ()),
        };
        if let Err(e) = &result {
            self.reporter.fatal(e);
        }
        result
    }

    /// Print every device pool with its description.
    pub async fn list_device_pools(&self) -> Result<()> {
        for pool in self.farm.list_device_pools(&self.project).await? {
            self.reporter.line(&format!(
                "- '{}'\n\t{}\n",
                pool.name,
                pool.description.unwrap_or_default()
            ));
        }
        Ok(())
    }

    /// Delete every completed run, returns how many were deleted.
    pub async fn delete_completed_runs(&self) -> Result<usize> {
        let mut deleted = 0;
        for run in self.farm.list_runs(&self.project).await? {
            if run.status != ExecutionStatus::Completed {
                debug!("Keeping run '{}' ({})", run.name, run.status);
                continue;
            }
            self.farm.delete_run(&run.arn).await?;
            deleted += 1;
        }
        self.reporter
            .progress(&format!("Deleted {} completed runs", deleted));
        Ok(deleted)
    }

    /// Upload, schedule and wait for a run, then collect its artifacts.
    ///
    /// Returns the completed run. A run that did not pass is an error and its
    /// artifacts are not downloaded.
    pub async fn run(&self, options: &RunOptions) -> Result<Run> {
        let device_pool = self.find_device_pool(&options.device_pool).await?;

        let features_dir = options
            .features_dir
            .clone()
            .unwrap_or_else(|| self.working_dir.join("features"));
        if !features_dir.is_dir() {
            return Err(FarmError::FeaturesDirNotFound(features_dir));
        }

        let app = match &options.app {
            AppSource::ReuseLatest => self.latest_app().await?,
            AppSource::Upload(path) => {
                self.reporter.progress("Sending APK...");
                self.upload(path, APP_UPLOAD_NAME, UploadType::AndroidApp, "Sending APK")
                    .await?
            }
        };

        let test_package = self.package_features(&features_dir).await?;

        let request = ScheduleRunBuilder::new(self.project.clone())
            .app(app)
            .device_pool(device_pool)
            .test_package(test_package)
            .name(options.run_name.clone())
            .build()?;
        let scheduled = self.farm.schedule_run(&request).await?;
        info!("Scheduled run '{}' ({})", scheduled.name, scheduled.arn);

        self.reporter
            .progress("Waiting test to finish (it takes a long time, please be patient)");
        let run = self.wait_for_run(&scheduled.arn).await?;
        self.reporter.line("");

        if run.result != ExecutionResult::Passed {
            return Err(FarmError::RunFailed(run.result));
        }

        match &options.artifacts_dir {
            Some(root) => {
                artifacts::download_all(self.farm, &self.http, &run.arn, root, &self.reporter)
                    .await?
            }
            None => info!("No artifacts directory given, skipping the download"),
        }

        self.reporter.progress("Test run finished successfully");
        Ok(run)
    }

    /// ARN of the device pool called exactly `name`.
    pub async fn find_device_pool(&self, name: &str) -> Result<Arn> {
        self.farm
            .list_device_pools(&self.project)
            .await?
            .into_iter()
            .find(|pool| pool.name == name)
            .map(|pool| pool.arn)
            .ok_or_else(|| FarmError::DevicePoolNotFound(name.into()))
    }

    /// The most recently created Android app upload.
    pub async fn latest_app(&self) -> Result<Arn> {
        let latest = self
            .farm
            .list_uploads(&self.project)
            .await?
            .into_iter()
            .filter(|upload| upload.kind == UploadType::AndroidApp)
            .max_by_key(|upload| upload.created)
            .ok_or(FarmError::NoAppUpload)?;

        self.reporter.line(&format!(
            "Using app '{}', created at {}",
            latest.name,
            latest
                .created
                .map(|t| t.with_timezone(&chrono::Local).to_string())
                .unwrap_or_else(|| "an unknown time".into())
        ));

        Ok(latest.arn)
    }

    /// Zip the features directory and upload it as the test package.
    async fn package_features(&self, features_dir: &Path) -> Result<Arn> {
        package::remove_stale_test_servers(&self.working_dir)?;

        let archive = package::package_path(features_dir);
        let source = features_dir.to_path_buf();
        let target = archive.clone();
        tokio::task::spawn_blocking(move || package::zip_directory(&source, &target))
            .await
            .map_err(anyhow::Error::from)??;

        self.reporter
            .line(&format!("Sending {}", package::TEST_PACKAGE_NAME));
        self.upload(
            &archive,
            package::TEST_PACKAGE_NAME,
            UploadType::CalabashTestPackage,
            "Sending features",
        )
        .await
    }

    /// Create an upload, send `path` to it and wait until Device Farm validated it.
    async fn upload(&self, path: &Path, name: &str, kind: UploadType, label: &str) -> Result<Arn> {
        let upload = self.farm.create_upload(&self.project, name, kind).await?;
        let url = upload.url.as_deref().ok_or_else(|| {
            FarmError::InvalidResponse(format!("upload '{}' has no URL", upload.arn))
        })?;

        transfer::upload_file(&self.http, path, url, label, &self.reporter).await?;

        let done = self.wait_for_upload(&upload.arn).await?;
        if done.status != UploadStatus::Succeeded {
            return Err(FarmError::UploadFailed(name.into()));
        }
        Ok(done.arn)
    }

    async fn wait_for_upload(&self, arn: &Arn) -> Result<Upload> {
        poll_until(
            arn.as_str(),
            &self.upload_poll,
            || self.farm.get_upload(arn),
            |upload: &Upload| upload.status.is_terminal(),
            |_| {},
        )
        .await
    }

    async fn wait_for_run(&self, arn: &Arn) -> Result<Run> {
        poll_until(
            arn.as_str(),
            &self.run_poll,
            || self.farm.get_run(arn),
            |run: &Run| run.status.is_terminal(),
            |_| self.reporter.tick(),
        )
        .await
    }
}
