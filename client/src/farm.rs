//! The Device Farm API as seen by the runner, and its AWS SDK implementation.

use crate::{FarmError, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_devicefarm::config::Region;
use aws_sdk_devicefarm::error::DisplayErrorContext;
use aws_sdk_devicefarm::types as aws;
use devicefarm_runner_common::{
    Arn, Artifact, ArtifactCategory, DevicePool, Resource, Run, Upload, UploadType,
};
use log::*;

/// Locale every run is configured with.
pub const RUN_LOCALE: &str = "en_US";

/// Everything needed to schedule a run, see [`crate::builder::ScheduleRunBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRun {
    #[allow(missing_docs)]
    pub project: Arn,
    #[allow(missing_docs)]
    pub app: Arn,
    #[allow(missing_docs)]
    pub device_pool: Arn,
    #[allow(missing_docs)]
    pub test_package: Arn,
    #[allow(missing_docs)]
    pub name: String,
    /// Device locale, e.g. `en_US`.
    pub locale: String,
    #[allow(missing_docs)]
    pub wifi: bool,
}

/// Operations the runner needs from Device Farm.
///
/// List operations return every item of every page.
#[async_trait]
pub trait DeviceFarm: Send + Sync {
    /// Device pools of a project.
    async fn list_device_pools(&self, project: &Arn) -> Result<Vec<DevicePool>>;

    /// Uploads of a project.
    async fn list_uploads(&self, project: &Arn) -> Result<Vec<Upload>>;

    /// Create an upload; the returned upload carries the URL to `PUT` the file to.
    async fn create_upload(&self, project: &Arn, name: &str, kind: UploadType) -> Result<Upload>;

    #[allow(missing_docs)]
    async fn get_upload(&self, upload: &Arn) -> Result<Upload>;

    /// Runs of a project.
    async fn list_runs(&self, project: &Arn) -> Result<Vec<Run>>;

    #[allow(missing_docs)]
    async fn delete_run(&self, run: &Arn) -> Result<()>;

    #[allow(missing_docs)]
    async fn schedule_run(&self, request: &ScheduleRun) -> Result<Run>;

    #[allow(missing_docs)]
    async fn get_run(&self, run: &Arn) -> Result<Run>;

    /// Jobs of a run, one per device.
    async fn list_jobs(&self, run: &Arn) -> Result<Vec<Resource>>;

    /// Suites of a job.
    async fn list_suites(&self, job: &Arn) -> Result<Vec<Resource>>;

    /// Tests of a suite.
    async fn list_tests(&self, suite: &Arn) -> Result<Vec<Resource>>;

    /// Artifacts of a given category produced by a run.
    async fn list_artifacts(&self, run: &Arn, category: ArtifactCategory)
        -> Result<Vec<Artifact>>;
}

/// Where and how to reach Device Farm.
#[derive(Debug, Clone)]
pub struct FarmSettings {
    /// AWS region, Device Farm only lives in `us-west-2`.
    pub region: String,
    /// Endpoint override, e.g. a local mock.
    pub endpoint_url: Option<String>,
}

/// [`DeviceFarm`] backed by the AWS SDK.
///
/// Credentials come from the default AWS provider chain.
#[derive(Clone, Debug)]
pub struct AwsDeviceFarm {
    client: aws_sdk_devicefarm::Client,
}

impl AwsDeviceFarm {
    /// Create a new client from the settings.
    pub async fn new(settings: &FarmSettings) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_devicefarm::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        info!("Device Farm client for region {}", settings.region);

        Self {
            client: aws_sdk_devicefarm::Client::from_conf(builder.build()),
        }
    }
}

fn remote<E: std::error::Error>(e: E) -> FarmError {
    FarmError::Remote(DisplayErrorContext(e).to_string())
}

fn missing(what: &str) -> FarmError {
    FarmError::InvalidResponse(format!("{} missing from response", what))
}

fn arn_of(arn: Option<&str>, what: &str) -> Result<Arn> {
    arn.map(Arn::from).ok_or_else(|| missing(what))
}

fn timestamp(
    t: Option<&aws_sdk_devicefarm::primitives::DateTime>,
) -> Option<chrono::DateTime<chrono::Utc>> {
    t.and_then(|t| chrono::DateTime::<chrono::Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
}

fn convert_pool(p: &aws::DevicePool) -> Result<DevicePool> {
    Ok(DevicePool {
        arn: arn_of(p.arn(), "device pool ARN")?,
        name: p.name().unwrap_or_default().into(),
        description: p.description().map(Into::into),
    })
}

fn convert_upload(u: &aws::Upload) -> Result<Upload> {
    Ok(Upload {
        arn: arn_of(u.arn(), "upload ARN")?,
        name: u.name().unwrap_or_default().into(),
        kind: parse_wire(u.r#type().map(|t| t.as_str())),
        status: parse_wire(u.status().map(|s| s.as_str())),
        url: u.url().map(Into::into),
        created: timestamp(u.created()),
    })
}

fn convert_run(r: &aws::Run) -> Result<Run> {
    Ok(Run {
        arn: arn_of(r.arn(), "run ARN")?,
        name: r.name().unwrap_or_default().into(),
        status: parse_wire(r.status().map(|s| s.as_str())),
        result: parse_wire(r.result().map(|s| s.as_str())),
        created: timestamp(r.created()),
    })
}

fn convert_artifact(a: &aws::Artifact, category: ArtifactCategory) -> Result<Artifact> {
    Ok(Artifact {
        arn: arn_of(a.arn(), "artifact ARN")?,
        name: a.name().unwrap_or_default().into(),
        extension: a.extension().unwrap_or_default().into(),
        url: a.url().map(Into::into),
        category,
    })
}

fn resource(arn: Option<&str>, name: Option<&str>, what: &str) -> Result<Resource> {
    Ok(Resource {
        arn: arn_of(arn, what)?,
        name: name.unwrap_or_default().into(),
    })
}

/// Wire values missing from a response parse as the empty unknown value.
fn parse_wire<T: std::str::FromStr<Err = std::convert::Infallible>>(v: Option<&str>) -> T {
    match v.unwrap_or_default().parse() {
        Ok(v) => v,
        Err(never) => match never {},
    }
}

fn aws_upload_type(kind: &UploadType) -> aws::UploadType {
    aws::UploadType::from(kind.as_str())
}

/// Device Farm retired Calabash, newer SDKs only know it by its wire spelling.
fn aws_test_type() -> aws::TestType {
    aws::TestType::from("CALABASH")
}

fn aws_artifact_category(category: ArtifactCategory) -> aws::ArtifactCategory {
    aws::ArtifactCategory::from(category.as_str())
}

#[async_trait]
impl DeviceFarm for AwsDeviceFarm {
    async fn list_device_pools(&self, project: &Arn) -> Result<Vec<DevicePool>> {
        debug!("Listing device pools of {}", project);
        let pools = self
            .client
            .list_device_pools()
            .arn(project.as_str())
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(remote)?;
        pools.iter().map(convert_pool).collect()
    }

    async fn list_uploads(&self, project: &Arn) -> Result<Vec<Upload>> {
        debug!("Listing uploads of {}", project);
        let uploads = self
            .client
            .list_uploads()
            .arn(project.as_str())
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(remote)?;
        uploads.iter().map(convert_upload).collect()
    }

    async fn create_upload(&self, project: &Arn, name: &str, kind: UploadType) -> Result<Upload> {
        debug!("Creating {} upload '{}'", kind, name);
        let output = self
            .client
            .create_upload()
            .project_arn(project.as_str())
            .name(name)
            .r#type(aws_upload_type(&kind))
            .send()
            .await
            .map_err(remote)?;
        convert_upload(output.upload().ok_or_else(|| missing("upload"))?)
    }

    async fn get_upload(&self, upload: &Arn) -> Result<Upload> {
        let output = self
            .client
            .get_upload()
            .arn(upload.as_str())
            .send()
            .await
            .map_err(remote)?;
        convert_upload(output.upload().ok_or_else(|| missing("upload"))?)
    }

    async fn list_runs(&self, project: &Arn) -> Result<Vec<Run>> {
        debug!("Listing runs of {}", project);
        let runs = self
            .client
            .list_runs()
            .arn(project.as_str())
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(remote)?;
        runs.iter().map(convert_run).collect()
    }

    async fn delete_run(&self, run: &Arn) -> Result<()> {
        debug!("Deleting run {}", run);
        self.client
            .delete_run()
            .arn(run.as_str())
            .send()
            .await
            .map_err(remote)?;
        Ok(())
    }

    async fn schedule_run(&self, request: &ScheduleRun) -> Result<Run> {
        debug!("Scheduling run {:?}", request);
        let test = aws::ScheduleRunTest::builder()
            .r#type(aws_test_type())
            .test_package_arn(request.test_package.as_str())
            .build()
            .map_err(remote)?;
        let configuration = aws::ScheduleRunConfiguration::builder()
            .radios(aws::Radios::builder().wifi(request.wifi).build())
            .locale(request.locale.as_str())
            .build();

        let output = self
            .client
            .schedule_run()
            .project_arn(request.project.as_str())
            .app_arn(request.app.as_str())
            .device_pool_arn(request.device_pool.as_str())
            .name(request.name.as_str())
            .test(test)
            .configuration(configuration)
            .send()
            .await
            .map_err(remote)?;
        convert_run(output.run().ok_or_else(|| missing("run"))?)
    }

    async fn get_run(&self, run: &Arn) -> Result<Run> {
        let output = self
            .client
            .get_run()
            .arn(run.as_str())
            .send()
            .await
            .map_err(remote)?;
        convert_run(output.run().ok_or_else(|| missing("run"))?)
    }

    async fn list_jobs(&self, run: &Arn) -> Result<Vec<Resource>> {
        let jobs = self
            .client
            .list_jobs()
            .arn(run.as_str())
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(remote)?;
        jobs
            .iter()
            .map(|item| resource(item.arn(), item.name(), "job ARN"))
            .collect()
    }

    async fn list_suites(&self, job: &Arn) -> Result<Vec<Resource>> {
        let suites = self
            .client
            .list_suites()
            .arn(job.as_str())
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(remote)?;
        suites
            .iter()
            .map(|item| resource(item.arn(), item.name(), "suite ARN"))
            .collect()
    }

    async fn list_tests(&self, suite: &Arn) -> Result<Vec<Resource>> {
        let tests = self
            .client
            .list_tests()
            .arn(suite.as_str())
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(remote)?;
        tests
            .iter()
            .map(|item| resource(item.arn(), item.name(), "test ARN"))
            .collect()
    }

    async fn list_artifacts(
        &self,
        run: &Arn,
        category: ArtifactCategory,
    ) -> Result<Vec<Artifact>> {
        debug!("Listing {} artifacts of {}", category, run);
        let artifacts = self
            .client
            .list_artifacts()
            .arn(run.as_str())
            .r#type(aws_artifact_category(category))
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(remote)?;
        artifacts
            .iter()
            .map(|item| convert_artifact(item, category))
            .collect()
    }
}
