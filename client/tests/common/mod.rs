#![allow(dead_code)]

use async_trait::async_trait;
use devicefarm_runner::farm::{DeviceFarm, ScheduleRun};
use devicefarm_runner::report::Reporter;
use devicefarm_runner::{
    Arn, Artifact, ArtifactCategory, DevicePool, ExecutionResult, ExecutionStatus, FarmError,
    Resource, Result, Run, Upload, UploadStatus, UploadType,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const PROJECT: &str = "arn:aws:devicefarm:us-west-2:111:project:P";
pub const RUN: &str = "arn:aws:devicefarm:us-west-2:111:run:P/R";

/// In-memory Device Farm.
///
/// Status scripts are consumed front to back, the last entry repeats.
#[derive(Default)]
pub struct FakeFarm {
    /// Base URL uploads and artifacts point to.
    pub base_url: String,
    pub pools: Vec<DevicePool>,
    pub uploads: Vec<Upload>,
    pub runs: Vec<Run>,
    pub upload_statuses: Mutex<HashMap<String, VecDeque<UploadStatus>>>,
    pub run_states: Mutex<VecDeque<(ExecutionStatus, ExecutionResult)>>,
    pub jobs: Vec<Resource>,
    pub suites: HashMap<Arn, Vec<Resource>>,
    pub tests: HashMap<Arn, Vec<Resource>>,
    pub artifacts: HashMap<ArtifactCategory, Vec<Artifact>>,

    pub created_uploads: Mutex<Vec<(String, UploadType)>>,
    pub scheduled: Mutex<Vec<ScheduleRun>>,
    pub deleted: Mutex<Vec<Arn>>,
    pub run_queries: Mutex<u32>,
    pub artifact_listings: Mutex<Vec<ArtifactCategory>>,
}

/// Everything the reporters handed out by [`Output::reporter`] wrote.
#[derive(Clone, Default)]
pub struct Output(Arc<Mutex<Vec<u8>>>);

impl Output {
    pub fn reporter(&self, ci_markers: bool) -> Reporter {
        Reporter::with_sink(ci_markers, self.0.clone())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(String::from).collect()
    }
}

pub fn resource(arn: &str, name: &str) -> Resource {
    Resource {
        arn: arn.into(),
        name: name.into(),
    }
}

pub fn pool(id: &str, name: &str) -> DevicePool {
    DevicePool {
        arn: format!("arn:aws:devicefarm:us-west-2:111:devicepool:P/{}", id).as_str().into(),
        name: name.into(),
        description: Some(format!("{} devices", name)),
    }
}

pub fn run(id: &str, status: ExecutionStatus) -> Run {
    Run {
        arn: format!("arn:aws:devicefarm:us-west-2:111:run:P/{}", id).as_str().into(),
        name: id.into(),
        status,
        result: ExecutionResult::Pending,
        created: None,
    }
}

impl FakeFarm {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// One job with two suites, three tests in total.
    pub fn with_run_tree(mut self) -> Self {
        let job = resource(
            "arn:aws:devicefarm:us-west-2:111:job:P/R/J1",
            "Nexus 5: Android 6.0",
        );
        let setup = resource(
            "arn:aws:devicefarm:us-west-2:111:suite:P/R/J1/S1",
            "Setup Suite",
        );
        let login = resource(
            "arn:aws:devicefarm:us-west-2:111:suite:P/R/J1/S2",
            "features/login.feature",
        );

        self.suites.insert(job.arn.clone(), vec![setup.clone(), login.clone()]);
        self.tests.insert(
            setup.arn.clone(),
            vec![resource("arn:aws:devicefarm:us-west-2:111:test:P/R/J1/S1/T1", "Setup Test")],
        );
        self.tests.insert(
            login.arn.clone(),
            vec![
                resource("arn:aws:devicefarm:us-west-2:111:test:P/R/J1/S2/T2", "Log in"),
                resource("arn:aws:devicefarm:us-west-2:111:test:P/R/J1/S2/T3", "Log out..."),
            ],
        );
        self.jobs.push(job);
        self
    }

    /// `test` is the `job/suite/test` id path of the owning test.
    pub fn with_artifact(
        mut self,
        category: ArtifactCategory,
        test: &str,
        id: &str,
        name: &str,
        extension: &str,
    ) -> Self {
        let artifact = Artifact {
            arn: format!("arn:aws:devicefarm:us-west-2:111:artifact:P/R/{}/{}", test, id)
                .as_str()
                .into(),
            name: name.into(),
            extension: extension.into(),
            url: Some(format!("{}/artifacts/{}", self.base_url, id)),
            category,
        };
        self.artifacts.entry(category).or_default().push(artifact);
        self
    }

    pub fn with_upload_statuses(self, name: &str, statuses: &[UploadStatus]) -> Self {
        self.upload_statuses
            .lock()
            .unwrap()
            .insert(name.into(), statuses.iter().cloned().collect());
        self
    }

    pub fn with_run_states(self, states: &[(ExecutionStatus, ExecutionResult)]) -> Self {
        *self.run_states.lock().unwrap() = states.iter().cloned().collect();
        self
    }
}

fn next<T: Clone>(script: &mut VecDeque<T>) -> Option<T> {
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    }
}

fn upload_name(arn: &Arn) -> String {
    arn.id().to_string()
}

#[async_trait]
impl DeviceFarm for FakeFarm {
    async fn list_device_pools(&self, _project: &Arn) -> Result<Vec<DevicePool>> {
        Ok(self.pools.clone())
    }

    async fn list_uploads(&self, _project: &Arn) -> Result<Vec<Upload>> {
        Ok(self.uploads.clone())
    }

    async fn create_upload(&self, _project: &Arn, name: &str, kind: UploadType) -> Result<Upload> {
        self.created_uploads
            .lock()
            .unwrap()
            .push((name.into(), kind.clone()));
        Ok(Upload {
            arn: format!("arn:aws:devicefarm:us-west-2:111:upload:P/{}", name)
                .as_str()
                .into(),
            name: name.into(),
            kind,
            status: UploadStatus::Initialized,
            url: Some(format!("{}/uploads/{}", self.base_url, name)),
            created: None,
        })
    }

    async fn get_upload(&self, upload: &Arn) -> Result<Upload> {
        let name = upload_name(upload);
        let status = self
            .upload_statuses
            .lock()
            .unwrap()
            .get_mut(&name)
            .and_then(next)
            .unwrap_or(UploadStatus::Succeeded);
        Ok(Upload {
            arn: upload.clone(),
            name,
            kind: UploadType::Unknown(String::new()),
            status,
            url: None,
            created: None,
        })
    }

    async fn list_runs(&self, _project: &Arn) -> Result<Vec<Run>> {
        Ok(self.runs.clone())
    }

    async fn delete_run(&self, run: &Arn) -> Result<()> {
        self.deleted.lock().unwrap().push(run.clone());
        Ok(())
    }

    async fn schedule_run(&self, request: &ScheduleRun) -> Result<Run> {
        self.scheduled.lock().unwrap().push(request.clone());
        Ok(Run {
            arn: RUN.into(),
            name: request.name.clone(),
            status: ExecutionStatus::Scheduling,
            result: ExecutionResult::Pending,
            created: None,
        })
    }

    async fn get_run(&self, run: &Arn) -> Result<Run> {
        *self.run_queries.lock().unwrap() += 1;
        let (status, result) = next(&mut *self.run_states.lock().unwrap())
            .ok_or_else(|| FarmError::InvalidResponse("no run state scripted".into()))?;
        Ok(Run {
            arn: run.clone(),
            name: "run".into(),
            status,
            result,
            created: None,
        })
    }

    async fn list_jobs(&self, _run: &Arn) -> Result<Vec<Resource>> {
        Ok(self.jobs.clone())
    }

    async fn list_suites(&self, job: &Arn) -> Result<Vec<Resource>> {
        Ok(self.suites.get(job).cloned().unwrap_or_default())
    }

    async fn list_tests(&self, suite: &Arn) -> Result<Vec<Resource>> {
        Ok(self.tests.get(suite).cloned().unwrap_or_default())
    }

    async fn list_artifacts(
        &self,
        _run: &Arn,
        category: ArtifactCategory,
    ) -> Result<Vec<Artifact>> {
        self.artifact_listings.lock().unwrap().push(category);
        Ok(self.artifacts.get(&category).cloned().unwrap_or_default())
    }
}
