//! Module containing the [`ScheduleRun`] builder

use crate::farm::{ScheduleRun, RUN_LOCALE};
use devicefarm_runner_common::Arn;

/// Possible errors produced by the [`ScheduleRunBuilder`]
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// No application was specified for a run
    #[error("No application was specified for a run")]
    NoApp,
    /// No device pool was specified for a run
    #[error("No device pool was specified for a run")]
    NoDevicePool,
    /// No test package was specified for a run
    #[error("No test package was specified for a run")]
    NoTestPackage,
}

type Result<T> = core::result::Result<T, Error>;

/// Builder of the [`ScheduleRun`] request
///
/// Defaults to Wi-Fi enabled, the `en_US` locale and a name made of the local
/// time of the build.
pub struct ScheduleRunBuilder {
    project: Arn,
    app: Option<Arn>,
    device_pool: Option<Arn>,
    test_package: Option<Arn>,
    name: Option<String>,
    locale: String,
    wifi: bool,
}

impl ScheduleRunBuilder {
    /// Constructor
    pub fn new(project: Arn) -> Self {
        Self {
            project,
            app: None,
            device_pool: None,
            test_package: None,
            name: None,
            locale: RUN_LOCALE.into(),
            wifi: true,
        }
    }

    /// Set the application upload under test
    pub fn app(mut self, app: Arn) -> Self {
        self.app = Some(app);
        self
    }

    /// Set the device pool to run on
    pub fn device_pool(mut self, device_pool: Arn) -> Self {
        self.device_pool = Some(device_pool);
        self
    }

    /// Set the test package upload
    pub fn test_package(mut self, test_package: Arn) -> Self {
        self.test_package = Some(test_package);
        self
    }

    /// Set the name of the run, `None` keeps the default
    pub fn name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Set the device locale
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Enable or disable Wi-Fi on the devices
    pub fn wifi(mut self, wifi: bool) -> Self {
        self.wifi = wifi;
        self
    }

    /// Finish the request
    pub fn build(self) -> Result<ScheduleRun> {
        Ok(ScheduleRun {
            project: self.project,
            app: self.app.ok_or(Error::NoApp)?,
            device_pool: self.device_pool.ok_or(Error::NoDevicePool)?,
            test_package: self.test_package.ok_or(Error::NoTestPackage)?,
            name: self
                .name
                .unwrap_or_else(|| format!("Run {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))),
            locale: self.locale,
            wifi: self.wifi,
        })
    }
}
