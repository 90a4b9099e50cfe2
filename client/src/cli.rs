use clap::Parser;
use devicefarm_runner::farm::FarmSettings;
use devicefarm_runner::orchestrator::{AppSource, Mode, RunOptions};
use devicefarm_runner::{Arn, Url};
use std::path::PathBuf;

/// Runs Calabash tests on AWS Device Farm and collects their artifacts
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Device Farm project to work in.
    #[clap(long, env = "DEVICE_FARM_PROJECT_ARN")]
    project_arn: String,

    /// AWS region of the project.
    #[clap(long, default_value = "us-west-2", env = "DEVICE_FARM_REGION")]
    region: String,

    /// Optional Device Farm endpoint override.
    #[clap(long, env = "DEVICE_FARM_ENDPOINT")]
    endpoint_url: Option<Url>,

    /// Use the last uploaded application package.
    #[clap(long, conflicts_with = "package-path")]
    reuse_last_package: bool,

    /// Application package to upload.
    #[clap(
        long,
        required_unless_present_any = &["reuse-last-package", "list-device-pools", "delete-completed-runs"]
    )]
    package_path: Option<PathBuf>,

    /// Path to the 'features' directory with the tests. Defaults to './features'.
    #[clap(long)]
    features_directory: Option<PathBuf>,

    /// Device pool to run on.
    #[clap(
        long,
        required_unless_present_any = &["list-device-pools", "delete-completed-runs"]
    )]
    device_pool_name: Option<String>,

    /// Name of the run. Defaults to the current time.
    #[clap(long)]
    run_name: Option<String>,

    /// List all device pools of the project.
    #[clap(long, conflicts_with = "delete-completed-runs")]
    list_device_pools: bool,

    /// Delete all completed runs of the project.
    #[clap(long)]
    delete_completed_runs: bool,

    /// Also print progress and problems as TeamCity service messages.
    #[clap(long)]
    verbose_ci_logs: bool,

    /// Directory to save the test artifacts to.
    #[clap(long)]
    artifacts_output_directory: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Cli {
    pub project: Arn,
    pub farm: FarmSettings,
    pub verbose_ci_logs: bool,
    pub mode: Mode,
}

pub fn cli() -> Cli {
    from_args(Args::parse())
}

fn from_args(args: Args) -> Cli {
    let mode = match (args.list_device_pools, args.delete_completed_runs) {
        (true, _) => Mode::ListDevicePools,
        (_, true) => Mode::DeleteCompletedRuns,
        _ => Mode::Run(RunOptions {
            // clap makes both of these present for a run
            device_pool: args.device_pool_name.unwrap_or_default(),
            app: match args.package_path {
                Some(path) if !args.reuse_last_package => AppSource::Upload(path),
                _ => AppSource::ReuseLatest,
            },
            features_dir: args.features_directory,
            run_name: args.run_name,
            artifacts_dir: args.artifacts_output_directory,
        }),
    };

    Cli {
        project: Arn(args.project_arn),
        farm: FarmSettings {
            region: args.region,
            endpoint_url: args.endpoint_url.map(String::from),
        },
        verbose_ci_logs: args.verbose_ci_logs,
        mode,
    }
}
