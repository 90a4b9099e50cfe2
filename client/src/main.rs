use devicefarm_runner::farm::AwsDeviceFarm;
use devicefarm_runner::orchestrator::Orchestrator;
use devicefarm_runner::report::Reporter;
use log::*;

mod cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = cli::cli();
    let reporter = Reporter::new(cli.verbose_ci_logs);

    debug!("Settings: {:#?}", cli);

    let farm = AwsDeviceFarm::new(&cli.farm).await;
    let orchestrator = Orchestrator::new(
        &farm,
        reqwest::Client::new(),
        cli.project,
        reporter,
        std::env::current_dir()?,
    );

    if let Err(e) = orchestrator.execute(&cli.mode).await {
        debug!("Exiting after {:?}", e);
        std::process::exit(e.exit_code());
    }

    Ok(())
}
