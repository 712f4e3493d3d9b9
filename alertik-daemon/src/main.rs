use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use alertik_core::config::AlertikConfig;
use alertik_daemon::cli::DaemonCli;
use alertik_daemon::logging;
use alertik_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = DaemonCli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // the subscriber may not be installed yet
            eprintln!("alertik: {:#}", e);
            tracing::error!(error = %e, "alertik exiting with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: DaemonCli) -> Result<()> {
    let mut config = AlertikConfig::load(cli.config.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;

    // CLI flags take precedence over file and environment
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    logging::init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "alertik starting");

    let mut orchestrator = Orchestrator::build_from_config(config)?;

    if cli.validate {
        println!("{}", orchestrator.summary());
        println!("configuration OK");
        return Ok(());
    }

    orchestrator.run().await?;
    tracing::info!("alertik shut down");
    Ok(())
}
