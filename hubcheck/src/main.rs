mod config;
mod telemetry;

use clap::{Args, Parser};
use config::{Config, ConfigError};
use enterprise_check::errors::EnterpriseCheckError;
use enterprise_check::service::EnterpriseCheck;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "HubSpot enterprise visitor check")]
enum CliCommand {
    /// Serve the enterprise check and its admin endpoints
    EnterpriseCheck(ConfigArgs),
    /// Look up a single hubspotutk value and print the result as JSON
    Lookup {
        #[command(flatten)]
        config: ConfigArgs,
        #[arg(long)]
        utk: String,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// YAML config file. Built-in defaults are used when omitted.
    #[arg(long)]
    config_file_path: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> Result<Config, ConfigError> {
        match &self.config_file_path {
            Some(path) => Config::from_file(path),
            None => Ok(Config::default()),
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] telemetry::TelemetryError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    EnterpriseCheck(#[from] EnterpriseCheckError),
    #[error("could not print result: {0}")]
    Output(#[from] serde_json::Error),
}

fn main() -> Result<(), CliError> {
    let cli = CliCommand::parse();

    let config = match &cli {
        CliCommand::EnterpriseCheck(args) => args.load()?,
        CliCommand::Lookup { config, .. } => config.load()?,
    };
    let _telemetry = telemetry::init(&config.common)?;
    let check_config = config.enterprise_check.unwrap_or_default();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli {
        CliCommand::EnterpriseCheck(_) => {
            tracing::info!("Starting enterprise check");
            rt.block_on(enterprise_check::run(check_config))?;
        }
        CliCommand::Lookup { utk, .. } => {
            let result = rt.block_on(async {
                let check = EnterpriseCheck::from_config(&check_config)?;
                check.lookup(&utk).await
            })?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
