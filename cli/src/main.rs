use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use taskmgmt_cli::{
    commands::{self, Command},
    config::Config,
    setup::initialize_app,
    telemetry::{init_telemetry, log_config_validation, log_startup_info, report_error},
};

#[derive(Parser)]
#[command(name = "taskmgmt")]
#[command(about = "Manage Genesys Cloud task management workbins, worktypes, statuses and flow rules")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<String>,

    /// Region override, e.g. eu-central-1
    #[arg(long)]
    region: Option<String>,

    /// API base URL override
    #[arg(long)]
    base_url: Option<String>,

    /// Log level override
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(config_file) => Config::from_file(config_file)?,
        None => Config::from_env()?,
    };

    if let Some(ref region) = cli.region {
        config.api.region = region.clone();
    }
    if let Some(ref base_url) = cli.base_url {
        config.api.base_url = Some(base_url.clone());
    }
    if let Some(ref log_level) = cli.log_level {
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli).context("Failed to load configuration")?;

    init_telemetry(&config.logging).context("Failed to initialize telemetry")?;
    log_config_validation(&config);

    if let Err(e) = config.validate() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    log_startup_info(&config);
    let app = initialize_app(&config).context("Failed to initialize application")?;

    match commands::run(&app, cli.command).await {
        Ok(output) => {
            for warning in output.warnings.iter() {
                eprintln!("{warning}");
            }
            println!("{}", output.body);
            info!("Command completed");
            Ok(())
        }
        Err(e) => {
            report_error(&e, "command");
            eprintln!("Error: {e:#}");
            std::process::exit(3);
        }
    }
}
