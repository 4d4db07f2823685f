// surfcast CLI v0.1
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use surfcast::commands::{self, App, Command};
use surfcast::config::AppConfig;

#[derive(Parser)]
#[command(
    name = "surfcast",
    version,
    about = "Surf forecasts and spot recommendations in the terminal"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize tracing; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "surfcast=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    tracing::debug!("Using API at {}, state in {}", config.api_url, config.state_dir.display());

    let mut app = match App::open(&config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("Failed to open local state: {}", e);
            eprintln!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
    };
    app.start().await;

    match commands::run(&mut app, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
