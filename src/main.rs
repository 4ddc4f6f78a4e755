use checkout_key_rotator::rotation::{handle_rotate_command, RunConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[cfg(test)]
use serial_test::serial;

#[derive(Parser)]
#[command(name = "checkout-key-rotator")]
#[command(about = "Replace legacy ssh-rsa CircleCI checkout keys across an organization")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// CircleCI personal API token
    api_token: String,
    /// Organization that owns the projects
    organization: String,
    /// Version control system: gh, github, bb or bitbucket
    vcs: String,
    /// Only rotate this project; empty means every followed project
    #[arg(default_value = "")]
    project: String,
    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<String>,
    /// CircleCI base URL (overrides config)
    #[arg(long, env = "CIRCLECI_API_URL")]
    api_url: Option<String>,
    /// Directory for the old/new key logs (overrides config)
    #[arg(long, env = "KEY_LOG_DIR")]
    output_dir: Option<PathBuf>,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        RunConfig {
            api_token: cli.api_token,
            organization: cli.organization,
            vcs: cli.vcs,
            project: cli.project,
            config_path: cli.config,
            api_url: cli.api_url,
            output_dir: cli.output_dir,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("checkout_key_rotator=info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = handle_rotate_command(cli.into()).await {
        error!("run aborted: {}", e);
        eprintln!("Error: {}", e.user_friendly_message());
        std::process::exit(1);
    }
}
