use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use secrecy::ExposeSecret;

use telegram_grabber::{Config, Daemon, TelegramChannel, logging};

/// Grabber - downloads files posted to a Telegram group
#[derive(Parser)]
#[command(name = "grabber", version, about)]
struct Cli {
    /// Directory downloads are saved to (overrides `DOWNLOAD_DIR`)
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Directory for rotated log files
    #[arg(long, env = "LOG_DIR", default_value = ".")]
    log_dir: PathBuf,

    /// Do not draw download progress bars
    #[arg(long)]
    no_progress: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is not an error
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let _guard = match logging::init(cli.verbose, &cli.log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;

    if let Some(dir) = cli.download_dir {
        config.download.root = dir;
    }
    if cli.no_progress {
        config.download.show_progress = false;
    }

    let channel = TelegramChannel::from_credentials(config.api_id, config.api_hash.expose_secret());

    Daemon::new(config, channel).run().await?;
    Ok(())
}
