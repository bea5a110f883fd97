use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};
use tracing_subscriber::EnvFilter;
use wa_selfbot::{Bot, BotConfig, BotExit, SessionEnd};

/// Self-command WhatsApp client: `s`, `setpp`, `setppfull`, `apk4all <query>`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Session name; credentials live in `<auth-dir>/<name>-session`.
    #[arg(long)]
    session_name: Option<String>,

    /// Directory holding persisted sessions.
    #[arg(long)]
    auth_dir: Option<PathBuf>,

    /// WebSocket endpoint of the messaging gateway.
    #[arg(long)]
    bridge: Option<String>,

    /// Seconds a command handler may run before it is abandoned.
    #[arg(long)]
    handler_timeout: Option<u64>,

    /// Root URL of the app catalog searched by `apk4all`.
    #[arg(long)]
    lookup_url: Option<String>,

    /// ffmpeg binary used for video stickers.
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Print the effective configuration and exit.
    #[arg(long)]
    show_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = BotConfig::default();
    if let Some(name) = cli.session_name {
        config = config.with_session_name(name);
    }
    if let Some(dir) = cli.auth_dir {
        config = config.with_auth_dir(dir);
    }
    if let Some(endpoint) = cli.bridge {
        config = config.with_bridge_endpoint(endpoint);
    }
    if let Some(secs) = cli.handler_timeout {
        config = config.with_handler_timeout(Duration::from_secs(secs));
    }
    if let Some(url) = cli.lookup_url {
        config = config.with_lookup_base_url(url);
    }
    if let Some(path) = cli.ffmpeg {
        config = config.with_ffmpeg_path(path);
    }

    if cli.show_config {
        match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{json}"),
            Err(e) => println!("{config:?} ({e})"),
        }
        return ExitCode::SUCCESS;
    }

    info!(
        "starting session {} via {}",
        config.session_name, config.bridge_endpoint
    );
    let bot = Bot::from_config(config);
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    match bot.run(interrupted).await {
        Ok(BotExit::Interrupted) | Ok(BotExit::Session(SessionEnd::Replaced)) => ExitCode::SUCCESS,
        Ok(BotExit::Session(SessionEnd::ReauthRequired(reason))) => {
            error!("session ended ({reason}); pair the device again");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
