use std::{
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use ankibot::{
    bot::BotHandler,
    core::{
        BotError,
        Settings,
    },
    websocket::WebSocketServer,
};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "ankibot", version, about = "Vocabulary flashcard bot backed by Ollama and Anki")]
struct Cli {
    /// Settings file; defaults to settings.json in the app config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address the WebSocket server listens on, overriding the settings file
    #[arg(long)]
    listen: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {}", e);
            std::process::exit(2);
        }
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_level.as_str()),
    );
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.filter_module("reqwest", log::LevelFilter::Warn);
    builder.target(env_logger::Target::Stderr).init();

    if let Err(e) = run(cli, settings).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, settings: Settings) -> Result<(), BotError> {
    let handler = Arc::new(BotHandler::from_settings(&settings)?);
    log::info!(
        "Using model '{}' and deck '{}' ({} attempts, {}s per attempt)",
        settings.ollama_model,
        settings.anki_deck_name,
        settings.max_generation_attempts,
        settings.generation_timeout_secs
    );
    match handler.guard().authorized_identity() {
        Some(identity) => log::info!("Authorized identity: {}", identity),
        None => log::info!("No authorized identity yet; waiting for /start <code>"),
    }

    let addr = cli.listen.unwrap_or_else(|| settings.listen_addr.clone());
    let listener = WebSocketServer::bind(&addr).await?;
    let server = WebSocketServer::new(handler.clone());

    let sweeper = handler.clone();
    let sweep_every = settings.session_timeout().max(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let pruned = sweeper.sessions().prune();
            if pruned > 0 {
                log::debug!("Pruned {} expired sessions", pruned);
            }
        }
    });

    tokio::select! {
        result = server.serve(listener) => result?,
        _ = tokio::signal::ctrl_c() => {
            log::info!("Shutting down");
        }
    }

    server.mark_stopped();
    let cleared = handler.sessions().clear_all();
    let status = handler.guard().status();
    let denied: usize = status.denied_counts.iter().map(|(_, count)| count).sum();
    log::info!(
        "Cleared {} sessions; {} denied attempts from {} identities this run",
        cleared,
        denied,
        status.denied_counts.len()
    );
    Ok(())
}
