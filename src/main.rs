//! `annotator`: headless host for the annotation engine.
//!
//! - `annotator replay <script.json>` runs a recorded step script against a
//!   fresh engine and prints the resulting view as JSON. `--save N` also posts
//!   the result to the backend as case snapshot `N`.
//! - `annotator watch --case-id .. --user-id ..` polls the backend for peer
//!   annotations and versions, applies them to a headless engine, and exits
//!   cleanly on Ctrl-C.

mod script;

use std::path::PathBuf;

use annotate::engine::Engine;
use clap::{Args, Parser, Subcommand};
use collab::{HttpSource, SyncConfig, SyncError, spawn_poller};
use tracing::{info, warn};

use crate::script::{Script, ScriptError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    ReadScript { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

#[derive(Parser, Debug)]
#[command(name = "annotator", about = "Headless medical-image annotation engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a step script and print the final engine view.
    Replay(ReplayArgs),
    /// Poll peer annotations and versions for a case until Ctrl-C.
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Path to a script JSON file.
    script: PathBuf,
    /// Pretty-print the output.
    #[arg(long)]
    pretty: bool,
    /// Post the final annotations to the backend as this snapshot number.
    #[arg(long, value_name = "N")]
    save: Option<u32>,
}

#[derive(Args, Debug)]
struct WatchArgs {
    #[arg(long, env = "ANNOTATE_CASE_ID")]
    case_id: String,
    #[arg(long, env = "ANNOTATE_USER_ID")]
    user_id: String,
    /// Overrides `ANNOTATE_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,
    /// Exit after this many applied updates.
    #[arg(long)]
    max_updates: Option<usize>,
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Replay(args) => run_replay(args).await,
        Command::Watch(args) => run_watch(args).await,
    }
}

async fn run_replay(args: ReplayArgs) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&args.script)
        .map_err(|source| CliError::ReadScript { path: args.script.clone(), source })?;
    let script = Script::from_json(&text)?;
    info!(case_id = %script.case_id, steps = script.steps.len(), "replaying script");
    let engine = script.run()?;
    if let Some(version) = args.save {
        let config = SyncConfig::from_env();
        let source = HttpSource::new(&config)?;
        source.save_snapshot(&engine.case_snapshot(version)).await?;
        info!(case_id = %script.case_id, version, base_url = %config.base_url, "snapshot saved");
    }
    print_view(&engine, args.pretty)
}

async fn run_watch(args: WatchArgs) -> Result<(), CliError> {
    let mut config = SyncConfig::from_env();
    if let Some(base_url) = args.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }
    let source = HttpSource::new(&config)?;
    let mut engine = Engine::new(&args.case_id, &args.user_id);
    let mut poller = spawn_poller(source, &args.case_id, &args.user_id, &config);
    info!(case_id = %args.case_id, base_url = %config.base_url, "watching case");

    let mut applied = 0_usize;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "ctrl-c handler failed; stopping");
                }
                info!("interrupt received");
                break;
            }
            update = poller.recv() => {
                let Some(update) = update else {
                    warn!("poller exited unexpectedly");
                    break;
                };
                if let Some(notice) = &update.notice {
                    warn!(%notice, "sync notice");
                }
                update.apply(&mut engine);
                applied += 1;
                info!(
                    peers = update.peers.len(),
                    versions = update.versions.as_ref().map(Vec::len),
                    applied,
                    "sync update applied"
                );
                if args.max_updates.is_some_and(|max| applied >= max) {
                    break;
                }
            }
        }
    }

    poller.stop().await;
    print_view(&engine, args.pretty)
}

fn print_view(engine: &Engine, pretty: bool) -> Result<(), CliError> {
    let view = engine.view();
    let json = if pretty { serde_json::to_string_pretty(&view)? } else { serde_json::to_string(&view)? };
    println!("{json}");
    Ok(())
}
