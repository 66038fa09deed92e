//! Command-line host for the channel feed.

mod serve;
mod subscribe;
mod terminal;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let token = CancellationToken::new();
    let hits = Arc::new(AtomicUsize::new(0));
    {
        let token = token.clone();
        let hits = hits.clone();
        tokio::spawn(async move {
            loop {
                if tokio::signal::ctrl_c().await.is_ok() {
                    match hits.fetch_add(1, Ordering::Relaxed) {
                        0 => {
                            eprintln!("Ctrl+C — stopping… (press again to force)");
                            token.cancel();
                        }
                        _ => {
                            eprintln!("Force exiting.");
                            std::process::exit(130);
                        }
                    }
                }
            }
        });
    }

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let t = token.clone();
        tokio::spawn(async move {
            if let Ok(mut term) = signal(SignalKind::terminate()) {
                term.recv().await;
                eprintln!("SIGTERM — stopping…");
                t.cancel();
            }
        });
    }

    let args = Arguments::parse();

    match args.command {
        Command::Subscribe(args) => subscribe::run(args, token).await,
        Command::Serve(args) => serve::run(args, token).await,
    }
}

#[derive(Debug, Parser)]
#[command(version, about = "Follow a channel feed over HTTP long-polling")]
struct Arguments {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Follow a channel and print every update
    Subscribe(subscribe::SubscribeArgs),

    /// Host a channel, publishing each line read from stdin
    Serve(serve::ServeArgs),
}
