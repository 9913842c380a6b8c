//! warmfetch - fetch API endpoints through a fingerprinting cache
//!
//! `warmfetch fetch <REQUEST>` runs a single request and prints its payload;
//! `warmfetch warm` keeps the configured warm-cache set refreshed.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use warmfetch::cli::{Cli, Command, FetchArgs, WarmArgs};
use warmfetch::logging::init_logging;
use warmfetch::{FetchOutcome, Fetcher, WarmCacheHandle, WarmEvent};

/// Exit status when the remote call failed and nothing was returned
const EXIT_ABSENT: u8 = 1;

/// Exit status for invalid input (unknown request, bad arguments, setup failure)
const EXIT_INVALID: u8 = 2;

async fn run_fetch(fetcher: &Fetcher, args: &FetchArgs) -> ExitCode {
    let request = match args.to_request() {
        Ok(request) => request,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(EXIT_INVALID);
        }
    };

    match fetcher.fetch(&request).await {
        FetchOutcome::Unresolved(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(EXIT_INVALID)
        }
        FetchOutcome::Failed(e) => {
            error!(error = %e, "request failed");
            println!("null");
            ExitCode::from(EXIT_ABSENT)
        }
        outcome => {
            let payload = outcome.into_payload().unwrap_or_default();
            match serde_json::to_string_pretty(&payload) {
                Ok(json) => {
                    println!("{}", json);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("error: {}", e);
                    ExitCode::from(EXIT_ABSENT)
                }
            }
        }
    }
}

async fn run_warm(fetcher: Arc<Fetcher>, args: &WarmArgs, cli: &Cli) -> ExitCode {
    let config = args.warm_config(&cli.fetch_config());
    let Some(mut handle) = WarmCacheHandle::spawn(fetcher, config) else {
        eprintln!("error: the warm cache only runs in the server role");
        return ExitCode::from(EXIT_INVALID);
    };

    let mut completed = 0u64;
    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(WarmEvent::CycleCompleted { cycle, refreshed, failed }) => {
                    println!("cycle {}: {} refreshed, {} failed", cycle, refreshed, failed);
                    completed += 1;
                    if args.cycles.is_some_and(|limit| completed >= limit) {
                        break;
                    }
                }
                Some(WarmEvent::CycleStarted { .. }) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    handle.shutdown().await;
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.environment) {
        eprintln!("warning: logging unavailable: {}", e);
    }

    let registry = match cli.registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(EXIT_INVALID);
        }
    };

    let fetcher = match Fetcher::from_config(&cli.fetch_config(), cli.role, registry) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(EXIT_INVALID);
        }
    };

    match &cli.command {
        Command::Fetch(args) => run_fetch(&fetcher, args).await,
        Command::Warm(args) => run_warm(fetcher.clone(), args, &cli).await,
    }
}
