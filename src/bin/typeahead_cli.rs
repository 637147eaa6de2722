//! Typeahead CLI
//!
//! Drives a live typeahead session from the terminal against a WebSocket
//! suggestion service. Each stdin line is one view event:
//!
//! ```text
//! gola         input text changed to "gola"
//! :down        arrow down
//! :up          arrow up
//! :click 1     click suggestion 1 (zero-based)
//! :enter       commit the input
//! :submit      same as :enter
//! :quit        tear the session down
//! ```
//!
//! The render model is printed whenever it changes. A commit prints the
//! search view location and exits.
//!
//! Usage:
//!   cargo run --features cli --bin typeahead-cli -- \
//!     --endpoint ws://localhost:8080/typeahead \
//!     --debounce-ms 300
//!
//! ## Environment Variables
//!
//! - `TYPEAHEAD_*`: configuration overrides (see `TypeaheadConfig`)
//! - `TYPEAHEAD_CONFIG`: YAML config file, same as `--config`
//! - `RUST_LOG`: log filter (default `warn`)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use typeahead::{
    Key, SearchRoute, SessionOutcome, TypeaheadConfig, TypeaheadSession, ViewEvent, ViewSnapshot,
    WsConnector,
};

/// Interactive typeahead session
#[derive(Parser, Debug)]
#[command(name = "typeahead-cli")]
#[command(about = "Live search suggestions over a WebSocket channel")]
struct Args {
    /// Suggestion service endpoint (e.g., "ws://localhost:8080/typeahead")
    #[arg(long, short = 'e')]
    endpoint: Option<String>,

    /// YAML config file
    #[arg(long, short = 'c', env = "TYPEAHEAD_CONFIG")]
    config: Option<PathBuf>,

    /// Debounce window in milliseconds
    #[arg(long)]
    debounce_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let route = SearchRoute::new(&config.search_base).context("Building search route")?;

    eprintln!(
        "[typeahead] Connecting to {} (debounce {}ms)",
        config.endpoint, config.debounce_ms
    );

    let session = TypeaheadSession::new(config, Arc::new(WsConnector), move |query: &str| {
        println!("search -> {}", route.location(query));
    });
    let handle = session.spawn();
    let mut view = handle.view();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let stdin_closed = loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Reading stdin")? else {
                    break true;
                };
                match parse_command(&line) {
                    Some(event) => {
                        handle.send(event).await;
                    }
                    None => eprintln!("[typeahead] Unknown command: {}", line.trim()),
                }
            }
            changed = view.changed() => {
                // Sender dropped: the session has ended
                if changed.is_err() {
                    break false;
                }
                print_snapshot(&view.borrow_and_update());
            }
        }
    };

    let outcome = if stdin_closed {
        handle.teardown().await
    } else {
        handle.join().await
    };

    match outcome {
        SessionOutcome::Committed(query) => eprintln!("[typeahead] Committed \"{}\"", query),
        SessionOutcome::TornDown => eprintln!("[typeahead] Session closed"),
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<TypeaheadConfig> {
    let mut config = match &args.config {
        Some(path) => TypeaheadConfig::load_from_file(path)?.with_env_overrides()?,
        None => TypeaheadConfig::from_env()?,
    };

    if let Some(endpoint) = &args.endpoint {
        config = config.endpoint(endpoint.clone());
    }
    if let Some(ms) = args.debounce_ms {
        config = config.debounce_ms(ms);
    }
    config.validate().context("Invalid command-line settings")?;
    Ok(config)
}

fn parse_command(line: &str) -> Option<ViewEvent> {
    let Some(command) = line.strip_prefix(':') else {
        return Some(ViewEvent::TextChanged(line.to_string()));
    };

    let mut parts = command.split_whitespace();
    let event = match parts.next()? {
        "down" => ViewEvent::Key(Key::ArrowDown),
        "up" => ViewEvent::Key(Key::ArrowUp),
        "enter" => ViewEvent::Key(Key::Enter),
        "submit" => ViewEvent::Submit,
        "quit" => ViewEvent::Teardown,
        "click" => ViewEvent::SuggestionClicked(parts.next()?.parse().ok()?),
        _ => return None,
    };
    Some(event)
}

fn print_snapshot(snapshot: &ViewSnapshot) {
    println!("[{}] > {}", snapshot.channel, snapshot.input);
    for (i, item) in snapshot.items.iter().enumerate() {
        let marker = if snapshot.cursor == Some(i) { '*' } else { ' ' };
        println!("  {} {}: {}", marker, i, item);
    }
}
