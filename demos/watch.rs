//! Follows a portfolio backend's view counter from the terminal.
//!
//! Run with:
//! ```bash
//! cargo run --example watch --features demo -- --base-url http://localhost:5000 --push
//! ```
//!
//! Pass `--session-file` twice in a row to see the second run take the
//! read-only path.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use contavisite::api::{ApiRevision, HttpCountSource};
use contavisite::config::{PushConfig, ViewCounterConfig};
use contavisite::counters::{DisplayedCounter, UpdatePolicy};
use contavisite::observers::json::JsonObserver;
use contavisite::observers::text::TextObserver;
use contavisite::push::SseChannel;
use contavisite::reconciler::ViewCounter;
use tracing_subscriber::EnvFilter;

/// Output format for counter updates.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Text as the page shows it
    #[default]
    Text,
    /// JSON snapshot per update
    Json,
}

/// Watch a view counter: count this visit once per session, then follow
/// live updates.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file; other flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend origin
    #[arg(short, long)]
    base_url: Option<String>,

    /// Use the legacy /api/views endpoints
    #[arg(long)]
    legacy: bool,

    /// Keep the session flag in this file across runs
    #[arg(long)]
    session_file: Option<PathBuf>,

    /// Never show a lower count than the current one
    #[arg(long)]
    monotonic: bool,

    /// Subscribe to live updates
    #[arg(long)]
    push: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

fn build_config(args: &Args) -> Result<ViewCounterConfig, Box<dyn std::error::Error>> {
    let mut config = match (&args.config, &args.base_url) {
        (Some(path), _) => ViewCounterConfig::load(path)?,
        (None, Some(base_url)) => ViewCounterConfig::new(base_url.clone()),
        (None, None) => return Err("either --config or --base-url is required".into()),
    };
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if args.legacy {
        config.api = ApiRevision::Legacy;
    }
    if let Some(path) = &args.session_file {
        config.session_file = Some(path.clone());
    }
    if args.monotonic {
        config.update_policy = UpdatePolicy::Monotonic;
    }
    if args.push && config.push.is_none() {
        config.push = Some(PushConfig::default());
    }
    config.validate()?;
    Ok(config)
}

fn print(format: OutputFormat, counter: &DisplayedCounter) {
    match format {
        OutputFormat::Text => println!("{}", TextObserver::new().with_label("views").render_counter(counter)),
        OutputFormat::Json => match JsonObserver::new().include_timestamp(true).to_json(counter) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("cannot serialize counter: {e}"),
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let source = HttpCountSource::from_config(&config)?;
    let mut views = ViewCounter::from_config(source, &config);
    let counter = views.counter().clone();

    let mut updates = counter.watch();
    views.init().await;
    updates.borrow_and_update();
    print(args.format, &counter);

    let Some(channel) = SseChannel::from_config(&config) else {
        return Ok(());
    };
    views.listen(channel);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                updates.borrow_and_update();
                print(args.format, &counter);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    views.teardown().await;
    Ok(())
}
