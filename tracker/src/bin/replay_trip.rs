use std::path::PathBuf;

use clap::Parser;
use tracker::{gpx_import::load_track, models::PositionOptions, replay::replay_fixes};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Replay a recorded GPX track as a trip and print its distance and speed"
)]
struct Args {
    /// GPX file whose track points all carry a <time> element
    #[arg(long)]
    gpx: PathBuf,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    tracing::info!("replaying {:?}", args.gpx);

    let fixes = load_track(&args.gpx)?;
    let summary = replay_fixes(&fixes, PositionOptions::default())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }
    Ok(())
}
