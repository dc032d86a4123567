use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use feedcanon::{DecoderConfig, FeedDecoder, Resolution};

#[derive(Parser, Debug)]
#[command(
    name = "feedcanon",
    about = "Decode an RSS/Atom document into canonical JSON"
)]
struct Args {
    /// Feed document (or HTML page) to decode
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// URL the document was fetched from; resolves relative links
    #[arg(long, default_value = "")]
    url: String,

    /// Declared Content-Type, tried first when it names a feed vocabulary
    #[arg(long, value_name = "TYPE")]
    content_type: Option<String>,

    /// Decoder configuration (TOML)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DecoderConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => DecoderConfig::default(),
    };
    let decoder = FeedDecoder::new(config);

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let resolution = match args.content_type.as_deref() {
        // A declared type means the caller expects a feed, so no autodiscovery
        Some(content_type) => Resolution::Feed(Box::new(decoder.decode_with_content_type(
            &args.url,
            Some(content_type),
            &bytes,
        )?)),
        None => decoder.decode_or_discover(&args.url, &bytes)?,
    };

    match resolution {
        Resolution::Feed(decoded) => {
            if let Some(error) = &decoded.error {
                eprintln!(
                    "warning: {error} ({} entries skipped)",
                    decoded.skipped_entries
                );
            }
            let json = serde_json::to_string_pretty(&decoded.feed)
                .context("Failed to serialize feed")?;
            println!("{json}");
        }
        Resolution::Discovered(link) => {
            println!("{link}");
        }
    }

    Ok(())
}
