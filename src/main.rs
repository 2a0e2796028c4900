use anyhow::Result;
use clap::{Arg, Command};
use tracing::warn;

use yt_transcript_fetcher::{Config, TranscriptFetcher};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("yt-transcript")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Fetch and normalize YouTube video transcripts")
        .arg(
            Arg::new("url")
                .value_name("URL_OR_ID")
                .help("Video URL or bare 11-character video id")
                .required(true),
        )
        .arg(
            Arg::new("language")
                .short('l')
                .long("language")
                .value_name("CODE")
                .help("Preferred caption language (e.g. zh-Hant, en)"),
        )
        .arg(
            Arg::new("fallback")
                .short('f')
                .long("fallback")
                .value_name("CODES")
                .help("Comma-separated fallback languages, overriding the configured list"),
        )
        .arg(
            Arg::new("chapters")
                .short('c')
                .long("chapters")
                .help("Render chapter-structured Markdown when the video has chapters")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-languages")
                .long("list-languages")
                .help("List available caption tracks instead of fetching")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Emit JSON instead of plain text")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let filter = if verbose {
        "yt_transcript_fetcher=debug,info"
    } else {
        "yt_transcript_fetcher=warn,error"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    if let Some(fallbacks) = matches.get_one::<String>("fallback") {
        config.languages.fallback_languages = fallbacks
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    config.validate()?;

    let url = matches
        .get_one::<String>("url")
        .map(String::as_str)
        .unwrap_or_default();
    let language = matches.get_one::<String>("language").map(String::as_str);
    let as_json = matches.get_flag("json");

    let fetcher = TranscriptFetcher::new(config)?;

    if matches.get_flag("list-languages") {
        let tracks = fetcher.available_languages(url).await?;
        if as_json {
            println!("{}", serde_json::to_string_pretty(&tracks)?);
        } else {
            for track in tracks {
                let origin = if track.is_generated {
                    "auto-generated"
                } else {
                    "manual"
                };
                println!("{}\t{}\t{}", track.code, track.name, origin);
            }
        }
        return Ok(());
    }

    let transcript = fetcher
        .fetch_text(url, language, matches.get_flag("chapters"))
        .await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&transcript)?);
    } else {
        println!("{}", transcript.text);
    }

    Ok(())
}
