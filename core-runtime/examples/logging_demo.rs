//! Logging system demonstration
//!
//! Shows the output formats against the kind of events the playback engine
//! produces.
//!
//! Run with:
//! ```bash
//! cargo run -p core-runtime --example logging_demo
//! cargo run -p core-runtime --example logging_demo -- json
//! cargo run -p core-runtime --example logging_demo -- compact "logging_demo=trace"
//! ```

use bridge_traits::logging::LogLevel;
use core_runtime::logging::{init_logging, redact_if_sensitive, redact_url, LogFormat, LoggingConfig};
use std::env;
use tracing::{debug, info, instrument, span, trace, warn, Level};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_filter("logging_demo=trace")
        .with_spans(true);

    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    init_logging(config).expect("Failed to initialize logging");

    info!(format = ?format, "Logging initialized");

    demo_load().await;
    demo_crossfade("https://cdn.example.com/a/track-b.mp3?sig=abc", 3.0).await;
    demo_redaction();
}

async fn demo_load() {
    let url = "https://cdn.example.com/a/track-a.mp3?token=secret";
    let span = span!(Level::INFO, "load", src = %redact_url(url), generation = 1);
    let _enter = span.enter();

    debug!("Assigning source");
    tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    trace!(kind = "loadedmetadata", duration = 215.4, "Media notification");
    info!(duration = 215.4, "Track ready to play");
}

#[instrument(fields(to = %redact_url(url)), skip(url))]
async fn demo_crossfade(url: &str, duration_secs: f64) {
    info!(duration_secs, "Crossfade started");

    for step in ["fade_out", "load", "play", "fade_in"] {
        debug!(step, "Crossfade step");
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    }

    warn!("Crossfade cancelled by a newer load");
}

fn demo_redaction() {
    let token = "secret_access_token_12345";
    info!(
        token = %redact_if_sensitive("access_token", token),
        volume = %redact_if_sensitive("volume", "0.8"),
        "Redacted fields"
    );
}
