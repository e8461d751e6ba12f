//! grabtune - download the audio of a video page as a tagged MP3.
//!
//! The source page is resolved with `yt-dlp`, the audio stream is fetched
//! over HTTP, encoded to MP3 with `ffmpeg`, and optionally tagged with title,
//! artist, album and cover art from the Deezer catalog.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod source;
#[cfg(test)]
pub mod test_utils;
pub mod tools;
pub mod transcode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    let directive = if args.verbose {
        "grabtune=debug"
    } else {
        "grabtune=info"
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    cli::run_command(&args)
}
