//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `download`: run the pipeline for one URL
//! - `catalog`: catalog search
//! - `tags`: write and inspect MP3 tags
//! - `system`: external tool checks and configuration

mod catalog;
mod download;
mod system;
mod tags;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::config::{self, Config};

pub use catalog::cmd_search;
pub use download::cmd_download;
pub use system::{cmd_check_tools, cmd_config};
pub use tags::{cmd_inspect, cmd_tag};

/// grabtune: download audio from a video URL as a tagged MP3
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Download a video's audio as an MP3
    Download {
        /// Video page URL
        url: String,
        /// Look the track up in the catalog for title, tags and cover
        #[arg(long)]
        cover_search: bool,
        /// Title to search the catalog for (implies --cover-search)
        #[arg(long, value_name = "TITLE")]
        cover_title: Option<String>,
        /// Output directory (default: configured dir, else Downloads)
        #[arg(short, long, env = "GRABTUNE_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,
        /// MP3 bitrate in kbps
        #[arg(short, long)]
        bitrate: Option<u32>,
    },
    /// Show the best catalog match for a title
    Search {
        /// Free-text title, e.g. "Daft Punk One More Time"
        title: String,
    },
    /// Write tags to an existing MP3
    Tag {
        /// Path to the MP3
        path: PathBuf,
        /// Track title
        #[arg(long)]
        title: String,
        /// Artist name
        #[arg(long)]
        artist: String,
        /// Album name
        #[arg(long)]
        album: String,
        /// Front cover image (JPEG or PNG)
        #[arg(long)]
        cover: Option<PathBuf>,
    },
    /// Print the tags of an MP3
    Inspect {
        /// Path to the MP3
        path: PathBuf,
    },
    /// Check that ffmpeg and yt-dlp are installed
    CheckTools,
    /// Print the effective configuration
    Config {
        /// Print only the config file path
        #[arg(long)]
        path: bool,
        /// Write the current configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = config::load();

    match &cli.command {
        Commands::Download {
            url,
            cover_search,
            cover_title,
            output_dir,
            bitrate,
        } => {
            let config = with_overrides(config, output_dir.as_ref(), *bitrate);
            let rt = Runtime::new()?;
            let lookup = *cover_search
                || cover_title.is_some()
                || config.pipeline.cover_lookup_by_default;
            cmd_download(&rt, &config, url, lookup, cover_title.clone())
        }
        Commands::Search { title } => {
            let rt = Runtime::new()?;
            cmd_search(&rt, &config, title)
        }
        Commands::Tag {
            path,
            title,
            artist,
            album,
            cover,
        } => cmd_tag(path, title, artist, album, cover.as_ref()),
        Commands::Inspect { path } => cmd_inspect(path),
        Commands::CheckTools => cmd_check_tools(&config),
        Commands::Config { path, init } => cmd_config(&config, *path, *init),
    }
}

/// Apply command-line overrides on top of the loaded config
fn with_overrides(
    mut config: Config,
    output_dir: Option<&PathBuf>,
    bitrate: Option<u32>,
) -> Config {
    if let Some(dir) = output_dir {
        config.output.dir = Some(dir.clone());
    }
    if let Some(kbps) = bitrate {
        config.output.bitrate_kbps = kbps;
    }
    config
}
