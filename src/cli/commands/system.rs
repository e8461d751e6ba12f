//! Tool check and configuration commands.

use crate::config::{self, Config};
use crate::tools::{self, Tool};

/// Report which external tools are installed
pub fn cmd_check_tools(config: &Config) -> anyhow::Result<()> {
    println!("Checking external tools...\n");

    let mut missing = false;
    for (tool, configured) in [
        (Tool::YtDlp, config.tools.yt_dlp.as_deref()),
        (Tool::Ffmpeg, config.tools.ffmpeg.as_deref()),
    ] {
        match tools::locate(tool, configured) {
            Some(path) => {
                let version = tools::version(tool, &path).unwrap_or_else(|| "unknown".to_string());
                println!("✓ {}: {} ({:?})", tool.name(), version, path);
            }
            None => {
                println!("✗ {}: not found", tool.name());
                missing = true;
            }
        }
    }

    if missing {
        println!();
        println!("Install:");
        println!("  Windows: winget install yt-dlp.yt-dlp Gyan.FFmpeg");
        println!("  macOS:   brew install yt-dlp ffmpeg");
        println!("  Linux:   apt install ffmpeg && pipx install yt-dlp");
        println!();
        println!("Or set [tools] ffmpeg / yt_dlp in the config file.");
    }
    Ok(())
}

/// Print the effective configuration, its path, or write it out
pub fn cmd_config(config: &Config, path_only: bool, init: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path_only {
        match path {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("could not determine config directory"),
        }
        return Ok(());
    }

    if init {
        config::save(config)?;
        if let Some(path) = path {
            println!("✓ Wrote {:?}", path);
        }
        return Ok(());
    }

    if let Some(path) = path {
        println!("# {}", path.display());
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
