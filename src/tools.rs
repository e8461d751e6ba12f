//! Locating the external binaries the pipeline shells out to.
//!
//! Both tools are run as child processes rather than linked:
//! - `yt-dlp` resolves a video page to its audio stream URLs
//! - `ffmpeg` encodes the downloaded audio to MP3
//!
//! Install:
//! - Windows: `winget install yt-dlp.yt-dlp Gyan.FFmpeg`
//! - macOS: `brew install yt-dlp ffmpeg`
//! - Linux: `apt install ffmpeg` and `pipx install yt-dlp` or equivalent

use std::path::{Path, PathBuf};
use std::process::Command;

/// An external tool the pipeline depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ffmpeg,
    YtDlp,
}

impl Tool {
    /// Executable name looked up on PATH
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::YtDlp => "yt-dlp",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "-version",
            Tool::YtDlp => "--version",
        }
    }

    #[cfg(windows)]
    fn candidates(&self) -> &'static [&'static str] {
        match self {
            Tool::Ffmpeg => &[
                "ffmpeg",
                r"C:\ffmpeg\bin\ffmpeg.exe",
                r"C:\Program Files\ffmpeg\bin\ffmpeg.exe",
            ],
            Tool::YtDlp => &["yt-dlp", r"C:\Program Files\yt-dlp\yt-dlp.exe"],
        }
    }

    #[cfg(not(windows))]
    fn candidates(&self) -> &'static [&'static str] {
        match self {
            Tool::Ffmpeg => &[
                "ffmpeg",
                "/usr/bin/ffmpeg",
                "/usr/local/bin/ffmpeg",
                "/opt/homebrew/bin/ffmpeg",
            ],
            Tool::YtDlp => &[
                "yt-dlp",
                "/usr/bin/yt-dlp",
                "/usr/local/bin/yt-dlp",
                "/opt/homebrew/bin/yt-dlp",
            ],
        }
    }
}

/// Whether running `<path> <version-arg>` succeeds
fn responds(tool: Tool, path: &Path) -> bool {
    Command::new(path)
        .arg(tool.version_arg())
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Find a working binary for `tool`.
///
/// A configured path is trusted as-is if it responds; otherwise the common
/// install locations are probed in order.
pub fn locate(tool: Tool, configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if responds(tool, path) {
            return Some(path.to_path_buf());
        }
        tracing::warn!(
            "Configured {} at {:?} does not run, searching defaults",
            tool.name(),
            path
        );
    }

    tool.candidates()
        .iter()
        .map(PathBuf::from)
        .find(|path| responds(tool, path))
}

/// Like [`locate`], but falls back to the bare executable name so a missing
/// tool surfaces as a spawn error at the stage that needs it.
pub fn locate_or_default(tool: Tool, configured: Option<&Path>) -> PathBuf {
    locate(tool, configured).unwrap_or_else(|| {
        tracing::warn!("{} not found; stages that need it will fail", tool.name());
        configured
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(tool.name()))
    })
}

/// First line of the tool's version output (for diagnostics)
pub fn version(tool: Tool, path: &Path) -> Option<String> {
    Command::new(path)
        .arg(tool.version_arg())
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| {
            String::from_utf8_lossy(&o.stdout)
                .lines()
                .next()
                .map(|l| l.trim().to_string())
        })
}
