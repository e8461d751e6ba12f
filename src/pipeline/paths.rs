//! Per-request file paths.
//!
//! All three files a request touches live directly in the output directory:
//!
//! ```text
//! tmp_<title>_<id>.<ext>        downloaded audio, deleted after transcoding
//! .<title>.<id>.mp3.part        encoder output while it is being written
//! <title>.mp3                   finished file
//! ```
//!
//! `<id>` is a prefix of the request's UUID, so two requests for the same
//! title never share a temp file.

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Longest file stem we produce, in characters
const MAX_STEM_CHARS: usize = 180;

/// Paths computed once at request start and threaded through the stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    pub output_dir: PathBuf,
    /// Downloaded audio (container chosen by the source)
    pub temp_audio_path: PathBuf,
    /// Encoder output, renamed to the final path on success
    pub partial_output_path: PathBuf,
    /// `<title>.mp3`
    pub output_filename: String,
}

impl PipelinePaths {
    /// Build paths for `title` inside `output_dir`.
    ///
    /// `temp_ext` is the downloaded container's extension (e.g. `m4a`).
    pub fn new(output_dir: &Path, title: &str, request_id: &Uuid, temp_ext: &str) -> Self {
        let stem = file_stem(title);
        let id = short_id(request_id);
        let ext = sanitize_filename(temp_ext.trim_start_matches('.'));
        let ext = if ext.is_empty() { "mp4".to_string() } else { ext };

        Self {
            output_dir: output_dir.to_path_buf(),
            temp_audio_path: output_dir.join(format!("tmp_{}_{}.{}", stem, id, ext)),
            partial_output_path: output_dir.join(format!(".{}.{}.mp3.part", stem, id)),
            output_filename: format!("{}.mp3", stem),
        }
    }

    /// Full path of the finished MP3
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_filename)
    }
}

fn short_id(request_id: &Uuid) -> String {
    request_id.simple().to_string().chars().take(8).collect()
}

/// Sanitizes a filename by replacing characters that are invalid on any
/// mainstream filesystem. Output has the same number of characters.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect()
}

/// A title turned into a safe, non-empty file stem.
///
/// On top of [`sanitize_filename`]: trims surrounding whitespace and dots
/// (so `..` and hidden names are impossible), caps the length, and falls
/// back to `untitled`.
pub fn file_stem(title: &str) -> String {
    let sanitized = sanitize_filename(title);
    let trimmed = sanitized.trim_matches(|c: char| c.is_whitespace() || c == '.');
    let capped: String = trimmed.chars().take(MAX_STEM_CHARS).collect();
    let capped = capped.trim_end_matches(|c: char| c.is_whitespace() || c == '.');

    if capped.is_empty() {
        "untitled".to_string()
    } else {
        capped.to_string()
    }
}
