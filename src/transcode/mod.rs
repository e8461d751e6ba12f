//! Audio transcoding to constant-bitrate MP3 with ffmpeg.
//!
//! ffmpeg runs as a child process with `-progress pipe:1`, which prints
//! blocks of `key=value` lines on stdout, each ending in `progress=continue`
//! or `progress=end`. We turn each block into a Converting event: the
//! `total_size` key drives the `Converting... [N kB]` message and `out_time_us`
//! drives the percentage when the source duration is known.

mod ffmpeg;

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::pipeline::progress::ProgressReporter;

pub use ffmpeg::{FfmpegEncoder, ProgressBlock, ProgressParser};

/// Default MP3 bitrate in kbps
pub const DEFAULT_BITRATE_KBPS: u32 = 320;

/// Parameters for one encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub bitrate_kbps: u32,
    /// Source duration, used to turn encoder position into a percentage
    pub duration: Option<Duration>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            duration: None,
        }
    }
}

/// Converts a downloaded audio file to MP3.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Encode `input` into `output`, emitting Converting progress that starts
    /// at 0 and ends at 100 on success.
    ///
    /// Fails with `ConvertFailed`, in which case nothing is left at `output`.
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        options: &EncodeOptions,
        progress: &ProgressReporter,
    ) -> Result<()>;
}
