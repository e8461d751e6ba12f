//! ffmpeg child process and its `-progress` output parser.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;

use super::{EncodeOptions, Encoder};
use crate::error::{Error, Result};
use crate::pipeline::progress::{ProgressReporter, Stage};

/// stderr lines kept for the error message
const STDERR_TAIL_LINES: usize = 5;

/// One `-progress` block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressBlock {
    /// Bytes of output written so far
    pub total_size: Option<u64>,
    /// Output position in microseconds
    pub out_time_us: Option<u64>,
    /// `progress=end`
    pub finished: bool,
}

impl ProgressBlock {
    /// `Converting... [N kB]`, if a size was reported
    pub fn message(&self) -> Option<String> {
        self.total_size
            .map(|bytes| format!("Converting... [{} kB]", bytes / 1024))
    }

    /// Floored position as a share of `duration`, held below 100 until the
    /// process has exited successfully.
    pub fn percent(&self, duration: Option<Duration>) -> Option<u8> {
        let total_us = duration?.as_micros();
        if total_us == 0 {
            return None;
        }
        let pct = u128::from(self.out_time_us?) * 100 / total_us;
        Some(pct.min(99) as u8)
    }
}

/// Accumulates `key=value` lines into [`ProgressBlock`]s.
#[derive(Debug, Default)]
pub struct ProgressParser {
    current: ProgressBlock,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one stdout line; returns the block it completes, if any.
    pub fn feed(&mut self, line: &str) -> Option<ProgressBlock> {
        let (key, value) = line.trim().split_once('=')?;
        let value = value.trim();

        match key.trim() {
            "total_size" => {
                if let Ok(bytes) = value.parse() {
                    self.current.total_size = Some(bytes);
                }
            }
            // out_time_ms is also microseconds; older builds only print it
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse() {
                    self.current.out_time_us = Some(us);
                }
            }
            "progress" => {
                self.current.finished = value == "end";
                return Some(std::mem::take(&mut self.current));
            }
            _ => {}
        }
        None
    }
}

/// Runs the ffmpeg binary.
pub struct FfmpegEncoder {
    binary: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Full argument list for one encode
    pub fn args(input: &Path, output: &Path, bitrate_kbps: u32) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = [
            "-hide_banner",
            "-nostdin",
            "-y",
            "-loglevel",
            "error",
            "-i",
        ]
        .iter()
        .map(Into::into)
        .collect();
        args.push(input.into());
        args.extend(
            [
                "-vn".to_string(),
                "-codec:a".to_string(),
                "libmp3lame".to_string(),
                "-b:a".to_string(),
                format!("{}k", bitrate_kbps),
                "-f".to_string(),
                "mp3".to_string(),
                "-progress".to_string(),
                "pipe:1".to_string(),
                "-nostats".to_string(),
            ]
            .into_iter()
            .map(Into::into),
        );
        args.push(output.into());
        args
    }

    async fn run(
        &self,
        input: &Path,
        output: &Path,
        options: &EncodeOptions,
        progress: &ProgressReporter,
    ) -> Result<()> {
        let mut child = Command::new(&self.binary)
            .args(Self::args(input, output, options.bitrate_kbps))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::convert(format!("could not run {:?}: {}", self.binary, e)))?;

        // stderr is drained concurrently so a chatty ffmpeg can't block on a full pipe
        let stderr_task = child.stderr.take().map(|stderr| tokio::spawn(tail(stderr)));

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            let mut parser = ProgressParser::new();
            while let Ok(Some(line)) = lines.next_line().await {
                let Some(block) = parser.feed(&line) else {
                    continue;
                };
                if let Some(message) = block.message() {
                    progress.status(message);
                }
                if let Some(pct) = block.percent(options.duration) {
                    progress.percent(pct);
                }
                if block.finished {
                    tracing::debug!("ffmpeg reported end of encode for {:?}", output);
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| Error::convert(format!("ffmpeg did not finish: {}", e)))?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            let detail = if stderr.is_empty() {
                String::new()
            } else {
                format!(": {}", stderr)
            };
            return Err(Error::convert(format!("ffmpeg exited with {}{}", status, detail)));
        }

        let written = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(Error::convert("ffmpeg produced no output"));
        }
        Ok(())
    }
}

/// Last few lines of a reader, joined with `; `
async fn tail<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf).await;
    let text = String::from_utf8_lossy(&buf);
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("; ")
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        options: &EncodeOptions,
        progress: &ProgressReporter,
    ) -> Result<()> {
        progress.stage(Stage::Converting, "Converting...");
        progress.percent(0);
        tracing::debug!(
            "Encoding {:?} -> {:?} at {} kbps",
            input,
            output,
            options.bitrate_kbps
        );

        match self.run(input, output, options, progress).await {
            Ok(()) => {
                progress.percent(100);
                tracing::info!("Encoded {:?}", output);
                Ok(())
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(output).await
                    && rm.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!("Could not remove partial output {:?}: {}", output, rm);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::progress::{channel, drain};

    #[test]
    fn test_parser_emits_block_per_progress_line() {
        let mut parser = ProgressParser::new();
        let lines = [
            "bitrate=N/A",
            "total_size=2048",
            "out_time_us=N/A",
            "out_time_ms=N/A",
            "speed=N/A",
            "progress=continue",
            "total_size=524288",
            "out_time_us=106000000",
            "progress=end",
        ];
        let blocks: Vec<ProgressBlock> = lines.iter().filter_map(|l| parser.feed(l)).collect();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].total_size, Some(2048));
        assert_eq!(blocks[0].out_time_us, None);
        assert!(!blocks[0].finished);
        assert_eq!(blocks[1].out_time_us, Some(106_000_000));
        assert!(blocks[1].finished);
    }

    #[test]
    fn test_block_message_in_kilobytes() {
        let block = ProgressBlock {
            total_size: Some(524_288),
            ..Default::default()
        };
        assert_eq!(block.message().as_deref(), Some("Converting... [512 kB]"));
        assert_eq!(ProgressBlock::default().message(), None);
    }

    #[test]
    fn test_block_percent() {
        let block = ProgressBlock {
            out_time_us: Some(106_000_000),
            ..Default::default()
        };
        assert_eq!(block.percent(Some(Duration::from_secs(212))), Some(50));
        assert_eq!(block.percent(None), None);
        assert_eq!(block.percent(Some(Duration::ZERO)), None);

        let past_end = ProgressBlock {
            out_time_us: Some(500_000_000),
            ..Default::default()
        };
        assert_eq!(past_end.percent(Some(Duration::from_secs(212))), Some(99));
    }

    #[test]
    fn test_args() {
        let args = FfmpegEncoder::args(Path::new("in.webm"), Path::new("out.part"), 320);
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i + 1], "in.webm");
        assert!(args.windows(2).any(|w| w[0] == "-b:a" && w[1] == "320k"));
        assert!(args.windows(2).any(|w| w[0] == "-codec:a" && w[1] == "libmp3lame"));
        assert!(args.windows(2).any(|w| w[0] == "-f" && w[1] == "mp3"));
        assert_eq!(args.last().map(String::as_str), Some("out.part"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_convert_failed() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp3.part");
        let encoder = FfmpegEncoder::new("/nonexistent/bin/ffmpeg");

        let err = encoder
            .transcode(
                &dir.path().join("in.webm"),
                &output,
                &EncodeOptions::default(),
                &ProgressReporter::disabled(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConvertFailed(_)));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("ffmpeg");
        std::fs::write(&script, format!("#!/bin/sh\nfor last; do :; done\n{}", body)).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_encode_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_ffmpeg(
            dir.path(),
            "printf 'half an mp3' > \"$last\"\necho 'Invalid data found when processing input' >&2\nexit 1\n",
        );
        let output = dir.path().join(".song.mp3.part");

        let err = FfmpegEncoder::new(script)
            .transcode(
                &dir.path().join("tmp_song.webm"),
                &output,
                &EncodeOptions::default(),
                &ProgressReporter::disabled(),
            )
            .await
            .unwrap_err();

        match err {
            Error::ConvertFailed(msg) => assert!(msg.contains("Invalid data")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_encode_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_ffmpeg(
            dir.path(),
            "printf 'mp3 bytes' > \"$last\"\n\
             echo total_size=2048\necho out_time_us=1000000\necho progress=continue\n\
             echo total_size=4096\necho out_time_us=2000000\necho progress=end\nexit 0\n",
        );
        let output = dir.path().join(".song.mp3.part");
        let (tx, mut rx) = channel();
        let options = EncodeOptions {
            bitrate_kbps: 320,
            duration: Some(Duration::from_secs(4)),
        };

        FfmpegEncoder::new(script)
            .transcode(
                &dir.path().join("tmp_song.webm"),
                &output,
                &options,
                &ProgressReporter::new(tx),
            )
            .await
            .unwrap();

        assert!(output.exists());
        let events = drain(&mut rx);
        assert!(events.iter().all(|e| e.stage == Stage::Converting));
        let percents: Vec<u8> = events.iter().filter_map(|e| e.percent).collect();
        assert_eq!(percents.first(), Some(&0));
        assert_eq!(percents.last(), Some(&100));
        assert!(percents.contains(&25));
        assert!(percents.contains(&50));
        assert!(events.iter().any(|e| e.message == "Converting... [2 kB]"));
        assert!(events.iter().any(|e| e.message == "Converting... [4 kB]"));
    }
}
