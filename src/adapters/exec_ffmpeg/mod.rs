//! FFmpeg execution adapter
//!
//! Builds ffmpeg command lines from export plans and supervises the child
//! process, parsing the key/value stream written by `-progress`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::ports::{ExportPlan, RateControl};

/// Builder for FFmpeg commands
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Arguments placed before `-i`
    input_args: Vec<String>,
    /// Arguments placed after `-i`
    output_args: Vec<String>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
        }
    }

    /// Build the command for an export plan
    pub fn from_plan(plan: &ExportPlan) -> Self {
        let mut cmd = Self::new(&plan.source, &plan.destination)
            .seek(plan.window.start_seconds())
            .duration(plan.window.duration_seconds());

        match &plan.encoding {
            None => {
                cmd = cmd
                    .output_args(["-c", "copy"])
                    .output_args(["-avoid_negative_ts", "make_zero"]);
            }
            Some(encoding) => {
                if let Some(size) = encoding.frame_size {
                    cmd = cmd.video_filter(format!("scale={}:{}", size.width, size.height));
                }
                cmd = cmd
                    .video_codec(&encoding.video_codec)
                    .preset(&encoding.preset);
                cmd = match encoding.rate {
                    RateControl::Bitrate(bits) => cmd.output_arg("-b:v").output_arg(bits.to_string()),
                    RateControl::Crf(crf) => cmd.output_arg("-crf").output_arg(crf.to_string()),
                };
                cmd = cmd
                    .output_args(["-pix_fmt", "yuv420p"])
                    .audio_codec(&encoding.audio_codec);
                if encoding.threads > 0 {
                    cmd = cmd.output_arg("-threads").output_arg(encoding.threads.to_string());
                }
            }
        }

        cmd.output_args(["-movflags", "+faststart"])
    }

    /// Add an input argument (before -i)
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add an output argument (after -i)
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Seek the input before decoding
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Limit how much of the input is read
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Build the command arguments
    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-y",
            "-nostdin",
            "-hide_banner",
            "-v",
            "error",
            "-progress",
            "pipe:1",
            "-nostats",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}

/// Snapshot of ffmpeg's `-progress` report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FfmpegProgress {
    /// Output timestamp in microseconds
    pub out_time_us: i64,
}

/// Parse one line of `-progress` output.
///
/// Returns a snapshot at the end of each report block (the `progress=` key).
pub fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // out_time_ms carries microseconds as well
        "out_time_us" | "out_time_ms" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_us = us;
            }
        }
        "progress" => return Some(current.clone()),
        _ => {}
    }
    None
}

/// How an ffmpeg process ended
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessExit {
    Succeeded,
    Failed(String),
    Cancelled,
}

/// A running ffmpeg child process
pub struct FfmpegProcess {
    child: Child,
    stdout: Lines<BufReader<ChildStdout>>,
    stderr: JoinHandle<String>,
}

impl FfmpegProcess {
    /// Spawn ffmpeg for `command`
    pub fn spawn(binary: &Path, command: &FfmpegCommand) -> Result<Self, DomainError> {
        let args = command.build_args();
        debug!("Running FFmpeg: {} {}", binary.display(), args.join(" "));

        let mut child = Command::new(binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DomainError::SessionCreationFailed(format!(
                    "Failed to start {}: {}",
                    binary.display(),
                    e
                ))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            DomainError::SessionCreationFailed("ffmpeg stdout was not captured".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            DomainError::SessionCreationFailed("ffmpeg stderr was not captured".to_string())
        })?;

        let stderr = tokio::spawn(async move {
            let mut text = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut text).await;
            text
        });

        Ok(Self {
            child,
            stdout: BufReader::new(stdout).lines(),
            stderr,
        })
    }

    /// Drive the process to completion, reporting progress and honouring cancellation
    pub async fn run<F>(self, mut on_progress: F, mut cancel_rx: watch::Receiver<bool>) -> ProcessExit
    where
        F: FnMut(&FfmpegProgress) + Send,
    {
        let Self {
            mut child,
            mut stdout,
            stderr,
        } = self;

        if *cancel_rx.borrow_and_update() {
            return Self::kill(&mut child, stderr).await;
        }

        let mut current = FfmpegProgress::default();
        let mut stdout_open = true;
        let mut cancel_live = true;

        loop {
            tokio::select! {
                biased;
                changed = cancel_rx.changed(), if cancel_live => {
                    match changed {
                        Ok(()) if *cancel_rx.borrow_and_update() => {
                            return Self::kill(&mut child, stderr).await;
                        }
                        Ok(()) => {}
                        // Nobody can cancel any more
                        Err(_) => cancel_live = false,
                    }
                }
                line = stdout.next_line(), if stdout_open => {
                    match line {
                        Ok(Some(line)) => {
                            if let Some(progress) = parse_progress_line(&line, &mut current) {
                                on_progress(&progress);
                            }
                        }
                        Ok(None) => stdout_open = false,
                        Err(e) => {
                            warn!("Failed to read ffmpeg progress: {}", e);
                            stdout_open = false;
                        }
                    }
                }
                status = child.wait(), if !stdout_open => {
                    let diagnostics = stderr.await.unwrap_or_default();
                    return match status {
                        Ok(status) if status.success() => ProcessExit::Succeeded,
                        Ok(status) => ProcessExit::Failed(format!(
                            "ffmpeg exited with {}: {}",
                            status,
                            tail_lines(&diagnostics, 5)
                        )),
                        Err(e) => ProcessExit::Failed(format!("Failed to wait for ffmpeg: {}", e)),
                    };
                }
            }
        }
    }

    async fn kill(child: &mut Child, stderr: JoinHandle<String>) -> ProcessExit {
        info!("FFmpeg cancelled, killing process");
        if let Err(e) = child.kill().await {
            warn!("Failed to kill ffmpeg: {}", e);
        }
        stderr.abort();
        ProcessExit::Cancelled
    }
}

/// Last `count` non-empty lines of `text`, joined with "; "
fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.is_empty() {
        return "no diagnostics".to_string();
    }
    lines[lines.len().saturating_sub(count)..].join("; ")
}

/// Locate the ffmpeg executable, honouring an explicitly configured path
pub fn locate_ffmpeg(configured: Option<&Path>) -> Result<PathBuf, which::Error> {
    match configured {
        Some(path) => which::which(path),
        None => which::which("ffmpeg"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ClipWindow, FrameSize, JobId, TransformMode};
    use crate::ports::VideoEncoding;

    fn plan(mode: TransformMode, encoding: Option<VideoEncoding>) -> ExportPlan {
        ExportPlan {
            job_id: JobId(1),
            source: PathBuf::from("in.mov"),
            destination: PathBuf::from("out.mp4"),
            window: ClipWindow::new(2_000, 5_000).unwrap(),
            mode,
            encoding,
        }
    }

    fn position(args: &[String], value: &str) -> usize {
        args.iter().position(|a| a == value).unwrap()
    }

    #[test]
    fn test_trim_command_copies_streams() {
        let args = FfmpegCommand::from_plan(&plan(TransformMode::TrimOnly, None)).build_args();

        assert!(position(&args, "-ss") < position(&args, "-i"));
        assert_eq!(args[position(&args, "-ss") + 1], "2.000");
        assert_eq!(args[position(&args, "-t") + 1], "3.000");
        assert_eq!(args[position(&args, "-c") + 1], "copy");
        assert!(!args.contains(&"-c:v".to_string()));
        assert_eq!(args.last().unwrap(), "out.mp4");
        assert_eq!(args[position(&args, "-progress") + 1], "pipe:1");
    }

    #[test]
    fn test_transcode_command_scales_and_sets_bitrate() {
        let encoding = VideoEncoding {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "fast".to_string(),
            rate: RateControl::Bitrate(1_500_000),
            frame_size: Some(FrameSize { width: 854, height: 480 }),
            threads: 4,
        };
        let args = FfmpegCommand::from_plan(&plan(TransformMode::Transcode, Some(encoding))).build_args();

        assert_eq!(args[position(&args, "-vf") + 1], "scale=854:480");
        assert_eq!(args[position(&args, "-c:v") + 1], "libx264");
        assert_eq!(args[position(&args, "-b:v") + 1], "1500000");
        assert_eq!(args[position(&args, "-threads") + 1], "4");
        assert!(!args.contains(&"-crf".to_string()));
        assert!(position(&args, "-i") < position(&args, "-c:v"));
    }

    #[test]
    fn test_transcode_command_uses_crf_without_bitrate() {
        let encoding = VideoEncoding {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "medium".to_string(),
            rate: RateControl::Crf(23),
            frame_size: None,
            threads: 0,
        };
        let args = FfmpegCommand::from_plan(&plan(TransformMode::Transcode, Some(encoding))).build_args();

        assert_eq!(args[position(&args, "-crf") + 1], "23");
        assert!(!args.contains(&"-vf".to_string()));
        assert!(!args.contains(&"-threads".to_string()));
    }

    #[test]
    fn test_progress_parsing() {
        let mut progress = FfmpegProgress::default();

        assert!(parse_progress_line("frame=42", &mut progress).is_none());
        assert!(parse_progress_line("out_time_us=1500000", &mut progress).is_none());
        assert!(parse_progress_line("speed=2.5x", &mut progress).is_none());
        assert!(parse_progress_line("speed=N/A", &mut progress).is_none());

        let snapshot = parse_progress_line("progress=continue", &mut progress).unwrap();
        assert_eq!(snapshot.out_time_us, 1_500_000);

        assert!(parse_progress_line("out_time_ms=2000000", &mut progress).is_none());
        let snapshot = parse_progress_line("progress=end", &mut progress).unwrap();
        assert_eq!(snapshot.out_time_us, 2_000_000);
    }

    #[test]
    fn test_progress_parsing_ignores_noise() {
        let mut progress = FfmpegProgress::default();
        assert!(parse_progress_line("garbage", &mut progress).is_none());
        assert!(parse_progress_line("out_time_us=N/A", &mut progress).is_none());
        assert_eq!(progress.out_time_us, 0);
    }

    #[test]
    fn test_tail_lines() {
        assert_eq!(tail_lines("", 3), "no diagnostics");
        assert_eq!(tail_lines("a\n\nb\nc\nd\n", 2), "c; d");
    }
}
