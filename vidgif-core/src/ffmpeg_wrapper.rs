use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// FFmpeg command builder with fluent interface
#[derive(Debug, Clone)]
pub struct FFmpegCommand {
    program: OsString,
    input: PathBuf,
    output: PathBuf,
    input_format: Option<String>,
    video_filters: Vec<String>,
    video_codec: Option<String>,
    bitrate_kbps: Option<u32>,
    frame_rate: Option<u32>,
    pixel_format: Option<String>,
    no_audio: bool,
    overwrite: bool,
}

impl FFmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            program: OsString::from("ffmpeg"),
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_format: None,
            video_filters: Vec::new(),
            video_codec: None,
            bitrate_kbps: None,
            frame_rate: None,
            pixel_format: None,
            no_audio: false,
            overwrite: false,
        }
    }

    /// Use a specific ffmpeg binary instead of the one on PATH
    pub fn program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Force the demuxer for the input (`-f`)
    pub fn input_format(mut self, format: &str) -> Self {
        self.input_format = Some(format.to_string());
        self
    }

    /// Set video codec
    pub fn video_codec(mut self, codec: &str) -> Self {
        self.video_codec = Some(codec.to_string());
        self
    }

    /// Set video bitrate in kbps
    pub fn bitrate(mut self, kbps: u32) -> Self {
        self.bitrate_kbps = Some(kbps);
        self
    }

    /// Set output frame rate
    pub fn frame_rate(mut self, fps: u32) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    pub fn pixel_format(mut self, pix_fmt: &str) -> Self {
        self.pixel_format = Some(pix_fmt.to_string());
        self
    }

    /// Drop every audio stream
    pub fn no_audio(mut self) -> Self {
        self.no_audio = true;
        self
    }

    /// Enable overwrite without asking
    pub fn overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    /// Add a video filter
    pub fn video_filter(mut self, filter: &str) -> Self {
        self.video_filters.push(filter.to_string());
        self
    }

    /// Resample to a constant frame rate
    pub fn fps_filter(self, fps: u32) -> Self {
        self.video_filter(&format!("fps={}", fps))
    }

    /// Scale to `width`, keeping the aspect ratio
    pub fn scale_width(self, width: u32) -> Self {
        self.video_filter(&format!("scale={}:-1:flags=lanczos", width))
    }

    /// Round both dimensions down to even numbers (required by yuv420p encoders)
    pub fn even_dimensions(self) -> Self {
        self.video_filter("scale=trunc(iw/2)*2:trunc(ih/2)*2")
    }

    /// Two-pass palette generation for good looking GIFs.
    /// Must be the last video filter.
    pub fn gif_palette(self) -> Self {
        self.video_filter("split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse")
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the FFmpeg command
    pub fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);

        // Global options
        if self.overwrite {
            cmd.arg("-y");
        }
        cmd.args(["-hide_banner", "-nostdin"]);

        if let Some(ref format) = self.input_format {
            cmd.args(["-f", format]);
        }

        cmd.arg("-i");
        cmd.arg(&self.input);

        if !self.video_filters.is_empty() {
            cmd.arg("-filter_complex");
            cmd.arg(format!("[0:v]{}[v]", self.video_filters.join(",")));
            cmd.args(["-map", "[v]"]);
        }

        if self.no_audio {
            cmd.arg("-an");
        }

        if let Some(ref codec) = self.video_codec {
            cmd.args(["-c:v", codec]);
        }

        if let Some(bitrate) = self.bitrate_kbps {
            cmd.args(["-b:v", &format!("{}k", bitrate)]);
        }

        if let Some(fps) = self.frame_rate {
            cmd.args(["-r", &fps.to_string()]);
        }

        if let Some(ref pix_fmt) = self.pixel_format {
            cmd.args(["-pix_fmt", pix_fmt]);
        }

        cmd.arg(&self.output);

        cmd
    }

    /// Execute the FFmpeg command, reporting percent complete parsed from stderr
    pub fn execute<F>(&self, progress_callback: F) -> Result<()>
    where
        F: Fn(f64) + Send + 'static,
    {
        let mut cmd = self.build();
        cmd.stdout(Stdio::null()).stderr(Stdio::piped());

        log::info!("Executing FFmpeg command: {:?}", cmd);

        let mut child = cmd.spawn().context("Failed to spawn FFmpeg process")?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture stderr"))?;

        let duration_regex = Regex::new(r"Duration: (\d{2}):(\d{2}):(\d{2})\.(\d{2})")?;
        let progress_regex = Regex::new(r"time=(\d{2}):(\d{2}):(\d{2})\.(\d{2})")?;

        let reader_thread = thread::spawn(move || {
            let mut total_duration: Option<f64> = None;
            let mut all_output = String::new();

            for_each_line(stderr, |line| {
                all_output.push_str(line);
                all_output.push('\n');

                if total_duration.is_none()
                    && let Some(caps) = duration_regex.captures(line)
                {
                    total_duration = Some(timestamp_seconds(&caps));
                }

                if let Some(caps) = progress_regex.captures(line)
                    && let Some(duration) = total_duration
                    && duration > 0.0
                {
                    let progress = (timestamp_seconds(&caps) / duration * 100.0).min(100.0);
                    progress_callback(progress);
                }
            });
            all_output
        });

        let status = child.wait().context("Failed to wait for FFmpeg process")?;

        let all_output = reader_thread
            .join()
            .unwrap_or_else(|_| String::from("Failed to get output"));

        if !status.success() {
            log::error!("FFmpeg failed with output:\n{}", all_output);
            anyhow::bail!(
                "FFmpeg failed with exit code: {:?}. {}",
                status.code(),
                last_error_line(&all_output).unwrap_or("Check logs for details.")
            );
        }

        Ok(())
    }
}

/// Feed each non-empty line of `reader` to `on_line` as soon as it ends.
///
/// ffmpeg terminates its status line with '\r' and only emits '\n' at the
/// end, so both count as line ends.
fn for_each_line(mut reader: impl Read, mut on_line: impl FnMut(&str)) {
    let mut chunk = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::debug!("Stopped reading FFmpeg output: {}", e);
                break;
            }
        };

        for &byte in &chunk[..read] {
            if byte == b'\n' || byte == b'\r' {
                if !pending.is_empty() {
                    on_line(&String::from_utf8_lossy(&pending));
                    pending.clear();
                }
            } else {
                pending.push(byte);
            }
        }
    }

    if !pending.is_empty() {
        on_line(&String::from_utf8_lossy(&pending));
    }
}

/// Seconds from a `HH:MM:SS.cc` capture
fn timestamp_seconds(caps: &Captures<'_>) -> f64 {
    let part = |i: usize| caps[i].parse::<f64>().unwrap_or(0.0);
    part(1) * 3600.0 + part(2) * 60.0 + part(3) + part(4) / 100.0
}

/// Last non-empty line of ffmpeg output, usually the actual error
fn last_error_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).rev().find(|l| !l.is_empty())
}

/// Check if FFmpeg is available and return version info
pub fn check_ffmpeg() -> Result<String> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .context("FFmpeg not found. Please install FFmpeg.")?;

    let version = String::from_utf8_lossy(&output.stdout);

    let version_regex = Regex::new(r"ffmpeg version (\S+)")?;
    if let Some(caps) = version_regex.captures(&version) {
        Ok(caps[1].to_string())
    } else {
        Ok("unknown".to_string())
    }
}

#[derive(Debug, Deserialize)]
struct MediaReport {
    #[serde(default)]
    streams: Vec<MediaStream>,
    format: Option<MediaContainer>,
}

#[derive(Debug, Deserialize)]
struct MediaStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaContainer {
    duration: Option<String>,
}

/// Basic facts about an input file
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub has_audio: bool,
}

/// Get media metadata using ffprobe
pub fn get_media_info(path: impl AsRef<Path>) -> Result<MediaInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path.as_ref())
        .output()
        .context("Failed to run ffprobe")?;

    if !output.status.success() {
        anyhow::bail!("ffprobe could not read {:?}", path.as_ref());
    }

    parse_media_json(&String::from_utf8_lossy(&output.stdout))
}

fn parse_media_json(json: &str) -> Result<MediaInfo> {
    let report: MediaReport = serde_json::from_str(json).context("Unexpected ffprobe output")?;

    let video = report
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    let fps = video
        .and_then(|s| s.r_frame_rate.as_deref())
        .and_then(|rate| {
            let (num, den) = rate.split_once('/')?;
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then(|| num / den)
        })
        .unwrap_or(0.0);

    Ok(MediaInfo {
        duration: report
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse().ok())
            .unwrap_or(0.0),
        width: video.and_then(|s| s.width).unwrap_or(0),
        height: video.and_then(|s| s.height).unwrap_or(0),
        fps,
        has_audio: report
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn gif_command_line() {
        let cmd = FFmpegCommand::new("/in/clip.mp4", "/out/clip.gif")
            .overwrite()
            .no_audio()
            .fps_filter(30)
            .scale_width(1080)
            .gif_palette()
            .build();

        let args = args_of(&cmd);
        assert_eq!(cmd.get_program(), "ffmpeg");
        assert_eq!(args.first().map(String::as_str), Some("-y"));
        let graph = args
            .iter()
            .position(|a| a == "-filter_complex")
            .map(|i| args[i + 1].clone())
            .unwrap();
        assert_eq!(
            graph,
            "[0:v]fps=30,scale=1080:-1:flags=lanczos,\
             split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse[v]"
        );
        assert!(args.contains(&"-an".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/out/clip.gif"));
    }

    #[test]
    fn video_command_line() {
        let cmd = FFmpegCommand::new("in.gif", "out.webm")
            .input_format("gif")
            .video_codec("libvpx")
            .bitrate(500)
            .frame_rate(24)
            .build();
        let args = args_of(&cmd);
        let joined = args.join(" ");
        assert!(joined.contains("-f gif -i in.gif"));
        assert!(joined.contains("-c:v libvpx"));
        assert!(joined.contains("-b:v 500k"));
        assert!(joined.contains("-r 24"));
        assert!(!args.contains(&"-filter_complex".to_string()));
    }

    #[test]
    fn parses_timestamps() {
        let re = Regex::new(r"time=(\d{2}):(\d{2}):(\d{2})\.(\d{2})").unwrap();
        let caps = re.captures("frame=  10 time=01:02:03.50 bitrate=").unwrap();
        assert!((timestamp_seconds(&caps) - 3723.5).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_media_report() {
        let json = r#"{
            "streams": [
                {
                    "codec_type": "video",
                    "width": 1920,
                    "height": 1080,
                    "r_frame_rate": "30000/1001"
                },
                {"codec_type": "audio"}
            ],
            "format": {"duration": "12.500000"}
        }"#;
        let info = parse_media_json(json).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.fps - 29.97).abs() < 0.01);
        assert!((info.duration - 12.5).abs() < f64::EPSILON);
        assert!(info.has_audio);
    }

    #[test]
    fn carriage_returns_end_lines() {
        let mut lines = Vec::new();
        for_each_line(&b"Duration: 1\nframe=1\rframe=2\r\n\nlast"[..], |l| {
            lines.push(l.to_string())
        });
        assert_eq!(lines, vec!["Duration: 1", "frame=1", "frame=2", "last"]);
    }

    #[cfg(unix)]
    #[test]
    fn progress_arrives_while_ffmpeg_runs() {
        use std::os::unix::fs::PermissionsExt;
        use std::sync::{Arc, Mutex};
        use std::time::{Duration, Instant};

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-ffmpeg");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             printf 'Duration: 00:00:10.00, start: 0.0\\n' >&2\n\
             for t in 01 03 05 07 09; do\n\
             printf 'frame=1 time=00:00:%s.00 bitrate=1k\\r' \"$t\" >&2\n\
             sleep 0.3\n\
             done\n\
             printf '\\n' >&2\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let started = Instant::now();
        let seen: Arc<Mutex<Vec<(f64, Duration)>>> = Arc::default();
        let sink = Arc::clone(&seen);

        FFmpegCommand::new("in.mp4", "out.gif")
            .program(&script)
            .execute(move |progress| sink.lock().unwrap().push((progress, started.elapsed())))
            .unwrap();
        let total = started.elapsed();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 5, "{seen:?}");
        assert!((seen[0].0 - 10.0).abs() < 0.01);
        assert!((seen[4].0 - 90.0).abs() < 0.01);
        assert!(
            seen[0].1 + Duration::from_millis(600) < total,
            "first progress at {:?}, process ended at {:?}",
            seen[0].1,
            total
        );
    }

    #[test]
    fn last_line_is_reported() {
        assert_eq!(last_error_line("a\nb: No such file\n\n"), Some("b: No such file"));
        assert_eq!(last_error_line(""), None);
    }
}
