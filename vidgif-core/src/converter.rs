use std::path::{Path, PathBuf};

use crate::dispatcher::Conversion;
use crate::error::{ConvertError, Result};
use crate::ffmpeg_wrapper::{FFmpegCommand, get_media_info};
use crate::format::MediaFormat;
use crate::job::ConversionJob;
use crate::settings::ConversionSettings;

/// Width every GIF is scaled to
pub const GIF_WIDTH: u32 = 1080;

/// Encoder parameters for a video -> GIF encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifParams {
    pub width: u32,
    pub fps: u32,
}

/// Encoder parameters for an encode into a video container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoParams {
    pub codec: &'static str,
    pub fps: u32,
    pub bitrate_kbps: u32,
    /// Input is a GIF and needs the gif demuxer
    pub from_gif: bool,
}

/// The external media library doing the actual encoding
pub trait MediaEngine: Send + Sync {
    fn write_gif(&self, input: &Path, output: &Path, params: &GifParams) -> Result<()>;
    fn write_video(&self, input: &Path, output: &Path, params: &VideoParams) -> Result<()>;

    /// Log facts about the input before encoding. Failures are not fatal.
    fn describe(&self, _input: &Path) {}
}

/// [`MediaEngine`] backed by the ffmpeg binary
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine;

impl FfmpegEngine {
    fn run(cmd: FFmpegCommand) -> Result<()> {
        let output = cmd.output_path().to_path_buf();
        cmd.execute(move |progress| {
            log::debug!("{:?}: {:.1}%", output.file_name().unwrap_or_default(), progress);
        })?;
        Ok(())
    }
}

impl MediaEngine for FfmpegEngine {
    fn write_gif(&self, input: &Path, output: &Path, params: &GifParams) -> Result<()> {
        let cmd = FFmpegCommand::new(input, output)
            .overwrite()
            .no_audio()
            .fps_filter(params.fps)
            .scale_width(params.width)
            .gif_palette();
        Self::run(cmd)
    }

    fn write_video(&self, input: &Path, output: &Path, params: &VideoParams) -> Result<()> {
        let mut cmd = FFmpegCommand::new(input, output)
            .overwrite()
            .no_audio()
            .video_codec(params.codec)
            .frame_rate(params.fps)
            .bitrate(params.bitrate_kbps);
        if params.from_gif {
            cmd = cmd.input_format("gif");
        }
        if params.codec == "libx264" {
            cmd = cmd.even_dimensions().pixel_format("yuv420p");
        }
        Self::run(cmd)
    }

    fn describe(&self, input: &Path) {
        match get_media_info(input) {
            Ok(info) => log::info!(
                "Input: {}x{}, {:.2} fps, {:.2}s duration, audio: {}",
                info.width,
                info.height,
                info.fps,
                info.duration,
                if info.has_audio { "yes" } else { "no" }
            ),
            Err(e) => log::warn!("Could not inspect {:?}: {:#}", input, e),
        }
    }
}

/// Codec used when writing into `format`
pub fn codec_for(format: MediaFormat) -> &'static str {
    match format {
        MediaFormat::Webm => "libvpx",
        _ => "libx264",
    }
}

/// Removes the intermediate file when dropped, if it exists
struct Intermediate(PathBuf);

impl Drop for Intermediate {
    fn drop(&mut self) {
        if self.0.exists() {
            match std::fs::remove_file(&self.0) {
                Ok(()) => log::debug!("Removed intermediate {:?}", self.0),
                Err(e) => log::warn!("Could not remove intermediate {:?}: {}", self.0, e),
            }
        }
    }
}

/// Runs conversion operations against a [`MediaEngine`]
pub struct Converter<E: MediaEngine> {
    engine: E,
}

impl Default for Converter<FfmpegEngine> {
    fn default() -> Self {
        Self::new(FfmpegEngine)
    }
}

impl<E: MediaEngine> Converter<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Run `job` to completion and return the path of the written file
    pub fn run(&self, job: &ConversionJob, settings: &ConversionSettings) -> Result<PathBuf> {
        if !job.input.is_file() {
            return Err(ConvertError::InputNotFound(job.input.clone()));
        }

        self.engine.describe(&job.input);

        let output = job.output_path();
        log::info!("Converting {:?} -> {:?} ({})", job.input, output, job.conversion);

        match job.conversion {
            Conversion::MovToGif => self.mov_to_gif(job, settings, &output)?,
            c if c.target() == MediaFormat::Gif => {
                self.video_to_gif(&job.input, &output, settings.fps(c))?
            }
            c => self.gif_to_video(&job.input, &output, c, settings)?,
        }

        log::info!("Output saved to: {:?}", output);
        Ok(output)
    }

    fn video_to_gif(&self, input: &Path, output: &Path, fps: u32) -> Result<()> {
        let params = GifParams {
            width: GIF_WIDTH,
            fps,
        };
        self.engine.write_gif(input, output, &params)
    }

    fn gif_to_video(
        &self,
        input: &Path,
        output: &Path,
        conversion: Conversion,
        settings: &ConversionSettings,
    ) -> Result<()> {
        let params = VideoParams {
            codec: codec_for(conversion.target()),
            fps: settings.fps(conversion),
            bitrate_kbps: settings.bitrate_kbps,
            from_gif: true,
        };
        self.engine.write_video(input, output, &params)
    }

    /// MOV is decoded unreliably, so it is re-encoded to MP4 first and the
    /// GIF is made from that.
    fn mov_to_gif(
        &self,
        job: &ConversionJob,
        settings: &ConversionSettings,
        output: &Path,
    ) -> Result<()> {
        let intermediate = Intermediate(job.intermediate_path());

        let params = VideoParams {
            codec: codec_for(MediaFormat::Mp4),
            fps: settings.fps(Conversion::MovToGif),
            bitrate_kbps: settings.bitrate_kbps,
            from_gif: false,
        };
        self.engine.write_video(&job.input, &intermediate.0, &params)?;

        self.video_to_gif(&intermediate.0, output, settings.fps(Conversion::Mp4ToGif))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::AppVariant;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        gifs: Mutex<Vec<(PathBuf, PathBuf, GifParams)>>,
        videos: Mutex<Vec<(PathBuf, PathBuf, VideoParams)>>,
    }

    impl MediaEngine for Recorder {
        fn write_gif(&self, input: &Path, output: &Path, params: &GifParams) -> Result<()> {
            std::fs::write(output, b"GIF89a")?;
            self.gifs
                .lock()
                .unwrap()
                .push((input.to_path_buf(), output.to_path_buf(), params.clone()));
            Ok(())
        }

        fn write_video(&self, input: &Path, output: &Path, params: &VideoParams) -> Result<()> {
            std::fs::write(output, b"video")?;
            self.videos
                .lock()
                .unwrap()
                .push((input.to_path_buf(), output.to_path_buf(), params.clone()));
            Ok(())
        }
    }

    fn job_for(dir: &Path, name: &str, gif_target: MediaFormat) -> ConversionJob {
        let input = dir.join(name);
        std::fs::write(&input, b"data").unwrap();
        ConversionJob::prepare(&input, dir, gif_target, AppVariant::Full).unwrap()
    }

    #[test]
    fn mp4_to_gif_uses_width_and_fps() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_for(dir.path(), "clip.mp4", MediaFormat::Mp4);
        let converter = Converter::new(Recorder::default());

        let out = converter.run(&job, &ConversionSettings::default()).unwrap();

        assert_eq!(out, dir.path().join("clip.gif"));
        let gifs = converter.engine.gifs.lock().unwrap();
        assert_eq!(gifs[0].2, GifParams { width: 1080, fps: 30 });
    }

    #[test]
    fn gif_to_webm_uses_libvpx_and_bitrate() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_for(dir.path(), "anim.gif", MediaFormat::Webm);
        let converter = Converter::new(Recorder::default());
        let mut settings = ConversionSettings::default();
        settings.bitrate_kbps = 800;
        settings.frame_rates.gif_to_webm = 12;

        converter.run(&job, &settings).unwrap();

        let videos = converter.engine.videos.lock().unwrap();
        assert_eq!(
            videos[0].2,
            VideoParams {
                codec: "libvpx",
                fps: 12,
                bitrate_kbps: 800,
                from_gif: true
            }
        );
        assert_eq!(videos[0].1, dir.path().join("anim.webm"));
    }

    #[test]
    fn mov_goes_through_intermediate_mp4() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_for(dir.path(), "take.mov", MediaFormat::Mp4);
        let converter = Converter::new(Recorder::default());
        let mut settings = ConversionSettings::default();
        settings.frame_rates.mov_to_gif = 20;
        settings.frame_rates.mp4_to_gif = 15;

        converter.run(&job, &settings).unwrap();

        let videos = converter.engine.videos.lock().unwrap();
        let gifs = converter.engine.gifs.lock().unwrap();
        assert_eq!(videos[0].2.fps, 20);
        assert_eq!(videos[0].1, gifs[0].0);
        assert_eq!(gifs[0].2.fps, 15);
        assert!(!job.intermediate_path().exists());
        assert!(dir.path().join("take.gif").exists());
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let job = ConversionJob::prepare(
            dir.path().join("gone.mp4"),
            dir.path(),
            MediaFormat::Mp4,
            AppVariant::Full,
        )
        .unwrap();
        let err = Converter::new(Recorder::default())
            .run(&job, &ConversionSettings::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Error: Input file does not exist.");
    }

    #[test]
    fn codecs() {
        assert_eq!(codec_for(MediaFormat::Webm), "libvpx");
        assert_eq!(codec_for(MediaFormat::Mov), "libx264");
        assert_eq!(codec_for(MediaFormat::Avi), "libx264");
    }
}
