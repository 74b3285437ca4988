//! Vidgif Core - Video <-> GIF conversion using the FFmpeg CLI
//!
//! This library turns MP4, WEBM, MOV and AVI files into GIFs and GIFs back
//! into any of those containers by driving the `ffmpeg` command-line tool:
//! - Format dispatch from file extension and chosen export format
//! - Per-pair frame rates and a shared bitrate, edited with confirm/cancel
//! - A two-stage path for MOV input through an intermediate MP4
//! - A "Processing..." status animation while the encoder runs

pub mod converter;
pub mod dispatcher;
pub mod error;
pub mod ffmpeg_wrapper;
pub mod format;
pub mod job;
pub mod progress;
pub mod session;
pub mod settings;

// Re-export commonly used types at the crate root
pub use converter::{Converter, FfmpegEngine, GifParams, MediaEngine, VideoParams};
pub use dispatcher::{Conversion, dispatch};
pub use error::ConvertError;
pub use ffmpeg_wrapper::{FFmpegCommand, MediaInfo, check_ffmpeg, get_media_info};
pub use format::{AppVariant, MediaFormat};
pub use job::ConversionJob;
pub use progress::{StatusDisplay, StatusSender, StatusSink, StatusUpdate, status_channel};
pub use session::{JobHandle, Session};
pub use settings::{ConversionSettings, SettingsDraft, SettingsStore};
