use clap::ValueEnum;
use std::fmt;
use std::path::Path;

/// Container formats the converter understands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum MediaFormat {
    Mp4,
    Webm,
    Mov,
    Avi,
    Gif,
}

impl MediaFormat {
    /// All video containers, in the order they are offered as GIF export targets
    pub const VIDEO: [MediaFormat; 4] = [
        MediaFormat::Mp4,
        MediaFormat::Webm,
        MediaFormat::Mov,
        MediaFormat::Avi,
    ];

    /// Lower-case file extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Webm => "webm",
            MediaFormat::Mov => "mov",
            MediaFormat::Avi => "avi",
            MediaFormat::Gif => "gif",
        }
    }

    /// Parse an extension, case-insensitive, with or without a leading dot
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "mp4" => Some(MediaFormat::Mp4),
            "webm" => Some(MediaFormat::Webm),
            "mov" => Some(MediaFormat::Mov),
            "avi" => Some(MediaFormat::Avi),
            "gif" => Some(MediaFormat::Gif),
            _ => None,
        }
    }

    pub fn is_video(&self) -> bool {
        !matches!(self, MediaFormat::Gif)
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Lower-cased extension of `path`, empty when there is none
pub fn extension_of(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Which flavour of the application is running.
///
/// `Mp4Only` is the reduced "Mp4 <-> Gif" tool: it accepts only mp4 and gif
/// inputs and always exports GIFs as mp4.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum AppVariant {
    #[default]
    Full,
    Mp4Only,
}

impl AppVariant {
    pub fn title(&self) -> &'static str {
        match self {
            AppVariant::Full => "Video <-> Gif",
            AppVariant::Mp4Only => "Mp4 <-> Gif",
        }
    }

    /// Source formats accepted by this variant
    pub fn supported_sources(&self) -> &'static [MediaFormat] {
        match self {
            AppVariant::Full => &[
                MediaFormat::Mp4,
                MediaFormat::Webm,
                MediaFormat::Mov,
                MediaFormat::Avi,
                MediaFormat::Gif,
            ],
            AppVariant::Mp4Only => &[MediaFormat::Mp4, MediaFormat::Gif],
        }
    }

    pub fn supports(&self, format: MediaFormat) -> bool {
        self.supported_sources().contains(&format)
    }

    /// Human readable list used in the unsupported-file message, e.g.
    /// ".mp4, .webm, .mov, .avi, or .gif"
    pub fn supported_list(&self) -> String {
        let exts: Vec<String> = self
            .supported_sources()
            .iter()
            .map(|f| format!(".{}", f.extension()))
            .collect();
        match exts.split_last() {
            Some((last, rest)) if !rest.is_empty() => {
                let sep = if rest.len() > 1 { ", or " } else { " or " };
                format!("{}{}{}", rest.join(", "), sep, last)
            }
            Some((last, _)) => last.clone(),
            None => String::new(),
        }
    }
}
