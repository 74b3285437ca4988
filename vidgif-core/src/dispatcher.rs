use std::fmt;

use crate::error::{ConvertError, Result};
use crate::format::{AppVariant, MediaFormat};

/// A single format-pair transformation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Conversion {
    Mp4ToGif,
    WebmToGif,
    MovToGif,
    AviToGif,
    GifToMp4,
    GifToWebm,
    GifToMov,
    GifToAvi,
}

impl Conversion {
    pub const ALL: [Conversion; 8] = [
        Conversion::Mp4ToGif,
        Conversion::WebmToGif,
        Conversion::MovToGif,
        Conversion::AviToGif,
        Conversion::GifToMp4,
        Conversion::GifToWebm,
        Conversion::GifToMov,
        Conversion::GifToAvi,
    ];

    pub fn source(&self) -> MediaFormat {
        match self {
            Conversion::Mp4ToGif => MediaFormat::Mp4,
            Conversion::WebmToGif => MediaFormat::Webm,
            Conversion::MovToGif => MediaFormat::Mov,
            Conversion::AviToGif => MediaFormat::Avi,
            _ => MediaFormat::Gif,
        }
    }

    pub fn target(&self) -> MediaFormat {
        match self {
            Conversion::GifToMp4 => MediaFormat::Mp4,
            Conversion::GifToWebm => MediaFormat::Webm,
            Conversion::GifToMov => MediaFormat::Mov,
            Conversion::GifToAvi => MediaFormat::Avi,
            _ => MediaFormat::Gif,
        }
    }

    /// Look up the operation for a (source, target) pair
    pub fn between(source: MediaFormat, target: MediaFormat) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.source() == source && c.target() == target)
    }

    /// Short name used on the command line, e.g. `mp4-to-gif`
    pub fn name(&self) -> String {
        format!("{}-to-{}", self.source(), self.target())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let (source, target) = name.to_lowercase().split_once("-to-").map(|(s, t)| {
            (MediaFormat::from_extension(s), MediaFormat::from_extension(t))
        })?;
        Self::between(source?, target?)
    }

    /// Label shown next to the frame-rate setting
    pub fn label(&self) -> String {
        let upper = |f: MediaFormat| f.extension().to_uppercase();
        format!("{} to {} FPS", upper(self.source()), upper(self.target()))
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Pick the conversion for a lower-cased `extension`.
///
/// Video inputs always go to GIF; a GIF input goes to `gif_target`.
pub fn dispatch(
    extension: &str,
    gif_target: MediaFormat,
    variant: AppVariant,
) -> Result<Conversion> {
    let unsupported = || ConvertError::UnsupportedFileType {
        extension: extension.to_string(),
        supported: variant.supported_list(),
    };

    let source = MediaFormat::from_extension(extension).ok_or_else(unsupported)?;
    if !variant.supports(source) {
        return Err(unsupported());
    }

    let target = match (source, variant) {
        (MediaFormat::Gif, AppVariant::Mp4Only) => MediaFormat::Mp4,
        (MediaFormat::Gif, AppVariant::Full) => {
            if !gif_target.is_video() {
                return Err(ConvertError::UnsupportedTarget(gif_target.to_string()));
            }
            gif_target
        }
        _ => MediaFormat::Gif,
    };

    let conversion = Conversion::between(source, target).ok_or_else(unsupported)?;
    log::debug!("Dispatched .{} to {}", extension, conversion);
    Ok(conversion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn videos_always_go_to_gif() {
        for (ext, expected) in [
            ("mp4", Conversion::Mp4ToGif),
            ("webm", Conversion::WebmToGif),
            ("mov", Conversion::MovToGif),
            ("avi", Conversion::AviToGif),
        ] {
            let got = dispatch(ext, MediaFormat::Webm, AppVariant::Full).unwrap();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn gif_follows_selected_target() {
        for target in MediaFormat::VIDEO {
            let got = dispatch("gif", target, AppVariant::Full).unwrap();
            assert_eq!(got.source(), MediaFormat::Gif);
            assert_eq!(got.target(), target);
        }
    }

    #[test]
    fn gif_to_gif_is_rejected() {
        let err = dispatch("gif", MediaFormat::Gif, AppVariant::Full).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedTarget(_)));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = dispatch("txt", MediaFormat::Mp4, AppVariant::Full).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFileType { .. }));
        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[test]
    fn mp4_only_variant() {
        assert_eq!(
            dispatch("gif", MediaFormat::Webm, AppVariant::Mp4Only).unwrap(),
            Conversion::GifToMp4
        );
        let err = dispatch("mov", MediaFormat::Mp4, AppVariant::Mp4Only).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: Unsupported file type. Please select a .mp4 or .gif file."
        );
    }

    #[test]
    fn names_round_trip() {
        for c in Conversion::ALL {
            assert_eq!(Conversion::from_name(&c.name()), Some(c));
        }
        assert_eq!(Conversion::from_name("mp4-to-webm"), None);
        assert_eq!(Conversion::MovToGif.label(), "MOV to GIF FPS");
    }
}
