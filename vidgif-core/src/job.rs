use std::path::{Path, PathBuf};

use crate::dispatcher::{Conversion, dispatch};
use crate::error::{ConvertError, Result};
use crate::format::{AppVariant, MediaFormat, extension_of};

/// One conversion request, consumed by a single background task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub conversion: Conversion,
}

impl ConversionJob {
    /// Validate the selection and pick the conversion.
    ///
    /// Fails with [`ConvertError::MissingSelection`] if either path is empty and
    /// with [`ConvertError::UnsupportedFileType`] for extensions the variant
    /// does not handle. Neither check touches the filesystem.
    pub fn prepare(
        input: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
        gif_target: MediaFormat,
        variant: AppVariant,
    ) -> Result<Self> {
        let input = input.as_ref();
        let output_dir = output_dir.as_ref();
        if input.as_os_str().is_empty() || output_dir.as_os_str().is_empty() {
            return Err(ConvertError::MissingSelection);
        }

        let conversion = dispatch(&extension_of(input), gif_target, variant)?;

        Ok(Self {
            input: input.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            conversion,
        })
    }

    fn stem(&self) -> String {
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// `<output_dir>/<input-stem>.<target-ext>`
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.stem(), self.conversion.target().extension()))
    }

    /// Scratch MP4 for the two-stage MOV path. Hidden and suffixed so it never
    /// collides with a real `<stem>.mp4` next to the input.
    pub fn intermediate_path(&self) -> PathBuf {
        self.output_dir.join(format!(".{}.vidgif-tmp.mp4", self.stem()))
    }
}
