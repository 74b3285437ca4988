use std::path::PathBuf;
use thiserror::Error;

/// Everything that can end a conversion request
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Input file or output directory was not chosen
    #[error("Please select both an input file and an output directory.")]
    MissingSelection,

    #[error("Error: Unsupported file type. Please select a {supported} file.")]
    UnsupportedFileType {
        extension: String,
        supported: String,
    },

    /// GIF export target is not a video container
    #[error(
        "Error: Unsupported export format '{0}'. \
         GIFs can be exported as mp4, webm, mov, or avi."
    )]
    UnsupportedTarget(String),

    #[error("Error: Input file does not exist.")]
    InputNotFound(PathBuf),

    /// The external encoder failed
    #[error("Error during conversion: {0}")]
    Engine(String),

    #[error("Error during conversion: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Errors caught before a job starts are shown as a modal, not as status text
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ConvertError::MissingSelection
                | ConvertError::UnsupportedFileType { .. }
                | ConvertError::UnsupportedTarget(_)
        )
    }
}

impl From<anyhow::Error> for ConvertError {
    fn from(err: anyhow::Error) -> Self {
        ConvertError::Engine(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
