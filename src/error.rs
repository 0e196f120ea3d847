use thiserror::Error;

/// Main error type for the videocut library
#[derive(Error, Debug)]
pub enum CutterError {
    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Video-specific errors
#[derive(Error, Debug)]
pub enum VideoError {
    /// The input is missing or the backend cannot read it.
    #[error("Failed to open video source: {path} ({reason})")]
    OpenFailed { path: String, reason: String },

    #[error("Failed to probe video metadata: {path} ({reason})")]
    ProbeFailed { path: String, reason: String },

    #[error("Video decoding failed: {reason}")]
    DecodingFailed { reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    /// Writing a still image failed.
    #[error("Failed to save image {path}: {reason}")]
    SaveFailed { path: String, reason: String },

    #[error("Invalid video parameters: {details}")]
    InvalidParameters { details: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path} ({reason})")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using CutterError
pub type Result<T> = std::result::Result<T, CutterError>;

impl CutterError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Whether the pipeline can keep running after this error.
    ///
    /// Save and encode failures only affect the operation that caused them;
    /// everything that happens before the pipeline starts is terminal.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Video(VideoError::SaveFailed { .. }) => true,
            Self::Video(VideoError::EncodingFailed { .. }) => true,
            Self::Io(_) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Video(VideoError::OpenFailed { path, .. }) => {
                format!("Could not open video file '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            Self::Config(ConfigError::MissingKey { key }) => {
                format!("Configuration is missing '{}'. Add it to the config file or pass it on the command line.", key)
            }
            _ => self.to_string(),
        }
    }
}
