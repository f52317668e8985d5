use std::path::PathBuf;
use thiserror::Error;

////////////
// Errors //
////////////

/// Root error type for parameter handling, training and checkpointing.
#[derive(Error, Debug)]
pub enum EncoderMapError {
    /// Reading or writing a parameter/checkpoint file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A parameter file did not contain valid JSON.
    #[error("malformed parameter file: {0}")]
    Json(#[from] serde_json::Error),

    /// A parameter file was missing a required field.
    #[error("parameter file is missing the `{0}` field")]
    MissingField(&'static str),

    /// A path could not be represented as UTF-8 for the parameter file.
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    /// A parameter value is out of range or inconsistent with the others.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Writing a model checkpoint failed.
    #[error("failed to write checkpoint: {0}")]
    Checkpoint(String),
}

pub type EmResult<T> = Result<T, EncoderMapError>;
