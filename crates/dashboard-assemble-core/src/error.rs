use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    MarkerNotFound = 1,
    InvalidPayload = 2,
    Serialization = 3,
    InvalidArguments = 4,
    Io = 5,
    Validation = 6,
}

impl ExitCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Success),
            1 => Some(Self::MarkerNotFound),
            2 => Some(Self::InvalidPayload),
            3 => Some(Self::Serialization),
            4 => Some(Self::InvalidArguments),
            5 => Some(Self::Io),
            6 => Some(Self::Validation),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("marker '{marker}' occurs {occurrences} times in shell (expected exactly one)")]
    MarkerNotFound { marker: String, occurrences: usize },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("payload cannot be serialized: {0}")]
    Serialization(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("validation failed: {0}")]
    Validation(String),
}

impl AssembleError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::MarkerNotFound { .. } => ExitCode::MarkerNotFound,
            Self::InvalidPayload(_) => ExitCode::InvalidPayload,
            Self::Serialization(_) => ExitCode::Serialization,
            Self::InvalidArguments(_) => ExitCode::InvalidArguments,
            Self::Io { .. } => ExitCode::Io,
            Self::Validation(_) => ExitCode::Validation,
        }
    }
}

pub type AssembleResult<T> = Result<T, AssembleError>;
