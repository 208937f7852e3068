use std::{
    ffi::NulError,
    fmt,
    str::Utf8Error,
    sync::Arc,
};

use thiserror::Error as ThisError;

use crate::{ErrorCode, RawErrorCode};

pub mod prelude {
    pub use super::{
        err_msg, ErrorDetails, IndyError, IndyErrorExt, IndyErrorKind, IndyResult, IndyResultExt,
    };
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ThisError)]
pub enum IndyErrorKind {
    #[error("Invalid library state")]
    InvalidState,
    #[error("Invalid structure")]
    InvalidStructure,
    #[error("Command rejected by native library")]
    CommandRejected,
    #[error("Command failed in native library")]
    CommandFailed,
    #[error("Callback protocol violation")]
    ProtocolViolation,
    #[error("Native library could not be loaded")]
    LibraryLoading,
    #[error("Invalid configuration")]
    InvalidConfiguration,
    #[error("Command timed out")]
    Timeout,
}

/// Error details reported by the native side through `indy_get_current_error`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub message: Option<String>,
    pub backtrace: Option<String>,
}

#[derive(Debug, Clone, ThisError)]
pub struct IndyError {
    kind: IndyErrorKind,
    error_code: RawErrorCode,
    msg: Arc<String>,
    details: Option<Arc<ErrorDetails>>,
}

impl fmt::Display for IndyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {} (code {})", self.kind, self.error_code)?;

        if !self.msg.is_empty() {
            write!(f, "\n  Caused by: {}", self.msg)?;
        }

        if let Some(message) = self.details.as_ref().and_then(|d| d.message.as_ref()) {
            write!(f, "\n  Native: {message}")?;
        }

        Ok(())
    }
}

impl IndyError {
    pub fn from_msg<D>(kind: IndyErrorKind, msg: D) -> IndyError
    where
        D: fmt::Display + Send + Sync + 'static,
    {
        IndyError {
            kind,
            error_code: ErrorCode::from(kind).into(),
            msg: Arc::new(msg.to_string()),
            details: None,
        }
    }

    /// Error carrying the status code the native library reported, known or not.
    pub fn from_native<D>(kind: IndyErrorKind, error_code: RawErrorCode, msg: D) -> IndyError
    where
        D: fmt::Display + Send + Sync + 'static,
    {
        IndyError {
            kind,
            error_code,
            msg: Arc::new(msg.to_string()),
            details: None,
        }
    }

    pub fn with_details(self, details: Option<ErrorDetails>) -> IndyError {
        IndyError {
            details: details.map(Arc::new),
            ..self
        }
    }

    pub fn kind(&self) -> IndyErrorKind {
        self.kind
    }

    pub fn error_code(&self) -> RawErrorCode {
        self.error_code
    }

    pub fn known_error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_raw(self.error_code)
    }

    pub fn details(&self) -> Option<&ErrorDetails> {
        self.details.as_deref()
    }

    pub fn extend<D>(self, msg: D) -> IndyError
    where
        D: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        IndyError {
            msg: Arc::new(format!("{}\n  Caused by: {msg}", self.msg)),
            ..self
        }
    }

    pub fn map<D>(self, kind: IndyErrorKind, msg: D) -> IndyError
    where
        D: fmt::Display + Send + Sync + 'static,
    {
        IndyError {
            kind,
            msg: Arc::new(format!("{}\n  Caused by: {msg}", self.msg)),
            ..self
        }
    }
}

pub fn err_msg<D>(kind: IndyErrorKind, msg: D) -> IndyError
where
    D: fmt::Display + fmt::Debug + Send + Sync + 'static,
{
    IndyError::from_msg(kind, msg)
}

impl From<IndyErrorKind> for IndyError {
    fn from(kind: IndyErrorKind) -> IndyError {
        IndyError::from_msg(kind, String::new())
    }
}

impl From<IndyErrorKind> for ErrorCode {
    fn from(kind: IndyErrorKind) -> ErrorCode {
        match kind {
            IndyErrorKind::InvalidStructure => ErrorCode::CommonInvalidStructure,
            IndyErrorKind::LibraryLoading => ErrorCode::CommonIOError,
            IndyErrorKind::Timeout => ErrorCode::PoolLedgerTimeout,
            IndyErrorKind::InvalidState
            | IndyErrorKind::CommandRejected
            | IndyErrorKind::CommandFailed
            | IndyErrorKind::ProtocolViolation
            | IndyErrorKind::InvalidConfiguration => ErrorCode::CommonInvalidState,
        }
    }
}

impl From<futures::channel::oneshot::Canceled> for IndyError {
    fn from(err: futures::channel::oneshot::Canceled) -> Self {
        err.to_indy(
            IndyErrorKind::InvalidState,
            "Completion slot dropped without resolution",
        )
    }
}

impl From<serde_json::Error> for IndyError {
    fn from(err: serde_json::Error) -> Self {
        err.to_indy(IndyErrorKind::InvalidStructure, "Invalid JSON")
    }
}

impl From<Utf8Error> for IndyError {
    fn from(err: Utf8Error) -> Self {
        err.to_indy(
            IndyErrorKind::InvalidStructure,
            "Native string is not valid UTF-8",
        )
    }
}

impl From<NulError> for IndyError {
    fn from(err: NulError) -> IndyError {
        err.to_indy(
            IndyErrorKind::InvalidStructure,
            "Null symbols in string passed to native library",
        )
    }
}

impl From<log::SetLoggerError> for IndyError {
    fn from(err: log::SetLoggerError) -> IndyError {
        err.to_indy(IndyErrorKind::InvalidState, "Logger is already set")
    }
}

pub type IndyResult<T> = Result<T, IndyError>;

/// Extension methods for `Result`.
pub trait IndyResultExt<T, E> {
    fn to_indy<D>(self, kind: IndyErrorKind, msg: D) -> IndyResult<T>
    where
        D: fmt::Display + Send + Sync + 'static;
}

impl<T, E> IndyResultExt<T, E> for Result<T, E>
where
    E: fmt::Display,
{
    fn to_indy<D>(self, kind: IndyErrorKind, msg: D) -> IndyResult<T>
    where
        D: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|err| err.to_indy(kind, msg))
    }
}

/// Extension methods for `Error`.
pub trait IndyErrorExt {
    fn to_indy<D>(self, kind: IndyErrorKind, msg: D) -> IndyError
    where
        D: fmt::Display + Send + Sync + 'static;
}

impl<E> IndyErrorExt for E
where
    E: fmt::Display,
{
    fn to_indy<D>(self, kind: IndyErrorKind, msg: D) -> IndyError
    where
        D: fmt::Display + Send + Sync + 'static,
    {
        IndyError::from_msg(kind, format!("{msg}\n  Caused by: {self}"))
    }
}
