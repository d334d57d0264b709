use std::fmt;

/// Coarse classification of an [`Error`], for callers deciding whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Auth,
    BadResponse,
    Parse,
    Config,
}

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Auth(String),
    Status { status: u16, body: String },
    Parse(String),
    NoSpaSelected,
    InvalidArgument(String),
    Config(String),
    Observer(String),
    Io(std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Http(_) | Error::Io(_) => ErrorKind::Transport,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Status { .. } | Error::Observer(_) => ErrorKind::BadResponse,
            Error::Parse(_) => ErrorKind::Parse,
            Error::NoSpaSelected | Error::InvalidArgument(_) | Error::Config(_) => {
                ErrorKind::Config
            }
        }
    }

    /// Transport failures and 5xx responses are worth another attempt on the next tick.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::Io(_) | Error::Auth(_) => true,
            Error::Status { status, .. } => *status >= 500 || *status == 401,
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Auth(msg) => write!(f, "authentication failed: {msg}"),
            Error::Status { status, body } => write!(f, "unexpected HTTP status {status}: {body}"),
            Error::Parse(msg) => write!(f, "malformed vendor payload: {msg}"),
            Error::NoSpaSelected => write!(f, "no spa selected"),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
            Error::Observer(msg) => write!(f, "observer failed: {msg}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
