use std::path::PathBuf;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ParseError { file: PathBuf, message: String },
    InvalidArgument(String),
    NoModelFound(PathBuf),
    InvalidOverride(String),
    SerializationError(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::ParseError { file, message } => {
                write!(f, "Parse error in {}: {}", file.display(), message)
            }
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::NoModelFound(path) => {
                write!(f, "No IDL model found in {}", path.display())
            }
            Error::InvalidOverride(msg) => write!(f, "Invalid override payload: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML error: {}", err))
    }
}
