use std::error::Error;
use std::fmt;

/// Custom Error and Result types to unify errors from all sources.
pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheError {
    Http(String),
    Fetch(String),
    Parse(String),
    InvalidQuery(String),
    Config(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CacheError::Http(s) => write!(f, "HTTP Error: {}", s),
            CacheError::Fetch(s) => write!(f, "Fetch Error: {}", s),
            CacheError::Parse(s) => write!(f, "Parse Error: {}", s),
            CacheError::InvalidQuery(s) => write!(f, "Invalid Query: {}", s),
            CacheError::Config(s) => write!(f, "Config Error: {}", s),
        }
    }
}

impl Error for CacheError {}

impl CacheError {
    /// Transient errors are retried on the next scheduled reload.
    pub fn is_transient(&self) -> bool {
        matches!(self, CacheError::Http(_) | CacheError::Fetch(_))
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(error: reqwest::Error) -> Self {
        CacheError::Http(error.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        CacheError::Parse(error.to_string())
    }
}

impl From<figment::Error> for CacheError {
    fn from(error: figment::Error) -> Self {
        CacheError::Config(error.to_string())
    }
}
