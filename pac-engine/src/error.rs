//! Error types for PAC loading and evaluation

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PacError>;

#[derive(Debug, Error)]
pub enum PacError {
    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to load config from {path}: {source}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid PAC location {location}: {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("Unsupported PAC location scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    #[error("Failed to read PAC script from {path}: {source}")]
    ScriptRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to fetch PAC script: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("PAC download from {url} failed: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("PAC script failed to compile: {0}")]
    Compile(String),

    #[error("PAC script does not define a FindProxyForURL function")]
    MissingEntryPoint,

    #[error("PAC script raised an error: {0}")]
    Runtime(String),

    #[error("PAC script exceeded its {0:?} evaluation budget")]
    Timeout(Duration),

    #[error("FindProxyForURL returned no result")]
    EmptyResult,

    #[error("Cannot evaluate PAC for {target}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("PAC script previously failed to load: {0}")]
    LoadFaulted(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid PAC URL: {url}")]
    InvalidPacUrl { url: String },

    #[error("Sandbox limit {name} must be greater than zero")]
    ZeroLimit { name: &'static str },

    #[error("Fetch timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Script evaluation timeout must be greater than zero")]
    ZeroEvalTimeout,
}

impl PacError {
    /// Whether this error came from loading the script rather than from a
    /// single evaluation
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            PacError::InvalidLocation { .. }
                | PacError::UnsupportedScheme { .. }
                | PacError::ScriptRead { .. }
                | PacError::Fetch(_)
                | PacError::HttpStatus { .. }
                | PacError::Compile(_)
                | PacError::MissingEntryPoint
                | PacError::LoadFaulted(_)
        )
    }
}
