// src/error.rs
//! Error types for plant-scout

use std::fmt;

pub type Result<T> = std::result::Result<T, ScoutError>;

#[derive(Debug)]
pub enum ScoutError {
    Io(std::io::Error),
    Serial(tokio_serial::Error),
    Json(serde_json::Error),
    Http(reqwest::Error),
    Connection(String),
    Store(String),
    Parse(String),
    Other(String),
}

impl fmt::Display for ScoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoutError::Io(e) => write!(f, "IO error: {}", e),
            ScoutError::Serial(e) => write!(f, "Serial error: {}", e),
            ScoutError::Json(e) => write!(f, "JSON error: {}", e),
            ScoutError::Http(e) => write!(f, "HTTP error: {}", e),
            ScoutError::Connection(msg) => write!(f, "Connection error: {}", msg),
            ScoutError::Store(msg) => write!(f, "Store error: {}", msg),
            ScoutError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ScoutError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for ScoutError {}

impl From<std::io::Error> for ScoutError {
    fn from(error: std::io::Error) -> Self {
        ScoutError::Io(error)
    }
}

impl From<tokio_serial::Error> for ScoutError {
    fn from(error: tokio_serial::Error) -> Self {
        ScoutError::Serial(error)
    }
}

impl From<serde_json::Error> for ScoutError {
    fn from(error: serde_json::Error) -> Self {
        ScoutError::Json(error)
    }
}

impl From<reqwest::Error> for ScoutError {
    fn from(error: reqwest::Error) -> Self {
        ScoutError::Http(error)
    }
}

impl From<anyhow::Error> for ScoutError {
    fn from(error: anyhow::Error) -> Self {
        ScoutError::Other(error.to_string())
    }
}
