use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("render of {url} failed: {message}")]
    Render { url: String, message: String },

    #[error("{method} is not supported by this transport")]
    Unsupported { method: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorCode {
    GateAcceptFailed,
    FetchFailed,
}

impl SessionErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionErrorCode::GateAcceptFailed => "GATE_ACCEPT_FAILED",
            SessionErrorCode::FetchFailed => "FETCH_FAILED",
        }
    }
}

impl fmt::Display for SessionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const SCRAPE_FAILED: &str = "SCRAPE_FAILED";

/// Fatal outcome of a run; no document is produced.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("{code} for {identifier}: {details}")]
    Session {
        code: SessionErrorCode,
        identifier: String,
        details: String,
    },

    #[error("SCRAPE_FAILED for {identifier}: {message}")]
    ScrapeFailed { identifier: String, message: String },
}

impl ScrapeError {
    pub fn session(code: SessionErrorCode, identifier: &str, details: impl fmt::Display) -> Self {
        ScrapeError::Session {
            code,
            identifier: identifier.to_string(),
            details: details.to_string(),
        }
    }

    pub fn failed(identifier: &str, message: impl fmt::Display) -> Self {
        ScrapeError::ScrapeFailed {
            identifier: identifier.to_string(),
            message: message.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ScrapeError::Session { code, .. } => code.as_str(),
            ScrapeError::ScrapeFailed { .. } => SCRAPE_FAILED,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
