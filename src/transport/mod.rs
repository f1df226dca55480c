pub mod http;
pub mod rendered;

#[cfg(test)]
pub mod fake;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::TransportError;

pub use http::HttpTransport;
pub use rendered::RenderedTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn get() -> Self {
        Self {
            method: Method::Get,
            body: None,
        }
    }

    /// POST with no body, used for confirmation actions.
    pub fn confirm() -> Self {
        Self {
            method: Method::Post,
            body: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
}

/// Network access for one run. Implementations own their cookie/session
/// state and apply their own retry budget before returning an error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str, request: FetchRequest) -> Result<FetchResponse, TransportError>;
}

/// Status codes worth another attempt.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}
