use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::{debug, warn};

use super::{FetchRequest, FetchResponse, Method, Transport};
use crate::config::FetchConfig;
use crate::error::TransportError;

/// Browser-rendered fetches through spider.cloud. Each call is an independent
/// navigation; the rendering service keeps its own browser context.
pub struct RenderedTransport {
    spider: Spider,
    config: FetchConfig,
}

impl RenderedTransport {
    pub fn new(config: FetchConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("SPIDER_API_KEY")
            .map_err(|_| anyhow::anyhow!("SPIDER_API_KEY environment variable must be set"))?;
        let spider = Spider::new(Some(api_key))
            .map_err(|e| anyhow::anyhow!("Failed to create Spider client: {}", e))?;
        Ok(Self { spider, config })
    }

    async fn render_once(&self, url: &str) -> Result<FetchResponse, TransportError> {
        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
            ..Default::default()
        };

        let start = Instant::now();
        let response = tokio::time::timeout(
            self.config.timeout,
            self.spider.scrape_url(url, Some(params), "application/json"),
        )
        .await
        .map_err(|_| TransportError::Render {
            url: url.to_string(),
            message: format!("timed out after {:.1}s", self.config.timeout.as_secs_f64()),
        })?
        .map_err(|e| TransportError::Render {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        debug!("Rendered {} in {}ms", url, start.elapsed().as_millis());

        parse_render_response(url, response)
    }
}

/// Pull `content` and `status` from the first entry of a render response.
fn parse_render_response(url: &str, value: serde_json::Value) -> Result<FetchResponse, TransportError> {
    let parsed: serde_json::Value = match value.as_str() {
        Some(s) => serde_json::from_str(s).unwrap_or(value.clone()),
        None => value,
    };
    let first = parsed.as_array().and_then(|arr| arr.first());

    let status = first
        .and_then(|obj| obj.get("status"))
        .and_then(|s| s.as_u64())
        .map(|s| s as u16)
        .unwrap_or(200);
    if !(200..300).contains(&status) {
        return Err(TransportError::Status {
            url: url.to_string(),
            status,
        });
    }

    let body = first
        .and_then(|obj| obj.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| TransportError::Render {
            url: url.to_string(),
            message: "no content in render response".to_string(),
        })?
        .to_string();

    Ok(FetchResponse {
        status,
        body,
        headers: HashMap::new(),
    })
}

fn is_transient(err: &TransportError) -> bool {
    match err {
        TransportError::Status { status, .. } => super::is_retryable_status(*status),
        TransportError::Render { message, .. } => {
            message.contains("429")
                || message.contains("rate")
                || message.contains("500")
                || message.contains("502")
                || message.contains("503")
                || message.contains("timed out")
        }
        _ => false,
    }
}

#[async_trait]
impl Transport for RenderedTransport {
    async fn fetch(&self, url: &str, request: FetchRequest) -> Result<FetchResponse, TransportError> {
        if request.method != Method::Get {
            return Err(TransportError::Unsupported {
                method: request.method.as_str(),
            });
        }

        let mut attempt = 0;
        loop {
            match self.render_once(url).await {
                Err(e) if is_transient(&e) && attempt < self.config.max_retries => {
                    let backoff = self.config.backoff(attempt);
                    warn!(
                        "Render of {} failed (attempt {}/{}): {}, backing off {:.1}s",
                        url,
                        attempt + 1,
                        self.config.max_retries,
                        e,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}
