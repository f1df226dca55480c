use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::{debug, warn};

use super::{is_retryable_status, FetchRequest, FetchResponse, Method, Transport};
use crate::config::FetchConfig;
use crate::error::TransportError;

/// Plain HTTP with a per-run cookie jar.
pub struct HttpTransport {
    client: Client,
    config: FetchConfig,
}

impl HttpTransport {
    pub fn new(config: FetchConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| anyhow::anyhow!("invalid header name '{}': {}", key, e))?;
            let val = HeaderValue::from_str(value)
                .map_err(|e| anyhow::anyhow!("invalid header value '{}': {}", value, e))?;
            headers.insert(name, val);
        }

        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    async fn send_once(&self, url: &str, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        let builder = match &request.body {
            Some(body) => builder.body(body.clone()),
            None => builder,
        };

        let response = builder.send().await.map_err(|source| TransportError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response.text().await.map_err(|source| TransportError::Http {
            url: url.to_string(),
            source,
        })?;

        Ok(FetchResponse {
            status,
            body,
            headers,
        })
    }
}

/// `Retry-After` given in seconds.
fn retry_after(response: &FetchResponse) -> Option<Duration> {
    response
        .headers
        .get("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str, request: FetchRequest) -> Result<FetchResponse, TransportError> {
        let mut attempt = 0;
        loop {
            debug!("{} {} (attempt {})", request.method.as_str(), url, attempt + 1);
            let outcome = self.send_once(url, &request).await;

            let should_retry = match &outcome {
                Ok(r) => is_retryable_status(r.status),
                Err(TransportError::Http { source, .. }) => source.is_timeout() || source.is_connect(),
                Err(_) => false,
            };

            if !should_retry || attempt >= self.config.max_retries {
                let response = outcome?;
                if !(200..300).contains(&response.status) {
                    return Err(TransportError::Status {
                        url: url.to_string(),
                        status: response.status,
                    });
                }
                return Ok(response);
            }

            let base = self.config.backoff(attempt);
            let backoff = match &outcome {
                Ok(r) => retry_after(r).map_or(base, |d| d.max(base)),
                Err(_) => base,
            };
            warn!(
                "Transient failure on {} (attempt {}/{}), backing off {:.1}s",
                url,
                attempt + 1,
                self.config.max_retries,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}
