//! [`CountSource`] over HTTP using `reqwest`.

use async_trait::async_trait;
use tracing::debug;

use crate::api::{join_url, parse_count_body, CountSource, Endpoints};
use crate::config::ViewCounterConfig;
use crate::counters::ViewCount;
use crate::error::ApiError;

/// Talks to the portfolio backend's analytics endpoints.
///
/// ```rust,no_run
/// use contavisite::api::{CountSource, Endpoints, HttpCountSource};
///
/// # async fn run() -> Result<(), contavisite::error::ApiError> {
/// let source = HttpCountSource::new("https://api.example.com", &Endpoints::default());
/// let count = source.current().await?;
/// println!("{count} views");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpCountSource {
    client: reqwest::Client,
    increment_url: String,
    read_url: String,
}

impl HttpCountSource {
    /// Creates a source with a default `reqwest` client.
    pub fn new(base_url: &str, endpoints: &Endpoints) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, endpoints)
    }

    /// Creates a source that sends its requests through `client`.
    pub fn with_client(client: reqwest::Client, base_url: &str, endpoints: &Endpoints) -> Self {
        HttpCountSource {
            client,
            increment_url: join_url(base_url, &endpoints.increment),
            read_url: join_url(base_url, &endpoints.read),
        }
    }

    /// Builds a source from config, applying the request timeout if set.
    pub fn from_config(config: &ViewCounterConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(
            builder.build()?,
            &config.base_url,
            &config.endpoints(),
        ))
    }

    /// Absolute URL of the increment request.
    pub fn increment_url(&self) -> &str {
        &self.increment_url
    }

    /// Absolute URL of the read request.
    pub fn read_url(&self) -> &str {
        &self.read_url
    }
}

async fn read_count(response: reqwest::Response) -> Result<ViewCount, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status(status.as_u16()));
    }
    let body = response.bytes().await?;
    parse_count_body(&body)
}

#[async_trait]
impl CountSource for HttpCountSource {
    async fn increment(&self) -> Result<ViewCount, ApiError> {
        debug!(url = %self.increment_url, "incrementing view count");
        let response = self.client.post(&self.increment_url).send().await?;
        read_count(response).await
    }

    async fn current(&self) -> Result<ViewCount, ApiError> {
        debug!(url = %self.read_url, "reading view count");
        let response = self.client.get(&self.read_url).send().await?;
        read_count(response).await
    }
}
