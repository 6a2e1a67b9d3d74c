//! The fetch boundary. The crawler only issues URLs; connection pooling,
//! rate limiting and retries live behind this trait.

use async_trait::async_trait;
use reqwest::Client;

use crate::Result;

/// Delivers the body of a document. A failure is terminal for that one URL;
/// the crawler never retries.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Plain HTTP fetcher over a shared connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let res = self.client.get(url).send().await?.error_for_status()?;
        Ok(res.text().await?)
    }
}
