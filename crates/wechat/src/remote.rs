//! Blocking remote fetches for stickers and card icons.

use crate::error::{WeChatError, WeChatResult};
use std::time::Duration;
use tracing::debug;

/// Source of remote bytes.
pub trait RemoteFetch {
    /// Fetch `url` in full.
    fn fetch(&self, url: &str) -> WeChatResult<Vec<u8>>;
}

/// Plain blocking HTTP client.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Build a client with a per-request timeout.
    pub fn new(timeout: Duration) -> WeChatResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl RemoteFetch for HttpFetcher {
    fn fetch(&self, url: &str) -> WeChatResult<Vec<u8>> {
        debug!("fetching {}", url);
        let response = self.client.get(url).send()?.error_for_status()?;
        let bytes = response.bytes()?;
        if bytes.is_empty() {
            return Err(WeChatError::Remote(format!("empty body from {}", url)));
        }
        Ok(bytes.to_vec())
    }
}

/// Fetcher used when downloads are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct Offline;

impl RemoteFetch for Offline {
    fn fetch(&self, url: &str) -> WeChatResult<Vec<u8>> {
        Err(WeChatError::Remote(format!("downloads disabled: {}", url)))
    }
}
