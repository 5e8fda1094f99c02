// src/fetch/http.rs

use reqwest::blocking::{Client, Response};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::Fetcher;
use crate::error::FetchError;

/// Blocking HTTP GET with library-default headers. No retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// `timeout` of `None` keeps the client's default behaviour.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<Response, FetchError> {
        let parsed = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        debug!("GET {}", parsed);

        let resp = self
            .client
            .get(parsed)
            .send()
            .map_err(|e| request_error(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(resp)
    }
}

fn request_error(url: &str, source: reqwest::Error) -> FetchError {
    if source.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Request {
            url: url.to_string(),
            source,
        }
    }
}

impl Fetcher for HttpFetcher {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let bytes = self
            .get(url)?
            .bytes()
            .map_err(|e| request_error(url, e))?;
        Ok(bytes.to_vec())
    }

    /// Decodes using the response charset, like `requests`' `res.text`.
    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.get(url)?.text().map_err(|e| request_error(url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_a_fetch_error() {
        let f = HttpFetcher::new(Some(Duration::from_secs(1))).unwrap();
        assert!(matches!(
            f.get_text("not a url"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }
}
