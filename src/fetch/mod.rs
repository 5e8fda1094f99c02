// src/fetch/mod.rs

use std::{cell::RefCell, collections::HashMap};

use crate::error::FetchError;

pub mod download;
pub mod http;

pub use download::download;
pub use http::HttpFetcher;

/// Something that can GET a URL.
///
/// Every call is blocking and independent; nothing is cached between calls.
pub trait Fetcher {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.get_bytes(url)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// In-memory URL → payload map, for offline runs and tests.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.insert(url, body);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.pages.insert(url.into(), body.into());
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Fetcher for StaticFetcher {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.borrow_mut().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_string(),
            })
    }
}
