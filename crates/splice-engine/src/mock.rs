//! In-memory content source for testing.
//!
//! Provides [`MockSource`] for exercising the engine without filesystem or
//! network access. Every fetch is counted so tests can assert how many
//! physical reads a document caused.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use encoding_rs::Encoding;
use url::Url;

use crate::fetch::{ContentSource, FetchError};

/// Strip one trailing slash so `https://host/` and `https://host` match.
fn url_key(url: &str) -> String {
    url.strip_suffix('/').unwrap_or(url).to_owned()
}

/// Mock content source for testing.
///
/// Stores files and URLs in memory. Encodings are ignored. Use the builder
/// methods to configure the mock with test data.
///
/// # Example
///
/// ```ignore
/// use splice_engine::{Includer, MockSource};
///
/// let source = MockSource::new()
///     .with_file("/docs/intro.md", "Hello")
///     .with_url("https://example.com/a.md", "Remote");
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    files: RwLock<HashMap<PathBuf, String>>,
    urls: RwLock<HashMap<String, String>>,
    reads: RwLock<HashMap<String, usize>>,
}

impl MockSource {
    /// Create a new empty mock source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a local file.
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.set_file(path, content);
        self
    }

    /// Add a remote resource.
    #[must_use]
    pub fn with_url(self, url: &str, content: impl Into<String>) -> Self {
        self.urls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url_key(url), content.into());
        self
    }

    /// Add or replace a local file after construction.
    pub fn set_file(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), content.into());
    }

    /// Number of fetches of a path or URL, successful or not.
    #[must_use]
    pub fn read_count(&self, target: &str) -> usize {
        let reads = self.reads.read().unwrap_or_else(PoisonError::into_inner);
        reads
            .get(target)
            .or_else(|| reads.get(&url_key(target)))
            .copied()
            .unwrap_or(0)
    }

    /// Total number of fetches.
    #[must_use]
    pub fn total_reads(&self) -> usize {
        self.reads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    fn record(&self, key: String) {
        *self
            .reads
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default() += 1;
    }
}

impl ContentSource for MockSource {
    fn fetch_local(&self, path: &Path, _encoding: &'static Encoding) -> Result<String, FetchError> {
        self.record(path.display().to_string());
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::Io {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            })
    }

    fn fetch_remote(&self, url: &Url, _encoding: &'static Encoding) -> Result<String, FetchError> {
        let key = url_key(url.as_str());
        self.record(key.clone());
        self.urls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .ok_or_else(|| FetchError::Http {
                url: url.to_string(),
                message: "status code 404".to_owned(),
            })
    }
}
