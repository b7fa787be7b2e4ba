//! Content retrieval for include targets.
//!
//! [`ContentSource`] is the seam between the engine and the outside world.
//! [`DefaultSource`] reads from the filesystem and downloads over HTTP with
//! a reusable `ureq` agent; tests and hosts with their own I/O plug in other
//! implementations.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use encoding_rs::Encoding;
use ureq::Agent;
use url::Url;

/// Failure to obtain the text of an include target.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The download failed (DNS, connection, HTTP status, body).
    #[error("failed to download {url}: {message}")]
    Http {
        /// Requested URL.
        url: String,
        /// Error message from the HTTP client.
        message: String,
    },
    /// The bytes are not valid in the requested encoding.
    #[error("{target} is not valid {encoding}")]
    Decode {
        /// Path or URL of the content.
        target: String,
        /// Name of the encoding used.
        encoding: &'static str,
    },
}

/// Source of include content.
///
/// Implementations must not panic on bad input; every failure is reported
/// through [`FetchError`] and the engine applies its failure policy.
pub trait ContentSource: Send + Sync {
    /// Read and decode a local file.
    fn fetch_local(&self, path: &Path, encoding: &'static Encoding) -> Result<String, FetchError>;

    /// Download and decode a remote resource.
    fn fetch_remote(&self, url: &Url, encoding: &'static Encoding) -> Result<String, FetchError>;
}

impl<S: ContentSource + ?Sized> ContentSource for Arc<S> {
    fn fetch_local(&self, path: &Path, encoding: &'static Encoding) -> Result<String, FetchError> {
        (**self).fetch_local(path, encoding)
    }

    fn fetch_remote(&self, url: &Url, encoding: &'static Encoding) -> Result<String, FetchError> {
        (**self).fetch_remote(url, encoding)
    }
}

/// Create HTTP agent with the specified timeout.
///
/// Redirects are followed; HTTP error statuses are reported as errors.
pub(crate) fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Decode `bytes` with `encoding`, treating malformed input as an error.
pub(crate) fn decode(
    bytes: &[u8],
    encoding: &'static Encoding,
    target: &str,
) -> Result<String, FetchError> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
        .ok_or_else(|| FetchError::Decode {
            target: target.to_owned(),
            encoding: encoding.name(),
        })
}

/// Filesystem and HTTP backed [`ContentSource`].
pub struct DefaultSource {
    /// HTTP agent for connection pooling (reused across fetches).
    agent: Agent,
}

impl DefaultSource {
    /// Create a source whose downloads time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: create_agent(timeout),
        }
    }
}

impl ContentSource for DefaultSource {
    fn fetch_local(&self, path: &Path, encoding: &'static Encoding) -> Result<String, FetchError> {
        let bytes = std::fs::read(path).map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        decode(&bytes, encoding, &path.display().to_string())
    }

    fn fetch_remote(&self, url: &Url, encoding: &'static Encoding) -> Result<String, FetchError> {
        tracing::info!(url = %url, "Downloading include");
        let http_error = |e: ureq::Error| FetchError::Http {
            url: url.to_string(),
            message: e.to_string(),
        };

        let mut response = self.agent.get(url.as_str()).call().map_err(http_error)?;
        let bytes = response.body_mut().read_to_vec().map_err(http_error)?;
        decode(&bytes, encoding, url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_8, WINDOWS_1252};
    use pretty_assertions::assert_eq;
    use std::io::{BufRead, BufReader, Write as _};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};
    use tempfile::TempDir;

    /// Serve one canned HTTP response on a local port.
    fn serve_once(status: &'static str, body: &'static [u8]) -> (Url, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = Url::parse(&format!("http://{}/doc.md", listener.local_addr().unwrap())).unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            let mut stream = stream;
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            // The client may hang up early on error statuses
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(body);
        });
        (url, handle)
    }

    fn source() -> DefaultSource {
        DefaultSource::new(Duration::from_secs(2))
    }

    #[test]
    fn test_fetch_local_utf8() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        std::fs::write(&path, "héllo\nworld\n").unwrap();

        let text = source().fetch_local(&path, UTF_8).unwrap();
        assert_eq!(text, "héllo\nworld\n");
    }

    #[test]
    fn test_fetch_local_other_encoding() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("latin.txt");
        std::fs::write(&path, b"caf\xe9").unwrap();

        let text = source().fetch_local(&path, WINDOWS_1252).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn test_fetch_local_decode_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("latin.txt");
        std::fs::write(&path, b"caf\xe9").unwrap();

        let err = source().fetch_local(&path, UTF_8).unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_fetch_local_missing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing.md");

        let err = source().fetch_local(&path, UTF_8).unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
        assert!(err.to_string().contains("missing.md"));
    }

    #[test]
    fn test_fetch_remote_decodes_body() {
        let (url, server) = serve_once("200 OK", b"caf\xe9");

        let text = source().fetch_remote(&url, WINDOWS_1252).unwrap();
        server.join().unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn test_fetch_remote_error_status() {
        let (url, server) = serve_once("404 Not Found", b"missing");

        let err = source().fetch_remote(&url, UTF_8).unwrap_err();
        server.join().unwrap();
        assert!(matches!(&err, FetchError::Http { message, .. } if message.contains("404")));
    }

    #[test]
    fn test_fetch_remote_connection_refused() {
        let url = Url::parse("http://127.0.0.1:9/nothing").unwrap();

        let err = source().fetch_remote(&url, UTF_8).unwrap_err();
        assert!(matches!(err, FetchError::Http { .. }));
    }
}
