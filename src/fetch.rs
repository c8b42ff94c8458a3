//! Remote font fetching.
//!
//! `@font-face` rules routinely point at CDN-hosted files; when URL
//! following is enabled the analyzer downloads those to the output
//! directory before conversion. The fetch seam is a trait so tests (and
//! embedders with their own HTTP stack) can substitute implementations.

use crate::error::{Error, FetchError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Default User-Agent header sent with font downloads.
pub const DEFAULT_USER_AGENT: &str = concat!("fontpurge/", env!("CARGO_PKG_VERSION"));

/// Cap on downloaded font size; anything larger is rejected.
const MAX_FONT_BYTES: u64 = 50 * 1024 * 1024;

/// Fetches raw bytes for remote font sources.
pub trait RemoteFetcher: Send + Sync {
  /// GET `url` and return the raw response body.
  fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

impl<T: RemoteFetcher + ?Sized> RemoteFetcher for Arc<T> {
  fn fetch(&self, url: &str) -> Result<Vec<u8>> {
    (**self).fetch(url)
  }
}

/// Default HTTP fetcher
///
/// Follows redirects and applies a global timeout covering the whole
/// request. Matches the pipeline's expectations: one GET, raw bytes back,
/// any failure surfaced as a [`FetchError`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
  timeout: Duration,
  user_agent: String,
}

impl HttpFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Set the global request timeout
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Set the User-Agent header
  pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
    self.user_agent = user_agent.into();
    self
  }
}

impl Default for HttpFetcher {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(90),
      user_agent: DEFAULT_USER_AGENT.to_string(),
    }
  }
}

impl RemoteFetcher for HttpFetcher {
  fn fetch(&self, url: &str) -> Result<Vec<u8>> {
    let config = ureq::Agent::config_builder()
      .timeout_global(Some(self.timeout))
      .build();
    let agent: ureq::Agent = config.into();

    let mut response = agent
      .get(url)
      .header("User-Agent", &self.user_agent)
      .call()
      .map_err(|err| {
        Error::Fetch(FetchError::Request {
          url: url.to_string(),
          message: err.to_string(),
        })
      })?;

    let status = response.status();
    if !status.is_success() {
      return Err(Error::Fetch(FetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
      }));
    }

    let bytes = response
      .body_mut()
      .with_config()
      .limit(MAX_FONT_BYTES)
      .read_to_vec()
      .map_err(|err| {
        Error::Fetch(FetchError::Request {
          url: url.to_string(),
          message: err.to_string(),
        })
      })?;
    Ok(bytes)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct StaticFetcher {
    payload: Vec<u8>,
    calls: AtomicUsize,
  }

  impl RemoteFetcher for StaticFetcher {
    fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(self.payload.clone())
    }
  }

  #[test]
  fn arc_wrapped_fetchers_delegate() {
    let fetcher = Arc::new(StaticFetcher {
      payload: vec![1, 2, 3],
      calls: AtomicUsize::new(0),
    });
    let bytes = fetcher.fetch("http://example.com/font.ttf").expect("fetch");
    assert_eq!(bytes, vec![1, 2, 3]);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn default_fetcher_uses_90s_timeout() {
    let fetcher = HttpFetcher::new();
    assert_eq!(fetcher.timeout, Duration::from_secs(90));
    let fetcher = fetcher.with_timeout(Duration::from_secs(5));
    assert_eq!(fetcher.timeout, Duration::from_secs(5));
  }
}
