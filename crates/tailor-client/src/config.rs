use std::time::Duration;

use crate::errors::ClientError;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// What to do with undelimited bytes still buffered when the stream ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrailingFragment {
    /// Drop the fragment (logged at `warn` when non-empty).
    #[default]
    Discard,
    /// Treat the fragment as one final line before declaring the stream incomplete.
    Flush,
}

/// Configuration for [`AnalyzeClient`](crate::client::AnalyzeClient) and its HTTP transport.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the generation service, without the `/api` suffix.
    pub base_url: String,
    /// Optional deadline for a whole analyze call, streaming included.
    pub timeout: Option<Duration>,
    /// TCP connect timeout for the HTTP client.
    pub connect_timeout: Duration,
    /// Handling of an unterminated final line.
    pub trailing_fragment: TrailingFragment,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            trailing_fragment: TrailingFragment::Discard,
        }
    }
}

impl ClientConfig {
    /// Creates a config pointing at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builds a config from `TAILOR_API_URL` and `TAILOR_TIMEOUT_SECS`.
    ///
    /// Both are optional; the base URL falls back to `http://localhost:8000`.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = match std::env::var("TAILOR_API_URL") {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::default(),
        };
        if let Ok(raw) = std::env::var("TAILOR_TIMEOUT_SECS")
            && !raw.trim().is_empty()
        {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ClientError::Config(format!("TAILOR_TIMEOUT_SECS must be an integer, got `{raw}`"))
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the service base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets a deadline for each analyze call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Selects the trailing fragment policy.
    pub fn trailing_fragment(mut self, policy: TrailingFragment) -> Self {
        self.trailing_fragment = policy;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must start with http:// or https://, got `{base}`"
            )));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ClientError::Config("timeout must be greater than 0".into()));
        }
        Ok(())
    }

    fn api_root(&self) -> String {
        format!("{}/api", self.base_url.trim().trim_end_matches('/'))
    }

    /// Endpoint that accepts the multipart analyze request.
    pub fn analyze_url(&self) -> String {
        format!("{}/analyze", self.api_root())
    }

    /// Retrieval URL for an artifact the service named in a result.
    pub fn download_url(&self, filename: &str) -> String {
        format!("{}/download/{filename}", self.api_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_joined_without_double_slashes() {
        let config = ClientConfig::new("https://tailor.example.com/");
        assert_eq!(config.analyze_url(), "https://tailor.example.com/api/analyze");
        assert_eq!(
            config.download_url("cover_letter_20250101_120000.md"),
            "https://tailor.example.com/api/download/cover_letter_20250101_120000.md"
        );
    }

    #[test]
    fn default_points_at_local_service() {
        let config = ClientConfig::default();
        assert_eq!(config.analyze_url(), "http://localhost:8000/api/analyze");
        assert_eq!(config.trailing_fragment, TrailingFragment::Discard);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn validate_rejects_bad_base_urls_and_zero_timeout() {
        assert!(matches!(
            ClientConfig::new("  ").validate(),
            Err(ClientError::Config(msg)) if msg.contains("must not be empty")
        ));
        assert!(matches!(
            ClientConfig::new("localhost:8000").validate(),
            Err(ClientError::Config(msg)) if msg.contains("http://")
        ));
        assert!(
            ClientConfig::default()
                .timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(ClientConfig::default().validate().is_ok());
    }
}
