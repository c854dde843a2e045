//! Configuration options for the PowerFlow client

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;
use crate::estimator::{DEFAULT_RATE_PER_KWH, SUMMARY_USAGE_HOURS};
use crate::suggestion::MIN_SUGGESTION_CHARS;

/// Backend used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Where the CLI keeps the session unless told otherwise
pub const DEFAULT_SESSION_PATH: &str = ".powerflow/session.json";

/// Configuration options for the PowerFlow client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Base URL of the backend, without the `/api` prefix
    pub api_url: String,

    /// Overall request timeout; `None` leaves the transport default
    pub request_timeout: Option<Duration>,

    /// Tariff in Lempiras per kWh
    pub rate_per_kwh: f64,

    /// Daily usage assumed for every device in the summary figures
    pub summary_usage_hours: f64,

    /// Name length at which a suggestion is requested
    pub suggestion_min_chars: usize,

    /// File holding the persisted session
    pub session_path: PathBuf,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: None,
            rate_per_kwh: DEFAULT_RATE_PER_KWH,
            summary_usage_hours: SUMMARY_USAGE_HOURS,
            suggestion_min_chars: MIN_SUGGESTION_CHARS,
            session_path: PathBuf::from(DEFAULT_SESSION_PATH),
        }
    }
}

impl ClientOptions {
    /// Defaults overridden by `POWERFLOW_*` environment variables
    ///
    /// Recognised: `POWERFLOW_API_URL`, `POWERFLOW_RATE_PER_KWH`,
    /// `POWERFLOW_SESSION_PATH`, `POWERFLOW_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, Error> {
        let mut options = Self::default();

        if let Ok(url) = env::var("POWERFLOW_API_URL") {
            options = options.with_api_url(&url)?;
        }

        if let Ok(rate) = env::var("POWERFLOW_RATE_PER_KWH") {
            let rate = rate.trim().parse::<f64>().map_err(|_| {
                Error::config(format!("POWERFLOW_RATE_PER_KWH is not a number: {}", rate))
            })?;
            options = options.with_rate_per_kwh(rate)?;
        }

        if let Ok(path) = env::var("POWERFLOW_SESSION_PATH") {
            options = options.with_session_path(path);
        }

        if let Ok(secs) = env::var("POWERFLOW_TIMEOUT_SECS") {
            let secs = secs.trim().parse::<u64>().map_err(|_| {
                Error::config(format!("POWERFLOW_TIMEOUT_SECS is not a whole number: {}", secs))
            })?;
            options = options.with_request_timeout(Some(Duration::from_secs(secs)));
        }

        Ok(options)
    }

    /// Set the backend URL; must be an absolute http(s) URL
    pub fn with_api_url(mut self, value: &str) -> Result<Self, Error> {
        let url = url::Url::parse(value)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!("unsupported scheme: {}", url.scheme())));
        }
        self.api_url = value.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the tariff; must be finite and non-negative
    pub fn with_rate_per_kwh(mut self, value: f64) -> Result<Self, Error> {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::config(format!("invalid rate per kWh: {}", value)));
        }
        self.rate_per_kwh = value;
        Ok(self)
    }

    /// Override the assumed daily hours for the summary figures
    pub fn with_summary_usage_hours(mut self, value: f64) -> Result<Self, Error> {
        if !(0.0..=24.0).contains(&value) {
            return Err(Error::config(format!("invalid summary usage hours: {}", value)));
        }
        self.summary_usage_hours = value;
        Ok(self)
    }

    /// Set the suggestion trigger length
    pub fn with_suggestion_min_chars(mut self, value: usize) -> Self {
        self.suggestion_min_chars = value;
        self
    }

    /// Set the session file
    pub fn with_session_path(mut self, value: impl Into<PathBuf>) -> Self {
        self.session_path = value.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.api_url, "http://localhost:5000");
        assert_eq!(options.rate_per_kwh, 3.7);
        assert_eq!(options.summary_usage_hours, 6.0);
        assert_eq!(options.suggestion_min_chars, 3);
        assert_eq!(options.request_timeout, None);
    }

    #[test]
    fn test_builders_validate() {
        let options = ClientOptions::default()
            .with_api_url("https://energia.example.com/")
            .unwrap();
        assert_eq!(options.api_url, "https://energia.example.com");

        assert!(ClientOptions::default().with_api_url("not a url").is_err());
        assert!(ClientOptions::default().with_api_url("ftp://x.example").is_err());
        assert!(ClientOptions::default().with_rate_per_kwh(-1.0).is_err());
        assert!(ClientOptions::default().with_summary_usage_hours(25.0).is_err());
    }
}
