use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::fetch::Transport;
use crate::normalize::InvalidAmountPolicy;
use crate::upstream::{ProxyClient, UpstreamClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    Tui,
    Web,
    Headless,
    Sandbox,
}

/// Fully resolved runtime configuration. Built once at startup; components
/// receive the pieces they need and never read the environment themselves.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: Mode,
    pub base_url: Option<String>,
    pub api_key: String,
    pub account_id: String,
    pub proxy_url: Option<String>,
    pub data_dir: PathBuf,
    pub port: u16,
    pub static_dir: PathBuf,
    pub invalid_amounts: InvalidAmountPolicy,
    pub timeout: Duration,
    pub sandbox_movements: usize,
    pub anomaly_rate: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::Tui,
            base_url: None,
            api_key: String::new(),
            account_id: "999".to_string(),
            proxy_url: None,
            data_dir: PathBuf::from(".bankwatch"),
            port: 3000,
            static_dir: PathBuf::from("static"),
            invalid_amounts: InvalidAmountPolicy::Drop,
            timeout: Duration::from_secs(30),
            sandbox_movements: 60,
            anomaly_rate: 0.1,
        }
    }
}

impl Settings {
    /// Bank base URL with any trailing slash removed, since endpoints are
    /// appended with their leading slash.
    pub fn upstream_base(&self) -> Result<String, ConfigError> {
        let raw = self
            .base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::Missing("BANK_API_BASE_URL"))?;
        Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { url: raw.to_string(), source })?;
        Ok(raw.trim_end_matches('/').to_string())
    }

    pub fn proxy(&self) -> Result<Option<Url>, ConfigError> {
        match self.proxy_url.as_deref().filter(|u| !u.trim().is_empty()) {
            None => Ok(None),
            Some(raw) => Url::parse(raw)
                .map(Some)
                .map_err(|source| ConfigError::InvalidUrl { url: raw.to_string(), source }),
        }
    }

    /// Check that everything the selected mode needs is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.mode {
            Mode::Sandbox if !(0.0..=1.0).contains(&self.anomaly_rate) => {
                Err(ConfigError::InvalidAnomalyRate(self.anomaly_rate))
            }
            Mode::Sandbox => Ok(()),
            Mode::Web => self.upstream_base().map(|_| ()),
            Mode::Tui | Mode::Headless => match self.proxy()? {
                Some(_) => Ok(()),
                None => self.upstream_base().map(|_| ()),
            },
        }
    }

    pub fn upstream_client(&self) -> Result<UpstreamClient, Box<dyn std::error::Error>> {
        let base = self.upstream_base()?;
        Ok(UpstreamClient::new(base, self.api_key.clone(), self.timeout)?)
    }

    /// The proxy when one is configured, the bank directly otherwise.
    pub fn transport(&self) -> Result<Arc<dyn Transport>, Box<dyn std::error::Error>> {
        if let Some(proxy_url) = self.proxy()? {
            return Ok(Arc::new(ProxyClient::new(proxy_url, self.timeout)?));
        }
        Ok(Arc::new(self.upstream_client()?))
    }
}
