//! Runtime configuration read from the process environment.

use crate::error::{Result, XrayReportError};
use crate::llm::gateways::GeminiConfig;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

/// Everything the binary needs to start serving.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub model: String,
    pub bind: SocketAddr,
    pub skip_credential_check: bool,
}

impl AppConfig {
    /// Read configuration from environment variables.
    ///
    /// `GEMINI_API_KEY` is mandatory; everything else has a default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| XrayReportError::Config("GEMINI_API_KEY is not set".to_string()))?;

        let base_url = lookup("GEMINI_API_ENDPOINT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| GeminiConfig::DEFAULT_BASE_URL.to_string());

        let timeout = match lookup("XRAY_REPORT_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    XrayReportError::Config(format!("XRAY_REPORT_TIMEOUT_SECS is not a number: {raw}"))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let model = lookup("GEMINI_MODEL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let bind_raw = lookup("XRAY_REPORT_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw.parse().map_err(|_| {
            XrayReportError::Config(format!("XRAY_REPORT_BIND is not a socket address: {bind_raw}"))
        })?;

        let skip_credential_check = lookup("XRAY_REPORT_SKIP_CREDENTIAL_CHECK")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            gemini: GeminiConfig {
                api_key,
                base_url,
                timeout,
            },
            model,
            bind,
            skip_credential_check,
        })
    }
}
