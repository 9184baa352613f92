use envconfig::Envconfig;
use url::Url;

use crate::error::GatewayError;

/// Merchant id of the provider's public sandbox.
pub const SANDBOX_MERCHANT: &str = "zibal";
pub const DEFAULT_API_URL: &str = "https://gateway.zibal.ir/v1/";
pub const DEFAULT_START_URL: &str = "https://gateway.zibal.ir/start/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Envconfig, Debug, Clone)]
pub struct ZibalConfig {
    #[envconfig(from = "ZIBAL_MERCHANT", default = "zibal")]
    pub merchant: String,

    /// Base of the JSON API; `request` and `verify` are resolved against it.
    #[envconfig(from = "ZIBAL_API_URL", default = "https://gateway.zibal.ir/v1/")]
    pub api_url: Url,

    /// Payer-facing page; the track id is appended to it.
    #[envconfig(from = "ZIBAL_START_URL", default = "https://gateway.zibal.ir/start/")]
    pub start_url: Url,

    #[envconfig(from = "ZIBAL_TIMEOUT_SECS", default = "30")]
    pub timeout_secs: u64,
}

impl ZibalConfig {
    pub fn from_env() -> Result<Self, envconfig::Error> {
        ZibalConfig::init_from_env()
    }

    /// Production endpoints with the sandbox merchant, without touching the
    /// environment.
    pub fn sandbox() -> Result<Self, GatewayError> {
        Self::for_merchant(SANDBOX_MERCHANT)
    }

    pub fn for_merchant(merchant: impl Into<String>) -> Result<Self, GatewayError> {
        let api_url = Url::parse(DEFAULT_API_URL).map_err(|e| GatewayError::UrlParse {
            context: "Failed to parse default API URL",
            source: e,
        })?;
        let start_url = Url::parse(DEFAULT_START_URL).map_err(|e| GatewayError::UrlParse {
            context: "Failed to parse default start URL",
            source: e,
        })?;
        Ok(Self {
            merchant: merchant.into(),
            api_url,
            start_url,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_point_at_production_gateway() {
        let config = ZibalConfig::init_from_hashmap(&HashMap::new()).unwrap();
        assert_eq!(config.merchant, SANDBOX_MERCHANT);
        assert_eq!(config.api_url.as_str(), DEFAULT_API_URL);
        assert_eq!(config.start_url.as_str(), DEFAULT_START_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn environment_overrides_defaults() {
        let vars = HashMap::from([
            ("ZIBAL_MERCHANT".to_string(), "shop-42".to_string()),
            ("ZIBAL_API_URL".to_string(), "http://localhost:9000/v1/".to_string()),
            ("ZIBAL_TIMEOUT_SECS".to_string(), "5".to_string()),
        ]);
        let config = ZibalConfig::init_from_hashmap(&vars).unwrap();
        assert_eq!(config.merchant, "shop-42");
        assert_eq!(config.api_url.as_str(), "http://localhost:9000/v1/");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn sandbox_matches_env_defaults() {
        let config = ZibalConfig::sandbox().unwrap();
        assert_eq!(config.merchant, "zibal");
        assert_eq!(config.start_url.as_str(), "https://gateway.zibal.ir/start/");
    }
}
