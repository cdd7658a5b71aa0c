use std::env;

use dotenv::dotenv;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub payment_currency: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenv().ok();

        let config = Self {
            api_base_url: env::var("CARELINK_API_URL")
                .unwrap_or_else(|_| {
                    warn!("CARELINK_API_URL not set, using empty value");
                    String::new()
                }),
            api_key: env::var("CARELINK_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("CARELINK_API_KEY not set, using empty value");
                    String::new()
                }),
            payment_currency: env::var("CARELINK_CURRENCY")
                .unwrap_or_else(|_| {
                    warn!("CARELINK_CURRENCY not set, using default");
                    "EUR".to_string()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty() && !self.api_key.is_empty()
    }
}
