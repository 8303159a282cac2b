use crate::models::default_device_label;
use crate::services::EngineError;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub api: ApiConfig,
    pub refresh: RefreshConfig,
    pub storage: StorageConfig,
    pub bankid: BankIdConfig,
    pub device_label: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// How long before access-token expiry the proactive refresh fires.
    pub lead_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankIdConfig {
    pub environment: String,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, EngineError> {
        dotenvy::dotenv().ok();

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| EngineError::Config(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = EngineConfig {
            environment,
            service_name: get_env("SERVICE_NAME", Some("session-engine"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            api: ApiConfig {
                base_url: get_env("API_BASE_URL", Some("http://localhost:8080"), is_prod)?,
            },
            refresh: RefreshConfig {
                lead_seconds: get_env("REFRESH_LEAD_SECONDS", Some("60"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        EngineError::Config(anyhow::anyhow!(e.to_string()))
                    })?,
            },
            storage: StorageConfig {
                path: get_env("SESSION_STORE_PATH", Some(".session-store.json"), is_prod)?,
            },
            bankid: BankIdConfig {
                environment: get_env("BANKID_ENV", Some("test"), is_prod)?,
            },
            device_label: match env::var("DEVICE_LABEL") {
                Ok(label) => label,
                Err(_) => default_device_label(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.api.base_url.is_empty() {
            return Err(EngineError::Config(anyhow::anyhow!(
                "API_BASE_URL must not be empty"
            )));
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(EngineError::Config(anyhow::anyhow!(
                "API_BASE_URL must be an http(s) URL"
            )));
        }

        if self.refresh.lead_seconds <= 0 {
            return Err(EngineError::Config(anyhow::anyhow!(
                "REFRESH_LEAD_SECONDS must be positive"
            )));
        }

        if self.environment == Environment::Prod && self.api.base_url.starts_with("http://") {
            tracing::warn!("API_BASE_URL is plain http in production");
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, EngineError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(EngineError::Config(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(EngineError::Config(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EngineConfig {
        EngineConfig {
            environment: Environment::Dev,
            service_name: "session-engine".to_string(),
            log_level: "info".to_string(),
            api: ApiConfig {
                base_url: "http://localhost:8080".to_string(),
            },
            refresh: RefreshConfig { lead_seconds: 60 },
            storage: StorageConfig {
                path: ".session-store.json".to_string(),
            },
            bankid: BankIdConfig {
                environment: "test".to_string(),
            },
            device_label: "test-device".to_string(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_base_url() {
        let mut config = test_config();
        config.api.base_url = "".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let mut config = test_config();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_positive_refresh_lead() {
        let mut config = test_config();
        config.refresh.lead_seconds = 0;
        assert!(config.validate().is_err());
    }
}
