use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub store: StoreConfig,
    pub directory: DirectoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Rest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
    pub users_path: String,
    pub groups_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub institutional_domain: String,
    pub min_password_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Store overrides
        if let Ok(v) = env::var("STORE_BACKEND") {
            self.store.backend = match v.to_ascii_lowercase().as_str() {
                "rest" => StoreBackend::Rest,
                "memory" => StoreBackend::Memory,
                _ => self.store.backend,
            };
        }
        if let Ok(v) = env::var("STORE_URL") {
            self.store.url = Some(v);
        }
        if let Ok(v) = env::var("STORE_AUTH_TOKEN") {
            self.store.auth_token = Some(v).filter(|t| !t.is_empty());
        }
        if let Ok(v) = env::var("STORE_TIMEOUT_SECS") {
            self.store.timeout_secs = v.parse().unwrap_or(self.store.timeout_secs);
        }
        if let Ok(v) = env::var("STORE_USERS_PATH") {
            self.store.users_path = v;
        }
        if let Ok(v) = env::var("STORE_GROUPS_PATH") {
            self.store.groups_path = v;
        }

        // Directory overrides
        if let Ok(v) = env::var("DIRECTORY_INSTITUTIONAL_DOMAIN") {
            self.directory.institutional_domain = v;
        }
        if let Ok(v) = env::var("DIRECTORY_MIN_PASSWORD_LEN") {
            self.directory.min_password_len = v.parse().unwrap_or(self.directory.min_password_len);
        }

        if let Ok(v) = env::var("LOG_FILTER") {
            self.logging.filter = v;
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            store: StoreConfig {
                backend: StoreBackend::Memory,
                url: None,
                auth_token: None,
                timeout_secs: 30,
                users_path: "users".to_string(),
                groups_path: "grupos".to_string(),
            },
            directory: DirectoryConfig::default(),
            logging: LoggingConfig {
                filter: "clubes_directory=debug".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            store: StoreConfig {
                backend: StoreBackend::Rest,
                url: None,
                auth_token: None,
                timeout_secs: 10,
                users_path: "users".to_string(),
                groups_path: "grupos".to_string(),
            },
            directory: DirectoryConfig::default(),
            logging: LoggingConfig {
                filter: "clubes_directory=info".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            store: StoreConfig {
                backend: StoreBackend::Rest,
                url: None,
                auth_token: None,
                timeout_secs: 5,
                users_path: "users".to_string(),
                groups_path: "grupos".to_string(),
            },
            directory: DirectoryConfig::default(),
            logging: LoggingConfig {
                filter: "clubes_directory=warn".to_string(),
            },
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            institutional_domain: "@unal.edu.co".to_string(),
            min_password_len: 6,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    // Load .env if present so STORE_URL and friends are picked up
    let _ = dotenvy::dotenv();
    AppConfig::from_env()
});

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
