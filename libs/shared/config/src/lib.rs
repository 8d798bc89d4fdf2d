use std::env;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    JsonFile,
    Redis,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "json" | "file" => Some(Self::JsonFile),
            "redis" => Some(Self::Redis),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub storage_backend: StorageBackend,
    pub data_file: String,
    pub redis_url: Option<String>,
    pub seed_file: Option<String>,
    pub reserve_timeout_ms: u64,
    pub notification_queue_capacity: usize,
    pub notification_timeout_ms: u64,
    pub mail_relay_url: Option<String>,
    pub mail_relay_token: Option<String>,
    pub mail_sender: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            storage_backend: StorageBackend::JsonFile,
            data_file: "db.json".to_string(),
            redis_url: None,
            seed_file: None,
            reserve_timeout_ms: 2000,
            notification_queue_capacity: 256,
            notification_timeout_ms: 10_000,
            mail_relay_url: None,
            mail_relay_token: None,
            mail_sender: "agenda@vetcare.local".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| {
                    warn!("BIND_ADDR not set, using default");
                    defaults.bind_addr.clone()
                }),
            storage_backend: match env::var("STORAGE_BACKEND") {
                Ok(value) => StorageBackend::parse(&value).unwrap_or_else(|| {
                    warn!("Unknown STORAGE_BACKEND '{}', falling back to json", value);
                    StorageBackend::JsonFile
                }),
                Err(_) => {
                    warn!("STORAGE_BACKEND not set, using json file storage");
                    defaults.storage_backend
                }
            },
            data_file: env::var("DATA_FILE")
                .unwrap_or_else(|_| defaults.data_file.clone()),
            redis_url: optional_var("REDIS_URL"),
            seed_file: optional_var("SEED_FILE"),
            reserve_timeout_ms: parsed_var("RESERVE_TIMEOUT_MS", defaults.reserve_timeout_ms),
            notification_queue_capacity: parsed_var(
                "NOTIFICATION_QUEUE_CAPACITY",
                defaults.notification_queue_capacity,
            ),
            notification_timeout_ms: parsed_var("NOTIFICATION_TIMEOUT_MS", defaults.notification_timeout_ms),
            mail_relay_url: optional_var("MAIL_RELAY_URL"),
            mail_relay_token: optional_var("MAIL_RELAY_TOKEN"),
            mail_sender: env::var("MAIL_SENDER")
                .unwrap_or_else(|_| defaults.mail_sender.clone()),
        };

        if config.storage_backend == StorageBackend::Redis && config.redis_url.is_none() {
            warn!("STORAGE_BACKEND=redis but REDIS_URL is not set");
        }

        if !config.is_mail_configured() {
            warn!("MAIL_RELAY_URL not set - doctor notifications will only be logged");
        }

        config
    }

    pub fn is_mail_configured(&self) -> bool {
        self.mail_relay_url
            .as_deref()
            .map(|url| !url.is_empty())
            .unwrap_or(false)
    }

    pub fn reserve_timeout(&self) -> Duration {
        Duration::from_millis(self.reserve_timeout_ms)
    }

    /// Upper bound on a single notification delivery attempt.
    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
