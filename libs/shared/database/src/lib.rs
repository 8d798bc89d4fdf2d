pub mod backend;
pub mod json_file;
pub mod memory;
pub mod redis_store;
pub mod seed;

use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, StorageBackend};

pub use backend::{BackendError, BackendResult, PersistenceBackend};
pub use json_file::JsonFileBackend;
pub use memory::InMemoryBackend;
pub use redis_store::RedisBackend;
pub use seed::{SeedData, SeedReport};

pub const REDIS_KEY_PREFIX: &str = "vetcare";

/// Builds the backend selected by `STORAGE_BACKEND`.
pub async fn connect(config: &AppConfig) -> BackendResult<Arc<dyn PersistenceBackend>> {
    let backend: Arc<dyn PersistenceBackend> = match config.storage_backend {
        StorageBackend::Memory => Arc::new(InMemoryBackend::new()),
        StorageBackend::JsonFile => Arc::new(JsonFileBackend::open(&config.data_file).await?),
        StorageBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                BackendError::Unavailable("REDIS_URL is required for the redis backend".to_string())
            })?;
            Arc::new(RedisBackend::connect(url, REDIS_KEY_PREFIX).await?)
        }
    };

    info!("Using {} storage backend", backend.name());
    Ok(backend)
}
