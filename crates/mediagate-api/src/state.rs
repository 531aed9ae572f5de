use anyhow::Result;
use mediagate_core::{Config, StorageBackend, TokenCodec};
use mediagate_storage::{create_storage, AccessBroker, LocalStorage, Storage};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
///
/// `storage` is the backend behind the broker. `local` is set only when the
/// local backend is active; the fulfillment handlers need the concrete type
/// for streaming filesystem access.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub broker: AccessBroker,
    pub codec: TokenCodec,
    pub local: Option<Arc<LocalStorage>>,
}

pub async fn build_state(config: Config) -> Result<AppState> {
    let codec = TokenCodec::new(config.jwt_secret.clone());

    let local = match config.storage_backend {
        StorageBackend::Local => Some(Arc::new(
            LocalStorage::new(
                config.local_storage_path.clone(),
                config.app_url.clone(),
                codec.clone(),
            )
            .await?,
        )),
        StorageBackend::S3 => None,
    };

    let storage: Arc<dyn Storage> = match &local {
        Some(local) => local.clone(),
        None => create_storage(&config, codec.clone()).await?,
    };

    let broker = AccessBroker::new(
        storage.clone(),
        Duration::from_secs(config.put_url_expires_secs),
        Duration::from_secs(config.get_url_expires_secs),
    );

    tracing::info!(
        backend = %storage.backend_type(),
        put_expires_secs = config.put_url_expires_secs,
        get_expires_secs = config.get_url_expires_secs,
        "Storage backend initialized"
    );

    Ok(AppState {
        config,
        storage,
        broker,
        codec,
        local,
    })
}
