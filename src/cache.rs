//! Backend client handles, built once per host configuration.

use crate::backend::http::ElasticClient;
use crate::backend::memory::MemoryBackend;
use crate::backend::SearchBackend;
use crate::config::BackendConfig;
use crate::error::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Builds a backend client for a host configuration.
pub trait Connector: Send + Sync {
    fn connect(&self, config: &BackendConfig) -> Result<Arc<dyn SearchBackend>>;
}

/// Connects to real clusters over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    pub timeout: Option<Duration>,
}

impl HttpConnector {
    pub fn new(timeout: Option<Duration>) -> Self {
        HttpConnector { timeout }
    }
}

impl Connector for HttpConnector {
    fn connect(&self, config: &BackendConfig) -> Result<Arc<dyn SearchBackend>> {
        let client = ElasticClient::new(config, self.timeout)?;
        tracing::info!(hosts = ?client.hosts(), "Connected search backend client");
        Ok(Arc::new(client))
    }
}

/// Hands out one shared in-process backend for every host configuration.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    backend: Arc<MemoryBackend>,
}

impl MemoryConnector {
    pub fn new(backend: Arc<MemoryBackend>) -> Self {
        MemoryConnector { backend }
    }

    pub fn backend(&self) -> Arc<MemoryBackend> {
        Arc::clone(&self.backend)
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, _config: &BackendConfig) -> Result<Arc<dyn SearchBackend>> {
        Ok(self.backend.clone() as Arc<dyn SearchBackend>)
    }
}

/// Host string to client handle. Entries are never evicted.
///
/// The first lookup for a key builds the client while holding that key's
/// shard lock, so concurrent first access builds exactly one client.
pub struct ConnectionCache {
    clients: DashMap<String, Arc<dyn SearchBackend>>,
    connector: Arc<dyn Connector>,
}

impl ConnectionCache {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        ConnectionCache {
            clients: DashMap::new(),
            connector,
        }
    }

    pub fn http(timeout: Option<Duration>) -> Self {
        Self::new(Arc::new(HttpConnector::new(timeout)))
    }

    pub fn memory(backend: Arc<MemoryBackend>) -> Self {
        Self::new(Arc::new(MemoryConnector::new(backend)))
    }

    pub fn client(&self, config: &BackendConfig) -> Result<Arc<dyn SearchBackend>> {
        let key = config.hosts_key()?;

        match self.clients.entry(key.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let client = self.connector.connect(config)?;
                entry.insert(Arc::clone(&client));
                Ok(client)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
