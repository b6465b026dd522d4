use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::entry::{Manifest, ManifestEntry};
use crate::errors::EnvError;
use crate::identity::EnvironmentId;

/// Almacenamiento durable `identidad -> ManifestEntry`, uno por workflow.
pub trait ManifestStore: Send + Sync {
    /// Manifest completo del workflow (vacío si aún no existe).
    fn read(&self, flow_name: &str) -> Result<Manifest, EnvError>;
    /// Read-merge-write: sólo reemplaza la entrada de `env_id`.
    fn write(&self, flow_name: &str, env_id: &EnvironmentId, entry: &ManifestEntry) -> Result<(), EnvError>;
}

/// Store en memoria, con contador de escrituras para tests.
#[derive(Default)]
pub struct InMemoryManifestStore {
    inner: Mutex<HashMap<String, Manifest>>,
    writes: AtomicUsize,
}

impl InMemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Manifest>>, EnvError> {
        self.inner.lock().map_err(|_| EnvError::Manifest("in-memory manifest lock poisoned".into()))
    }
}

impl ManifestStore for InMemoryManifestStore {
    fn read(&self, flow_name: &str) -> Result<Manifest, EnvError> {
        Ok(self.lock()?.get(flow_name).cloned().unwrap_or_default())
    }

    fn write(&self, flow_name: &str, env_id: &EnvironmentId, entry: &ManifestEntry) -> Result<(), EnvError> {
        self.lock()?
            .entry(flow_name.to_string())
            .or_default()
            .insert(env_id.clone(), entry.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
