//! Costura entre la resolución y la cache de artifacts.

use std::path::PathBuf;

use crate::errors::EnvError;
use crate::identity::EnvironmentId;

/// Artifact presente localmente y publicado bajo `destination_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    pub source_url: String,
    pub destination_key: String,
    pub local_path: PathBuf,
}

pub trait EnvironmentCache: Send + Sync {
    /// Garantiza que todos los artifacts del entorno están en disco y en el
    /// store durable. Devuelve las claves producidas.
    fn ensure_cached(&self, env_id: &EnvironmentId) -> Result<Vec<CachedArtifact>, EnvError>;
}
