//! Entrada del manifest: resultado de resolver una identidad.
//!
//! Formato en disco (objeto JSON por identidad):
//! `{"explicit": [...], "deps": [...], "urls": [...], "order": [...],
//!   "cache_urls": [[url, key], ...]}`; `cache_urls` es opcional.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::EnvironmentId;
use crate::resolver::Resolution;

/// Manifest completo de un workflow.
pub type Manifest = BTreeMap<EnvironmentId, ManifestEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "explicit")]
    pub explicit_packages: Vec<String>,
    /// Eco de los tokens pedidos al resolver (auditoría).
    #[serde(rename = "deps")]
    pub requested_deps: Vec<String>,
    #[serde(rename = "urls")]
    pub download_urls: Vec<String>,
    #[serde(rename = "order")]
    pub install_order: Vec<String>,
    /// Pares `(url de origen, clave en el store durable)`. Sólo existe cuando
    /// hubo ejecución remota.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_urls: Option<Vec<(String, String)>>,
}

impl ManifestEntry {
    pub fn from_resolution(resolution: Resolution, requested_deps: Vec<String>) -> Self {
        Self { explicit_packages: resolution.explicit_packages,
               requested_deps,
               download_urls: resolution.download_urls,
               install_order: resolution.install_order,
               cache_urls: None }
    }

    pub fn state(&self) -> ResolutionState {
        if self.cache_urls.is_some() {
            ResolutionState::ResolvedCached
        } else {
            ResolutionState::Resolved
        }
    }
}

/// Estados monótonos de una identidad dentro del manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResolutionState {
    Unresolved,
    Resolved,
    ResolvedCached,
}

impl ResolutionState {
    pub fn of(entry: Option<&ManifestEntry>) -> Self {
        entry.map_or(ResolutionState::Unresolved, ManifestEntry::state)
    }
}
