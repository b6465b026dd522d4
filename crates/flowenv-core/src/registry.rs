//! Registro de proceso: memo de resoluciones y de entornos instalados.
//!
//! Vive lo que vive el proceso. Se comparte detrás de un `Arc` entre los
//! componentes de los distintos pasos; no coordina entre procesos.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::identity::EnvironmentId;
use crate::manifest::ManifestEntry;

#[derive(Default)]
pub struct ProcessRegistry {
    resolved: DashMap<EnvironmentId, ManifestEntry>,
    installed: DashMap<String, HashSet<EnvironmentId>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolved(&self, env_id: &EnvironmentId) -> Option<ManifestEntry> {
        self.resolved.get(env_id).map(|e| e.value().clone())
    }

    pub fn record_resolved(&self, env_id: EnvironmentId, entry: ManifestEntry) {
        self.resolved.insert(env_id, entry);
    }

    /// `None` si aún no se consultaron los entornos del workflow.
    pub fn installed(&self, flow_name: &str) -> Option<HashSet<EnvironmentId>> {
        self.installed.get(flow_name).map(|s| s.value().clone())
    }

    pub fn set_installed(&self, flow_name: &str, envs: HashSet<EnvironmentId>) {
        self.installed.insert(flow_name.to_string(), envs);
    }
}
