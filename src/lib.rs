//! flowenv
//!
//! Entornos de paquetes aislados y reproducibles para los pasos de un
//! workflow:
//! - raíz (`flowenv_core`): identidad, resolución, manifest y configuración.
//! - `persistence`: manifest durable en disco.
//! - `adapters`: cache de artifacts, descargas y stores.
//! - `runtime`: aprovisionamiento en el host y ciclo de vida del paso.

use std::sync::Arc;

use log::debug;

pub use flowenv_adapters as adapters;
pub use flowenv_persistence as persistence;
pub use flowenv_runtime as runtime;

pub use flowenv_core::*;
pub use flowenv_runtime::{EnvironmentStepDecorator, LaunchPlan, StepLifecycle};

/// Resolución para este proceso con la configuración del entorno (`.env` y
/// variables `FLOWENV_*`) y un registro de proceso nuevo. También devuelve el
/// host detectado, con el override de versión de Python aplicado.
pub fn resolution_from_env(datastore: DatastoreType,
                           resolver: Arc<dyn ExternalResolver>,
                           fetcher: Arc<dyn adapters::ArtifactFetcher>,
                           storage: &adapters::StorageRegistry)
                           -> Result<(Settings, HostPlatform, EnvironmentResolution), EnvError> {
    let settings = Settings::from_env()?;
    let host = HostPlatform::from_settings(&settings)?;
    debug!("resolution_from_env datastore={datastore} root={}", settings.datastore_root.display());
    let resolution = runtime::build_resolution(&settings, datastore, resolver, fetcher, storage, Arc::new(ProcessRegistry::new()))?;
    Ok((settings, host, resolution))
}
