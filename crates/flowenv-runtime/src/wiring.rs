//! Composición de la resolución a partir de la configuración.

use std::sync::Arc;

use flowenv_adapters::{ArtifactCache, ArtifactFetcher, StorageRegistry};
use flowenv_core::{DatastoreType, EnvError, EnvironmentResolution, ExternalResolver, ProcessRegistry, Settings};
use flowenv_persistence::FileManifestStore;
use log::debug;

/// Manifest en disco bajo la raíz del datastore; la cache de artifacts sólo se
/// conecta cuando el datastore implica ejecución remota.
pub fn build_resolution(settings: &Settings,
                        datastore: DatastoreType,
                        resolver: Arc<dyn ExternalResolver>,
                        fetcher: Arc<dyn ArtifactFetcher>,
                        storage: &StorageRegistry,
                        registry: Arc<ProcessRegistry>)
                        -> Result<EnvironmentResolution, EnvError> {
    let store = Arc::new(FileManifestStore::new(&settings.datastore_root));
    let resolution = EnvironmentResolution::new(store, resolver.clone(), registry);
    if !datastore.caches_remotely() {
        return Ok(resolution);
    }
    let root = settings.package_root_for(datastore);
    debug!("wiring: artifact cache datastore={datastore} root={root}");
    let object_store = storage.open(datastore, root)?;
    let cache = ArtifactCache::new(resolver, fetcher, Arc::from(object_store)).with_concurrency(settings.download_concurrency);
    Ok(resolution.with_cache(Arc::new(cache)))
}
