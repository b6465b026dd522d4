//! `ArtifactCache`: garantiza que los artifacts de un entorno estén en disco y
//! en el store durable.
//!
//! Por cada paquete del entorno:
//! - clave destino `{autoridad}/{path}/{checksum}/{archivo}` derivada de la URL
//!   de origen (direccionada por contenido);
//! - ruta local canónica del tarball, independiente de la identidad;
//! - si falta en disco, se encola la descarga.
//!
//! Las descargas corren en un pool acotado de rayon; cada worker escribe un
//! archivo distinto. El primer error aborta la llamada completa. Luego se
//! sube el conjunto entero en una sola llamada al store.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flowenv_core::constants::{CANONICAL_TARBALL_SUFFIX, CONDA_FORMAT_SUFFIX, DEFAULT_DOWNLOAD_CONCURRENCY};
use flowenv_core::hashing::sha256_file;
use flowenv_core::{CachedArtifact, EnvError, EnvironmentCache, EnvironmentId, ExternalResolver, PackageInfo};
use log::{debug, info};
use rayon::prelude::*;
use url::Url;

use crate::fetch::ArtifactFetcher;
use crate::storage::ObjectStore;

/// Clave destino de un paquete en el store durable.
pub fn destination_key(info: &PackageInfo) -> Result<String, EnvError> {
    let url = Url::parse(&info.url).map_err(|e| EnvError::Download { url: info.url.clone(), reason: format!("invalid url: {e}") })?;
    let authority = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };
    let parts = [authority.as_str(), url.path().trim_start_matches('/'), info.md5.as_str(), info.file_name.as_str()];
    Ok(parts.iter().filter(|p| !p.is_empty()).copied().collect::<Vec<_>>().join("/"))
}

/// Nombre local canónico: el gestor a veces reporta `.conda` para archivos que
/// en disco son `.tar.bz2` (y a veces omite el sufijo); se normaliza siempre a
/// `<base>.tar.bz2`.
pub fn canonical_tarball_path(reported: &Path) -> PathBuf {
    let raw = reported.to_string_lossy();
    let base = raw.strip_suffix(CONDA_FORMAT_SUFFIX).unwrap_or(&raw);
    if base.ends_with(CANONICAL_TARBALL_SUFFIX) {
        PathBuf::from(base)
    } else {
        PathBuf::from(format!("{base}{CANONICAL_TARBALL_SUFFIX}"))
    }
}

struct PlannedArtifact {
    info: PackageInfo,
    key: String,
    local_path: PathBuf,
}

pub struct ArtifactCache {
    resolver: Arc<dyn ExternalResolver>,
    fetcher: Arc<dyn ArtifactFetcher>,
    store: Arc<dyn ObjectStore>,
    concurrency: usize,
}

impl ArtifactCache {
    pub fn new(resolver: Arc<dyn ExternalResolver>, fetcher: Arc<dyn ArtifactFetcher>, store: Arc<dyn ObjectStore>) -> Self {
        Self { resolver, fetcher, store, concurrency: DEFAULT_DOWNLOAD_CONCURRENCY }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn plan(&self, env_id: &EnvironmentId) -> Result<Vec<PlannedArtifact>, EnvError> {
        self.resolver
            .package_info(env_id)?
            .into_iter()
            .map(|info| {
                let key = destination_key(&info)?;
                let local_path = canonical_tarball_path(&info.package_tarball_full_path);
                Ok(PlannedArtifact { info, key, local_path })
            })
            .collect()
    }

    /// Descarga a `<ruta>.partial`, verifica y renombra. Un `.partial` de una
    /// ejecución interrumpida se sobreescribe.
    fn download(&self, artifact: &PlannedArtifact) -> Result<(), EnvError> {
        let url = &artifact.info.url;
        let dest = &artifact.local_path;
        let io_err = |e: std::io::Error| EnvError::Download { url: url.clone(), reason: e.to_string() };
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut partial = dest.as_os_str().to_owned();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        if partial.exists() {
            fs::remove_file(&partial).map_err(io_err)?;
        }
        self.fetcher.fetch(url, &partial)?;
        if let Some(expected) = &artifact.info.sha256 {
            let actual = sha256_file(&partial).map_err(io_err)?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(EnvError::Download { url: url.clone(),
                                                reason: format!("sha256 mismatch (expected {expected}, found {actual})") });
            }
        }
        fs::rename(&partial, dest).map_err(io_err)
    }

    fn download_all(&self, missing: &[&PlannedArtifact]) -> Result<(), EnvError> {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(self.concurrency)
                                                  .build()
                                                  .map_err(|e| EnvError::config(format!("cannot build download pool: {e}")))?;
        pool.install(|| missing.par_iter().try_for_each(|a| self.download(a)))
    }
}

impl EnvironmentCache for ArtifactCache {
    fn ensure_cached(&self, env_id: &EnvironmentId) -> Result<Vec<CachedArtifact>, EnvError> {
        debug!("ensure_cached:start env_id={env_id}");
        let planned = self.plan(env_id)?;
        let missing: Vec<&PlannedArtifact> = planned.iter().filter(|a| !a.local_path.is_file()).collect();
        if !missing.is_empty() {
            info!("downloading {} of {} artifacts for {env_id} ({} workers)", missing.len(), planned.len(), self.concurrency);
            self.download_all(&missing)?;
        }

        let handles = planned.iter()
                             .map(|a| {
                                 File::open(&a.local_path).map(|f| (a.key.clone(), f))
                                                          .map_err(|e| EnvError::Upload(format!("{}: {e}", a.local_path.display())))
                             })
                             .collect::<Result<Vec<_>, _>>()?;
        let written = self.store.save_files(handles)?;
        debug!("ensure_cached:done env_id={env_id} artifacts={} uploaded={written}", planned.len());

        Ok(planned.into_iter()
                  .map(|a| CachedArtifact { source_url: a.info.url, destination_key: a.key, local_path: a.local_path })
                  .collect())
    }
}
