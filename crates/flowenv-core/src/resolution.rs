//! Resolución de entornos con manifest durable y memo de proceso.
//!
//! Por identidad: `Unresolved -> Resolved -> ResolvedCached`. Las transiciones
//! sólo avanzan; `force` vuelve a invocar al resolver y reemplaza únicamente
//! la entrada de esa identidad. El resolver se invoca a lo sumo una vez por
//! identidad y proceso mientras no se fuerce.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::cache::EnvironmentCache;
use crate::errors::EnvError;
use crate::identity::EnvironmentId;
use crate::manifest::{ManifestEntry, ManifestStore};
use crate::registry::ProcessRegistry;
use crate::resolver::{ExternalResolver, ResolveRequest};
use crate::spec::DependencySpec;

pub struct EnvironmentResolution {
    store: Arc<dyn ManifestStore>,
    resolver: Arc<dyn ExternalResolver>,
    registry: Arc<ProcessRegistry>,
    /// Presente sólo cuando la ejecución es remota (hay que subir artifacts).
    cache: Option<Arc<dyn EnvironmentCache>>,
}

impl EnvironmentResolution {
    pub fn new(store: Arc<dyn ManifestStore>, resolver: Arc<dyn ExternalResolver>, registry: Arc<ProcessRegistry>) -> Self {
        Self { store, resolver, registry, cache: None }
    }

    pub fn with_cache(mut self, cache: Arc<dyn EnvironmentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn resolver(&self) -> &Arc<dyn ExternalResolver> {
        &self.resolver
    }

    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    /// Estado terminal para los requisitos actuales.
    fn is_terminal(&self, entry: &ManifestEntry) -> bool {
        self.cache.is_none() || entry.cache_urls.is_some()
    }

    /// Resuelve (o reutiliza) la entrada del manifest para `spec`.
    pub fn resolve(&self, step_name: &str, spec: &DependencySpec, force: bool) -> Result<ManifestEntry, EnvError> {
        let env_id = spec.identity();
        let flow = spec.flow_name();
        if !force {
            if let Some(entry) = self.registry.resolved(env_id).filter(|e| self.is_terminal(e)) {
                debug!("resolve:memo env_id={env_id}");
                return Ok(entry);
            }
        }
        debug!("resolve:start env_id={env_id} force={force}");
        let manifest = self.store.read(flow)?;
        let installed = self.installed(flow)?;
        let existing = manifest.get(env_id);
        let req = request(step_name, spec);

        let (mut entry, mut dirty) = match existing {
            Some(prev) if !force => (prev.clone(), false),
            _ => {
                if existing.is_some() {
                    warn!("forced re-resolution of {env_id}: manifest entry will be rewritten");
                }
                let deps = spec.tokens(true);
                info!("invoking external resolver for {env_id} ({} tokens)", deps.len());
                let resolution = self.resolver.create(&req, &deps)?;
                let mut fresh = ManifestEntry::from_resolution(resolution, deps);
                // Un force que reproduce las mismas URLs conserva la cache ya publicada.
                if let Some(prev) = existing.filter(|p| p.download_urls == fresh.download_urls) {
                    fresh.cache_urls = prev.cache_urls.clone();
                }
                (fresh, true)
            }
        };

        if let Some(cache) = &self.cache {
            if entry.cache_urls.is_none() {
                if !dirty && !installed.contains(env_id) {
                    self.install(&req, &entry)?;
                }
                let artifacts = cache.ensure_cached(env_id)?;
                entry.cache_urls = Some(artifacts.into_iter().map(|a| (a.source_url, a.destination_key)).collect());
                dirty = true;
            }
        }

        if dirty {
            self.store.write(flow, env_id, &entry)?;
            self.refresh_installed(flow)?;
        }
        self.registry.record_resolved(env_id.clone(), entry.clone());
        debug!("resolve:done env_id={env_id} state={:?} written={dirty}", entry.state());
        Ok(entry)
    }

    /// Garantiza que el entorno del paso existe instalado. Si hay que
    /// instalarlo, se usa la lista exacta ya resuelta (sin re-resolver) para
    /// reproducirlo bit a bit.
    pub fn prepare(&self, step_name: &str, spec: &DependencySpec) -> Result<EnvironmentId, EnvError> {
        let entry = self.resolve(step_name, spec, false)?;
        let env_id = spec.identity();
        if !self.installed(spec.flow_name())?.contains(env_id) {
            self.install(&request(step_name, spec), &entry)?;
            self.refresh_installed(spec.flow_name())?;
        }
        Ok(env_id.clone())
    }

    fn install(&self, req: &ResolveRequest<'_>, entry: &ManifestEntry) -> Result<(), EnvError> {
        info!("installing {} from {} resolved urls", req.env_id, entry.download_urls.len());
        self.resolver.install_explicit(req, &entry.download_urls)
    }

    fn installed(&self, flow: &str) -> Result<std::collections::HashSet<EnvironmentId>, EnvError> {
        match self.registry.installed(flow) {
            Some(envs) => Ok(envs),
            None => self.refresh_installed(flow),
        }
    }

    fn refresh_installed(&self, flow: &str) -> Result<std::collections::HashSet<EnvironmentId>, EnvError> {
        let envs = self.resolver.environments(flow)?;
        self.registry.set_installed(flow, envs.clone());
        Ok(envs)
    }
}

fn request<'a>(step_name: &'a str, spec: &'a DependencySpec) -> ResolveRequest<'a> {
    ResolveRequest { step_name,
                     env_id: spec.identity(),
                     architecture: spec.architecture(),
                     disable_safety_checks: spec.disable_safety_checks() }
}
