//! `EnvironmentProvisioner`: materializa el entorno de un paso y construye el
//! contexto de ejecución del proceso hijo.
//!
//! Fases:
//! - `init_host_links`: una vez por proceso anfitrión.
//! - `ensure_step_environment`: por tarea; resuelve e instala si falta.
//! - `build_execution_context`: al lanzar; no toca el entorno del proceso.
//! - `teardown`: borra el directorio privado, haya fallado o no la tarea.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use flowenv_core::{DependencySpec, EnvError, EnvironmentId, EnvironmentResolution, ExecutionContext};
use log::debug;

use crate::host_links::{DistributionLocator, HostLinks, TrampolineGenerator};

pub struct EnvironmentProvisioner {
    resolution: Arc<EnvironmentResolution>,
    host_links: Option<HostLinks>,
}

impl EnvironmentProvisioner {
    pub fn new(resolution: Arc<EnvironmentResolution>) -> Self {
        Self { resolution, host_links: None }
    }

    pub fn resolution(&self) -> &Arc<EnvironmentResolution> {
        &self.resolution
    }

    pub fn host_links(&self) -> Option<&HostLinks> {
        self.host_links.as_ref()
    }

    /// Crea la vista privada. Idempotente dentro del proceso.
    pub fn init_host_links(&mut self,
                           tmp_root: &Path,
                           locator: &dyn DistributionLocator,
                           trampolines: &dyn TrampolineGenerator)
                           -> Result<&HostLinks, EnvError> {
        if self.host_links.is_none() {
            self.host_links = Some(HostLinks::create(tmp_root, locator, trampolines)?);
        }
        self.host_links
            .as_ref()
            .ok_or_else(|| EnvError::config("host links not initialized"))
    }

    pub fn ensure_step_environment(&self, step_name: &str, spec: &DependencySpec) -> Result<EnvironmentId, EnvError> {
        debug!("provision:start step={step_name} env_id={}", spec.identity());
        let env_id = self.resolution.prepare(step_name, spec)?;
        debug!("provision:done step={step_name} env_id={env_id}");
        Ok(env_id)
    }

    /// Contexto para lanzar el paso contra `env_id`. `inherited_path` es el
    /// search path de ejecutables del lanzador.
    pub fn build_execution_context(&self,
                                   env_id: &EnvironmentId,
                                   inherited_path: Option<&OsStr>)
                                   -> Result<ExecutionContext, EnvError> {
        let links = self.host_links
                        .as_ref()
                        .ok_or_else(|| EnvError::config("host links must be initialized before launching a step"))?;
        let python = self.resolution.resolver().python(env_id)?;
        let bin_dir = python.parent()
                            .ok_or_else(|| EnvError::MissingEnvironment(format!("{env_id} (interpreter {})", python.display())))?
                            .to_path_buf();

        let mut ctx = ExecutionContext::new();
        ctx.set_module_search_path(&links.module_search_path())?
           .set_executable_search_path(&[bin_dir], inherited_path)?
           .tag_environment(env_id)
           .isolate_user_site()
           .set_interpreter(python);
        Ok(ctx)
    }

    pub fn teardown(&mut self) -> Result<(), EnvError> {
        match self.host_links.take() {
            Some(links) => links.teardown(),
            None => Ok(()),
        }
    }
}
