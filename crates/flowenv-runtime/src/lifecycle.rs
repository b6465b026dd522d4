//! Interfaz ordenada de ciclo de vida de un paso y su implementación.
//!
//! El framework invoca, en este orden: `step_init` (carga del workflow),
//! `package_init` (empaquetado), `runtime_init` (arranque del runtime),
//! `runtime_task_created` (por tarea), `runtime_step_cli` (antes de lanzar el
//! proceso hijo), `task_pre_step` (dentro del proceso de la tarea) y
//! `runtime_finished` (siempre, con éxito o error).

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flowenv_core::constants::{ENV_ID_METADATA_FIELD, PATH_VARIABLE, REQUIRED_ENVIRONMENT_MODE};
use flowenv_core::spec::DefaultPinnedLibraries;
use flowenv_core::{is_enabled, select_architecture, DatastoreType, DependencySpec, DependencySpecBuilder, EnvConfig, EnvError,
                   EnvironmentId, EnvironmentResolution, ExecutionContext, ExecutionRole, HostPlatform, PinnedLibraries, Settings};
use log::{debug, info};
use serde::Serialize;

use crate::host_links::{DistributionLocator, TrampolineGenerator};
use crate::launch::LaunchPlan;
use crate::provisioner::EnvironmentProvisioner;

/// Datos disponibles al cargar el workflow.
#[derive(Debug, Clone)]
pub struct StepInit<'a> {
    pub flow_name: &'a str,
    /// Modo de entorno activo en la invocación.
    pub environment_mode: &'a str,
    pub datastore: DatastoreType,
    /// Extensiones activas en el paso (p. ej. ejecución remota).
    pub active_extensions: &'a [String],
}

/// Intento de tarea visto desde su propio proceso.
#[derive(Debug, Clone)]
pub struct TaskAttempt {
    pub role: ExecutionRole,
    pub retry_count: u32,
    /// Intérprete que ejecuta la tarea.
    pub interpreter: PathBuf,
    pub inherited_path: Option<OsString>,
}

/// Metadato para el registrador externo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvMetadatum {
    pub field: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub tags: Vec<String>,
}

impl EnvMetadatum {
    pub fn env_id(env_id: &EnvironmentId, retry_count: u32) -> Self {
        Self { field: ENV_ID_METADATA_FIELD.to_string(),
               value: env_id.to_string(),
               kind: ENV_ID_METADATA_FIELD.to_string(),
               tags: vec![format!("attempt_id:{retry_count}")] }
    }
}

/// Resultado de `task_pre_step`; el caller lo aplica.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreStep {
    pub context: ExecutionContext,
    pub metadata: Vec<EnvMetadatum>,
}

pub trait StepLifecycle {
    fn step_init(&mut self, init: &StepInit<'_>) -> Result<(), EnvError>;
    fn package_init(&mut self) -> Result<(), EnvError>;
    fn runtime_init(&mut self) -> Result<(), EnvError>;
    fn runtime_task_created(&mut self, role: ExecutionRole) -> Result<(), EnvError>;
    fn runtime_step_cli(&mut self, plan: &mut LaunchPlan, role: ExecutionRole) -> Result<(), EnvError>;
    fn task_pre_step(&mut self, attempt: &TaskAttempt) -> Result<PreStep, EnvError>;
    /// `failure` es el error de la tarea, si lo hubo.
    fn runtime_finished(&mut self, failure: Option<&EnvError>) -> Result<(), EnvError>;
}

/// Entorno aislado por paso, conectado al ciclo de vida del framework.
pub struct EnvironmentStepDecorator {
    step_name: String,
    step_config: EnvConfig,
    flow_config: EnvConfig,
    settings: Settings,
    host: HostPlatform,
    pinned: Arc<dyn PinnedLibraries>,
    locator: Arc<dyn DistributionLocator>,
    trampolines: Arc<dyn TrampolineGenerator>,
    provisioner: EnvironmentProvisioner,
    spec: Option<DependencySpec>,
    env_id: Option<EnvironmentId>,
}

impl EnvironmentStepDecorator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(step_name: impl Into<String>,
               step_config: EnvConfig,
               flow_config: EnvConfig,
               settings: Settings,
               host: HostPlatform,
               resolution: Arc<EnvironmentResolution>,
               locator: Arc<dyn DistributionLocator>,
               trampolines: Arc<dyn TrampolineGenerator>)
               -> Self {
        Self { step_name: step_name.into(),
               step_config,
               flow_config,
               settings,
               host,
               pinned: Arc::new(DefaultPinnedLibraries),
               locator,
               trampolines,
               provisioner: EnvironmentProvisioner::new(resolution),
               spec: None,
               env_id: None }
    }

    pub fn with_pinned(mut self, pinned: Arc<dyn PinnedLibraries>) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn is_enabled(&self, role: ExecutionRole) -> bool {
        is_enabled(&self.step_config, &self.flow_config, role)
    }

    pub fn spec(&self) -> Result<&DependencySpec, EnvError> {
        self.spec
            .as_ref()
            .ok_or_else(|| EnvError::config(format!("step {} used before step_init", self.step_name)))
    }

    pub fn env_id(&self) -> Option<&EnvironmentId> {
        self.env_id.as_ref()
    }

    pub fn provisioner(&self) -> &EnvironmentProvisioner {
        &self.provisioner
    }

    fn prepare(&mut self) -> Result<EnvironmentId, EnvError> {
        let env_id = self.provisioner.ensure_step_environment(&self.step_name, self.spec()?)?;
        self.env_id = Some(env_id.clone());
        Ok(env_id)
    }
}

impl StepLifecycle for EnvironmentStepDecorator {
    fn step_init(&mut self, init: &StepInit<'_>) -> Result<(), EnvError> {
        if init.environment_mode != REQUIRED_ENVIRONMENT_MODE {
            return Err(EnvError::config(format!("step environments require --environment={REQUIRED_ENVIRONMENT_MODE} (got {:?})",
                                                init.environment_mode)));
        }
        let choice = select_architecture(init.active_extensions, &self.settings.force_linux64, &self.host);
        let builder = DependencySpecBuilder::new(init.flow_name, init.datastore, self.host.python_version.clone(), choice)
            .with_pinned(self.pinned.clone());
        let spec = builder.build(&self.step_config, &self.flow_config)?;
        debug!("step_init step={} arch={} env_id={}", self.step_name, spec.architecture(), spec.identity());
        self.spec = Some(spec);
        Ok(())
    }

    fn package_init(&mut self) -> Result<(), EnvError> {
        if self.is_enabled(ExecutionRole::Regular) {
            self.prepare()?;
        }
        Ok(())
    }

    fn runtime_init(&mut self) -> Result<(), EnvError> {
        let tmp_root = self.settings.tmp_root.clone();
        self.provisioner
            .init_host_links(&tmp_root, self.locator.as_ref(), self.trampolines.as_ref())?;
        Ok(())
    }

    fn runtime_task_created(&mut self, role: ExecutionRole) -> Result<(), EnvError> {
        if self.is_enabled(role) {
            self.prepare()?;
        }
        Ok(())
    }

    fn runtime_step_cli(&mut self, plan: &mut LaunchPlan, role: ExecutionRole) -> Result<(), EnvError> {
        if !self.is_enabled(role) || plan.requests_forcing(&self.settings.force_linux64) {
            return Ok(());
        }
        let env_id = self.env_id
                         .clone()
                         .ok_or_else(|| EnvError::MissingEnvironment(format!("step {} has no prepared environment", self.step_name)))?;
        let inherited = plan.env.get(PATH_VARIABLE).cloned().or_else(|| std::env::var_os(PATH_VARIABLE));
        let ctx = self.provisioner.build_execution_context(&env_id, inherited.as_deref())?;
        plan.apply(&ctx);
        info!("step {} launching with environment {env_id}", self.step_name);
        Ok(())
    }

    fn task_pre_step(&mut self, attempt: &TaskAttempt) -> Result<PreStep, EnvError> {
        let mut out = PreStep::default();
        let env_id = self.spec()?.identity().clone();
        if attempt.role == ExecutionRole::Control {
            out.context.tag_environment(&env_id);
        }
        if self.is_enabled(attempt.role) {
            let dir = attempt.interpreter.parent().map(Path::to_path_buf).unwrap_or_default();
            out.context
               .set_executable_search_path(&[dir], attempt.inherited_path.as_deref())?
               .isolate_user_site();
            out.metadata.push(EnvMetadatum::env_id(&env_id, attempt.retry_count));
        }
        Ok(out)
    }

    fn runtime_finished(&mut self, failure: Option<&EnvError>) -> Result<(), EnvError> {
        if let Some(err) = failure {
            debug!("runtime_finished step={} after failure: {err}", self.step_name);
        }
        self.provisioner.teardown()
    }
}
