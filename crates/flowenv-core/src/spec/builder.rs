//! `DependencySpecBuilder`: fusiona la configuración por capas de un paso.
//!
//! Precedencia de librerías (de menor a mayor): fijadas por defecto según
//! python + datastore, workflow, paso. Python: primer valor no nulo entre
//! paso, workflow y host. Canales: los del paso antes que los del workflow,
//! sin deduplicar.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::dependency::DependencySpec;
use super::libraries::{merge_libraries, Libraries, LibrarySet};
use crate::arch::ArchitectureChoice;
use crate::datastore::DatastoreType;
use crate::errors::EnvError;

/// Atributos de entorno declarados a nivel de paso o de workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub libraries: Libraries,
    pub channels: Vec<String>,
    pub python: Option<String>,
    pub disabled: Option<bool>,
}

/// Rol de ejecución de la tarea. `Control` no ejecuta código de usuario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionRole {
    #[default]
    Regular,
    Task,
    Control,
}

/// Un paso está habilitado salvo que se desactive explícitamente (gana el
/// paso si no es nulo) o que la tarea sea de control.
pub fn is_enabled(step: &EnvConfig, flow: &EnvConfig, role: ExecutionRole) -> bool {
    if role == ExecutionRole::Control {
        return false;
    }
    !step.disabled.or(flow.disabled).unwrap_or(false)
}

/// Librerías fijadas por defecto para una versión de python y un datastore.
pub trait PinnedLibraries: Send + Sync {
    fn pinned(&self, python_version: &str, datastore: DatastoreType) -> LibrarySet;
}

/// Fijaciones mínimas para que el código del paso pueda hablar con el
/// datastore desde dentro del entorno aislado.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPinnedLibraries;

impl PinnedLibraries for DefaultPinnedLibraries {
    fn pinned(&self, _python_version: &str, datastore: DatastoreType) -> LibrarySet {
        let mut pins = LibrarySet::new();
        pins.insert("requests".into(), ">=2.21.0".into());
        match datastore {
            DatastoreType::Local => {}
            DatastoreType::S3 => {
                pins.insert("boto3".into(), ">=1.14.0".into());
            }
            DatastoreType::Azure => {
                pins.insert("azure-identity".into(), ">=1.10.0".into());
                pins.insert("azure-storage-blob".into(), ">=12.12.0".into());
            }
            DatastoreType::Gs => {
                pins.insert("google-cloud-storage".into(), ">=2.5.0".into());
                pins.insert("google-auth".into(), ">=2.11.0".into());
            }
        }
        pins
    }
}

/// Sin fijaciones; útil cuando el caller controla la lista completa.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPinnedLibraries;

impl PinnedLibraries for NoPinnedLibraries {
    fn pinned(&self, _python_version: &str, _datastore: DatastoreType) -> LibrarySet {
        LibrarySet::new()
    }
}

pub struct DependencySpecBuilder {
    flow_name: String,
    datastore: DatastoreType,
    host_python: String,
    choice: ArchitectureChoice,
    pinned: Arc<dyn PinnedLibraries>,
}

impl DependencySpecBuilder {
    pub fn new(flow_name: impl Into<String>,
               datastore: DatastoreType,
               host_python: impl Into<String>,
               choice: ArchitectureChoice)
               -> Self {
        Self { flow_name: flow_name.into(),
               datastore,
               host_python: host_python.into(),
               choice,
               pinned: Arc::new(DefaultPinnedLibraries) }
    }

    pub fn with_pinned(mut self, pinned: Arc<dyn PinnedLibraries>) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn python_version(&self, step: &EnvConfig, flow: &EnvConfig) -> String {
        step.python
            .as_ref()
            .or(flow.python.as_ref())
            .cloned()
            .unwrap_or_else(|| self.host_python.clone())
    }

    pub fn libraries(&self, step: &EnvConfig, flow: &EnvConfig) -> Result<LibrarySet, EnvError> {
        let python = self.python_version(step, flow);
        let pinned = self.pinned.pinned(&python, self.datastore);
        let with_flow = merge_libraries(&pinned, &flow.libraries.to_set()?);
        Ok(merge_libraries(&with_flow, &step.libraries.to_set()?))
    }

    pub fn channels(step: &EnvConfig, flow: &EnvConfig) -> Vec<String> {
        step.channels.iter().chain(flow.channels.iter()).cloned().collect()
    }

    pub fn build(&self, step: &EnvConfig, flow: &EnvConfig) -> Result<DependencySpec, EnvError> {
        let spec = DependencySpec::new(self.flow_name.clone(),
                                       self.choice.architecture.clone(),
                                       self.python_version(step, flow),
                                       self.libraries(step, flow)?,
                                       Self::channels(step, flow));
        Ok(spec.with_flags(self.choice.force_architecture, self.choice.disable_safety_checks))
    }
}
