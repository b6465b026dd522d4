//! `ExecutionContext`: overrides que un proceso hijo debe usar para correr
//! contra un entorno resuelto.
//!
//! Es un valor: se construye por llamada de aprovisionamiento y el caller lo
//! fusiona en la especificación de lanzamiento. Nunca se aplica sobre el
//! entorno del proceso actual.

use std::collections::BTreeMap;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::constants::{ENV_ID_VARIABLE, MODULE_PATH_VARIABLE, NO_USER_SITE_VARIABLE, PATH_VARIABLE};
use crate::errors::EnvError;
use crate::identity::EnvironmentId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    variables: BTreeMap<String, OsString>,
    interpreter: Option<PathBuf>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variables(&self) -> &BTreeMap<String, OsString> {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&OsStr> {
        self.variables.get(name).map(OsString::as_os_str)
    }

    /// Intérprete que reemplaza al entrypoint del proceso hijo.
    pub fn interpreter(&self) -> Option<&Path> {
        self.interpreter.as_deref()
    }

    pub fn env_id(&self) -> Option<&OsStr> {
        self.variable(ENV_ID_VARIABLE)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<OsString>) -> &mut Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn tag_environment(&mut self, env_id: &EnvironmentId) -> &mut Self {
        self.set_variable(ENV_ID_VARIABLE, env_id.as_str())
    }

    pub fn isolate_user_site(&mut self) -> &mut Self {
        self.set_variable(NO_USER_SITE_VARIABLE, "1")
    }

    /// Search path de módulos: `entries` en orden.
    pub fn set_module_search_path(&mut self, entries: &[PathBuf]) -> Result<&mut Self, EnvError> {
        let joined = join_search_path(entries, None)?;
        Ok(self.set_variable(MODULE_PATH_VARIABLE, joined))
    }

    /// Search path de ejecutables: `entries` antepuestos al path heredado.
    pub fn set_executable_search_path(&mut self, entries: &[PathBuf], inherited: Option<&OsStr>) -> Result<&mut Self, EnvError> {
        let joined = join_search_path(entries, inherited)?;
        Ok(self.set_variable(PATH_VARIABLE, joined))
    }

    pub fn set_interpreter(&mut self, interpreter: impl Into<PathBuf>) -> &mut Self {
        self.interpreter = Some(interpreter.into());
        self
    }
}

/// Une `entries` y, a continuación, las entradas de `inherited`.
pub fn join_search_path(entries: &[PathBuf], inherited: Option<&OsStr>) -> Result<OsString, EnvError> {
    let tail: Vec<PathBuf> = inherited.map(|p| env::split_paths(p).collect()).unwrap_or_default();
    env::join_paths(entries.iter().chain(tail.iter()))
        .map_err(|e| EnvError::config(format!("invalid search path entry: {e}")))
}
