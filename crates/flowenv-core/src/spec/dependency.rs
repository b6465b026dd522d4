//! `DependencySpec`: resultado inmutable del merge de configuración de un paso.

use std::fmt;

use once_cell::sync::OnceCell;

use super::libraries::LibrarySet;
use crate::arch::Architecture;
use crate::identity::{self, EnvironmentId};

/// Conjunto canónico de dependencias de un paso.
///
/// La identidad se calcula perezosamente y queda memorizada en la instancia;
/// la memo no participa en la igualdad.
#[derive(Clone)]
pub struct DependencySpec {
    flow_name: String,
    architecture: Architecture,
    python: String,
    libraries: LibrarySet,
    channels: Vec<String>,
    force_architecture: bool,
    disable_safety_checks: bool,
    identity: OnceCell<EnvironmentId>,
}

impl DependencySpec {
    pub fn new(flow_name: impl Into<String>,
               architecture: Architecture,
               python: impl Into<String>,
               libraries: LibrarySet,
               channels: Vec<String>)
               -> Self {
        Self { flow_name: flow_name.into(),
               architecture,
               python: python.into(),
               libraries,
               channels,
               force_architecture: false,
               disable_safety_checks: false,
               identity: OnceCell::new() }
    }

    /// Fija los flags de resolución. No alteran la identidad.
    pub fn with_flags(mut self, force_architecture: bool, disable_safety_checks: bool) -> Self {
        self.force_architecture = force_architecture;
        self.disable_safety_checks = disable_safety_checks;
        self
    }

    pub fn flow_name(&self) -> &str {
        &self.flow_name
    }
    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }
    pub fn python(&self) -> &str {
        &self.python
    }
    pub fn libraries(&self) -> &LibrarySet {
        &self.libraries
    }
    pub fn channels(&self) -> &[String] {
        &self.channels
    }
    pub fn force_architecture(&self) -> bool {
        self.force_architecture
    }
    pub fn disable_safety_checks(&self) -> bool {
        self.disable_safety_checks
    }

    /// Tokens entregados al resolver: `python==<v>`, `<pkg>==<v>` en orden de
    /// merge y, si se piden, `-c <canal>` por canal.
    pub fn tokens(&self, include_channels: bool) -> Vec<String> {
        let mut deps = Vec::with_capacity(1 + self.libraries.len() + self.channels.len());
        deps.push(format!("python=={}", self.python));
        deps.extend(self.libraries.iter().map(|(name, ver)| format!("{name}=={ver}")));
        if include_channels {
            deps.extend(self.channels.iter().map(|c| format!("-c {c}")));
        }
        deps
    }

    /// Identidad del entorno (memorizada).
    pub fn identity(&self) -> &EnvironmentId {
        self.identity.get_or_init(|| identity::compute(self))
    }
}

impl PartialEq for DependencySpec {
    fn eq(&self, other: &Self) -> bool {
        self.flow_name == other.flow_name
        && self.architecture == other.architecture
        && self.python == other.python
        && self.libraries == other.libraries
        && self.channels == other.channels
        && self.force_architecture == other.force_architecture
        && self.disable_safety_checks == other.disable_safety_checks
    }
}

impl fmt::Debug for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencySpec")
         .field("flow_name", &self.flow_name)
         .field("architecture", &self.architecture)
         .field("python", &self.python)
         .field("libraries", &self.libraries)
         .field("channels", &self.channels)
         .field("force_architecture", &self.force_architecture)
         .field("disable_safety_checks", &self.disable_safety_checks)
         .finish()
    }
}
