//! Identidad determinista de un entorno.
//!
//! `metaflow_<flow>_<arch>_<sha1>` donde el hash cubre los tokens de
//! dependencias (python + librerías) ordenados lexicográficamente, seguidos de
//! los canales en su orden original. Los flags de forzado de arquitectura y de
//! safety checks no participan: sólo cambian cómo se resuelve, no qué se pide.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::ENV_ID_PREFIX;
use crate::hashing::hash_tokens;
use crate::spec::DependencySpec;

/// Identidad opaca de un entorno resuelto.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentId(String);

impl EnvironmentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EnvironmentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EnvironmentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for EnvironmentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hash de contenido de un `DependencySpec` (sin flow ni arquitectura).
pub fn content_hash(spec: &DependencySpec) -> String {
    let mut deps = spec.tokens(false);
    deps.sort();
    hash_tokens(deps.iter().map(String::as_str).chain(spec.channels().iter().map(String::as_str)))
}

/// Calcula la identidad completa. Función pura del spec.
pub fn compute(spec: &DependencySpec) -> EnvironmentId {
    EnvironmentId(format!("{}_{}_{}_{}",
                          ENV_ID_PREFIX,
                          spec.flow_name(),
                          spec.architecture(),
                          content_hash(spec)))
}
