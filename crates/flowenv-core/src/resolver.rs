//! Contrato del resolver externo (gestor de paquetes).
//!
//! El algoritmo de resolución es opaco para este crate: recibe tokens de
//! dependencias y una arquitectura, y devuelve el conjunto exacto a instalar.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::arch::Architecture;
use crate::errors::EnvError;
use crate::identity::EnvironmentId;

/// Resultado exacto de una resolución.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    pub explicit_packages: Vec<String>,
    pub download_urls: Vec<String>,
    pub install_order: Vec<String>,
}

/// Metadatos de un paquete instalado en un entorno.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub url: String,
    pub md5: String,
    #[serde(rename = "fn")]
    pub file_name: String,
    /// Ruta local del tarball según el gestor (el sufijo puede ser inexacto).
    pub package_tarball_full_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Parámetros comunes de una llamada al resolver.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    pub step_name: &'a str,
    pub env_id: &'a EnvironmentId,
    pub architecture: &'a Architecture,
    pub disable_safety_checks: bool,
}

pub trait ExternalResolver: Send + Sync {
    /// Resuelve `deps` y crea el entorno `req.env_id`.
    fn create(&self, req: &ResolveRequest<'_>, deps: &[String]) -> Result<Resolution, EnvError>;

    /// Instala exactamente los paquetes de `urls` sin volver a resolver.
    fn install_explicit(&self, req: &ResolveRequest<'_>, urls: &[String]) -> Result<(), EnvError>;

    /// Entornos ya materializados para el workflow.
    fn environments(&self, flow_name: &str) -> Result<HashSet<EnvironmentId>, EnvError>;

    /// Ruta del intérprete dentro del entorno.
    fn python(&self, env_id: &EnvironmentId) -> Result<PathBuf, EnvError>;

    /// Paquetes que componen el entorno instalado.
    fn package_info(&self, env_id: &EnvironmentId) -> Result<Vec<PackageInfo>, EnvError>;
}
