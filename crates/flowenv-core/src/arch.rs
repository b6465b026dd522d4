//! Selección de arquitectura objetivo.
//!
//! Si alguna extensión activa (p.ej. ejecución remota en un cluster Linux)
//! figura en la lista de forzado, se resuelve para `linux-64` aunque el host
//! sea otro. En macOS, además, se desactivan los safety checks del gestor de
//! paquetes por las diferencias de sensibilidad a mayúsculas del filesystem.

use std::fmt;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::constants::FORCED_ARCHITECTURE;
use crate::errors::EnvError;

/// Etiqueta de arquitectura (`linux-64`, `osx-arm64`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Architecture(String);

impl Architecture {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }
    pub fn forced() -> Self {
        Self(FORCED_ARCHITECTURE.to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl HostOs {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => HostOs::Linux,
            "macos" => HostOs::MacOs,
            "windows" => HostOs::Windows,
            _ => HostOs::Other,
        }
    }
}

/// Descripción del host de build: SO, etiqueta nativa e intérprete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: HostOs,
    pub native_architecture: Architecture,
    pub python_version: String,
}

impl HostPlatform {
    /// Detecta el host actual. La versión de Python se toma de `python_override`
    /// si existe; si no, se consulta `python3 --version`.
    pub fn detect(python_override: Option<&str>) -> Result<Self, EnvError> {
        let os = HostOs::current();
        let native_architecture = native_arch_tag(os, std::env::consts::ARCH)?;
        let python_version = match python_override {
            Some(v) => v.to_string(),
            None => probe_python_version()?,
        };
        Ok(Self { os, native_architecture, python_version })
    }

    /// Host actual con la versión de Python de `FLOWENV_PYTHON_VERSION`, si está.
    pub fn from_settings(settings: &Settings) -> Result<Self, EnvError> {
        Self::detect(settings.python_version.as_deref())
    }
}

/// Etiqueta nativa para un par (SO, arquitectura de CPU).
pub fn native_arch_tag(os: HostOs, cpu: &str) -> Result<Architecture, EnvError> {
    let tag = match (os, cpu) {
        (HostOs::Linux, "x86_64") => "linux-64",
        (HostOs::Linux, "x86") => "linux-32",
        (HostOs::Linux, "aarch64") => "linux-aarch64",
        (HostOs::MacOs, "x86_64") => "osx-64",
        (HostOs::MacOs, "aarch64") => "osx-arm64",
        (HostOs::Windows, "x86_64") => "win-64",
        _ => return Err(EnvError::config(format!("unsupported host platform {os:?}/{cpu}"))),
    };
    Ok(Architecture::new(tag))
}

fn probe_python_version() -> Result<String, EnvError> {
    let out = Command::new("python3").arg("--version")
                                     .output()
                                     .map_err(|e| EnvError::config(format!("cannot probe host python: {e}")))?;
    // Python < 3.4 escribía la versión en stderr.
    let text = if out.stdout.is_empty() { out.stderr } else { out.stdout };
    let text = String::from_utf8_lossy(&text);
    parse_python_version(&text).ok_or_else(|| EnvError::config(format!("unexpected `python3 --version` output: {text:?}")))
}

fn parse_python_version(text: &str) -> Option<String> {
    let v = text.trim().strip_prefix("Python ")?.trim();
    if v.is_empty() { None } else { Some(v.to_string()) }
}

/// Resultado de la selección de arquitectura para un paso.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchitectureChoice {
    pub architecture: Architecture,
    pub force_architecture: bool,
    pub disable_safety_checks: bool,
}

/// Elige la arquitectura a partir de las extensiones activas del paso.
pub fn select_architecture<S: AsRef<str>>(active_extensions: &[S],
                                          force_list: &[String],
                                          host: &HostPlatform)
                                          -> ArchitectureChoice {
    let forced = active_extensions.iter()
                                  .any(|e| force_list.iter().any(|f| f == e.as_ref()));
    if forced {
        ArchitectureChoice { architecture: Architecture::forced(),
                             force_architecture: true,
                             disable_safety_checks: host.os == HostOs::MacOs }
    } else {
        ArchitectureChoice { architecture: host.native_architecture.clone(),
                             force_architecture: false,
                             disable_safety_checks: false }
    }
}
