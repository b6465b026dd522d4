//! Errores del núcleo de entornos.
//!
//! La taxonomía es plana: todo error aborta el paso de resolución o
//! aprovisionamiento donde ocurrió y sube sin modificar al framework que lo
//! invocó. `ErrorKind` permite clasificar sin depender del mensaje.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("resolution failed for {env_id}: {reason}")]
    Resolution { env_id: String, reason: String },
    #[error("download failed for {url}: {reason}")]
    Download { url: String, reason: String },
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("manifest error: {0}")]
    Manifest(String),
    #[error("environment {0} is not installed")]
    MissingEnvironment(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Clase de error según la taxonomía del subsistema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Resolution,
    Download,
    Upload,
    Storage,
}

impl EnvError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Resolution { .. } | Self::MissingEnvironment(_) => ErrorKind::Resolution,
            Self::Download { .. } => ErrorKind::Download,
            Self::Upload(_) => ErrorKind::Upload,
            Self::Manifest(_) | Self::Io(_) | Self::Serialization(_) => ErrorKind::Storage,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
