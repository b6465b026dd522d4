//! Errores de persistencia.
//! Mapea errores de IO / JSON / lock a variantes semánticas del store.

use std::path::PathBuf;

use flowenv_core::EnvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("manifest io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt manifest at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("could not lock manifest at {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PersistenceError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }
}

impl From<PersistenceError> for EnvError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Io { source, .. } => EnvError::Io(source),
            other => EnvError::Manifest(other.to_string()),
        }
    }
}
