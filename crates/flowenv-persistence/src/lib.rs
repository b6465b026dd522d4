//! flowenv-persistence
//!
//! Implementación durable de `ManifestStore`: un archivo JSON por workflow en
//! `<datastore root>/<flow>/conda.dependencies`.
//!
//! Módulos:
//! - `file`: store sobre filesystem con read-merge-write bajo lock exclusivo.
//! - `error`: errores de persistencia y su mapeo a `EnvError`.

pub mod error;
pub mod file;

pub use error::PersistenceError;
pub use file::{manifest_path, FileManifestStore};
