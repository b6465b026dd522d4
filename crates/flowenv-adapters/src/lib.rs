//! flowenv-adapters: cache de artifacts y backends de almacenamiento.
//!
//! - `artifacts`: `ArtifactCache`, implementación de `EnvironmentCache`.
//! - `fetch`: descarga de artifacts (HTTP y `file://`).
//! - `storage`: store durable direccionado por clave y registro por tipo de
//!   datastore.

pub mod artifacts;
pub mod fetch;
pub mod storage;

pub use artifacts::{canonical_tarball_path, destination_key, ArtifactCache};
pub use fetch::{ArtifactFetcher, HttpFetcher};
pub use storage::{LocalObjectStore, ObjectStore, StorageRegistry, StoreFactory};
