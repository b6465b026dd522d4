//! Manifest por workflow: modelo de entrada y contrato de almacenamiento.

pub mod entry;
pub mod store;

pub use entry::{Manifest, ManifestEntry, ResolutionState};
pub use store::{InMemoryManifestStore, ManifestStore};
