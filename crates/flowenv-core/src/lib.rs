//! flowenv-core: identidad, resolución y manifest de entornos de pasos.
//!
//! Flujo: `DependencySpecBuilder` -> `EnvironmentId` -> `ManifestStore`
//! (lookup) -> `ExternalResolver` (si falta) -> `ManifestStore` (write) ->
//! `EnvironmentCache` (ejecución remota).
pub mod arch;
pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod datastore;
pub mod errors;
pub mod hashing;
pub mod identity;
pub mod manifest;
pub mod registry;
pub mod resolution;
pub mod resolver;
pub mod spec;

pub use arch::{select_architecture, Architecture, ArchitectureChoice, HostOs, HostPlatform};
pub use cache::{CachedArtifact, EnvironmentCache};
pub use config::Settings;
pub use context::ExecutionContext;
pub use datastore::DatastoreType;
pub use errors::{EnvError, ErrorKind};
pub use identity::EnvironmentId;
pub use manifest::{InMemoryManifestStore, Manifest, ManifestEntry, ManifestStore, ResolutionState};
pub use registry::ProcessRegistry;
pub use resolution::EnvironmentResolution;
pub use resolver::{ExternalResolver, PackageInfo, Resolution, ResolveRequest};
pub use spec::{is_enabled, DependencySpec, DependencySpecBuilder, EnvConfig, ExecutionRole, Libraries, LibrarySet, PinnedLibraries};
