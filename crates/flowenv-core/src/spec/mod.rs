//! Especificación de dependencias de un paso y su construcción por capas.

pub mod builder;
pub mod dependency;
pub mod libraries;

pub use builder::{is_enabled, DefaultPinnedLibraries, DependencySpecBuilder, EnvConfig, ExecutionRole, NoPinnedLibraries, PinnedLibraries};
pub use dependency::DependencySpec;
pub use libraries::{merge_libraries, parse_compact, Libraries, LibrarySet};
