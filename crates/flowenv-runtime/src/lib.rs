//! flowenv-runtime: aprovisionamiento en el host y ciclo de vida del paso.
pub mod host_links;
pub mod launch;
pub mod lifecycle;
pub mod provisioner;
pub mod wiring;

pub use host_links::{DistributionLocator, ExtensionPackage, HostLinks, NoTrampolines, TrampolineGenerator, INFO_FILE_NAME};
pub use launch::LaunchPlan;
pub use lifecycle::{EnvMetadatum, EnvironmentStepDecorator, PreStep, StepInit, StepLifecycle, TaskAttempt};
pub use provisioner::EnvironmentProvisioner;
pub use wiring::build_resolution;
