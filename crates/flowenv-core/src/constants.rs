//! Constantes del núcleo de entornos.
//!
//! Varios de estos valores participan en la identidad de un entorno o en el
//! formato del manifest persistido. Cambiarlos invalida manifests existentes
//! (las identidades dejan de coincidir), por eso se mantienen estables.

/// Prefijo de toda identidad de entorno (`metaflow_<flow>_<arch>_<sha1>`).
pub const ENV_ID_PREFIX: &str = "metaflow";

/// Arquitectura canónica usada cuando alguna extensión activa fuerza la
/// resolución (ejecución remota en hosts Linux de 64 bits).
pub const FORCED_ARCHITECTURE: &str = "linux-64";

/// Nombre del archivo de manifest dentro de `<datastore root>/<flow>/`.
pub const MANIFEST_FILE_NAME: &str = "conda.dependencies";

/// Modo de entorno requerido por el componente de pasos.
pub const REQUIRED_ENVIRONMENT_MODE: &str = "conda";

/// Tamaño por defecto del pool de descargas.
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 8;

/// Nombres (extensiones o comandos) que fuerzan `FORCED_ARCHITECTURE` si no se
/// configura otra lista.
pub const DEFAULT_FORCE_LINUX64: &[&str] = &["batch", "kubernetes"];

/// Variable que etiqueta la identidad del entorno activo en el proceso hijo.
pub const ENV_ID_VARIABLE: &str = "_METAFLOW_CONDA_ENV";
pub const PATH_VARIABLE: &str = "PATH";
pub const MODULE_PATH_VARIABLE: &str = "PYTHONPATH";
pub const NO_USER_SITE_VARIABLE: &str = "PYTHONNOUSERSITE";

/// Campo/tipo del metadato que registra el entorno usado por un intento.
pub const ENV_ID_METADATA_FIELD: &str = "conda_env_id";

/// Sufijo canónico de los tarballs en la cache local.
pub const CANONICAL_TARBALL_SUFFIX: &str = ".tar.bz2";
/// Sufijo que el gestor de paquetes reporta de forma inconsistente.
pub const CONDA_FORMAT_SUFFIX: &str = ".conda";
