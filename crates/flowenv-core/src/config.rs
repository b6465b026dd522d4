//! Carga de configuración desde variables de entorno (y `.env`).
//!
//! Convención `FLOWENV_*`. `Settings::from_env` carga `.env` una sola vez por
//! proceso; `Settings::from_lookup` permite construirla desde cualquier fuente
//! (tests, framework anfitrión).

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::constants::{DEFAULT_DOWNLOAD_CONCURRENCY, DEFAULT_FORCE_LINUX64};
use crate::datastore::DatastoreType;
use crate::errors::EnvError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

const DATASTORE_MARKER: &str = ".metaflow";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Raíz local donde viven los manifests (`<root>/<flow>/conda.dependencies`).
    pub datastore_root: PathBuf,
    /// Raíz de artifacts por defecto para cualquier datastore.
    pub package_root: String,
    /// Overrides por tipo de datastore.
    pub package_roots: HashMap<DatastoreType, String>,
    pub force_linux64: Vec<String>,
    pub download_concurrency: usize,
    pub python_version: Option<String>,
    /// Directorio padre de los directorios privados de aprovisionamiento.
    pub tmp_root: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self, EnvError> {
        init_dotenv();
        let cwd = env::current_dir()?;
        Self::from_lookup(|k| env::var(k).ok(), &cwd)
    }

    pub fn from_lookup<F>(lookup: F, cwd: &Path) -> Result<Self, EnvError>
        where F: Fn(&str) -> Option<String>
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let datastore_root = get("FLOWENV_DATASTORE_ROOT").map(PathBuf::from)
                                                          .unwrap_or_else(|| default_datastore_root(cwd));
        let package_root = get("FLOWENV_PACKAGE_ROOT").unwrap_or_else(|| datastore_root.join("conda").to_string_lossy().into_owned());

        let mut package_roots = HashMap::new();
        for ty in [DatastoreType::Local, DatastoreType::S3, DatastoreType::Azure, DatastoreType::Gs] {
            let key = format!("FLOWENV_PACKAGE_ROOT_{}", ty.as_str().to_ascii_uppercase());
            if let Some(root) = get(&key) {
                package_roots.insert(ty, root);
            }
        }

        let force_linux64 = match get("FLOWENV_FORCE_LINUX64") {
            Some(list) => list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect(),
            None => DEFAULT_FORCE_LINUX64.iter().map(|s| s.to_string()).collect(),
        };

        let download_concurrency = match get("FLOWENV_DOWNLOAD_CONCURRENCY") {
            Some(raw) => {
                let n: usize = raw.parse()
                                  .map_err(|_| EnvError::config(format!("FLOWENV_DOWNLOAD_CONCURRENCY must be a positive integer, got {raw:?}")))?;
                if n == 0 {
                    return Err(EnvError::config("FLOWENV_DOWNLOAD_CONCURRENCY must be at least 1"));
                }
                n
            }
            None => DEFAULT_DOWNLOAD_CONCURRENCY,
        };

        Ok(Self { datastore_root,
                  package_root,
                  package_roots,
                  force_linux64,
                  download_concurrency,
                  python_version: get("FLOWENV_PYTHON_VERSION"),
                  tmp_root: get("FLOWENV_TMP_ROOT").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/tmp")) })
    }

    /// Raíz de artifacts para el backend de `ty`.
    pub fn package_root_for(&self, ty: DatastoreType) -> &str {
        self.package_roots.get(&ty).map(String::as_str).unwrap_or(&self.package_root)
    }
}

/// Primer ancestro de `cwd` con un directorio `.metaflow`; si no hay, `cwd/.metaflow`.
fn default_datastore_root(cwd: &Path) -> PathBuf {
    cwd.ancestors()
       .map(|a| a.join(DATASTORE_MARKER))
       .find(|p| p.is_dir())
       .unwrap_or_else(|| cwd.join(DATASTORE_MARKER))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |k| pairs.iter().find(|(key, _)| *key == k).map(|(_, v)| v.to_string())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = Settings::from_lookup(lookup(&[]), dir.path()).expect("settings");
        assert_eq!(s.datastore_root, dir.path().join(".metaflow"));
        assert_eq!(s.download_concurrency, 8);
        assert_eq!(s.force_linux64, vec!["batch", "kubernetes"]);
        assert_eq!(s.tmp_root, PathBuf::from("/tmp"));
        assert_eq!(s.package_root_for(DatastoreType::S3), dir.path().join(".metaflow").join("conda").to_string_lossy());
    }

    #[test]
    fn datastore_root_found_in_ancestor() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join(".metaflow")).expect("marker");
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("nested");
        let s = Settings::from_lookup(lookup(&[]), &nested).expect("settings");
        assert_eq!(s.datastore_root, dir.path().join(".metaflow"));
    }

    #[test]
    fn explicit_values_and_per_type_roots() {
        let s = Settings::from_lookup(lookup(&[("FLOWENV_DATASTORE_ROOT", "/data/mf"),
                                               ("FLOWENV_PACKAGE_ROOT_S3", "s3://bucket/conda"),
                                               ("FLOWENV_FORCE_LINUX64", "batch, custom_remote"),
                                               ("FLOWENV_DOWNLOAD_CONCURRENCY", "3")]),
                                      Path::new("/"))
                    .expect("settings");
        assert_eq!(s.package_root_for(DatastoreType::S3), "s3://bucket/conda");
        assert_eq!(s.package_root_for(DatastoreType::Local), "/data/mf/conda");
        assert_eq!(s.force_linux64, vec!["batch", "custom_remote"]);
        assert_eq!(s.download_concurrency, 3);
    }

    #[test]
    fn invalid_concurrency_is_configuration_error() {
        assert!(Settings::from_lookup(lookup(&[("FLOWENV_DOWNLOAD_CONCURRENCY", "many")]), Path::new("/")).is_err());
        assert!(Settings::from_lookup(lookup(&[("FLOWENV_DOWNLOAD_CONCURRENCY", "0")]), Path::new("/")).is_err());
    }
}
