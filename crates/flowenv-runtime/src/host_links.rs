//! Vista privada del filesystem para el proceso anfitrión.
//!
//! Directorio temporal propio con enlaces a la distribución instalada (árbol
//! de la librería núcleo + archivo de versión) y a la extensión opcional. Si
//! la extensión es un namespace repartido en varias rutas físicas, cada ruta
//! va en su propio subdirectorio y esos subdirectorios se agregan al search
//! path (un único enlace no puede representar varias raíces).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flowenv_core::EnvError;
use log::debug;
use serde_json::Value;
use tempfile::TempDir;

/// Nombre del archivo de versión dentro del directorio privado.
pub const INFO_FILE_NAME: &str = "INFO";

/// Extensión opcional y las rutas físicas donde vive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionPackage {
    pub name: String,
    pub paths: Vec<PathBuf>,
}

/// Ubicación de la distribución instalada en el host.
pub trait DistributionLocator: Send + Sync {
    /// Nombre del paquete núcleo (nombre del enlace).
    fn library_name(&self) -> &str;
    /// Raíz del árbol instalado del paquete núcleo.
    fn library_root(&self) -> Result<PathBuf, EnvError>;
    /// Archivo de versión, si existe.
    fn info_file(&self) -> Option<PathBuf>;
    /// Descriptor del entorno activo; se usa cuando no hay archivo de versión.
    fn environment_info(&self) -> Value;
    fn extension_package(&self) -> Option<ExtensionPackage>;
}

/// Instala shims de escape entre runtimes dentro del directorio privado.
pub trait TrampolineGenerator: Send + Sync {
    fn generate(&self, dir: &Path) -> Result<(), EnvError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrampolines;

impl TrampolineGenerator for NoTrampolines {
    fn generate(&self, _dir: &Path) -> Result<(), EnvError> {
        Ok(())
    }
}

#[cfg(unix)]
fn link(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn link(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}

#[derive(Debug)]
pub struct HostLinks {
    dir: TempDir,
    additional_paths: Vec<PathBuf>,
}

impl HostLinks {
    pub fn create(tmp_root: &Path,
                  locator: &dyn DistributionLocator,
                  trampolines: &dyn TrampolineGenerator)
                  -> Result<Self, EnvError> {
        fs::create_dir_all(tmp_root)?;
        let dir = tempfile::Builder::new().prefix("flowenv-").tempdir_in(tmp_root)?;
        let root = dir.path();
        debug!("host_links:start dir={}", root.display());

        link(&locator.library_root()?, &root.join(locator.library_name()))?;
        match locator.info_file().filter(|p| p.is_file()) {
            Some(info) => link(&info, &root.join(INFO_FILE_NAME))?,
            None => fs::write(root.join(INFO_FILE_NAME), serde_json::to_string(&locator.environment_info())?)?,
        }

        let mut additional_paths = Vec::new();
        if let Some(ext) = locator.extension_package() {
            let mut paths: Vec<PathBuf> = Vec::with_capacity(ext.paths.len());
            for p in ext.paths {
                if !paths.contains(&p) {
                    paths.push(p);
                }
            }
            match paths.as_slice() {
                [] => {}
                [single] => link(single, &root.join(&ext.name))?,
                many => {
                    for (i, p) in many.iter().enumerate() {
                        let sub = root.join(format!("{}-{i}", ext.name));
                        fs::create_dir(&sub)?;
                        link(p, &sub.join(&ext.name))?;
                        additional_paths.push(sub);
                    }
                }
            }
        }

        trampolines.generate(root)?;
        debug!("host_links:done dir={} additional_paths={}", root.display(), additional_paths.len());
        Ok(Self { dir, additional_paths })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Subdirectorios de un namespace multi-ruta (vacío en otro caso).
    pub fn additional_paths(&self) -> &[PathBuf] {
        &self.additional_paths
    }

    /// Search path de módulos: subdirectorios de la extensión y luego el
    /// directorio privado.
    pub fn module_search_path(&self) -> Vec<PathBuf> {
        let mut entries = self.additional_paths.clone();
        entries.push(self.path().to_path_buf());
        entries
    }

    /// Borra el directorio privado con todo su árbol de enlaces.
    pub fn teardown(self) -> Result<(), EnvError> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!("host_links:teardown dir={}", path.display());
        Ok(())
    }
}
