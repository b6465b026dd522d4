//! `FileManifestStore`: manifest por workflow sobre el filesystem local.
//!
//! Escrituras: se abre (o crea) el archivo, se toma un lock exclusivo
//! advisory, se lee el contenido actual, se reemplaza sólo la identidad
//! escrita y se reescribe en el mismo descriptor. Dos procesos que escriben
//! identidades distintas no se pisan; para la misma identidad gana el último
//! (el contenido es idempotente). Lecturas: lock compartido; un archivo vacío
//! o inexistente es un manifest vacío.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flowenv_core::constants::MANIFEST_FILE_NAME;
use flowenv_core::{EnvError, EnvironmentId, Manifest, ManifestEntry, ManifestStore};
use fs4::FileExt;
use log::debug;

use crate::error::PersistenceError;

/// Ruta del manifest de `flow_name` bajo `root`.
pub fn manifest_path(root: &Path, flow_name: &str) -> PathBuf {
    root.join(flow_name).join(MANIFEST_FILE_NAME)
}

pub struct FileManifestStore {
    root: PathBuf,
}

impl FileManifestStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_locked(path: &Path, file: &mut File) -> Result<Manifest, PersistenceError> {
        let mut raw = String::new();
        file.read_to_string(&mut raw).map_err(|e| PersistenceError::io(path, e))?;
        parse(path, &raw)
    }
}

fn parse(path: &Path, raw: &str) -> Result<Manifest, PersistenceError> {
    if raw.trim().is_empty() {
        return Ok(Manifest::new());
    }
    serde_json::from_str(raw).map_err(|e| PersistenceError::Corrupt { path: path.to_path_buf(), reason: e.to_string() })
}

impl ManifestStore for FileManifestStore {
    fn read(&self, flow_name: &str) -> Result<Manifest, EnvError> {
        let path = manifest_path(&self.root, flow_name);
        debug!("manifest:read path={}", path.display());
        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Manifest::new()),
            Err(e) => return Err(PersistenceError::io(&path, e).into()),
        };
        file.lock_shared().map_err(|e| PersistenceError::Lock { path: path.clone(), source: e })?;
        Ok(Self::read_locked(&path, &mut file)?)
    }

    fn write(&self, flow_name: &str, env_id: &EnvironmentId, entry: &ManifestEntry) -> Result<(), EnvError> {
        let path = manifest_path(&self.root, flow_name);
        debug!("manifest:write:start path={} env_id={env_id}", path.display());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
        }
        let mut file = OpenOptions::new().read(true)
                                         .write(true)
                                         .create(true)
                                         .truncate(false)
                                         .open(&path)
                                         .map_err(|e| PersistenceError::io(&path, e))?;
        // El lock se libera al cerrar el descriptor.
        file.lock_exclusive().map_err(|e| PersistenceError::Lock { path: path.clone(), source: e })?;

        let mut manifest = Self::read_locked(&path, &mut file)?;
        manifest.insert(env_id.clone(), entry.clone());
        let body = serde_json::to_vec(&manifest)?;

        file.seek(SeekFrom::Start(0)).map_err(|e| PersistenceError::io(&path, e))?;
        file.write_all(&body).map_err(|e| PersistenceError::io(&path, e))?;
        file.set_len(body.len() as u64).map_err(|e| PersistenceError::io(&path, e))?;
        file.sync_all().map_err(|e| PersistenceError::io(&path, e))?;
        debug!("manifest:write:done path={} entries={}", path.display(), manifest.len());
        Ok(())
    }
}
