//! Store durable direccionado por clave y selección de backend.
//!
//! Sólo se incluye el backend local (directorio). Los backends remotos se
//! registran en `StorageRegistry` por tipo de datastore; el transporte queda
//! fuera de este crate.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use flowenv_core::{DatastoreType, EnvError};
use log::{debug, warn};

pub trait ObjectStore: Send + Sync {
    /// Sube en una sola llamada todos los pares `(clave, archivo)`. Una clave
    /// existente no se sobreescribe. Devuelve cuántos objetos se escribieron.
    fn save_files(&self, items: Vec<(String, File)>) -> Result<usize, EnvError>;
}

/// Backend sobre un directorio local (o un montaje compartido).
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn put(&self, dest: &Path, file: &mut File) -> io::Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut partial = dest.as_os_str().to_owned();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        let mut out = File::create(&partial)?;
        io::copy(file, &mut out)?;
        out.sync_all()?;
        fs::rename(&partial, dest)
    }
}

impl ObjectStore for LocalObjectStore {
    fn save_files(&self, items: Vec<(String, File)>) -> Result<usize, EnvError> {
        debug!("store:save:start root={} items={}", self.root.display(), items.len());
        let mut written = 0;
        for (key, mut file) in items {
            let dest = self.object_path(&key);
            if dest.exists() {
                warn!("store: key {key} already present, skipping");
                continue;
            }
            self.put(&dest, &mut file).map_err(|e| EnvError::Upload(format!("{key}: {e}")))?;
            written += 1;
        }
        debug!("store:save:done written={written}");
        Ok(written)
    }
}

pub type StoreFactory = Box<dyn Fn(&str) -> Result<Box<dyn ObjectStore>, EnvError> + Send + Sync>;

/// Backends disponibles por tipo de datastore.
pub struct StorageRegistry {
    factories: HashMap<DatastoreType, StoreFactory>,
}

impl Default for StorageRegistry {
    fn default() -> Self {
        let mut r = Self { factories: HashMap::new() };
        r.register(DatastoreType::Local, Box::new(|root: &str| Ok(Box::new(LocalObjectStore::new(root)) as Box<dyn ObjectStore>)));
        r
    }
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, ty: DatastoreType, factory: StoreFactory) {
        self.factories.insert(ty, factory);
    }

    /// Instancia el backend de `ty` apuntando a `root`.
    pub fn open(&self, ty: DatastoreType, root: &str) -> Result<Box<dyn ObjectStore>, EnvError> {
        let factory = self.factories
                          .get(&ty)
                          .ok_or_else(|| EnvError::config(format!("no storage backend registered for datastore {ty}")))?;
        factory(root)
    }
}
