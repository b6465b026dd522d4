use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EnvError;

/// Tipo de datastore del workflow. Determina las librerías fijadas por defecto,
/// el backend de almacenamiento de artifacts y si se cachean remotamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatastoreType {
    Local,
    S3,
    Azure,
    Gs,
}

impl DatastoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::S3 => "s3",
            Self::Azure => "azure",
            Self::Gs => "gs",
        }
    }

    /// `true` si la ejecución remota requiere subir los artifacts a un store
    /// durable (y por tanto poblar `cache_urls`).
    pub fn caches_remotely(&self) -> bool {
        matches!(self, Self::S3 | Self::Azure)
    }
}

impl fmt::Display for DatastoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatastoreType {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            "azure" => Ok(Self::Azure),
            "gs" => Ok(Self::Gs),
            other => Err(EnvError::config(format!("unknown datastore type {other:?}"))),
        }
    }
}
