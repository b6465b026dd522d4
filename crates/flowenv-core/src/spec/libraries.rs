//! Conjuntos de librerías `nombre -> versión` y su merge por capas.
//!
//! Un `LibrarySet` conserva el orden de inserción (los tokens de dependencias
//! se emiten en ese orden) y unicidad por nombre. El merge es "shallow" al
//! estilo de `merge_json`: las entradas de la capa superior reemplazan
//! individualmente a las de la inferior, nunca el mapa completo.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::EnvError;

pub type LibrarySet = IndexMap<String, String>;

/// Forma en que un paso declara sus librerías: mapa explícito o la forma
/// compacta `"pkg:ver,pkg:ver"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Libraries {
    Map(LibrarySet),
    Compact(String),
}

impl Default for Libraries {
    fn default() -> Self {
        Libraries::Map(LibrarySet::new())
    }
}

impl Libraries {
    /// Normaliza a `LibrarySet`; la forma compacta se parsea y falla rápido si
    /// está mal formada.
    pub fn to_set(&self) -> Result<LibrarySet, EnvError> {
        match self {
            Libraries::Map(m) => Ok(m.clone()),
            Libraries::Compact(s) => parse_compact(s),
        }
    }
}

impl From<LibrarySet> for Libraries {
    fn from(m: LibrarySet) -> Self {
        Libraries::Map(m)
    }
}

const WRAPPER_CHARS: &[char] = &['"', '{', '}', '\''];
const QUOTE_CHARS: &[char] = &['"', '\''];

/// Parsea `"pkg:ver,pkg:ver"` (opcionalmente envuelto en llaves o comillas).
/// Una cadena vacía produce un conjunto vacío.
pub fn parse_compact(raw: &str) -> Result<LibrarySet, EnvError> {
    let body = raw.trim_matches(WRAPPER_CHARS);
    let mut out = LibrarySet::new();
    if body.is_empty() {
        return Ok(out);
    }
    for item in body.split(',') {
        let parts: Vec<&str> = item.split(':').map(|p| p.trim().trim_matches(QUOTE_CHARS)).collect();
        match parts.as_slice() {
            [name, version] => {
                out.insert((*name).to_string(), (*version).to_string());
            }
            _ => {
                return Err(EnvError::config(format!("malformed library entry {item:?} in {raw:?}; expected \"pkg:version\"")));
            }
        }
    }
    Ok(out)
}

/// Merge: claves de `upper` sobreescriben las de `base`; el resto se conserva
/// en su posición original y las nuevas se agregan al final.
pub fn merge_libraries(base: &LibrarySet, upper: &LibrarySet) -> LibrarySet {
    let mut out = base.clone();
    for (k, v) in upper {
        out.insert(k.clone(), v.clone());
    }
    out
}
