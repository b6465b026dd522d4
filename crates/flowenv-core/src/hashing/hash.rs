//! Hash helpers – la identidad de entorno usa SHA-1 (160 bits) para ser
//! compatible con manifests ya escritos; los checksums de artifacts usan
//! SHA-256.

use std::fs::File;
use std::io;
use std::path::Path;

use sha1::{Digest, Sha1};
use sha2::Sha256;

/// Hashea una secuencia de tokens unidos por un espacio y devuelve hex.
pub fn hash_tokens<I, S>(tokens: I) -> String
    where I: IntoIterator<Item = S>,
          S: AsRef<str>
{
    let mut h = Sha1::new();
    for (i, t) in tokens.into_iter().enumerate() {
        if i > 0 {
            h.update(b" ");
        }
        h.update(t.as_ref().as_bytes());
    }
    hex(&h.finalize())
}

/// SHA-256 en hex del contenido de un archivo (lectura en streaming).
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut h = Sha256::new();
    io::copy(&mut file, &mut h)?;
    Ok(hex(&h.finalize()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
