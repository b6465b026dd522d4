//! Hashing: identidad de entornos y checksums de artifacts.

pub mod hash;

pub use hash::{hash_tokens, sha256_file};
