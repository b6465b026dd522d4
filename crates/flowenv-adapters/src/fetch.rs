//! Descarga de artifacts.

use std::fs::{self, File};
use std::path::Path;
use std::time::Duration;

use flowenv_core::EnvError;
use log::debug;
use url::Url;

/// Trae el contenido de `url` a `dest` (que no existe todavía).
pub trait ArtifactFetcher: Send + Sync {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), EnvError>;
}

/// Fetcher HTTP(S) bloqueante; las URLs `file://` se copian del disco.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, EnvError> {
        let client = reqwest::blocking::Client::builder().connect_timeout(Duration::from_secs(15))
                                                         .timeout(Duration::from_secs(600))
                                                         .build()
                                                         .map_err(|e| EnvError::config(format!("cannot build http client: {e}")))?;
        Ok(Self { client })
    }
}

fn download_error(url: &str, reason: impl ToString) -> EnvError {
    EnvError::Download { url: url.to_string(), reason: reason.to_string() }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), EnvError> {
        let parsed = Url::parse(url).map_err(|e| download_error(url, e))?;
        if parsed.scheme() == "file" {
            let src = parsed.to_file_path().map_err(|_| download_error(url, "not a local path"))?;
            fs::copy(&src, dest).map_err(|e| download_error(url, e))?;
            return Ok(());
        }
        debug!("fetch:start url={url}");
        let mut response = self.client.get(parsed).send().map_err(|e| download_error(url, e))?;
        if !response.status().is_success() {
            return Err(download_error(url, format!("HTTP {}", response.status())));
        }
        let mut out = File::create(dest).map_err(|e| download_error(url, e))?;
        let bytes = response.copy_to(&mut out).map_err(|e| download_error(url, e))?;
        debug!("fetch:done url={url} bytes={bytes}");
        Ok(())
    }
}
