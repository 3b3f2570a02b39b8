use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use url::Url;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_METADATA_FILE: &str = "imageMetadata.json";
pub const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000/";

/// Upload service settings, read from `IMGCROP_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub metadata_file: PathBuf,
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            metadata_file: PathBuf::from(DEFAULT_METADATA_FILE),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty or unparsable values
    /// fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        Self {
            bind: get("IMGCROP_BIND")
                .map(|value| value.trim().to_string())
                .unwrap_or(defaults.bind),
            port: get("IMGCROP_PORT")
                .and_then(|value| value.trim().parse::<u16>().ok())
                .unwrap_or(defaults.port),
            upload_dir: get("IMGCROP_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            metadata_file: get("IMGCROP_METADATA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.metadata_file),
            body_limit: get("IMGCROP_BODY_LIMIT")
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(defaults.body_limit),
        }
    }

    pub fn bind_address(&self) -> anyhow::Result<SocketAddr> {
        Ok(SocketAddr::new(self.bind.parse()?, self.port))
    }
}

/// Base URL of the upload service as seen by the crop client.
pub fn client_base_url(raw: Option<&str>) -> anyhow::Result<Url> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_SERVER_URL);
    let mut url = Url::parse(raw)?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => anyhow::bail!("server url must be http or https, got {scheme}"),
    }
    // Url::join replaces the last segment unless the path ends with '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
