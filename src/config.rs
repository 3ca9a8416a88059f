//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `CATALOG_DATA_FILE` - Course store document (default: data/courses.json)
//! - `CATALOG_PUBLIC_DIR` - Front-end pages and scripts (default: public)
//! - `CATALOG_UPLOAD_DIR` - Persisted uploads, served at `/uploads` (default: uploads)
//! - `CATALOG_UPLOAD_STORAGE` - `local` or `placeholder` (default: local)
//! - `CATALOG_MAX_UPLOAD_BYTES` - Upload ceiling in bytes (default: 5 MiB)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where accepted uploads go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStorageKind {
    /// Written under `upload_dir` and served back.
    Local,
    /// Validated, then discarded; the placeholder thumbnail URL is returned.
    Placeholder,
}

impl FromStr for UploadStorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "disk" => Ok(Self::Local),
            "placeholder" | "noop" | "none" => Ok(Self::Placeholder),
            other => Err(format!("unknown upload storage '{other}' (expected local or placeholder)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub data_file: PathBuf,
    pub public_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub upload_storage: UploadStorageKind,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            data_file: PathBuf::from("data/courses.json"),
            public_dir: PathBuf::from("public"),
            upload_dir: PathBuf::from("uploads"),
            upload_storage: UploadStorageKind::Local,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// Calls `dotenvy::dotenv()` first so a local `.env` file is honored.
    pub fn from_env() -> Result<Self, ConfigError> {
        // .env is optional
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: parse_var(&get, "HOST")?.unwrap_or(defaults.host),
            port: parse_var(&get, "PORT")?.unwrap_or(defaults.port),
            data_file: get("CATALOG_DATA_FILE").map_or(defaults.data_file, PathBuf::from),
            public_dir: get("CATALOG_PUBLIC_DIR").map_or(defaults.public_dir, PathBuf::from),
            upload_dir: get("CATALOG_UPLOAD_DIR").map_or(defaults.upload_dir, PathBuf::from),
            upload_storage: parse_var(&get, "CATALOG_UPLOAD_STORAGE")?
                .unwrap_or(defaults.upload_storage),
            max_upload_bytes: parse_var(&get, "CATALOG_MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_var<T, F>(get: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.data_file, PathBuf::from("data/courses.json"));
        assert_eq!(config.upload_storage, UploadStorageKind::Local);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("CATALOG_DATA_FILE", "/tmp/courses.json"),
            ("CATALOG_UPLOAD_STORAGE", "Placeholder"),
            ("CATALOG_MAX_UPLOAD_BYTES", "1024"),
        ]))
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.data_file, PathBuf::from("/tmp/courses.json"));
        assert_eq!(config.upload_storage, UploadStorageKind::Placeholder);
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("PORT", "  ")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "PORT"));

        let err = AppConfig::from_lookup(lookup(&[("CATALOG_UPLOAD_STORAGE", "s3")])).unwrap_err();
        assert!(err.to_string().contains("CATALOG_UPLOAD_STORAGE"));
    }
}
