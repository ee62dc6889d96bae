//! Server configuration, loaded from a TOML file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the SQLite, redb and blob stores.
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// JWT signing secret.
    pub secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: i64,
}

fn default_access_ttl() -> i64 {
    86400
}

fn default_refresh_ttl() -> i64 {
    604800
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Display name of the seeded superadmin.
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
    /// Login email of the seeded superadmin.
    pub admin_email: String,
    /// Argon2id hash of the superadmin password. Generated out of band;
    /// the plaintext never appears in configuration.
    pub admin_password_hash: String,
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. "0.0.0.0:8080".
    #[serde(default = "default_listen")]
    pub listen: String,
    pub storage: StorageConfig,
    pub jwt: JwtConfig,
    pub bootstrap: BootstrapConfig,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

impl ServerConfig {
    /// Resolve a context name or path. Names map to
    /// `/etc/acpn/<name>.toml`; anything containing `/` or `.` is used
    /// as a path directly.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/acpn/{}.toml", name_or_path))
        }
    }

    /// Load configuration from disk.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config {}: {}", path.display(), e))?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir().join("data.sqlite")
    }

    pub fn redb_path(&self) -> PathBuf {
        self.data_dir().join("data.redb")
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir().join("blobs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_name_vs_path() {
        assert_eq!(
            ServerConfig::resolve_path("prod"),
            PathBuf::from("/etc/acpn/prod.toml")
        );
        assert_eq!(
            ServerConfig::resolve_path("./local.toml"),
            PathBuf::from("./local.toml")
        );
    }

    #[test]
    fn toml_round_trip_with_defaults() {
        let toml_str = r#"
            [storage]
            data_dir = "/var/lib/acpnd"

            [jwt]
            secret = "s3cret"

            [bootstrap]
            admin_email = "admin@acpn.example"
            admin_password_hash = "$argon2id$stub"
        "#;
        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.jwt.access_ttl_secs, 86400);
        assert_eq!(config.bootstrap.admin_name, "Administrator");
        assert_eq!(config.sqlite_path(), PathBuf::from("/var/lib/acpnd/data.sqlite"));
    }
}
