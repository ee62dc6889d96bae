//! Bootstrap — configuration checks and first-start seeding.
//!
//! When acpnd starts:
//! 1. Verify the config carries a JWT secret and a superadmin password
//!    hash — refuse to start otherwise.
//! 2. Initialize the permission catalog and the six default roles
//!    (idempotent reset-to-default).
//! 3. Ensure the superadmin account exists.

use std::sync::Arc;

use tracing::info;

use auth::model::AuditContext;
use auth::service::AuthService;

use crate::config::ServerConfig;

/// Verify server configuration is ready for use.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.jwt.secret.is_empty() {
        anyhow::bail!("JWT secret is empty in configuration.");
    }
    if config.bootstrap.admin_password_hash.is_empty() {
        anyhow::bail!(
            "No superadmin password hash found in configuration.\n\
             Generate one with an argon2id tool and set bootstrap.admin_password_hash."
        );
    }
    if config.bootstrap.admin_email.is_empty() {
        anyhow::bail!("bootstrap.admin_email is empty in configuration.");
    }
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("storage.data_dir is empty in configuration.");
    }
    Ok(())
}

/// Seed roles, permissions and the superadmin account.
pub fn seed(auth: &Arc<AuthService>, config: &ServerConfig) -> anyhow::Result<()> {
    let ctx = AuditContext::system();

    auth.initialize_roles(&ctx)
        .map_err(|e| anyhow::anyhow!("role initialization failed: {}", e))?;

    let admin = auth
        .ensure_superadmin(
            &ctx,
            &config.bootstrap.admin_name,
            &config.bootstrap.admin_email,
            &config.bootstrap.admin_password_hash,
        )
        .map_err(|e| anyhow::anyhow!("superadmin seeding failed: {}", e))?;

    info!(admin_id = %admin.id, "bootstrap complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BootstrapConfig, JwtConfig, StorageConfig};

    fn config(secret: &str, hash: &str) -> ServerConfig {
        ServerConfig {
            listen: "127.0.0.1:0".into(),
            storage: StorageConfig {
                data_dir: "/tmp/acpnd-test".into(),
            },
            jwt: JwtConfig {
                secret: secret.into(),
                access_ttl_secs: 3600,
                refresh_ttl_secs: 7200,
            },
            bootstrap: BootstrapConfig {
                admin_name: "Admin".into(),
                admin_email: "admin@acpn.example".into(),
                admin_password_hash: hash.into(),
            },
        }
    }

    #[test]
    fn empty_secret_or_hash_refused() {
        assert!(verify_config(&config("", "$argon2id$x")).is_err());
        assert!(verify_config(&config("secret", "")).is_err());
        assert!(verify_config(&config("secret", "$argon2id$x")).is_ok());
    }
}
