//! Auth module — identity, roles, permissions, audit trail, sessions.
//!
//! # Resources
//!
//! - **User** — member identity with credentials, role assignment and an
//!   approval lifecycle (pending → active, may be suspended/rejected)
//! - **Role** — named permission bundle; the six default roles are seeded
//!   by initialization and protected from rename/delete/deactivation
//! - **Permission** — atomic (resource, action) capability grant,
//!   compound-unique
//! - **AuditTrail** — append-only log of privileged mutations
//! - **Session** — JWT issuance record supporting refresh and revocation
//!
//! The module also implements [`acpn_core::Authenticator`], which is how
//! every other module authenticates requests and checks permissions.
//!
//! # Usage
//!
//! ```ignore
//! use auth::{AuthModule, service::AuthConfig};
//!
//! let module = AuthModule::new(sql, kv, AuthConfig::default())?;
//! let authenticator = module.service().clone(); // Arc<AuthService>: Authenticator
//! let router = module.routes(); // mounted under /api
//! ```

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use acpn_core::Module;

use crate::service::{AuthConfig, AuthService};

/// Auth module implementing the Module trait.
pub struct AuthModule {
    service: Arc<AuthService>,
}

impl AuthModule {
    pub fn new(
        sql: Arc<dyn acpn_sql::SQLStore>,
        kv: Arc<dyn acpn_kv::KVStore>,
        config: AuthConfig,
    ) -> Result<Self, acpn_core::ServiceError> {
        let service = AuthService::new(sql, kv, config).map_err(acpn_core::ServiceError::from)?;
        Ok(Self { service })
    }

    /// Get a reference to the underlying AuthService.
    pub fn service(&self) -> &Arc<AuthService> {
        &self.service
    }
}

impl Module for AuthModule {
    fn name(&self) -> &str {
        "auth"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone())
    }
}
