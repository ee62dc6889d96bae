//! Registry module — the member pharmacy register.
//!
//! Every due is assigned to a pharmacy from this register; bulk
//! assignment targets pharmacies whose registration is active, and a
//! pharmacy's owning user may read its own dues.

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use acpn_core::{Authenticator, Module};

use crate::service::RegistryService;

/// Registry module implementing the Module trait.
pub struct RegistryModule {
    service: Arc<RegistryService>,
    auth: Arc<dyn Authenticator>,
}

impl RegistryModule {
    pub fn new(
        sql: Arc<dyn acpn_sql::SQLStore>,
        auth: Arc<dyn Authenticator>,
    ) -> Result<Self, acpn_core::ServiceError> {
        let service = RegistryService::new(sql)?;
        Ok(Self { service, auth })
    }

    pub fn service(&self) -> &Arc<RegistryService> {
        &self.service
    }
}

impl Module for RegistryModule {
    fn name(&self) -> &str {
        "registry"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone(), self.auth.clone())
    }
}
