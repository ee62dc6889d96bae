//! Dues module — financial obligations assigned to member pharmacies.
//!
//! # Resources
//!
//! - **DueType** — category/template of due with a name and default amount
//! - **Due** — an obligation for a (pharmacy, due type, year); carries
//!   penalties, a derived balance and payment status
//! - **DuePayment** — a pharmacy's submitted payment, pending review;
//!   approval applies the amount to the due, rejection leaves it untouched
//!
//! Balance arithmetic is an explicit pure function ([`model::Due::recompute`])
//! invoked at every mutation site. Duplicate prevention for the
//! (pharmacy, due type, year) triple is a unique index with the conflict
//! surfaced as an error, not a read-then-write check.

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use acpn_core::{Authenticator, Module};
use registry::service::RegistryService;

use crate::service::DuesService;

/// Dues module implementing the Module trait.
pub struct DuesModule {
    service: Arc<DuesService>,
    auth: Arc<dyn Authenticator>,
}

impl DuesModule {
    pub fn new(
        sql: Arc<dyn acpn_sql::SQLStore>,
        registry: Arc<RegistryService>,
        auth: Arc<dyn Authenticator>,
    ) -> Result<Self, acpn_core::ServiceError> {
        let service = DuesService::new(sql, registry)?;
        Ok(Self { service, auth })
    }

    pub fn service(&self) -> &Arc<DuesService> {
        &self.service
    }
}

impl Module for DuesModule {
    fn name(&self) -> &str {
        "dues"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone(), self.auth.clone())
    }
}
