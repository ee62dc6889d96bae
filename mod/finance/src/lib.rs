//! Finance module — the association's income/expense ledger.
//!
//! Records carry a closed category set and a positive amount; reports
//! aggregate by month, day and category with zero-filled buckets so chart
//! consumers never see missing entries.

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use acpn_core::{Authenticator, Module};

use crate::service::FinanceService;

/// Finance module implementing the Module trait.
pub struct FinanceModule {
    service: Arc<FinanceService>,
    auth: Arc<dyn Authenticator>,
}

impl FinanceModule {
    pub fn new(
        sql: Arc<dyn acpn_sql::SQLStore>,
        auth: Arc<dyn Authenticator>,
    ) -> Result<Self, acpn_core::ServiceError> {
        let service = FinanceService::new(sql)?;
        Ok(Self { service, auth })
    }

    pub fn service(&self) -> &Arc<FinanceService> {
        &self.service
    }
}

impl Module for FinanceModule {
    fn name(&self) -> &str {
        "finance"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone(), self.auth.clone())
    }
}
