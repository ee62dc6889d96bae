//! Docs module — organization document management.
//!
//! Documents carry metadata and a pointer into the blob store; uploads
//! append immutable versions and bump the parent's version counter.
//! Read visibility is gated by a hand-coded access-level hierarchy,
//! independent of the role/permission table (mutations still go through
//! the permission table).

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use acpn_core::{Authenticator, Module};

use crate::service::DocsService;

/// Docs module implementing the Module trait.
pub struct DocsModule {
    service: Arc<DocsService>,
    auth: Arc<dyn Authenticator>,
}

impl DocsModule {
    pub fn new(
        sql: Arc<dyn acpn_sql::SQLStore>,
        blob: Arc<dyn acpn_blob::BlobStore>,
        auth: Arc<dyn Authenticator>,
    ) -> Result<Self, acpn_core::ServiceError> {
        let service = DocsService::new(sql, blob)?;
        Ok(Self { service, auth })
    }

    pub fn service(&self) -> &Arc<DocsService> {
        &self.service
    }
}

impl Module for DocsModule {
    fn name(&self) -> &str {
        "docs"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone(), self.auth.clone())
    }
}
