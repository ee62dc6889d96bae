use axum::Router;

/// A service module that contributes HTTP routes.
///
/// Each business module (auth, registry, dues, finance, docs) implements
/// this trait. The binary entry point collects all modules and nests
/// their routes under the shared `/api` prefix.
pub trait Module: Send + Sync {
    /// Module name, used for logging.
    fn name(&self) -> &str;

    /// Return the module's routes, relative to `/api`.
    fn routes(&self) -> Router;
}
