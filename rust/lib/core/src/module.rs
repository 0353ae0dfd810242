use axum::Router;

/// A service module that contributes HTTP routes.
///
/// The binary entry point collects all modules and nests their routes
/// under `/{name}`.
pub trait Module: Send + Sync {
    /// Module name, used for logging and route prefixes.
    fn name(&self) -> &str;

    /// Return the module's routes, relative to `/{name}`.
    fn routes(&self) -> Router;
}
