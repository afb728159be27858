//! # Contexto del Servidor
//! src/server/context.rs
//!
//! Estado compartido de solo lectura que reciben el dispatcher y cada
//! worker al crearse: directorio servido, handler y métricas.

use crate::http::{Handler, StaticFiles};
use crate::metrics::MetricsCollector;
use std::path::PathBuf;

pub struct ServerContext<H = StaticFiles> {
    serve_dir: String,
    handler: H,
    metrics: MetricsCollector,
}

impl<H: Handler> ServerContext<H> {
    pub fn new(serve_dir: impl Into<String>, handler: H) -> Self {
        Self {
            serve_dir: serve_dir.into(),
            handler,
            metrics: MetricsCollector::new(),
        }
    }

    /// Path del recurso: directorio servido + nombre, sin modificar el nombre.
    ///
    /// ```
    /// use pool_server::http::StaticFiles;
    /// use pool_server::server::ServerContext;
    ///
    /// let context = ServerContext::new("/srv/www", StaticFiles);
    /// assert_eq!(context.resolve("/index.html").to_str(), Some("/srv/www/index.html"));
    /// ```
    pub fn resolve(&self, resource: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.serve_dir, resource))
    }

    pub fn serve_dir(&self) -> &str {
        &self.serve_dir
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }
}
