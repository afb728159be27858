//! # Worker
//! src/server/worker.rs
//!
//! Loop que corre cada thread del pool:
//!
//! ```text
//! Idle (dequeue) ──► Servicing (leer request, resolver, responder) ──► Idle
//!   │
//!   └── cola apagada y vacía ──► Terminated
//! ```
//!
//! Un worker atiende una conexión a la vez. La conexión se consume en
//! `service` y se cierra al salir de ahí, pase lo que pase en el medio.

use super::context::ServerContext;
use super::queue::ConnectionQueue;
use crate::error::QueueError;
use crate::http::{Connection, Handler, StatusCode};
use crate::metrics::MetricsCollector;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Resultado de atender una conexión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Respuesta enviada completa
    Served(StatusCode),

    /// El request no se pudo leer o parsear
    Malformed,

    /// La respuesta falló a mitad de escritura
    WriteFailed,
}

pub struct Worker<C, H> {
    id: usize,
    queue: Arc<ConnectionQueue<C>>,
    context: Arc<ServerContext<H>>,
}

impl<C, H> Worker<C, H>
where
    C: Connection + Send + 'static,
    H: Handler,
{
    pub fn new(id: usize, queue: Arc<ConnectionQueue<C>>, context: Arc<ServerContext<H>>) -> Self {
        Self { id, queue, context }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Atiende conexiones hasta que la cola quede apagada y vacía.
    /// Retorna cuántas conexiones atendió.
    pub fn run(self) -> usize {
        info!(worker = self.id, "worker started");
        let mut serviced = 0;

        loop {
            let conn = match self.queue.dequeue() {
                Ok(conn) => conn,
                Err(QueueError::Shutdown) => break,
                Err(e) => {
                    error!(worker = self.id, error = %e, "worker cannot take connections");
                    break;
                }
            };

            self.service(conn);
            serviced += 1;
        }

        info!(worker = self.id, serviced, "worker stopped");
        serviced
    }

    /// Atiende una conexión y la cierra.
    pub fn service(&self, mut conn: C) -> Outcome {
        let start = Instant::now();
        let _busy = BusyGuard::new(self.context.metrics());
        let handler = self.context.handler();

        let resource = match handler.read_request(&mut conn) {
            Ok(resource) => resource,
            Err(e) => {
                warn!(worker = self.id, error = %e, "dropping unreadable request");
                self.context.metrics().record_malformed();
                return Outcome::Malformed;
            }
        };

        let path = self.context.resolve(&resource);

        match handler.write_response(&mut conn, &path) {
            Ok(status) => {
                let latency = start.elapsed();
                debug!(
                    worker = self.id,
                    resource = %resource,
                    status = %status,
                    latency_us = latency.as_micros() as u64,
                    "served"
                );
                self.context.metrics().record_served(status, latency);
                Outcome::Served(status)
            }
            Err(e) => {
                warn!(worker = self.id, resource = %resource, error = %e, "response write failed");
                self.context.metrics().record_write_failure();
                Outcome::WriteFailed
            }
        }
        // `conn` se cierra aquí en todos los caminos
    }
}

/// Marca al worker como ocupado mientras vive
struct BusyGuard<'a> {
    metrics: &'a MetricsCollector,
}

impl<'a> BusyGuard<'a> {
    fn new(metrics: &'a MetricsCollector) -> Self {
        metrics.worker_busy();
        Self { metrics }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.metrics.worker_idle();
    }
}
