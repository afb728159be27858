//! # Coordinador de Apagado
//! src/server/shutdown.rs
//!
//! Una interrupción externa (SIGINT o SIGTERM) es la única forma de parar
//! el servidor. El handler solo llama a `ShutdownHandle::trigger`, que:
//!
//! 1. Baja el flag `running` (una sola vez, nunca vuelve a subir)
//! 2. Apaga la cola, para que un dispatcher bloqueado en `enqueue` y los
//!    workers bloqueados en `dequeue` despierten
//!
//! El accept loop revisa el flag entre intentos de `accept`.

use super::queue::ConnectionQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{info, warn};

/// Algo que se puede apagar desde el coordinador
pub trait ShutdownTarget: Send + Sync {
    fn shutdown(&self) -> bool;
}

impl<T: Send> ShutdownTarget for ConnectionQueue<T> {
    fn shutdown(&self) -> bool {
        ConnectionQueue::shutdown(self)
    }
}

/// Token de cancelación compartido por el dispatcher y el handler de señales
#[derive(Clone)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
    target: Weak<dyn ShutdownTarget>,
}

impl ShutdownHandle {
    pub fn new(target: Weak<dyn ShutdownTarget>) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            target,
        }
    }

    /// Pide el apagado. Retorna `true` solo para la primera llamada.
    ///
    /// Solo la primera llamada toca la cola; las siguientes solo leen el flag.
    pub fn trigger(&self) -> bool {
        let first = self.running.swap(false, Ordering::SeqCst);
        if !first {
            // La cola ya fue apagada; tomar otra referencia ahora puede
            // chocar con `dispose` durante el apagado
            return false;
        }

        // Si la cola ya fue liberada no queda nadie bloqueado
        if let Some(target) = self.target.upgrade() {
            target.shutdown();
        }

        true
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("running", &self.is_running())
            .finish()
    }
}

/// Instala el handler de SIGINT/SIGTERM del proceso.
///
/// Solo puede llamarse una vez por proceso.
pub fn install_signal_handler(handle: ShutdownHandle) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        if handle.trigger() {
            info!("interrupt received, shutting down");
        } else {
            warn!("interrupt received again, shutdown already in progress");
        }
    })
}
