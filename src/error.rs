//! # Tipos de Error
//! src/error.rs
//!
//! Errores tipados del servidor. Se agrupan según dónde se originan:
//!
//! - `ConfigError`: configuración inválida (fatal al arrancar)
//! - `HttpError`: fallos por conexión (se registran y se cierra la conexión)
//! - `QueueError` / `EnqueueError`: la cola de conexiones
//! - `ServerError`: errores fatales de arranque y fallos del apagado

use crate::http::request::ParseError;
use std::fmt;
use std::io;

/// Resultado por defecto del crate
pub type Result<T> = std::result::Result<T, ServerError>;

/// Configuración inválida
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("worker count must be >= 1")]
    NoWorkers,

    #[error("queue capacity must be >= 1")]
    NoQueueCapacity,

    #[error("poll interval must be > 0 ms")]
    NoPollInterval,

    #[error("serve directory is not a directory: {0}")]
    NotADirectory(String),
}

/// Errores al leer un request o escribir una respuesta
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("connection I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("malformed request: {0}")]
    Malformed(#[from] ParseError),

    #[error("request header block exceeds {0} bytes")]
    TooLarge(usize),

    #[error("connection closed before sending a request")]
    ConnectionClosed,
}

/// Errores de la cola de conexiones
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    /// La cola fue apagada y ya no quedan conexiones
    #[error("connection queue is shut down")]
    Shutdown,

    /// Un thread entró en pánico con el lock tomado
    #[error("connection queue lock poisoned")]
    Poisoned,

    /// `dispose` llamado mientras otro dueño sigue vivo
    #[error("connection queue still shared by {0} other owner(s)")]
    InUse(usize),
}

/// `enqueue` rechazado: devuelve el handle para que el llamador lo cierre
pub struct EnqueueError<T> {
    pub handle: T,
    pub reason: QueueError,
}

impl<T> EnqueueError<T> {
    /// Recupera el handle rechazado
    pub fn into_inner(self) -> T {
        self.handle
    }
}

impl<T> fmt::Debug for EnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnqueueError")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for EnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enqueue rejected: {}", self.reason)
    }
}

impl<T> std::error::Error for EnqueueError<T> {}

/// Errores de nivel servidor
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to configure listening socket: {0}")]
    Listener(#[source] io::Error),

    #[error("failed to spawn worker {id}: {source}")]
    Spawn {
        id: usize,
        #[source]
        source: io::Error,
    },

    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    #[error("connection queue failed: {0}")]
    Queue(#[from] QueueError),

    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    /// Fallos acumulados durante el apagado. El apagado siempre se completa.
    #[error("teardown finished with {} failure(s): {}", .0.len(), .0.join("; "))]
    Teardown(Vec<String>),
}
