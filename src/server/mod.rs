//! # Módulo del Servidor
//! src/server/mod.rs
//!
//! Pool fijo de workers alimentado por una cola acotada:
//!
//! 1. `tcp`: el dispatcher acepta conexiones y las encola
//! 2. `queue`: buffer circular con bloqueo en ambos extremos
//! 3. `worker`: cada thread saca una conexión, la atiende y la cierra
//! 4. `shutdown`: token de apagado y handler de señales

pub mod context;
pub mod queue;
pub mod shutdown;
pub mod tcp;
pub mod worker;

pub use context::ServerContext;
pub use queue::ConnectionQueue;
pub use shutdown::{install_signal_handler, ShutdownHandle, ShutdownTarget};
pub use tcp::Server;
pub use worker::{Outcome, Worker};
