//! # Pool Server
//! src/lib.rs
//!
//! Servidor de archivos estáticos sobre HTTP/1.x con un número fijo de
//! workers. Un dispatcher acepta conexiones y las deja en una cola acotada;
//! cuando la cola se llena, el dispatcher espera.
//!
//! ## Arquitectura
//!
//! - `config`: argumentos CLI y variables de entorno
//! - `error`: errores tipados
//! - `http`: lectura del request y escritura de la respuesta
//! - `server`: dispatcher, cola, workers y apagado
//! - `metrics`: contadores y latencias
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use pool_server::config::Config;
//! use pool_server::server::{install_signal_handler, Server};
//!
//! let config = Config::default();
//! let server = Server::bind(config)?;
//! install_signal_handler(server.shutdown_handle())?;
//! server.run()?;
//! # Ok::<(), pool_server::error::ServerError>(())
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod server;
