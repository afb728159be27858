//! # Handler de Conexiones
//! src/http/handler.rs
//!
//! Frontera entre el núcleo (cola + workers) y el protocolo. El worker
//! solo conoce estas dos operaciones; cómo se parsea el request o se
//! arma la respuesta queda de este lado.

use super::{request, response, StatusCode};
use crate::error::HttpError;
use std::io::{Read, Write};
use std::path::Path;

/// Conexión bidireccional (un `TcpStream` en producción)
pub trait Connection: Read + Write {}

impl<T: Read + Write> Connection for T {}

/// Operaciones que un worker invoca sobre cada conexión
pub trait Handler: Send + Sync + 'static {
    /// Lee un request y devuelve el nombre del recurso pedido
    fn read_request(&self, conn: &mut dyn Connection) -> Result<String, HttpError>;

    /// Escribe la respuesta para un path ya resuelto
    fn write_response(&self, conn: &mut dyn Connection, path: &Path)
        -> Result<StatusCode, HttpError>;
}

/// Servidor de archivos estáticos HTTP/1.0
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticFiles;

impl Handler for StaticFiles {
    fn read_request(&self, conn: &mut dyn Connection) -> Result<String, HttpError> {
        let request = request::read_request(conn)?;
        Ok(request.path().to_string())
    }

    fn write_response(
        &self,
        conn: &mut dyn Connection,
        path: &Path,
    ) -> Result<StatusCode, HttpError> {
        response::write_response(conn, path)
    }
}
