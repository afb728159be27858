//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Colaborador "escribir respuesta": dado un path ya resuelto, envía el
//! archivo (200) o una respuesta vacía 404.
//!
//! ## Formato de una respuesta HTTP/1.0
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: text/html\r\n
//! Content-Length: 13\r\n
//! \r\n
//! <h1>Hola</h1>
//! ```

use super::StatusCode;
use crate::error::HttpError;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Component, Path};

/// Respuesta HTTP/1.0 completa
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    /// Headers en orden de inserción
    headers: Vec<(String, String)>,

    body: Vec<u8>,
}

impl Response {
    /// Respuesta sin headers ni body
    ///
    /// # Ejemplo
    /// ```
    /// use pool_server::http::{Response, StatusCode};
    ///
    /// let response = Response::new(StatusCode::NotFound)
    ///     .with_header("Content-Length", "0");
    /// assert!(response.to_bytes().starts_with(b"HTTP/1.0 404 Not Found\r\n"));
    /// ```
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Agrega un header. Si ya existe, se sobrescribe.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Body de texto. Calcula `Content-Length`.
    pub fn with_body(self, body: &str) -> Self {
        self.with_body_bytes(body.as_bytes().to_vec())
    }

    /// Body binario. Calcula `Content-Length`.
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        let len = self.body.len().to_string();
        self.add_header("Content-Length", &len);
        self
    }

    /// Status line y headers, terminados en la línea vacía
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut result = format!("HTTP/1.0 {}\r\n", self.status).into_bytes();

        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        result.extend_from_slice(b"\r\n");
        result
    }

    /// Respuesta completa lista para el socket
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = self.head_bytes();
        result.extend_from_slice(&self.body);
        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Content-Type según la extensión del archivo
pub fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html",
        Some("txt") => "text/plain",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// Escribe la respuesta para `path` en `conn`.
///
/// Si `path` es un archivo regular se envía con 200; en cualquier otro caso
/// (no existe, es un directorio, contiene `..`) se envía 404 sin body.
/// Retorna el código enviado.
pub fn write_response<W: Write + ?Sized>(conn: &mut W, path: &Path) -> Result<StatusCode, HttpError> {
    let file = if escapes_root(path) {
        None
    } else {
        open_regular_file(path)
    };

    let Some((mut file, len)) = file else {
        let response = Response::new(StatusCode::NotFound).with_header("Content-Length", "0");
        conn.write_all(&response.head_bytes())?;
        conn.flush()?;
        return Ok(StatusCode::NotFound);
    };

    let head = Response::new(StatusCode::Ok)
        .with_header("Content-Type", mime_type(path))
        .with_header("Content-Length", &len.to_string())
        .head_bytes();

    conn.write_all(&head)?;
    let copied = io::copy(&mut file, conn)?;
    conn.flush()?;

    if copied != len {
        return Err(HttpError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("sent {} of {} bytes of {}", copied, len, path.display()),
        )));
    }

    Ok(StatusCode::Ok)
}

fn escapes_root(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

fn open_regular_file(path: &Path) -> Option<(File, u64)> {
    let file = File::open(path).ok()?;
    let meta = file.metadata().ok()?;
    meta.is_file().then(|| (file, meta.len()))
}
