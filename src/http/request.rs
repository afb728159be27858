//! # Lectura de Requests HTTP/1.0
//! src/http/request.rs
//!
//! Colaborador "leer request": consume el bloque de headers de una conexión
//! y devuelve el nombre del recurso pedido.
//!
//! ## Formato de un Request HTTP/1.0
//!
//! ```text
//! GET /index.html HTTP/1.0\r\n
//! Host: localhost:8080\r\n
//! \r\n
//! ```
//!
//! Solo interesa el target de la request line. Los headers se validan
//! pero el servidor no los usa.

use crate::error::HttpError;
use std::collections::HashMap;
use std::io::{self, Read};

/// Tamaño máximo del bloque de headers
pub const MAX_HEADER_BYTES: usize = 8192;

/// Tamaño de cada lectura del socket
const READ_CHUNK: usize = 512;

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
}

impl Method {
    fn from_str(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
        }
    }
}

/// Request HTTP/1.0 parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Path decodificado, sin query string (ej: "/index.html")
    path: String,

    headers: HashMap<String, String>,

    version: String,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Request vacío
    EmptyRequest,

    /// Bytes que no son UTF-8
    InvalidEncoding,

    /// La request line no tiene la forma `METHOD TARGET VERSION`
    InvalidRequestLine,

    /// El target no empieza con '/'
    InvalidTarget(String),

    UnsupportedMethod(String),

    InvalidHttpVersion(String),

    /// Header sin ':'
    InvalidHeader(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::EmptyRequest => write!(f, "Empty request"),
            ParseError::InvalidEncoding => write!(f, "Request is not valid UTF-8"),
            ParseError::InvalidRequestLine => write!(f, "Invalid request line format"),
            ParseError::InvalidTarget(t) => write!(f, "Invalid request target: {}", t),
            ParseError::UnsupportedMethod(m) => write!(f, "Unsupported HTTP method: {}", m),
            ParseError::InvalidHttpVersion(v) => write!(f, "Invalid HTTP version: {}", v),
            ParseError::InvalidHeader(h) => write!(f, "Invalid header: {}", h),
        }
    }
}

impl std::error::Error for ParseError {}

/// Lee el bloque de headers de `conn` y lo parsea.
///
/// Bloquea hasta ver la línea vacía que cierra los headers o hasta EOF.
/// Falla si el peer cierra sin mandar nada, si el bloque supera
/// `MAX_HEADER_BYTES` o si el contenido no es un request válido.
pub fn read_request<R: Read + ?Sized>(conn: &mut R) -> Result<Request, HttpError> {
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = match conn.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            // Una señal cortó la lectura: se reintenta
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        // Buscar el fin de headers solo en la zona nueva (más 3 bytes de solape)
        let search_from = buffer.len().saturating_sub(3);
        buffer.extend_from_slice(&chunk[..n]);

        if let Some(end) = find_header_end(&buffer[search_from..]) {
            buffer.truncate(search_from + end);
            break;
        }

        if buffer.len() > MAX_HEADER_BYTES {
            return Err(HttpError::TooLarge(MAX_HEADER_BYTES));
        }
    }

    if buffer.is_empty() {
        return Err(HttpError::ConnectionClosed);
    }

    Ok(Request::parse(&buffer)?)
}

/// Posición justo después de "\r\n\r\n", si aparece
fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

impl Request {
    /// Parsea un bloque de headers HTTP/1.0
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use pool_server::http::Request;
    ///
    /// let raw = b"GET /docs/index.html?v=2 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/docs/index.html");
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let request_str = std::str::from_utf8(buffer)
            .map_err(|_| ParseError::InvalidEncoding)?;

        if request_str.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut lines = request_str.split("\r\n");
        let request_line = lines.next().ok_or(ParseError::EmptyRequest)?;

        let (method, path, version) = Self::parse_request_line(request_line)?;
        let headers = Self::parse_headers(lines)?;

        Ok(Request {
            method,
            path,
            headers,
            version,
        })
    }

    /// Formato: `GET /path?query HTTP/1.0`
    fn parse_request_line(line: &str) -> Result<(Method, String, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method = Method::from_str(parts[0])?;

        let target = parts[1];
        if !target.starts_with('/') {
            return Err(ParseError::InvalidTarget(target.to_string()));
        }
        // El query string no forma parte del nombre del recurso
        let raw_path = target.split('?').next().unwrap_or(target);
        let path = percent_decode(raw_path);

        let version = parts[2].to_string();
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version));
        }

        Ok((method, path, version))
    }

    /// Cada header tiene formato "Name: Value". Termina en la línea vacía.
    fn parse_headers<'a>(
        lines: impl Iterator<Item = &'a str>,
    ) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();

        for line in lines {
            if line.trim().is_empty() {
                break;
            }

            match line.split_once(':') {
                Some((name, value)) => {
                    headers.insert(name.trim().to_string(), value.trim().to_string());
                }
                None => return Err(ParseError::InvalidHeader(line.to_string())),
            }
        }

        Ok(headers)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Nombre del recurso pedido
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Decodifica secuencias `%XX`. Las secuencias inválidas se dejan tal cual.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
