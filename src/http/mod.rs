//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Los dos colaboradores que usan los workers:
//!
//! - `read_request`: lee el request y extrae el nombre del recurso
//! - `write_response`: envía el archivo pedido o un 404
//!
//! Ambos quedan detrás del trait `Handler`; el núcleo no sabe nada de
//! métodos ni headers.
//!
//! ### Formato de Request
//!
//! ```text
//! GET /index.html HTTP/1.0\r\n
//! \r\n
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: text/html\r\n
//! Content-Length: 13\r\n
//! \r\n
//! <h1>Hola</h1>
//! ```

pub mod handler;   // Trait Handler + StaticFiles
pub mod request;   // Lectura y parsing de requests
pub mod response;  // Construcción y envío de responses
pub mod status;    // Códigos de estado HTTP

pub use handler::{Connection, Handler, StaticFiles};
pub use request::{read_request, Request};
pub use response::{write_response, Response};
pub use status::StatusCode;
