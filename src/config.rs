//! # Configuración del Servidor
//! src/config.rs
//!
//! Argumentos CLI con respaldo en variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./pool_server ./www 8080 --workers 4 --queue-capacity 16
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! SERVE_DIR=./www HTTP_PORT=8080 WORKERS=4 ./pool_server
//! ```

use crate::error::ConfigError;
use clap::Parser;
use std::path::Path;
use tracing::info;

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "pool_server")]
#[command(about = "Servidor de archivos estáticos con pool fijo de workers")]
#[command(version)]
pub struct Config {
    /// Directorio cuyos archivos se sirven
    #[arg(value_name = "DIRECTORY", env = "SERVE_DIR")]
    pub serve_dir: String,

    /// Puerto TCP de escucha
    #[arg(value_name = "PORT", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP de escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    /// Número de workers del pool
    #[arg(short, long, default_value = "5", env = "WORKERS")]
    pub workers: usize,

    /// Capacidad de la cola de conexiones pendientes
    #[arg(short = 'q', long = "queue-capacity", default_value = "5", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Cada cuánto el accept loop revisa si se pidió el apagado
    #[arg(long = "poll-interval-ms", default_value = "50", env = "POLL_INTERVAL_MS")]
    pub poll_interval_ms: u64,

    /// Filtro de logs (sintaxis de `tracing_subscriber::EnvFilter`)
    #[arg(long = "log", default_value = "info", env = "RUST_LOG")]
    pub log_filter: String,
}

impl Config {
    /// Parsea los argumentos del proceso
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use pool_server::config::Config;
    ///
    /// let mut config = Config::default();
    /// config.port = 8080;
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración. Un error acá es fatal al arrancar.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::NoQueueCapacity);
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::NoPollInterval);
        }
        if !Path::new(&self.serve_dir).is_dir() {
            return Err(ConfigError::NotADirectory(self.serve_dir.clone()));
        }
        Ok(())
    }

    /// Registra la configuración efectiva
    pub fn print_summary(&self) {
        info!(
            address = %self.address(),
            serve_dir = %self.serve_dir,
            workers = self.workers,
            queue_capacity = self.queue_capacity,
            poll_interval_ms = self.poll_interval_ms,
            "configuration"
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serve_dir: ".".to_string(),
            port: 0,
            host: "0.0.0.0".to_string(),
            workers: 5,
            queue_capacity: 5,
            poll_interval_ms: 50,
            log_filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.workers, 5);
        assert_eq!(config.queue_capacity, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_address_custom() {
        let mut config = Config::default();
        config.host = "127.0.0.1".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_parse_positional_and_flags() {
        let config = Config::try_parse_from([
            "pool_server", "/tmp", "8081", "--workers", "2", "-q", "4", "--host", "127.0.0.1",
        ])
        .unwrap();

        assert_eq!(config.serve_dir, "/tmp");
        assert_eq!(config.port, 8081);
        assert_eq!(config.workers, 2);
        assert_eq!(config.queue_capacity, 4);
        assert_eq!(config.address(), "127.0.0.1:8081");
    }

    #[test]
    fn test_parse_rejects_bad_port() {
        assert!(Config::try_parse_from(["pool_server", ".", "not-a-port"]).is_err());
        assert!(Config::try_parse_from(["pool_server", ".", "70000"]).is_err());
    }

    #[test]
    fn test_validate_invalid_workers() {
        let mut config = Config::default();
        config.workers = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoWorkers));
    }

    #[test]
    fn test_validate_invalid_queue_capacity() {
        let mut config = Config::default();
        config.queue_capacity = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoQueueCapacity));
    }

    #[test]
    fn test_validate_invalid_poll_interval() {
        let mut config = Config::default();
        config.poll_interval_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoPollInterval));
    }

    #[test]
    fn test_validate_missing_serve_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.serve_dir = dir.path().join("missing").to_str().unwrap().to_string();

        assert!(matches!(config.validate(), Err(ConfigError::NotADirectory(_))));
    }

    #[test]
    fn test_validate_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.html");
        std::fs::write(&file, "x").unwrap();

        let mut config = Config::default();
        config.serve_dir = file.to_str().unwrap().to_string();

        assert!(matches!(config.validate(), Err(ConfigError::NotADirectory(_))));
    }
}
