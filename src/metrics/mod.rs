//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Contadores de conexiones aceptadas, rechazadas y atendidas, más
//! percentiles de latencia por conexión.

pub mod collector;

pub use collector::{LatencySummary, MetricsCollector, MetricsSnapshot};
