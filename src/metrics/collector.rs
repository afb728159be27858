//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Contadores del servidor compartidos entre el dispatcher y los workers.
//! Se resumen en JSON al terminar el apagado.

use crate::http::StatusCode;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Máximo de latencias guardadas para los percentiles
const MAX_LATENCIES: usize = 10_000;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

#[derive(Default)]
struct MetricsData {
    /// Conexiones aceptadas por el dispatcher
    accepted: u64,

    /// Conexiones cerradas sin encolar porque la cola estaba apagada
    rejected: u64,

    /// Respuestas enviadas, por código
    status_codes: BTreeMap<u16, u64>,

    /// Requests que no se pudieron leer
    malformed: u64,

    /// Respuestas que fallaron a mitad de escritura
    write_failures: u64,

    /// Latencias de servicio en microsegundos (ventana circular)
    latencies: Vec<u64>,
    next_latency: usize,

    /// Workers atendiendo una conexión ahora mismo
    busy_workers: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData {
                latencies: Vec::with_capacity(MAX_LATENCIES),
                ..MetricsData::default()
            })),
            start_time: Instant::now(),
        }
    }

    /// Un worker que entra en pánico no debe dejar las métricas inutilizables
    fn data(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_accepted(&self) {
        self.data().accepted += 1;
    }

    pub fn record_rejected(&self) {
        self.data().rejected += 1;
    }

    pub fn record_malformed(&self) {
        self.data().malformed += 1;
    }

    pub fn record_write_failure(&self) {
        self.data().write_failures += 1;
    }

    /// Registra una respuesta enviada completa
    pub fn record_served(&self, status: StatusCode, latency: Duration) {
        let mut data = self.data();

        *data.status_codes.entry(status.as_u16()).or_insert(0) += 1;

        let latency_us = latency.as_micros().min(u64::MAX as u128) as u64;
        if data.latencies.len() < MAX_LATENCIES {
            data.latencies.push(latency_us);
        } else {
            let slot = data.next_latency;
            data.latencies[slot] = latency_us;
        }
        data.next_latency = (data.next_latency + 1) % MAX_LATENCIES;
    }

    pub fn worker_busy(&self) {
        self.data().busy_workers += 1;
    }

    pub fn worker_idle(&self) {
        let mut data = self.data();
        data.busy_workers = data.busy_workers.saturating_sub(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.data();
        let latency = LatencySummary::from_samples(&data.latencies);

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            accepted: data.accepted,
            rejected: data.rejected,
            served: data.status_codes.values().sum(),
            status_codes: data
                .status_codes
                .iter()
                .map(|(code, count)| (code.to_string(), *count))
                .collect(),
            malformed: data.malformed,
            write_failures: data.write_failures,
            busy_workers: data.busy_workers,
            latency_us: latency,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentiles de latencia en microsegundos
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LatencySummary {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub avg: u64,
    pub samples: usize,
}

impl LatencySummary {
    fn from_samples(latencies: &[u64]) -> Self {
        if latencies.is_empty() {
            return Self::default();
        }

        let mut sorted = latencies.to_vec();
        sorted.sort_unstable();

        let len = sorted.len();
        let sum: u64 = sorted.iter().sum();

        Self {
            p50: sorted[len * 50 / 100],
            p95: sorted[len * 95 / 100],
            p99: sorted[len * 99 / 100],
            avg: sum / len as u64,
            samples: len,
        }
    }
}

/// Foto de las métricas en un instante
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub served: u64,
    pub status_codes: BTreeMap<String, u64>,
    pub malformed: u64,
    pub write_failures: u64,
    pub busy_workers: u64,
    pub latency_us: LatencySummary,
}

impl MetricsSnapshot {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let collector = MetricsCollector::new();

        collector.record_accepted();
        collector.record_accepted();
        collector.record_accepted();
        collector.record_served(StatusCode::Ok, Duration::from_millis(10));
        collector.record_served(StatusCode::NotFound, Duration::from_millis(5));
        collector.record_malformed();

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.accepted, 3);
        assert_eq!(snapshot.served, 2);
        assert_eq!(snapshot.malformed, 1);
        assert_eq!(snapshot.status_codes.get("200"), Some(&1));
        assert_eq!(snapshot.status_codes.get("404"), Some(&1));
    }

    #[test]
    fn test_percentiles() {
        let collector = MetricsCollector::new();

        for i in 1..=100 {
            collector.record_served(StatusCode::Ok, Duration::from_micros(i));
        }

        let latency = collector.snapshot().latency_us;
        assert_eq!(latency.samples, 100);
        assert!(latency.p50 > 0);
        assert!(latency.p95 > latency.p50);
        assert!(latency.p99 > latency.p95);
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let collector = MetricsCollector::new();

        for i in 0..(MAX_LATENCIES as u64 + 500) {
            collector.record_served(StatusCode::Ok, Duration::from_micros(i));
        }

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.served, MAX_LATENCIES as u64 + 500);
        assert_eq!(snapshot.latency_us.samples, MAX_LATENCIES);
    }

    #[test]
    fn test_busy_workers_never_negative() {
        let collector = MetricsCollector::new();

        collector.worker_busy();
        collector.worker_busy();
        assert_eq!(collector.snapshot().busy_workers, 2);

        collector.worker_idle();
        collector.worker_idle();
        collector.worker_idle();
        assert_eq!(collector.snapshot().busy_workers, 0);
    }

    #[test]
    fn test_json_summary() {
        let collector = MetricsCollector::new();
        collector.record_served(StatusCode::Ok, Duration::from_millis(1));
        collector.record_rejected();

        let json = collector.snapshot().to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["served"], 1);
        assert_eq!(value["rejected"], 1);
        assert_eq!(value["status_codes"]["200"], 1);
        assert!(value["latency_us"]["p50"].is_u64());
    }
}
