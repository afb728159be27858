//! # Dispatcher TCP
//! src/server/tcp.rs
//!
//! Dueño del socket de escucha y del ciclo de vida del pool:
//!
//! 1. `bind`: valida la configuración, abre el socket y crea la cola
//! 2. `run`: lanza los N workers, corre el accept loop y, al salir,
//!    ejecuta el apagado completo
//!
//! Apagado: cola apagada → socket cerrado → join de cada worker →
//! cola liberada. Cada paso corre aunque uno anterior haya fallado; los
//! fallos se juntan en `ServerError::Teardown`.

use super::context::ServerContext;
use super::queue::ConnectionQueue;
use super::shutdown::{ShutdownHandle, ShutdownTarget};
use super::worker::Worker;
use crate::config::Config;
use crate::error::{QueueError, Result, ServerError};
use crate::http::{Handler, StaticFiles};
use crate::metrics::MetricsCollector;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Servidor con pool fijo de workers
pub struct Server<H: Handler = StaticFiles> {
    config: Config,
    listener: TcpListener,
    queue: Arc<ConnectionQueue<TcpStream>>,
    context: Arc<ServerContext<H>>,
    shutdown: ShutdownHandle,
}

impl Server<StaticFiles> {
    /// Servidor de archivos estáticos sobre `config.serve_dir`
    pub fn bind(config: Config) -> Result<Self> {
        Self::with_handler(config, StaticFiles)
    }
}

impl<H: Handler> Server<H> {
    pub fn with_handler(config: Config, handler: H) -> Result<Self> {
        config.validate()?;

        let address = config.address();
        let listener = TcpListener::bind(&address)
            .map_err(|source| ServerError::Bind { address: address.clone(), source })?;

        // El accept loop revisa el flag de apagado entre intentos
        listener.set_nonblocking(true).map_err(ServerError::Listener)?;

        let queue = Arc::new(ConnectionQueue::new(config.queue_capacity));
        let target: Arc<dyn ShutdownTarget> = queue.clone();
        let shutdown = ShutdownHandle::new(Arc::downgrade(&target));
        let context = Arc::new(ServerContext::new(config.serve_dir.clone(), handler));

        Ok(Self {
            config,
            listener,
            queue,
            context,
            shutdown,
        })
    }

    /// Dirección real de escucha (útil con puerto 0)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Token para pedir el apagado desde otro thread o desde el handler de señales
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn metrics(&self) -> MetricsCollector {
        self.context.metrics().clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Corre el servidor hasta que se pida el apagado.
    ///
    /// Retorna `Ok(())` solo si el arranque, el accept loop y todo el
    /// apagado terminaron sin errores.
    pub fn run(self) -> Result<()> {
        let Server {
            config,
            listener,
            queue,
            context,
            shutdown,
        } = self;

        let workers = match spawn_workers(config.workers, &queue, &context) {
            Ok(workers) => workers,
            Err((err, spawned)) => {
                error!(error = %err, "aborting startup");
                teardown(listener, queue, spawned, &context, &shutdown);
                return Err(err);
            }
        };

        info!(
            address = %listener.local_addr().map(|a| a.to_string()).unwrap_or_else(|_| config.address()),
            workers = workers.len(),
            queue_capacity = queue.capacity(),
            "server listening"
        );

        let poll = Duration::from_millis(config.poll_interval_ms);
        let accepted = accept_loop(&listener, &queue, &context, &shutdown, poll);

        info!("accept loop finished, shutting down");
        let failures = teardown(listener, queue, workers, &context, &shutdown);

        if let Err(e) = accepted {
            error!(error = %e, "accept loop failed");
            return Err(e);
        }
        if !failures.is_empty() {
            return Err(ServerError::Teardown(failures));
        }
        Ok(())
    }
}

type WorkerHandle = (usize, JoinHandle<usize>);

/// Lanza los workers. Si alguno no se puede crear, retorna el error junto
/// con los que sí arrancaron para que el llamador los baje.
fn spawn_workers<H: Handler>(
    count: usize,
    queue: &Arc<ConnectionQueue<TcpStream>>,
    context: &Arc<ServerContext<H>>,
) -> std::result::Result<Vec<WorkerHandle>, (ServerError, Vec<WorkerHandle>)> {
    let mut handles = Vec::with_capacity(count);

    for id in 0..count {
        let worker = Worker::new(id, Arc::clone(queue), Arc::clone(context));
        let spawned = thread::Builder::new()
            .name(format!("worker-{}", id))
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => handles.push((id, handle)),
            Err(source) => return Err((ServerError::Spawn { id, source }, handles)),
        }
    }

    Ok(handles)
}

/// Acepta conexiones y las encola hasta que se pida el apagado.
fn accept_loop<H: Handler>(
    listener: &TcpListener,
    queue: &ConnectionQueue<TcpStream>,
    context: &ServerContext<H>,
    shutdown: &ShutdownHandle,
    poll: Duration,
) -> Result<()> {
    let metrics = context.metrics();

    while shutdown.is_running() {
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(poll);
                continue;
            }
            // Una señal cortó el accept: el while vuelve a mirar el flag
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if is_per_connection(&e) => {
                warn!(error = %e, "accept failed for one connection");
                continue;
            }
            Err(e) => return Err(ServerError::Accept(e)),
        };

        // El socket aceptado puede heredar el modo no bloqueante
        if let Err(e) = stream.set_nonblocking(false) {
            warn!(peer = %peer, error = %e, "cannot switch connection to blocking mode, closing");
            continue;
        }

        metrics.record_accepted();
        debug!(peer = %peer, "accepted connection");

        if let Err(rejected) = queue.enqueue(stream) {
            metrics.record_rejected();
            // Ningún worker la va a atender: se cierra acá
            drop(rejected.handle);

            match rejected.reason {
                QueueError::Shutdown => {
                    warn!(peer = %peer, "queue shut down, closed connection without serving it");
                    break;
                }
                reason => return Err(ServerError::Queue(reason)),
            }
        }
    }

    Ok(())
}

/// Errores de `accept` que afectan solo a la conexión entrante
fn is_per_connection(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset
    )
}

/// Baja el pool. Cada paso corre aunque uno anterior falle.
fn teardown<H: Handler>(
    listener: TcpListener,
    queue: Arc<ConnectionQueue<TcpStream>>,
    workers: Vec<WorkerHandle>,
    context: &ServerContext<H>,
    shutdown: &ShutdownHandle,
) -> Vec<String> {
    let mut failures = Vec::new();

    // Bajar el flag antes de liberar la cola: una interrupción que llegue
    // después ya no toma referencias a la cola
    shutdown.trigger();
    queue.shutdown();
    debug!("connection queue shut down");

    drop(listener);
    debug!("listening socket closed");

    for (id, handle) in workers {
        match handle.join() {
            Ok(serviced) => debug!(worker = id, serviced, "worker joined"),
            Err(_) => failures.push(format!("worker-{} panicked", id)),
        }
    }

    match ConnectionQueue::dispose_shared(queue) {
        Ok(leftover) if leftover.is_empty() => debug!("connection queue released"),
        Ok(leftover) => {
            warn!(count = leftover.len(), "closing connections left in the queue");
            drop(leftover);
        }
        Err(e) => failures.push(format!("release connection queue: {}", e)),
    }

    for failure in &failures {
        error!(failure = %failure, "teardown step failed");
    }

    info!(metrics = %context.metrics().snapshot().to_json(), "server stopped");
    failures
}
