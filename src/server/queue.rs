//! # Cola Acotada de Conexiones
//! src/server/queue.rs
//!
//! Buffer circular de capacidad fija compartido entre el dispatcher
//! (único productor) y los workers (consumidores).
//!
//! - Un `Mutex` protege el buffer, los índices, la longitud y el flag
//!   de apagado
//! - `not_full` despierta productores, `not_empty` despierta consumidores
//! - `shutdown()` hace broadcast en ambas condvars
//!
//! Toda espera es un loop sobre el predicado: después de despertar se
//! vuelve a evaluar (wakeups espurios o robados por otro thread).

use crate::error::{EnqueueError, QueueError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Buffer circular con índices acotados a `slots.len()`
struct Ring<T> {
    slots: Vec<Option<T>>,
    length: usize,
    read_idx: usize,
    write_idx: usize,
    shutdown: bool,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            length: 0,
            read_idx: 0,
            write_idx: 0,
            shutdown: false,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.length == self.capacity()
    }

    /// Solo se llama con `length < capacity`
    fn push(&mut self, item: T) {
        debug_assert!(self.slots[self.write_idx].is_none());
        self.slots[self.write_idx] = Some(item);
        self.length += 1;
        self.write_idx = (self.write_idx + 1) % self.capacity();
    }

    fn pop(&mut self) -> Option<T> {
        if self.length == 0 {
            return None;
        }
        let item = self.slots[self.read_idx].take();
        self.length -= 1;
        self.read_idx = (self.read_idx + 1) % self.capacity();
        item
    }

    fn drain(&mut self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.length);
        while let Some(item) = self.pop() {
            items.push(item);
        }
        items
    }
}

/// Cola FIFO acotada y bloqueante
pub struct ConnectionQueue<T> {
    state: Mutex<Ring<T>>,

    /// Hay espacio para encolar
    not_full: Condvar,

    /// Hay elementos para desencolar
    not_empty: Condvar,

    /// Espejo del flag dentro del lock, para consultas sin bloquear
    shutdown: AtomicBool,

    capacity: usize,
}

impl<T> ConnectionQueue<T> {
    /// Crea una cola con capacidad fija
    ///
    /// # Panics
    ///
    /// Si `capacity` es 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "connection queue capacity must be >= 1");

        Self {
            state: Mutex::new(Ring::with_capacity(capacity)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            shutdown: AtomicBool::new(false),
            capacity,
        }
    }

    /// Encola un handle, bloqueando mientras la cola esté llena.
    ///
    /// Si la cola está (o queda) apagada el handle se devuelve dentro del
    /// error sin insertarse: sigue siendo del llamador.
    pub fn enqueue(&self, handle: T) -> Result<(), EnqueueError<T>> {
        let mut ring = match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => return Err(EnqueueError { handle, reason: QueueError::Poisoned }),
        };

        loop {
            if ring.shutdown {
                return Err(EnqueueError { handle, reason: QueueError::Shutdown });
            }
            if !ring.is_full() {
                break;
            }
            ring = match self.not_full.wait(ring) {
                Ok(guard) => guard,
                Err(_) => return Err(EnqueueError { handle, reason: QueueError::Poisoned }),
            };
        }

        ring.push(handle);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Desencola el handle más antiguo, bloqueando mientras esté vacía.
    ///
    /// Después del apagado sigue entregando lo que quedó encolado; solo
    /// falla con `QueueError::Shutdown` cuando ya no queda nada.
    pub fn dequeue(&self) -> Result<T, QueueError> {
        let mut ring = self.state.lock().map_err(|_| QueueError::Poisoned)?;

        loop {
            if let Some(handle) = ring.pop() {
                self.not_full.notify_one();
                return Ok(handle);
            }
            if ring.shutdown {
                return Err(QueueError::Shutdown);
            }
            ring = self.not_empty.wait(ring).map_err(|_| QueueError::Poisoned)?;
        }
    }

    /// Marca la cola como apagada y despierta a todos los que esperan.
    ///
    /// Idempotente. Retorna `true` solo en la primera llamada.
    pub fn shutdown(&self) -> bool {
        let first = {
            // El flag tiene que quedar puesto aunque otro thread haya entrado en pánico
            let mut ring = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let first = !ring.shutdown;
            ring.shutdown = true;
            self.shutdown.store(true, Ordering::Release);
            first
        };

        self.not_full.notify_all();
        self.not_empty.notify_all();
        first
    }

    /// Consulta sin lock
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .length
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Libera la cola. Retorna los handles que hayan quedado sin consumir.
    pub fn dispose(self) -> Result<Vec<T>, QueueError> {
        let mut ring = self.state.into_inner().map_err(|_| QueueError::Poisoned)?;
        Ok(ring.drain())
    }

    /// Libera una cola compartida. Falla con `QueueError::InUse` si algún
    /// worker todavía tiene una referencia.
    pub fn dispose_shared(queue: Arc<Self>) -> Result<Vec<T>, QueueError> {
        match Arc::try_unwrap(queue) {
            Ok(queue) => queue.dispose(),
            Err(shared) => Err(QueueError::InUse(Arc::strong_count(&shared) - 1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    const PROMPTLY: Duration = Duration::from_secs(2);

    #[test]
    fn test_fifo_order() {
        let queue = ConnectionQueue::new(4);
        for i in 0..4 {
            queue.enqueue(i).unwrap();
        }

        let out: Vec<i32> = (0..4).map(|_| queue.dequeue().unwrap()).collect();
        assert_eq!(out, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_fifo_across_wraparound() {
        let queue = ConnectionQueue::new(3);
        let mut next_in = 0;
        let mut next_out = 0;

        // Alternar para que los índices den varias vueltas
        for round in 0..20 {
            let pushes = 1 + round % 3;
            for _ in 0..pushes {
                if queue.len() < queue.capacity() {
                    queue.enqueue(next_in).unwrap();
                    next_in += 1;
                }
            }
            let pops = 1 + (round * 7) % 3;
            for _ in 0..pops {
                if !queue.is_empty() {
                    assert_eq!(queue.dequeue().unwrap(), next_out);
                    next_out += 1;
                }
            }
            assert!(queue.len() <= queue.capacity());
        }
    }

    #[test]
    fn test_length_stays_in_bounds() {
        let queue = ConnectionQueue::new(5);
        let mut expected = 0usize;
        let mut seed: u32 = 12345;

        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let want_push = (seed >> 16) % 2 == 0;

            if want_push && expected < 5 {
                queue.enqueue(seed).unwrap();
                expected += 1;
            } else if !want_push && expected > 0 {
                queue.dequeue().unwrap();
                expected -= 1;
            }

            assert_eq!(queue.len(), expected);
            assert!(queue.len() <= queue.capacity());
        }
    }

    #[test]
    fn test_many_producers_single_consumer() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 250;

        let queue = Arc::new(ConnectionQueue::new(4));
        let mut handles = Vec::new();

        for p in 0..PRODUCERS {
            let queue = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.enqueue(p * PER_PRODUCER + i).unwrap();
                }
            }));
        }

        let mut seen = HashSet::new();
        for _ in 0..PRODUCERS * PER_PRODUCER {
            let item = queue.dequeue().unwrap();
            assert!(seen.insert(item), "item {} dequeued twice", item);
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_per_producer_order_preserved() {
        let queue = Arc::new(ConnectionQueue::new(2));
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..100 {
                    queue.enqueue(i).unwrap();
                }
            })
        };

        for i in 0..100 {
            assert_eq!(queue.dequeue().unwrap(), i);
        }
        producer.join().unwrap();
    }

    #[test]
    fn test_shutdown_wakes_blocked_enqueue() {
        let queue = Arc::new(ConnectionQueue::new(1));
        queue.enqueue(1).unwrap();

        let (tx, rx) = mpsc::channel();
        let blocked = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let result = queue.enqueue(2);
                tx.send(result.map_err(|e| (e.reason, e.handle))).unwrap();
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_err(), "enqueue should block on a full queue");

        queue.shutdown();
        let result = rx.recv_timeout(PROMPTLY).expect("enqueue did not wake up");
        assert_eq!(result, Err((QueueError::Shutdown, 2)));
        blocked.join().unwrap();

        // Lo que ya estaba encolado se sigue entregando
        assert_eq!(queue.dequeue(), Ok(1));
        assert_eq!(queue.dequeue(), Err(QueueError::Shutdown));
    }

    #[test]
    fn test_shutdown_wakes_all_blocked_dequeues() {
        let queue: Arc<ConnectionQueue<u32>> = Arc::new(ConnectionQueue::new(4));
        let (tx, rx) = mpsc::channel();

        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let tx = tx.clone();
                thread::spawn(move || tx.send(queue.dequeue()).unwrap())
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        assert!(queue.shutdown());

        for _ in 0..3 {
            let result = rx.recv_timeout(PROMPTLY).expect("dequeue did not wake up");
            assert_eq!(result, Err(QueueError::Shutdown));
        }
        for c in consumers {
            c.join().unwrap();
        }
    }

    #[test]
    fn test_enqueue_after_shutdown_fails_immediately() {
        let queue = ConnectionQueue::new(8);
        queue.shutdown();

        let err = queue.enqueue(7).unwrap_err();
        assert_eq!(err.reason, QueueError::Shutdown);
        assert_eq!(err.into_inner(), 7);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_drains_before_reporting_shutdown() {
        let queue = ConnectionQueue::new(4);
        queue.enqueue("a").unwrap();
        queue.enqueue("b").unwrap();
        queue.shutdown();

        assert_eq!(queue.dequeue(), Ok("a"));
        assert_eq!(queue.dequeue(), Ok("b"));
        assert_eq!(queue.dequeue(), Err(QueueError::Shutdown));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let queue: ConnectionQueue<u8> = ConnectionQueue::new(1);
        assert!(!queue.is_shutdown());
        assert!(queue.shutdown());
        assert!(!queue.shutdown());
        assert!(queue.is_shutdown());
    }

    #[test]
    fn test_dispose_shared_requires_sole_owner() {
        let queue = Arc::new(ConnectionQueue::new(2));
        queue.enqueue(9).unwrap();

        let other = Arc::clone(&queue);
        let again = Arc::clone(&queue);
        assert_eq!(ConnectionQueue::dispose_shared(again), Err(QueueError::InUse(2)));

        drop(other);
        assert_eq!(ConnectionQueue::dispose_shared(queue), Ok(vec![9]));
    }

    #[test]
    #[should_panic(expected = "capacity must be >= 1")]
    fn test_zero_capacity_panics() {
        let _ = ConnectionQueue::<u8>::new(0);
    }
}
