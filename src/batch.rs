//! Timed coalescing of bursty live messages.
//!
//! A buffer flushes after `delay` of quiet, or `max_wait` after the first
//! message it holds, whichever comes first. Flushes are never empty.

use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::{sleep_until, Instant};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    pub delay: Duration,
    pub max_wait: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
            max_wait: Duration::from_millis(5000),
        }
    }
}

impl BatchConfig {
    pub fn from_millis(delay_ms: u64, max_wait_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            max_wait: Duration::from_millis(max_wait_ms.max(delay_ms)),
        }
    }
}

/// Clock-agnostic buffer; callers pass `now`.
#[derive(Debug)]
pub struct BatchBuffer<T> {
    config: BatchConfig,
    pending: Vec<T>,
    first_at: Option<Instant>,
    last_at: Option<Instant>,
}

impl<T> BatchBuffer<T> {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
            first_at: None,
            last_at: None,
        }
    }

    pub fn push(&mut self, msg: T, now: Instant) {
        if self.pending.is_empty() {
            self.first_at = Some(now);
        }
        self.last_at = Some(now);
        self.pending.push(msg);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// When the held messages are due, or `None` while empty.
    pub fn deadline(&self) -> Option<Instant> {
        match (self.first_at, self.last_at) {
            (Some(first), Some(last)) => {
                Some((last + self.config.delay).min(first + self.config.max_wait))
            }
            _ => None,
        }
    }

    pub fn poll_flush(&mut self, now: Instant) -> Option<Vec<T>> {
        match self.deadline() {
            Some(due) if due <= now => self.take(),
            _ => None,
        }
    }

    /// Drain regardless of timers.
    pub fn take(&mut self) -> Option<Vec<T>> {
        self.first_at = None;
        self.last_at = None;
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

/// Sending half of a [`batch_channel`]. Cloneable; the intake task flushes
/// what it holds and stops once every sink is dropped.
#[derive(Debug)]
pub struct BatchSink<T> {
    tx: UnboundedSender<T>,
}

impl<T> Clone for BatchSink<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> BatchSink<T> {
    /// Returns false once the intake task is gone.
    pub fn push(&self, msg: T) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Spawn an intake task that calls `handler` with each flushed batch, in
/// arrival order. Must be called inside a tokio runtime.
pub fn batch_channel<T, F>(config: BatchConfig, mut handler: F) -> BatchSink<T>
where
    T: Send + 'static,
    F: FnMut(Vec<T>) + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<T>();
    tokio::spawn(async move {
        let mut buffer = BatchBuffer::new(config);
        loop {
            let deadline = buffer.deadline();
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(msg) => buffer.push(msg, Instant::now()),
                    None => {
                        if let Some(batch) = buffer.take() {
                            log::debug!("final flush of {} message(s)", batch.len());
                            handler(batch);
                        }
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(batch) = buffer.poll_flush(Instant::now()) {
                        log::debug!("flushing {} message(s)", batch.len());
                        handler(batch);
                    }
                }
            }
        }
    });
    BatchSink { tx }
}
