//! Background Scheduler
//!
//! Runs the periodic flush and compaction tasks against a shared engine.
//!
//! ## Architecture
//! - One named thread per task, each driven by a `crossbeam` ticker
//! - A shared shutdown channel; dropping its sender stops every task
//! - Shutdown joins the threads, then performs one final flush

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use crate::engine::Engine;
use crate::error::Result;

/// Owns the background task threads
///
/// Call `shutdown` to drain state with a final flush. Dropping only stops the
/// tasks; unflushed writes stay in the WAL until the next open replays them.
pub struct Scheduler {
    engine: Arc<Engine>,

    /// Dropped to signal shutdown
    shutdown_tx: Option<Sender<()>>,

    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Start flush and compaction tasks at the intervals from the engine's config
    pub fn start(engine: Arc<Engine>) -> Result<Self> {
        let flush_every = engine.config().flush_interval();
        let compact_every = engine.config().compaction_interval();
        Self::with_intervals(engine, flush_every, compact_every)
    }

    /// Start flush and compaction tasks at explicit intervals
    pub fn with_intervals(
        engine: Arc<Engine>,
        flush_every: Duration,
        compact_every: Duration,
    ) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);

        let flush_engine = Arc::clone(&engine);
        let flush = spawn_periodic("stratakv-flush", flush_every, shutdown_rx.clone(), move || {
            flush_engine.flush().map(|_| ())
        })?;

        let compact_engine = Arc::clone(&engine);
        let compact = spawn_periodic("stratakv-compact", compact_every, shutdown_rx, move || {
            compact_engine.maybe_compact().map(|_| ())
        })?;

        tracing::info!(
            flush_every_ms = flush_every.as_millis() as u64,
            compact_every_ms = compact_every.as_millis() as u64,
            "background tasks started"
        );

        Ok(Self {
            engine,
            shutdown_tx: Some(shutdown_tx),
            handles: vec![flush, compact],
        })
    }

    /// Get the engine the tasks run against
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Stop both tasks, wait for them, then flush whatever is left
    pub fn shutdown(mut self) -> Result<()> {
        self.stop_tasks();
        self.engine.flush()?;
        tracing::info!("background tasks stopped");
        Ok(())
    }

    fn stop_tasks(&mut self) {
        // Disconnecting the channel wakes every select! below
        self.shutdown_tx.take();
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("task").to_string();
            if handle.join().is_err() {
                tracing::error!(task = %name, "background task panicked");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}

fn spawn_periodic<F>(
    name: &str,
    every: Duration,
    shutdown_rx: Receiver<()>,
    mut task: F,
) -> Result<JoinHandle<()>>
where
    F: FnMut() -> Result<()> + Send + 'static,
{
    let task_name = name.to_string();
    let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
        let ticker = channel::tick(every);
        loop {
            crossbeam::select! {
                recv(shutdown_rx) -> _ => break,
                recv(ticker) -> _ => {
                    if let Err(e) = task() {
                        tracing::error!(task = %task_name, error = %e, "background task failed");
                    }
                }
            }
        }
        tracing::debug!(task = %task_name, "background task exiting");
    })?;
    Ok(handle)
}
