use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{bounded, select, tick, Sender};
use tracing::{debug, error};

use crate::client::Inner;

/// Background task that flushes the packet buffer on a fixed interval.
///
/// The task runs on its own thread and talks to the client only through its flush operation. It is stopped exactly
/// once, via [`stop`][PeriodicFlusher::stop], which blocks until any in-progress flush has finished.
pub(crate) struct PeriodicFlusher {
    shutdown_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl PeriodicFlusher {
    /// Spawns the flusher thread.
    pub fn spawn(inner: Arc<Inner>, interval: Duration) -> io::Result<Self> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let handle = thread::Builder::new().name("statsd-client-flusher".to_string()).spawn(move || {
            let ticker = tick(interval);
            debug!(?interval, "Periodic flusher started.");

            loop {
                select! {
                    recv(ticker) -> _ => {
                        if let Err(e) = inner.flush() {
                            error!(error = %e, "Periodic flush failed.");
                        }
                    },
                    // Either an explicit stop, or the client went away without stopping us.
                    recv(shutdown_rx) -> _ => break,
                }
            }

            debug!("Periodic flusher stopped.");
        })?;

        Ok(Self { shutdown_tx, handle })
    }

    /// Stops the flusher and waits for its thread to exit.
    pub fn stop(self) {
        // Dropping the sender disconnects the channel, which wakes the thread even if it never reached `recv`.
        drop(self.shutdown_tx);

        if self.handle.join().is_err() {
            error!("Periodic flusher thread panicked.");
        }
    }
}
