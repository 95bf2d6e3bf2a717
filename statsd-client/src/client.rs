use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::{
    buffer::{Append, PacketBuffer},
    builder::ClientConfig,
    encoder::{encode_line, MetricEvent, MetricKind},
    flusher::PeriodicFlusher,
    sampler::SampleDecider,
    telemetry::Telemetry,
    transport::Transport,
};

/// Errors that could occur while flushing the client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlushError {
    /// The client was built without buffering, so there is nothing to flush.
    #[error("invalid call of flush in unbuffered mode")]
    InvalidMode,
}

enum Lifecycle {
    Unopened,
    Open(Option<PeriodicFlusher>),
    Closed,
}

/// Shared client state, reachable from both callers and the periodic flusher.
pub(crate) struct Inner {
    config: ClientConfig,
    sampler: SampleDecider,
    buffer: Option<PacketBuffer>,
    transport: Box<dyn Transport>,
    telemetry: Telemetry,
}

impl Inner {
    pub(crate) fn new(
        config: ClientConfig,
        sampler: SampleDecider,
        transport: Box<dyn Transport>,
        telemetry: Telemetry,
    ) -> Self {
        let buffer = config.buffered.then(|| PacketBuffer::new(config.max_packet_len));
        Self { config, sampler, buffer, transport, telemetry }
    }

    fn emit(&self, event: &MetricEvent) {
        if self.config.prefix.is_empty() && event.key().is_empty() {
            warn!(kind = ?event.kind(), "Dropping metric with an empty name.");
            return;
        }

        // Only sampled events need a decision; everything else always goes out without a rate suffix.
        if event.is_sampled() && !self.sampler.accept(event.sample_rate()) {
            trace!(key = event.key(), sample_rate = event.sample_rate(), "Metric rejected by sample rate.");
            self.telemetry.track_sampled_out();
            return;
        }

        let line = encode_line(&self.config.prefix, event);

        let Some(buffer) = &self.buffer else {
            self.send(&line);
            return;
        };

        if let Append::Overflow(line) = buffer.append(line) {
            // The overflowing line goes out first, on its own, and only then is the pending packet drained.
            trace!(
                line_len = line.len(),
                buffered_len = buffer.len(),
                buffered_lines = buffer.line_count(),
                "Pending packet full, sending line directly."
            );
            self.telemetry.track_buffer_overflow();
            self.send(&line);
            self.flush_buffer(buffer);
        }
    }

    /// Flushes the pending packet, if any.
    ///
    /// # Errors
    ///
    /// If the client is unbuffered, [`FlushError::InvalidMode`] is returned.
    pub(crate) fn flush(&self) -> Result<(), FlushError> {
        let buffer = self.buffer.as_ref().ok_or(FlushError::InvalidMode)?;
        self.flush_buffer(buffer);
        Ok(())
    }

    fn flush_buffer(&self, buffer: &PacketBuffer) {
        if let Some(packet) = buffer.drain() {
            trace!(packet_len = packet.len(), "Flushing pending packet.");
            self.send(&packet);
        }
    }

    fn send(&self, payload: &str) {
        match self.transport.send(payload.as_bytes()) {
            Ok(_) => self.telemetry.track_packet_send_succeeded(payload.len()),
            Err(e) => {
                error!(error = %e, payload_len = payload.len(), "Failed to send payload.");
                self.telemetry.track_packet_send_failed(payload.len());
            }
        }
    }
}

/// A StatsD client.
///
/// The client turns metric updates into StatsD lines and ships them over its transport, either one datagram per
/// metric, or (when buffered) batched into packets that are flushed when full, on an interval, on demand, and when
/// the client is closed.
///
/// Metrics are only emitted between [`open`][StatsdClient::open] and [`close`][StatsdClient::close]; calls made
/// before or after are dropped. Emitting never fails from the caller's point of view: network errors are logged and
/// the affected payload is discarded.
///
/// The client is `Send + Sync`, and is meant to be shared, typically behind an [`Arc`].
pub struct StatsdClient {
    inner: Arc<Inner>,
    lifecycle: RwLock<Lifecycle>,
}

impl StatsdClient {
    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self { inner: Arc::new(inner), lifecycle: RwLock::new(Lifecycle::Unopened) }
    }

    /// Returns the configuration the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns `true` if the client is open.
    pub fn is_open(&self) -> bool {
        matches!(*self.lifecycle.read(), Lifecycle::Open(_))
    }

    /// Opens the client.
    ///
    /// This dials the transport and, for a buffered client with a flush interval, starts the periodic flusher. A
    /// failure to dial is logged but does not prevent the client from opening: metrics will simply be dropped at send
    /// time until the transport is usable.
    ///
    /// Opening an already open client does nothing, and a closed client cannot be reopened.
    pub fn open(&self) {
        let mut lifecycle = self.lifecycle.write();
        match *lifecycle {
            Lifecycle::Unopened => {}
            Lifecycle::Open(_) => {
                debug!("Client already open.");
                return;
            }
            Lifecycle::Closed => {
                warn!("Ignoring attempt to reopen a closed client.");
                return;
            }
        }

        if let Err(e) = self.inner.transport.open() {
            error!(error = %e, "Failed to open transport. Metrics will be dropped.");
        }

        let flusher = match (self.inner.buffer.is_some(), self.inner.config.flush_interval) {
            (true, Some(interval)) => match PeriodicFlusher::spawn(Arc::clone(&self.inner), interval) {
                Ok(flusher) => Some(flusher),
                Err(e) => {
                    error!(error = %e, "Failed to spawn periodic flusher. Buffer will only be flushed on demand.");
                    None
                }
            },
            _ => None,
        };

        *lifecycle = Lifecycle::Open(flusher);
        debug!(
            buffered = self.inner.config.buffered,
            flush_interval = ?self.inner.config.flush_interval,
            "Client opened."
        );
    }

    /// Closes the client.
    ///
    /// Stops the periodic flusher, flushes whatever is still buffered, and then closes the transport. Any metric
    /// emitted afterwards is dropped. Closing is terminal; calling this more than once does nothing.
    pub fn close(&self) {
        let mut lifecycle = self.lifecycle.write();
        match std::mem::replace(&mut *lifecycle, Lifecycle::Closed) {
            Lifecycle::Open(maybe_flusher) => {
                if let Some(flusher) = maybe_flusher {
                    flusher.stop();
                }

                if let Some(buffer) = &self.inner.buffer {
                    self.inner.flush_buffer(buffer);
                }

                self.inner.transport.close();
                debug!("Client closed.");
            }
            Lifecycle::Unopened | Lifecycle::Closed => {}
        }
    }

    /// Flushes any buffered metrics as a single packet.
    ///
    /// Does nothing if the buffer is empty.
    ///
    /// # Errors
    ///
    /// If the client was built without buffering, [`FlushError::InvalidMode`] is returned.
    pub fn flush(&self) -> Result<(), FlushError> {
        self.inner.flush()
    }

    /// Emits a metric event.
    pub fn emit(&self, event: &MetricEvent) {
        // Holding the read side for the whole call keeps `close` from running underneath us, so nothing can land in
        // the buffer after the final flush.
        let lifecycle = self.lifecycle.read();
        if !matches!(*lifecycle, Lifecycle::Open(_)) {
            debug!(key = event.key(), kind = ?event.kind(), "Dropping metric emitted while client is not open.");
            self.inner.telemetry.track_dropped_closed();
            return;
        }

        self.inner.emit(event);
    }

    /// Adds `value` to a counter.
    ///
    /// When `sample_rate` is below `1.0`, the update is only sent with that probability, and carries the rate so
    /// the server can scale it back up.
    pub fn count(&self, key: &str, value: i64, sample_rate: f32) {
        self.emit(&MetricEvent::new(key, MetricKind::Count, value, sample_rate));
    }

    /// Increments a counter by one.
    pub fn increment(&self, key: &str) {
        self.count(key, 1, 1.0);
    }

    /// Decrements a counter by one.
    pub fn decrement(&self, key: &str) {
        self.count(key, -1, 1.0);
    }

    /// Sets a gauge to `value`.
    ///
    /// StatsD reads a signed gauge value as a relative change, so to set a gauge to a negative value it has to be
    /// zeroed first and then shifted with [`gauge_shift`][StatsdClient::gauge_shift].
    pub fn gauge(&self, key: &str, value: i64) {
        self.emit(&MetricEvent::new(key, MetricKind::Gauge, value, 1.0));
    }

    /// Shifts a gauge up or down by `delta`.
    pub fn gauge_shift(&self, key: &str, delta: i64) {
        self.emit(&MetricEvent::new(key, MetricKind::GaugeShift, delta, 1.0));
    }

    /// Records a timing, in milliseconds.
    pub fn timing(&self, key: &str, millis: i64, sample_rate: f32) {
        self.emit(&MetricEvent::new(key, MetricKind::Timing, millis, sample_rate));
    }

    /// Adds `value` to a set.
    pub fn set(&self, key: &str, value: i64) {
        self.emit(&MetricEvent::new(key, MetricKind::Set, value, 1.0));
    }
}

impl Drop for StatsdClient {
    fn drop(&mut self) {
        self.close();
    }
}
