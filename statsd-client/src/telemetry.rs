use metrics::{counter, Counter};

/// Client telemetry.
///
/// `Telemetry` tracks what happens to metrics after they are handed to the client: how many packets and bytes made it
/// onto the wire, how many were dropped, and how many metrics never got that far because of sampling. It is reported
/// through whatever [`metrics`] recorder is installed when the client is built.
pub(crate) struct Telemetry {
    packets_sent: Counter,
    bytes_sent: Counter,
    packets_dropped: Counter,
    bytes_dropped: Counter,
    metrics_sampled_out: Counter,
    metrics_dropped_closed: Counter,
    buffer_overflows: Counter,
}

impl Telemetry {
    /// Creates a `Telemetry` instance, registering its counters with the current recorder.
    pub fn new(transport: &'static str) -> Self {
        let labels = telemetry_tags!("client_transport" => transport);

        Self {
            packets_sent: counter!("statsd.client.packets_sent", labels.iter()),
            bytes_sent: counter!("statsd.client.bytes_sent", labels.iter()),
            packets_dropped: counter!("statsd.client.packets_dropped", labels.iter()),
            bytes_dropped: counter!("statsd.client.bytes_dropped", labels.iter()),
            metrics_sampled_out: counter!("statsd.client.metrics_sampled_out", labels.iter()),
            metrics_dropped_closed: counter!("statsd.client.metrics_dropped_closed", labels.iter()),
            buffer_overflows: counter!("statsd.client.buffer_overflows", labels.iter()),
        }
    }

    /// Creates a `Telemetry` instance whose counters go nowhere.
    pub fn noop() -> Self {
        Self {
            packets_sent: Counter::noop(),
            bytes_sent: Counter::noop(),
            packets_dropped: Counter::noop(),
            bytes_dropped: Counter::noop(),
            metrics_sampled_out: Counter::noop(),
            metrics_dropped_closed: Counter::noop(),
            buffer_overflows: Counter::noop(),
        }
    }

    /// Tracks a successful packet send.
    pub fn track_packet_send_succeeded(&self, bytes_len: usize) {
        self.packets_sent.increment(1);
        self.bytes_sent.increment(bytes_len as u64);
    }

    /// Tracks a failed packet send.
    pub fn track_packet_send_failed(&self, bytes_len: usize) {
        self.packets_dropped.increment(1);
        self.bytes_dropped.increment(bytes_len as u64);
    }

    /// Tracks a metric rejected by its sample rate.
    pub fn track_sampled_out(&self) {
        self.metrics_sampled_out.increment(1);
    }

    /// Tracks a metric emitted while the client was not open.
    pub fn track_dropped_closed(&self) {
        self.metrics_dropped_closed.increment(1);
    }

    /// Tracks a line that did not fit in the pending packet.
    pub fn track_buffer_overflow(&self) {
        self.buffer_overflows.increment(1);
    }
}

macro_rules! _telemetry_tags {
    ($($k:literal => $v:expr),*) => {
        [
            ::metrics::Label::from_static_parts("client", "rust"),
            ::metrics::Label::from_static_parts("client_version", env!("CARGO_PKG_VERSION")),
            $(::metrics::Label::from_static_parts($k, $v),)*
        ]
    };
}

pub(crate) use _telemetry_tags as telemetry_tags;
