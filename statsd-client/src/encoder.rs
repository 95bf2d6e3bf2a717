/// Smallest line the wire format permits, used to sanity check the configured packet length.
pub(crate) const SMALLEST_VALID_LINE: &[u8] = b"a:0|c";

/// StatsD metric type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricKind {
    /// A counter, sent as `|c`.
    Count,

    /// An absolute gauge value, sent as `|g`.
    Gauge,

    /// A relative gauge adjustment, sent as `|g` with an explicit sign on the value.
    GaugeShift,

    /// A timing in milliseconds, sent as `|ms`.
    Timing,

    /// A set member, sent as `|s`.
    Set,
}

impl MetricKind {
    fn as_str(self) -> &'static str {
        match self {
            MetricKind::Count => "|c",
            MetricKind::Gauge | MetricKind::GaugeShift => "|g",
            MetricKind::Timing => "|ms",
            MetricKind::Set => "|s",
        }
    }

    /// Returns `true` if this metric type may carry a sample rate on the wire.
    pub const fn is_sampled(self) -> bool {
        matches!(self, MetricKind::Count | MetricKind::Timing)
    }
}

/// A single metric update.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricEvent {
    key: String,
    kind: MetricKind,
    value: i64,
    sample_rate: f32,
}

impl MetricEvent {
    /// Creates a new `MetricEvent`.
    ///
    /// Only counters and timings keep the given sample rate; every other kind is always sent at a rate of `1.0`.
    pub fn new<K>(key: K, kind: MetricKind, value: i64, sample_rate: f32) -> Self
    where
        K: Into<String>,
    {
        let sample_rate = if kind.is_sampled() { sample_rate } else { 1.0 };
        Self { key: key.into(), kind, value, sample_rate }
    }

    /// Returns the metric key, without any client prefix.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the metric kind.
    pub const fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Returns the metric value.
    pub const fn value(&self) -> i64 {
        self.value
    }

    /// Returns the sample rate.
    ///
    /// On the wire, the rate is written in its shortest round-trip form, which uses exponent notation for very small
    /// rates (`1e-6` rather than `0.000001`).
    pub const fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Returns `true` if the event is subject to sampling.
    ///
    /// A `NaN` rate counts as sampled, so that it is rejected by the sampler rather than sent unconditionally.
    pub fn is_sampled(&self) -> bool {
        self.sample_rate.is_nan() || self.sample_rate < 1.0
    }
}

/// Writes the value fragment of `event` (`<value>|<type>[|@<rate>]`) into `buf`.
///
/// The sample rate suffix is only written for sampled events, which the caller must already have accepted. Gauge shifts
/// always carry an explicit sign so that the server treats them as relative.
fn write_fragment(buf: &mut String, event: &MetricEvent) {
    if event.kind == MetricKind::GaugeShift && event.value >= 0 {
        buf.push('+');
    }

    let mut int_writer = itoa::Buffer::new();
    buf.push_str(int_writer.format(event.value));
    buf.push_str(event.kind.as_str());

    if event.kind.is_sampled() && event.is_sampled() {
        let mut float_writer = ryu::Buffer::new();
        buf.push_str("|@");
        buf.push_str(float_writer.format(event.sample_rate));
    }
}

/// Builds the complete wire line for `event`: `<prefix><key>:<fragment>`.
///
/// `prefix` is expected to be normalized already, meaning it is either empty or ends with a separator.
pub(crate) fn encode_line(prefix: &str, event: &MetricEvent) -> String {
    let mut buf = String::with_capacity(prefix.len() + event.key.len() + 24);
    buf.push_str(prefix);
    buf.push_str(&event.key);
    buf.push(':');
    write_fragment(&mut buf, event);
    buf
}

/// Normalizes a metric prefix so that it is either empty or ends with `.`.
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('.') {
        prefix.to_string()
    } else {
        format!("{prefix}.")
    }
}
