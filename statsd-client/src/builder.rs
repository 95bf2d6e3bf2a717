use std::time::Duration;

use thiserror::Error;

use crate::{
    client::{Inner, StatsdClient},
    encoder::{normalize_prefix, SMALLEST_VALID_LINE},
    sampler::{RngSampleSource, SampleDecider, SampleSource},
    telemetry::Telemetry,
    transport::{Transport, UdpTransport},
};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8125;
const DEFAULT_MAX_PACKET_LEN: usize = 1400;

/// Errors that could occur while building a StatsD client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// The maximum packet length cannot hold even the smallest valid metric line.
    #[error("maximum packet length is too small to allow any metrics to be written (must be {minimum} or greater, got {actual})")]
    InvalidPacketLength {
        /// Smallest allowed maximum packet length.
        minimum: usize,

        /// Configured maximum packet length.
        actual: usize,
    },

    /// The flush interval was zero.
    #[error("flush interval must be greater than zero")]
    InvalidFlushInterval,

    /// A flush interval was configured without enabling buffering.
    #[error("flush interval requires buffering to be enabled")]
    FlushIntervalWithoutBuffering,
}

/// Client configuration.
///
/// This is a snapshot of what the client was built with, and does not change for the lifetime of the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Remote StatsD host.
    pub host: String,

    /// Remote StatsD port.
    pub port: u16,

    /// Prefix applied to every metric name, either empty or ending with `.`.
    pub prefix: String,

    /// Whether metrics are batched into packets instead of sent one by one.
    pub buffered: bool,

    /// How often the buffer is flushed in the background, if at all.
    pub flush_interval: Option<Duration>,

    /// Maximum length of the buffered lines in a single packet, in bytes.
    pub max_packet_len: usize,
}

/// Builder for a [`StatsdClient`].
pub struct StatsdClientBuilder {
    host: String,
    port: u16,
    prefix: String,
    buffered: bool,
    flush_interval: Option<Duration>,
    max_packet_len: usize,
    telemetry: bool,
    sample_source: Option<Box<dyn SampleSource>>,
    transport: Option<Box<dyn Transport>>,
}

impl StatsdClientBuilder {
    /// Set the remote StatsD server to send metrics to.
    ///
    /// The host is only resolved when the client is opened.
    ///
    /// Defaults to `127.0.0.1:8125`.
    #[must_use]
    pub fn with_remote_address<H>(mut self, host: H, port: u16) -> Self
    where
        H: Into<String>,
    {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Set the prefix applied to all metric names.
    ///
    /// A `.` separator is appended if the prefix does not already end with one.
    ///
    /// Defaults to no prefix.
    #[must_use]
    pub fn with_prefix<P>(mut self, prefix: P) -> Self
    where
        P: AsRef<str>,
    {
        self.prefix = normalize_prefix(prefix.as_ref());
        self
    }

    /// Sets whether or not to buffer metrics.
    ///
    /// When enabled, metric lines are accumulated into packets of up to the maximum packet length, and only sent when
    /// the next line would not fit, when flushed (manually or on the flush interval), or when the client is closed.
    /// When disabled, every metric is sent as its own datagram immediately.
    ///
    /// Defaults to `false`.
    #[must_use]
    pub fn with_buffering(mut self, buffered: bool) -> Self {
        self.buffered = buffered;
        self
    }

    /// Set the interval at which buffered metrics are flushed in the background.
    ///
    /// Requires buffering. Without an interval, a buffered client is only flushed when a packet fills up, when
    /// [`StatsdClient::flush`] is called, or when the client is closed.
    ///
    /// Defaults to no interval.
    #[must_use]
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = Some(flush_interval);
        self
    }

    /// Set the maximum packet length, in bytes.
    ///
    /// This bounds the summed length of the lines in a buffered packet. A line that would push the pending packet
    /// over the limit is sent on its own instead, and the pending packet is flushed right after.
    ///
    /// Defaults to 1400 bytes, which fits in a single Ethernet frame.
    #[must_use]
    pub fn with_maximum_packet_length(mut self, max_packet_len: usize) -> Self {
        self.max_packet_len = max_packet_len;
        self
    }

    /// Sets whether or not to enable telemetry for the client.
    ///
    /// When enabled, the client reports counters about packets and bytes sent or dropped, and metrics rejected by
    /// sampling, through the [`metrics`] recorder that is current when the client is built.
    ///
    /// Defaults to `true`.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: bool) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Set the random source used for sample rate decisions.
    ///
    /// Defaults to a fast PRNG seeded from the wall clock when the client is built.
    #[must_use]
    pub fn with_sample_source<S>(mut self, source: S) -> Self
    where
        S: SampleSource + 'static,
    {
        self.sample_source = Some(Box::new(source));
        self
    }

    /// Set the transport payloads are sent over.
    ///
    /// When set, the remote address is only informational.
    ///
    /// Defaults to a [`UdpTransport`] to the remote address.
    #[must_use]
    pub fn with_transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Builds the client.
    ///
    /// The client is returned unopened: [`StatsdClient::open`] must be called before metrics are sent.
    ///
    /// # Errors
    ///
    /// If the maximum packet length is too small, or the flush interval is zero or set without buffering, an error
    /// is returned.
    pub fn build(self) -> Result<StatsdClient, BuildError> {
        if self.max_packet_len < SMALLEST_VALID_LINE.len() {
            return Err(BuildError::InvalidPacketLength {
                minimum: SMALLEST_VALID_LINE.len(),
                actual: self.max_packet_len,
            });
        }

        match self.flush_interval {
            Some(interval) if interval.is_zero() => return Err(BuildError::InvalidFlushInterval),
            Some(_) if !self.buffered => return Err(BuildError::FlushIntervalWithoutBuffering),
            _ => {}
        }

        let config = ClientConfig {
            host: self.host,
            port: self.port,
            prefix: self.prefix,
            buffered: self.buffered,
            flush_interval: self.flush_interval,
            max_packet_len: self.max_packet_len,
        };

        let transport = self
            .transport
            .unwrap_or_else(|| Box::new(UdpTransport::new(config.host.clone(), config.port)));
        let sample_source =
            self.sample_source.unwrap_or_else(|| Box::new(RngSampleSource::from_time()));
        let telemetry = if self.telemetry {
            Telemetry::new(transport.transport_id())
        } else {
            Telemetry::noop()
        };

        let inner = Inner::new(config, SampleDecider::new(sample_source), transport, telemetry);
        Ok(StatsdClient::from_inner(inner))
    }
}

impl Default for StatsdClientBuilder {
    fn default() -> Self {
        StatsdClientBuilder {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            prefix: String::new(),
            buffered: false,
            flush_interval: None,
            max_packet_len: DEFAULT_MAX_PACKET_LEN,
            telemetry: true,
            sample_source: None,
            transport: None,
        }
    }
}
