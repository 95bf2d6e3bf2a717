//! A client for sending metrics to a [StatsD][statsd] server over UDP.
//!
//! [statsd]: https://github.com/statsd/statsd/blob/master/docs/metric_types.md
//!
//! # Usage
//!
//! ```no_run
//! # use std::time::Duration;
//! # use statsd_client::StatsdClientBuilder;
//! // First, create and configure a builder, and build the client.
//! let client = StatsdClientBuilder::default()
//!     .with_remote_address("127.0.0.1", 8125)
//!     .with_prefix("app")
//!     .with_buffering(true)
//!     .with_flush_interval(Duration::from_secs(1))
//!     .build()
//!     .expect("failed to build client");
//!
//! // The client has to be opened before metrics are sent. This connects the socket and starts the background flusher.
//! client.open();
//!
//! client.count("requests", 1, 1.0);
//! client.timing("request_time", 42, 0.25);
//! client.gauge_shift("connections", -1);
//!
//! // Closing the client flushes anything still buffered before releasing the socket.
//! client.close();
//! ```
//!
//! # Wire format
//!
//! Every metric becomes a single line of the form `<prefix><key>:<value>|<type>[|@<rate>]`, where the type is one of
//! `c` (count), `g` (gauge), `ms` (timing) or `s` (set). Gauge shifts are gauges whose value always carries an
//! explicit sign. Only counts and timings carry a sample rate, and only when it is below `1.0`.
//!
//! # Buffering
//!
//! An unbuffered client sends every metric as its own datagram, on the caller's thread.
//!
//! A buffered client instead accumulates lines into a packet of up to the maximum packet length (1400 bytes by
//! default), joined by newlines. The packet is sent when it is flushed: on the configured flush interval, when
//! [`StatsdClient::flush`] is called, or when the client is closed. A line that does not fit in the pending packet is
//! sent immediately as its own datagram, and then the pending packet is flushed.
//!
//! # Sampling
//!
//! Counts and timings with a sample rate below `1.0` are sent with that probability, and carry the rate on the wire so
//! the server can scale them back up. The random source is seeded once when the client is built, and can be replaced
//! with [`StatsdClientBuilder::with_sample_source`].
//!
//! # Errors
//!
//! Sending is fire-and-forget. Failing to connect or to write a datagram is logged (via [`tracing`]) and the affected
//! payload is dropped, never retried, and never reported to the code emitting the metric.
//!
//! # Telemetry
//!
//! The client can report its own counters -- packets and bytes sent or dropped, metrics rejected by sampling, buffer
//! overflows -- through the [`metrics`] facade, under the `statsd.client` namespace.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod buffer;

mod builder;
pub use self::builder::{BuildError, ClientConfig, StatsdClientBuilder};

mod client;
pub use self::client::{FlushError, StatsdClient};

mod encoder;
pub use self::encoder::{MetricEvent, MetricKind};

mod flusher;

mod sampler;
pub use self::sampler::{RngSampleSource, SampleSource};

mod telemetry;

mod transport;
pub use self::transport::{Transport, TransportError, UdpTransport};
