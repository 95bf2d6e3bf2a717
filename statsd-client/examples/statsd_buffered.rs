use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use rand::Rng as _;
use statsd_client::StatsdClientBuilder;

fn main() {
    tracing_subscriber::fmt::init();

    let client = StatsdClientBuilder::default()
        .with_remote_address("localhost", 8125)
        .with_prefix("example")
        .with_buffering(true)
        .with_flush_interval(Duration::from_secs(1))
        .build()
        .expect("failed to build StatsD client");
    client.open();

    let client = Arc::new(client);

    // Pretend to be a handful of request handlers, all sharing the same client.
    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                let mut rng = rand::rng();
                let started = Instant::now();
                while started.elapsed() < Duration::from_secs(10) {
                    client.count("requests", 1, 0.5);
                    client.timing("request_time", rng.random_range(1..250), 0.1);
                    client.gauge_shift("in_flight", 1);
                    thread::sleep(Duration::from_millis(rng.random_range(5..50)));
                    client.gauge_shift("in_flight", -1);
                    client.set("workers", worker);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker panicked");
    }

    // Flushes whatever is left before releasing the socket.
    client.close();
}
