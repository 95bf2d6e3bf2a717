use std::time::SystemTime;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng as _};
use rand_xoshiro::Xoshiro256StarStar;

/// A source of uniformly distributed values in `[0, 1)`.
///
/// The client draws exactly one value per sampled metric. Implementations only need to be `Send`: the sampler
/// serializes access to the source.
pub trait SampleSource: Send {
    /// Returns the next value in `[0, 1)`.
    fn next_sample(&mut self) -> f32;
}

/// A [`SampleSource`] backed by any [`Rng`].
pub struct RngSampleSource<R>(R);

impl<R> RngSampleSource<R> {
    /// Creates a new `RngSampleSource` that draws from `rng`.
    pub fn new(rng: R) -> Self {
        Self(rng)
    }
}

impl RngSampleSource<Xoshiro256StarStar> {
    /// Creates a `RngSampleSource` seeded from the current wall clock time.
    pub fn from_time() -> Self {
        let seed = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self::from_seed(seed)
    }

    /// Creates a `RngSampleSource` with a fixed seed.
    pub fn from_seed(seed: u64) -> Self {
        Self(Xoshiro256StarStar::seed_from_u64(seed))
    }
}

impl<R> SampleSource for RngSampleSource<R>
where
    R: Rng + Send,
{
    fn next_sample(&mut self) -> f32 {
        self.0.random::<f32>()
    }
}

/// Decides whether a sampled metric is kept or dropped.
pub(crate) struct SampleDecider {
    source: Mutex<Box<dyn SampleSource>>,
}

impl SampleDecider {
    /// Creates a new `SampleDecider` drawing from `source`.
    pub fn new(source: Box<dyn SampleSource>) -> Self {
        Self { source: Mutex::new(source) }
    }

    /// Returns `true` if a metric with the given sample rate should be sent.
    ///
    /// Rates of `1.0` or more are always accepted without consulting the source. Otherwise, a single value is drawn
    /// and the metric is kept if that value is at or below the rate. Rates of zero or less, and `NaN`, are never
    /// accepted, and never consult the source either.
    pub fn accept(&self, rate: f32) -> bool {
        if rate >= 1.0 {
            return true;
        }

        if rate.is_nan() || rate <= 0.0 {
            return false;
        }

        let sample = self.source.lock().next_sample();
        sample <= rate
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use proptest::prelude::*;

    use super::{RngSampleSource, SampleDecider, SampleSource};

    /// A source that replays a fixed sequence of values, repeating the last one once exhausted.
    pub(crate) struct FixedSource {
        values: VecDeque<f32>,
        last: f32,
    }

    impl FixedSource {
        pub(crate) fn new(values: &[f32]) -> Self {
            Self { values: values.iter().copied().collect(), last: values.last().copied().unwrap_or(0.0) }
        }

        pub(crate) fn constant(value: f32) -> Self {
            Self::new(&[value])
        }
    }

    impl SampleSource for FixedSource {
        fn next_sample(&mut self) -> f32 {
            self.values.pop_front().unwrap_or(self.last)
        }
    }

    #[test]
    fn unit_rate_skips_source() {
        // A source that would reject everything: if it was consulted, these would fail.
        let decider = SampleDecider::new(Box::new(FixedSource::constant(0.999)));
        for rate in [1.0, 1.01, 5.0, f32::INFINITY] {
            assert!(decider.accept(rate));
        }
    }

    #[test]
    fn exact_sequence() {
        let decider = SampleDecider::new(Box::new(FixedSource::new(&[0.1, 0.5, 0.2, 0.20001, 0.0])));
        let decisions: Vec<bool> = (0..5).map(|_| decider.accept(0.2)).collect();
        assert_eq!(decisions, [true, false, true, false, true]);
    }

    #[test]
    fn degenerate_rates_never_accept() {
        // A source of zero accepts every positive rate, so only the rate itself can reject these.
        let decider = SampleDecider::new(Box::new(FixedSource::constant(0.0)));
        for rate in [0.0, -0.0, -0.5, f32::NEG_INFINITY, f32::NAN] {
            assert!(!decider.accept(rate), "rate={rate}");
        }
        assert!(decider.accept(f32::MIN_POSITIVE));
    }

    #[test]
    fn seeded_sources_are_deterministic() {
        let mut a = RngSampleSource::from_seed(42);
        let mut b = RngSampleSource::from_seed(42);
        for _ in 0..64 {
            let value = a.next_sample();
            assert!((0.0..1.0).contains(&value));
            assert_eq!(value.to_bits(), b.next_sample().to_bits());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn acceptance_converges_to_rate(seed in any::<u64>(), rate in 0.05f32..0.95) {
            const TRIALS: u32 = 20_000;

            let decider = SampleDecider::new(Box::new(RngSampleSource::from_seed(seed)));
            let accepted = (0..TRIALS).filter(|_| decider.accept(rate)).count();

            // Five standard deviations of a binomial at the worst-case rate of 0.5.
            let expected = f64::from(rate) * f64::from(TRIALS);
            let tolerance = 5.0 * (f64::from(TRIALS) * 0.25).sqrt();
            prop_assert!((accepted as f64 - expected).abs() <= tolerance, "accepted={} expected={}", accepted, expected);
        }
    }
}
