//! Synthetic magnetometer.
//!
//! [`SimSource`] produces an ambient field with a little uniform noise and,
//! every `anomaly_period` samples, a smooth bump shaped like a half sine as
//! if a magnet were swept past the sensor.  An optional gravity channel is
//! interleaved with the field samples.
//!
//! The sequence is fully determined by [`SimSignal::seed`], so two sources
//! with the same signal produce identical samples.

use std::f32::consts::PI;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use magplane_types::{MagplaneError, SensorEvent, Vec3, ensure_positive};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use crate::source::{SampleSource, Subscriptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSignal {
    /// Resting field in µT (roughly Earth's field: about 50 µT total).
    pub ambient: Vec3,
    /// Half-width of the uniform per-axis noise, µT.
    pub noise: f32,
    /// Field added at the peak of each anomaly.
    pub anomaly: Vec3,
    /// Samples from the start of one anomaly to the start of the next.
    pub anomaly_period: u32,
    /// Samples each anomaly lasts.
    pub anomaly_duration: u32,
    /// Field samples per second.
    pub rate_hz: f32,
    /// Gravity vector to interleave as orientation samples.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gravity: Option<Vec3>,
    pub seed: u64,
}

impl Default for SimSignal {
    fn default() -> Self {
        Self {
            ambient: Vec3::new(18.0, -22.0, -40.0),
            noise: 0.4,
            anomaly: Vec3::new(30.0, -10.0, -25.0),
            anomaly_period: 400,
            anomaly_duration: 150,
            rate_hz: 50.0,
            gravity: None,
            seed: 7,
        }
    }
}

impl SimSignal {
    pub fn validate(&self) -> Result<(), MagplaneError> {
        ensure_positive("sim.rate_hz", self.rate_hz)?;
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(MagplaneError::invalid("sim.noise", "must be finite and >= 0"));
        }
        if self.anomaly_duration > self.anomaly_period {
            return Err(MagplaneError::invalid(
                "sim.anomaly_duration",
                "must not exceed sim.anomaly_period",
            ));
        }
        Ok(())
    }

    /// Noise-free field value of sample `index`.
    pub fn clean_field(&self, index: u64) -> Vec3 {
        let mut v = self.ambient;
        if self.anomaly_period == 0 || self.anomaly_duration == 0 {
            return v;
        }
        let phase = (index % u64::from(self.anomaly_period)) as u32;
        if phase < self.anomaly_duration {
            let envelope = (PI * phase as f32 / self.anomaly_duration as f32).sin();
            v.x += self.anomaly.x * envelope;
            v.y += self.anomaly.y * envelope;
            v.z += self.anomaly.z * envelope;
        }
        v
    }
}

/// Deterministic sample generator behind [`SimSource`].
#[derive(Debug)]
pub struct SimSamples {
    signal: SimSignal,
    rng: StdRng,
    index: u64,
    orientation_due: bool,
}

impl SimSamples {
    pub fn new(signal: SimSignal) -> Self {
        let rng = StdRng::seed_from_u64(signal.seed);
        Self {
            signal,
            rng,
            index: 0,
            orientation_due: false,
        }
    }

    fn jitter(&mut self) -> f32 {
        let n = self.signal.noise;
        if n > 0.0 { self.rng.gen_range(-n..=n) } else { 0.0 }
    }
}

impl Iterator for SimSamples {
    type Item = SensorEvent;

    fn next(&mut self) -> Option<SensorEvent> {
        if self.orientation_due {
            self.orientation_due = false;
            if let Some(g) = self.signal.gravity {
                return Some(SensorEvent::orientation(g));
            }
        }
        let clean = self.signal.clean_field(self.index);
        let v = Vec3::new(
            clean.x + self.jitter(),
            clean.y + self.jitter(),
            clean.z + self.jitter(),
        );
        self.index += 1;
        self.orientation_due = self.signal.gravity.is_some();
        Some(SensorEvent::field(v))
    }
}

/// Paced [`SampleSource`] over [`SimSamples`].
#[derive(Debug)]
pub struct SimSource {
    id: String,
    signal: SimSignal,
    subscriptions: Subscriptions,
}

impl SimSource {
    pub fn new(signal: SimSignal) -> Result<Self, MagplaneError> {
        signal.validate()?;
        Ok(Self {
            id: "sim".to_string(),
            signal,
            subscriptions: Subscriptions::new(),
        })
    }

    /// Time between consecutive samples.  With a gravity channel the
    /// orientation sample shares the field sample's slot.
    fn period(&self) -> Duration {
        let per_slot = if self.signal.gravity.is_some() { 2.0 } else { 1.0 };
        Duration::from_secs_f32(1.0 / (self.signal.rate_hz * per_slot))
    }
}

#[async_trait]
impl SampleSource for SimSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn subscribe(&self) -> BoxStream<'static, SensorEvent> {
        let mut ticker = time::interval(self.period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let samples = SimSamples::new(self.signal.clone());

        let inner = stream::unfold((samples, ticker), |(mut samples, mut ticker)| async move {
            ticker.tick().await;
            let event = samples.next()?;
            Some((event, (samples, ticker)))
        })
        .boxed();
        debug!(source = %self.id, rate_hz = self.signal.rate_hz, "simulated source started");
        self.subscriptions.open(inner)
    }

    async fn unsubscribe(&self) {
        if self.subscriptions.close_all() {
            debug!(source = %self.id, "simulated source stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magplane_types::SensorChannel;

    fn quiet() -> SimSignal {
        SimSignal {
            noise: 0.0,
            rate_hz: 1000.0,
            ..SimSignal::default()
        }
    }

    #[test]
    fn same_seed_same_samples() {
        let a: Vec<Vec3> = SimSamples::new(SimSignal::default())
            .take(50)
            .map(|e| e.vector)
            .collect();
        let b: Vec<Vec3> = SimSamples::new(SimSignal::default())
            .take(50)
            .map(|e| e.vector)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn noise_stays_within_bounds() {
        let signal = SimSignal::default();
        for (i, e) in SimSamples::new(signal.clone()).take(500).enumerate() {
            let clean = signal.clean_field(i as u64);
            assert!((e.vector.x - clean.x).abs() <= signal.noise + 1e-4);
            assert!((e.vector.z - clean.z).abs() <= signal.noise + 1e-4);
        }
    }

    #[test]
    fn anomaly_peaks_mid_window_and_repeats() {
        let s = quiet();
        let rest = s.clean_field(0).norm();
        let peak = s.clean_field(u64::from(s.anomaly_duration / 2)).norm();
        assert!(peak > rest + 10.0);
        assert_eq!(s.clean_field(u64::from(s.anomaly_duration)), s.ambient);
        let again = s.clean_field(u64::from(s.anomaly_period + s.anomaly_duration / 2));
        assert!((again.norm() - peak).abs() < 1e-3);
    }

    #[test]
    fn gravity_is_interleaved_after_each_field_sample() {
        let signal = SimSignal {
            gravity: Some(Vec3::new(0.5, 9.7, 0.3)),
            ..quiet()
        };
        let channels: Vec<SensorChannel> =
            SimSamples::new(signal).take(4).map(|e| e.channel).collect();
        assert_eq!(
            channels,
            vec![
                SensorChannel::Field,
                SensorChannel::Orientation,
                SensorChannel::Field,
                SensorChannel::Orientation,
            ]
        );
    }

    #[test]
    fn invalid_signal_is_rejected() {
        let bad = SimSignal {
            rate_hz: 0.0,
            ..SimSignal::default()
        };
        assert!(SimSource::new(bad).is_err());
        let bad = SimSignal {
            anomaly_duration: 500,
            anomaly_period: 100,
            ..SimSignal::default()
        };
        assert!(SimSource::new(bad).is_err());
    }

    #[tokio::test]
    async fn stream_delivers_until_unsubscribed() {
        let source = SimSource::new(quiet()).unwrap();
        let mut stream = source.subscribe().await;
        for _ in 0..5 {
            let e = stream.next().await.unwrap();
            assert_eq!(e.channel, SensorChannel::Field);
        }
        source.unsubscribe().await;
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn old_stream_stays_ended_after_resubscribe() {
        let source = SimSource::new(quiet()).unwrap();
        let mut old = source.subscribe().await;
        old.next().await.unwrap();
        source.unsubscribe().await;

        let mut fresh = source.subscribe().await;
        assert!(fresh.next().await.is_some());
        assert!(old.next().await.is_none());
    }
}
