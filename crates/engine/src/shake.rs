//! Shake gesture detection over a stream of accelerometer samples
//!
//! Pure state machine: the platform layer feeds raw samples and decides
//! what a trigger means. Arming is explicit and separate from sensor
//! permission, so granting motion access does not by itself start
//! claiming points.

use std::time::{Duration, Instant};

/// Minimum Euclidean magnitude of the delta between consecutive
/// samples to count as a shake
pub const SHAKE_THRESHOLD: f64 = 15.0;

/// Minimum spacing between two triggers
pub const SHAKE_COOLDOWN: Duration = Duration::from_secs(2);

/// One accelerometer reading (gravity included)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Detects shakes from consecutive motion samples
pub struct ShakeDetector {
    threshold: f64,
    cooldown: Duration,
    armed: bool,
    last_sample: Option<MotionSample>,
    last_trigger: Option<Instant>,
}

impl ShakeDetector {
    pub fn new() -> Self {
        Self::with_tuning(SHAKE_THRESHOLD, SHAKE_COOLDOWN)
    }

    pub fn with_tuning(threshold: f64, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            armed: false,
            last_sample: None,
            last_trigger: None,
        }
    }

    /// Start reacting to samples
    pub fn arm(&mut self) {
        self.armed = true;
        self.last_sample = None;
    }

    /// Stop reacting; pending sample history is dropped so the first
    /// sample after re-arming can't trigger against stale data
    pub fn disarm(&mut self) {
        self.armed = false;
        self.last_sample = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Feed one sample. Returns `true` when this sample completes a
    /// shake gesture (armed, over threshold, outside the cooldown).
    pub fn feed(&mut self, sample: MotionSample, now: Instant) -> bool {
        if !self.armed {
            return false;
        }

        let previous = self.last_sample.replace(sample);
        let Some(prev) = previous else {
            // First sample only establishes the baseline
            return false;
        };

        let (dx, dy, dz) = (sample.x - prev.x, sample.y - prev.y, sample.z - prev.z);
        let magnitude = (dx * dx + dy * dy + dz * dz).sqrt();
        if magnitude < self.threshold {
            return false;
        }

        if let Some(last) = self.last_trigger {
            if now.duration_since(last) < self.cooldown {
                return false;
            }
        }

        self.last_trigger = Some(now);
        true
    }
}

impl Default for ShakeDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_rest() -> MotionSample {
        MotionSample {
            x: 0.0,
            y: 0.0,
            z: 9.8,
        }
    }

    fn jolt() -> MotionSample {
        MotionSample {
            x: 14.0,
            y: -9.0,
            z: 9.8,
        }
    }

    #[test]
    fn test_disarmed_detector_ignores_samples() {
        let mut detector = ShakeDetector::new();
        let now = Instant::now();
        detector.feed(at_rest(), now);
        assert!(!detector.feed(jolt(), now));
    }

    #[test]
    fn test_shake_over_threshold_triggers() {
        let mut detector = ShakeDetector::new();
        detector.arm();
        let now = Instant::now();
        assert!(!detector.feed(at_rest(), now), "baseline sample");
        assert!(detector.feed(jolt(), now));
    }

    #[test]
    fn test_gentle_motion_does_not_trigger() {
        let mut detector = ShakeDetector::new();
        detector.arm();
        let now = Instant::now();
        detector.feed(at_rest(), now);
        let gentle = MotionSample {
            x: 2.0,
            y: 1.0,
            z: 9.8,
        };
        assert!(!detector.feed(gentle, now));
    }

    #[test]
    fn test_diagonal_jitter_stays_below_threshold() {
        let mut detector = ShakeDetector::new();
        detector.arm();
        let now = Instant::now();
        detector.feed(at_rest(), now);
        // 7.0 on each axis: the magnitude is sqrt(147) ~= 12.1, under
        // the threshold even though the per-axis deltas sum to 21
        let jitter = MotionSample {
            x: 7.0,
            y: 7.0,
            z: 16.8,
        };
        assert!(!detector.feed(jitter, now));
    }

    #[test]
    fn test_cooldown_swallows_rapid_repeat() {
        let mut detector = ShakeDetector::new();
        detector.arm();
        let now = Instant::now();
        detector.feed(at_rest(), now);
        assert!(detector.feed(jolt(), now));
        detector.feed(at_rest(), now);
        assert!(!detector.feed(jolt(), now + Duration::from_millis(500)));
        detector.feed(at_rest(), now);
        assert!(detector.feed(jolt(), now + Duration::from_secs(3)));
    }

    #[test]
    fn test_rearming_resets_baseline() {
        let mut detector = ShakeDetector::new();
        detector.arm();
        let now = Instant::now();
        detector.feed(jolt(), now);
        detector.disarm();
        detector.arm();
        // First sample after re-arm is a new baseline, even if far from
        // the last one seen before disarm
        assert!(!detector.feed(at_rest(), now));
    }
}
