use lidarcore::prelude::{Sample, SourceError, REVOLUTION_SIZE, SAMPLES_PER_FRAME, START_MARKER};
use lidarcore::protocol::RawByteFrame;
use lidarcore::ByteSource;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

const PACKETS_PER_REVOLUTION: usize = REVOLUTION_SIZE / SAMPLES_PER_FRAME;
const MAX_DISTANCE_MM: u16 = 0x1FFF;

/// Synthetic scene: a round room with one object walking towards the sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub room_radius_mm: u16,
    pub noise_mm: u16,
    /// Probability that a wall reading comes back with zero quality.
    pub dropout: f64,
    pub target_angle: u16,
    pub target_start_mm: u16,
    pub target_min_mm: u16,
    pub target_speed_mm_s: f64,
    pub rpm: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            room_radius_mm: 4000,
            noise_mm: 20,
            dropout: 0.0,
            target_angle: 45,
            target_start_mm: 3500,
            target_min_mm: 400,
            target_speed_mm_s: 600.0,
            rpm: 300.0,
            seed: 0,
        }
    }
}

impl GeneratorConfig {
    pub fn revolution_secs(&self) -> f64 {
        60.0 / self.rpm.max(1.0)
    }

    /// Target distance after `elapsed` seconds; starts over once it reaches the minimum.
    pub fn target_distance(&self, elapsed: f64) -> u16 {
        let span = self.target_start_mm.saturating_sub(self.target_min_mm).max(1) as f64;
        let travelled = (self.target_speed_mm_s.max(0.0) * elapsed) % span;
        (self.target_start_mm as f64 - travelled).round() as u16
    }
}

/// Speed bytes or payload bytes equal to the marker would split the packet.
fn marker_free(value: u16) -> u16 {
    let [lo, hi] = value.to_le_bytes();
    let lo = if lo == START_MARKER { lo - 1 } else { lo };
    let hi = if hi == START_MARKER { hi - 1 } else { hi };
    u16::from_le_bytes([lo, hi])
}

fn marker_free_rpm(rpm: f64) -> f64 {
    let raw = (rpm * 64.0).round().clamp(0.0, u16::MAX as f64) as u16;
    marker_free(raw) as f64 / 64.0
}

/// Byte-level simulator of the sensor. Emits well-formed packets, one
/// revolution at a time, optionally paced at the configured rpm.
pub struct SyntheticSensor {
    config: GeneratorConfig,
    rng: StdRng,
    revolution: u64,
    pending: VecDeque<u8>,
    paced: bool,
    limit: Option<u64>,
}

impl SyntheticSensor {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            revolution: 0,
            pending: VecDeque::new(),
            paced: false,
            limit: None,
        }
    }

    /// Sleep one revolution period before emitting each revolution.
    pub fn paced(mut self) -> Self {
        self.paced = true;
        self
    }

    /// Close the stream after `revolutions` sweeps.
    pub fn with_limit(mut self, revolutions: u64) -> Self {
        self.limit = Some(revolutions);
        self
    }

    /// Simulated time at the start of the next revolution.
    pub fn elapsed(&self) -> f64 {
        self.revolution as f64 * self.config.revolution_secs()
    }

    /// Packets for the next sweep.
    pub fn next_revolution(&mut self) -> Vec<RawByteFrame> {
        let target = self.config.target_distance(self.elapsed());
        let rpm = marker_free_rpm(self.config.rpm);
        let frames = (0..PACKETS_PER_REVOLUTION)
            .map(|index| {
                let readings: [Sample; SAMPLES_PER_FRAME] = std::array::from_fn(|i| {
                    let angle = (index * SAMPLES_PER_FRAME + i) as u16;
                    self.reading(angle, target)
                });
                RawByteFrame::encode(index as u8, rpm, &readings)
            })
            .collect();
        self.revolution += 1;
        frames
    }

    fn reading(&mut self, angle: u16, target: u16) -> Sample {
        let full_turn = REVOLUTION_SIZE as u16;
        let offset = angle.abs_diff(self.config.target_angle % full_turn);
        let offset = offset.min(full_turn - offset);

        let (distance, quality) = if offset == 0 {
            (target, 200)
        } else if offset <= 2 {
            (target.saturating_add(30 * offset), 180)
        } else {
            let noise = self.config.noise_mm as i32;
            let jitter = if noise > 0 {
                self.rng.gen_range(-noise..=noise)
            } else {
                0
            };
            let distance = (self.config.room_radius_mm as i32 + jitter).max(0) as u16;
            let quality = if self.rng.gen_bool(self.config.dropout.clamp(0.0, 1.0)) {
                0
            } else {
                self.rng.gen_range(20..=120)
            };
            (distance, quality)
        };

        Sample::new(angle, marker_free(distance.min(MAX_DISTANCE_MM)), quality)
    }
}

impl ByteSource for SyntheticSensor {
    fn read_byte(&mut self) -> Result<Option<u8>, SourceError> {
        if self.pending.is_empty() {
            if self.limit.is_some_and(|limit| self.revolution >= limit) {
                return Err(SourceError::Closed);
            }
            if self.paced {
                thread::sleep(Duration::from_secs_f64(self.config.revolution_secs()));
            }
            let frames = self.next_revolution();
            for frame in frames {
                self.pending.extend(frame.as_bytes());
            }
        }
        Ok(self.pending.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lidarcore::processing::find_extrema;

    #[test]
    fn generator_builds_full_revolution() {
        let mut sensor = SyntheticSensor::new(GeneratorConfig::default());
        let frames = sensor.next_revolution();
        assert_eq!(frames.len(), 90);

        let samples: Vec<Sample> = frames
            .iter()
            .flat_map(|frame| frame.decode().unwrap().readings)
            .collect();
        assert_eq!(samples.len(), 360);
        let extrema = find_extrema(&samples).unwrap();
        assert_eq!(extrema.nearest.angle, 45);
        assert_eq!(extrema.nearest.distance_mm, 3500);
    }

    #[test]
    fn payload_never_contains_start_marker() {
        let config = GeneratorConfig {
            noise_mm: 400,
            dropout: 0.3,
            // speed field 0x4bfa
            rpm: 303.906_25,
            seed: 7,
            ..Default::default()
        };
        let mut sensor = SyntheticSensor::new(config);
        for _ in 0..5 {
            for frame in sensor.next_revolution() {
                assert!(frame.as_bytes()[1..].iter().all(|&b| b != START_MARKER));
            }
        }
    }

    #[test]
    fn target_moves_closer_then_wraps() {
        let config = GeneratorConfig::default();
        assert_eq!(config.target_distance(0.0), 3500);
        assert_eq!(config.target_distance(1.0), 2900);
        assert!(config.target_distance(6.0) > config.target_distance(5.0));
    }

    #[test]
    fn limited_sensor_closes_after_last_revolution() {
        let mut sensor = SyntheticSensor::new(GeneratorConfig::default()).with_limit(1);
        let mut count = 0;
        while let Ok(Some(_)) = sensor.read_byte() {
            count += 1;
        }
        assert_eq!(count, 90 * 21);
        assert!(matches!(sensor.read_byte(), Err(SourceError::Closed)));
    }
}
