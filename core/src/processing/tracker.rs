use crate::prelude::{PipelineConfig, Sample};
use crate::processing::extrema::{find_extrema, Extrema};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Closing speed in distance units per second. Zero when no positive time has elapsed.
pub fn estimate_speed(distance_now: u16, distance_prev: u16, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 && elapsed_secs.is_finite() {
        (distance_now as f64 - distance_prev as f64).abs() / elapsed_secs
    } else {
        0.0
    }
}

/// A point that has been getting closer, keyed by the angle it was last seen at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub angle: u16,
    pub distance_mm: u16,
    /// Baseline captured at first detection; never moved by later sightings.
    pub previous_distance_mm: u16,
    pub last_seen_timestamp: f64,
    /// Speed as of the last revolution processed by the tracker.
    pub closing_speed_mm_s: f64,
}

impl TrackedObject {
    pub fn closing_speed_at(&self, now: f64) -> f64 {
        estimate_speed(
            self.distance_mm,
            self.previous_distance_mm,
            now - self.last_seen_timestamp,
        )
    }

    pub fn is_expired(&self, now: f64, window_secs: f64) -> bool {
        now - self.last_seen_timestamp >= window_secs
    }
}

/// What one revolution changed in the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerUpdate {
    pub extrema: Extrema,
    pub created: Option<u16>,
    pub refreshed: Option<u16>,
    pub expired: Vec<u16>,
}

/// Time-windowed table of approaching points.
///
/// The only history kept between revolutions is the previous nearest
/// distance and the table itself; stale entries are dropped on every update.
pub struct ObjectTracker {
    proximity_gate_mm: u16,
    expiry_secs: f64,
    nearest_state: Option<u16>,
    objects: BTreeMap<u16, TrackedObject>,
}

impl ObjectTracker {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            proximity_gate_mm: config.proximity_gate_mm,
            expiry_secs: config.expiry_secs,
            nearest_state: None,
            objects: BTreeMap::new(),
        }
    }

    /// Processes one revolution at wall-clock time `now` (seconds).
    /// An empty revolution leaves every piece of state untouched.
    pub fn update(&mut self, samples: &[Sample], now: f64) -> Option<TrackerUpdate> {
        let extrema = find_extrema(samples)?;
        let nearest = extrema.nearest;
        let mut created = None;
        let mut refreshed = None;

        if let Some(baseline) = self.nearest_state {
            if nearest.distance_mm < baseline && nearest.distance_mm < self.proximity_gate_mm {
                match self.objects.entry(nearest.angle) {
                    Entry::Vacant(slot) => {
                        slot.insert(TrackedObject {
                            angle: nearest.angle,
                            distance_mm: nearest.distance_mm,
                            previous_distance_mm: baseline,
                            last_seen_timestamp: now,
                            closing_speed_mm_s: 0.0,
                        });
                        info!(
                            "approaching object at {} deg: {} mm (was {} mm)",
                            nearest.angle, nearest.distance_mm, baseline
                        );
                        created = Some(nearest.angle);
                    }
                    Entry::Occupied(mut slot) => {
                        let object = slot.get_mut();
                        object.closing_speed_mm_s = estimate_speed(
                            nearest.distance_mm,
                            object.previous_distance_mm,
                            now - object.last_seen_timestamp,
                        );
                        object.distance_mm = nearest.distance_mm;
                        object.last_seen_timestamp = now;
                    }
                }
                refreshed = Some(nearest.angle);
            }
        }

        self.nearest_state = Some(nearest.distance_mm);

        for (angle, object) in self.objects.iter_mut() {
            if refreshed != Some(*angle) {
                object.closing_speed_mm_s = object.closing_speed_at(now);
            }
        }

        let window = self.expiry_secs;
        let expired: Vec<u16> = self
            .objects
            .values()
            .filter(|object| object.is_expired(now, window))
            .map(|object| object.angle)
            .collect();
        for angle in &expired {
            self.objects.remove(angle);
            debug!("approaching object at {} deg expired", angle);
        }

        Some(TrackerUpdate {
            extrema,
            created,
            refreshed,
            expired,
        })
    }

    pub fn tracked(&self) -> &BTreeMap<u16, TrackedObject> {
        &self.objects
    }

    /// Nearest distance of the previous revolution, if any.
    pub fn nearest_state(&self) -> Option<u16> {
        self.nearest_state
    }

    pub fn reset(&mut self) {
        self.nearest_state = None;
        self.objects.clear();
    }
}
