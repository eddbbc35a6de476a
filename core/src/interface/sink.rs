use crate::prelude::Sample;
use crate::processing::tracker::TrackedObject;
use crate::telemetry::PipelineMetrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the presentation side receives for one completed revolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevolutionReport {
    pub timestamp: f64,
    pub samples: Vec<Sample>,
    pub nearest: Sample,
    pub farthest: Sample,
    pub tracked: BTreeMap<u16, TrackedObject>,
    /// Motor speed from the most recent packet.
    pub sensor_rpm: Option<f64>,
    /// Counters as of this revolution.
    pub metrics: PipelineMetrics,
}

impl RevolutionReport {
    pub fn approaching_count(&self) -> usize {
        self.tracked.len()
    }
}

/// Consumer of completed revolutions. Receives a shared borrow only, so it
/// cannot alter tracker state.
pub trait RevolutionSink {
    fn on_revolution(&mut self, report: &RevolutionReport);
}

impl<F> RevolutionSink for F
where
    F: FnMut(&RevolutionReport),
{
    fn on_revolution(&mut self, report: &RevolutionReport) {
        self(report)
    }
}
