use serde::{Deserialize, Serialize};

/// Running counters for one pipeline instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineMetrics {
    pub frames_decoded: usize,
    pub frames_rejected: usize,
    pub samples_accepted: usize,
    pub samples_dropped: usize,
    pub revolutions: usize,
    pub objects_created: usize,
    pub objects_expired: usize,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&mut self, accepted: usize, dropped: usize) {
        self.frames_decoded += 1;
        self.samples_accepted += accepted;
        self.samples_dropped += dropped;
    }

    pub fn record_rejected(&mut self) {
        self.frames_rejected += 1;
    }

    pub fn record_revolution(&mut self, created: bool, expired: usize) {
        self.revolutions += 1;
        if created {
            self.objects_created += 1;
        }
        self.objects_expired += expired;
    }

    pub fn snapshot(&self) -> PipelineMetrics {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut metrics = PipelineMetrics::new();
        metrics.record_frame(3, 1);
        metrics.record_frame(4, 0);
        metrics.record_rejected();
        metrics.record_revolution(true, 2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_decoded, 2);
        assert_eq!(snapshot.samples_accepted, 7);
        assert_eq!(snapshot.samples_dropped, 1);
        assert_eq!(snapshot.frames_rejected, 1);
        assert_eq!(snapshot.objects_created, 1);
        assert_eq!(snapshot.objects_expired, 2);
    }
}
