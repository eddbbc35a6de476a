use crate::prelude::Sample;

/// Collects samples until a full revolution is available.
///
/// Angle collisions are kept as-is; the buffer only counts.
pub struct RevolutionBuffer {
    samples: Vec<Sample>,
    threshold: usize,
}

impl RevolutionBuffer {
    pub fn with_threshold(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            samples: Vec::with_capacity(threshold),
            threshold,
        }
    }

    /// Appends a sample. Once the threshold is reached the whole batch is
    /// handed back and the buffer starts over empty.
    pub fn push(&mut self, sample: Sample) -> Option<Vec<Sample>> {
        self.samples.push(sample);
        if self.samples.len() >= self.threshold {
            Some(std::mem::replace(
                &mut self.samples,
                Vec::with_capacity(self.threshold),
            ))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_flushes_exactly_at_threshold() {
        let mut buffer = RevolutionBuffer::with_threshold(4);
        for angle in 0..3 {
            assert!(buffer.push(Sample::new(angle, 1000, 1)).is_none());
        }
        let batch = buffer.push(Sample::new(3, 1000, 1)).unwrap();
        assert_eq!(batch.len(), 4);
        assert!(buffer.is_empty());
    }

    #[test]
    fn duplicate_angles_are_retained() {
        let mut buffer = RevolutionBuffer::with_threshold(3);
        buffer.push(Sample::new(10, 500, 1));
        buffer.push(Sample::new(10, 700, 1));
        let batch = buffer.push(Sample::new(11, 900, 1)).unwrap();
        assert_eq!(batch.iter().filter(|s| s.angle == 10).count(), 2);
    }

    #[test]
    fn zero_threshold_is_clamped() {
        let mut buffer = RevolutionBuffer::with_threshold(0);
        assert_eq!(buffer.threshold(), 1);
        assert!(buffer.push(Sample::new(0, 1, 1)).is_some());
    }

    #[test]
    fn reset_discards_partial_revolution() {
        let mut buffer = RevolutionBuffer::with_threshold(360);
        buffer.push(Sample::new(0, 1, 1));
        buffer.reset();
        assert_eq!(buffer.len(), 0);
    }
}
