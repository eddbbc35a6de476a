use crate::interface::{ByteSource, Clock, RevolutionReport, RevolutionSink};
use crate::prelude::{DecodeResult, PipelineConfig, Sample, SourceError, SAMPLES_PER_FRAME};
use crate::processing::{ObjectTracker, RevolutionBuffer};
use crate::protocol::{DecodedFrame, FrameDecoder, RawByteFrame};
use crate::telemetry::PipelineMetrics;
use log::{debug, info, warn};

/// Bytes in, revolution reports out.
///
/// Owns every piece of mutable state (framing, accumulation, tracking) so
/// separate instances never interfere.
pub struct Pipeline {
    decoder: FrameDecoder,
    buffer: RevolutionBuffer,
    tracker: ObjectTracker,
    metrics: PipelineMetrics,
    last_rpm: Option<f64>,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            buffer: RevolutionBuffer::with_threshold(config.revolution_size.max(SAMPLES_PER_FRAME)),
            tracker: ObjectTracker::new(config),
            metrics: PipelineMetrics::new(),
            last_rpm: None,
        }
    }

    /// Feeds one transport byte; `now` is only consulted when a frame completes.
    pub fn push_byte(&mut self, byte: u8, now: f64) -> Option<RevolutionReport> {
        let outcome = self.decoder.push_byte(byte)?;
        self.handle_outcome(outcome, now)
    }

    /// Feeds an already delimited frame, e.g. one line of a hex capture.
    pub fn ingest_frame(&mut self, frame: &RawByteFrame, now: f64) -> Option<RevolutionReport> {
        self.handle_outcome(frame.decode(), now)
    }

    /// Feeds one line of the colon-separated hex capture format.
    pub fn ingest_hex(&mut self, line: &str, now: f64) -> Option<RevolutionReport> {
        match RawByteFrame::from_hex(line) {
            Ok(frame) => self.ingest_frame(&frame, now),
            Err(err) => self.handle_outcome(Err(err), now),
        }
    }

    /// Decodes the frame still held by the decoder.
    pub fn flush(&mut self, now: f64) -> Option<RevolutionReport> {
        let outcome = self.decoder.flush()?;
        self.handle_outcome(outcome, now)
    }

    /// Pulls bytes until the source closes, handing each revolution to `sink`.
    pub fn run<S, C, K>(&mut self, source: &mut S, clock: &C, sink: &mut K) -> Result<(), SourceError>
    where
        S: ByteSource + ?Sized,
        C: Clock + ?Sized,
        K: RevolutionSink + ?Sized,
    {
        loop {
            match source.read_byte() {
                Ok(Some(byte)) => {
                    if let Some(outcome) = self.decoder.push_byte(byte) {
                        if let Some(report) = self.handle_outcome(outcome, clock.now()) {
                            sink.on_revolution(&report);
                        }
                    }
                }
                // The source already waited out its read timeout.
                Ok(None) => continue,
                Err(SourceError::Closed) => {
                    if let Some(report) = self.flush(clock.now()) {
                        sink.on_revolution(&report);
                    }
                    info!(
                        "byte source closed after {} revolutions",
                        self.metrics.revolutions
                    );
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn handle_outcome(
        &mut self,
        outcome: DecodeResult<DecodedFrame>,
        now: f64,
    ) -> Option<RevolutionReport> {
        match outcome {
            Ok(frame) => self.accept_frame(&frame, now),
            Err(err) => {
                warn!("dropping frame: {}", err);
                self.metrics.record_rejected();
                None
            }
        }
    }

    fn accept_frame(&mut self, frame: &DecodedFrame, now: f64) -> Option<RevolutionReport> {
        let dropped = frame.dropped_count();
        if dropped > 0 {
            debug!(
                "frame {}: {} zero-quality readings dropped",
                frame.index, dropped
            );
        }
        self.metrics
            .record_frame(SAMPLES_PER_FRAME - dropped, dropped);
        self.last_rpm = Some(frame.rpm);

        let mut report = None;
        for sample in frame.valid_samples() {
            if let Some(batch) = self.buffer.push(sample) {
                report = self.complete_revolution(batch, now);
            }
        }
        report
    }

    fn complete_revolution(
        &mut self,
        samples: Vec<Sample>,
        now: f64,
    ) -> Option<RevolutionReport> {
        let update = self.tracker.update(&samples, now)?;
        self.metrics
            .record_revolution(update.created.is_some(), update.expired.len());
        debug!(
            "revolution {}: nearest {} mm @ {} deg, farthest {} mm @ {} deg, {} tracked",
            self.metrics.revolutions,
            update.extrema.nearest.distance_mm,
            update.extrema.nearest.angle,
            update.extrema.farthest.distance_mm,
            update.extrema.farthest.angle,
            self.tracker.tracked().len()
        );

        Some(RevolutionReport {
            timestamp: now,
            samples,
            nearest: update.extrema.nearest,
            farthest: update.extrema.farthest,
            tracked: self.tracker.tracked().clone(),
            sensor_rpm: self.last_rpm,
            metrics: self.metrics.snapshot(),
        })
    }

    pub fn metrics(&self) -> PipelineMetrics {
        self.metrics.snapshot()
    }

    pub fn tracker(&self) -> &ObjectTracker {
        &self.tracker
    }

    /// Samples waiting for the current revolution to fill.
    pub fn pending_samples(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.decoder.reset();
        self.buffer.reset();
        self.tracker.reset();
        self.last_rpm = None;
    }
}
