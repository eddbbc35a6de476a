use anyhow::Context;
use lidarcore::interface::{Clock, ManualClock};
use lidarcore::prelude::{SourceError, REVOLUTION_SIZE, SAMPLES_PER_FRAME, START_MARKER};
use lidarcore::{ByteSource, Pipeline, RevolutionSink};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Tees every byte read from `inner` into a hex capture, one frame per line.
pub struct CaptureSource<S, W: Write> {
    inner: S,
    writer: W,
    line_open: bool,
}

impl<S, W: Write> CaptureSource<S, W> {
    pub fn new(inner: S, writer: W) -> Self {
        Self {
            inner,
            writer,
            line_open: false,
        }
    }

    pub fn into_writer(mut self) -> std::io::Result<W> {
        if self.line_open {
            writeln!(self.writer)?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn record(&mut self, byte: u8) -> std::io::Result<()> {
        if byte == START_MARKER && self.line_open {
            writeln!(self.writer)?;
        } else if self.line_open {
            write!(self.writer, ":")?;
        }
        write!(self.writer, "{:02x}", byte)?;
        self.line_open = true;
        Ok(())
    }
}

impl<S: ByteSource, W: Write> ByteSource for CaptureSource<S, W> {
    fn read_byte(&mut self) -> Result<Option<u8>, SourceError> {
        let byte = self.inner.read_byte();
        if let Ok(Some(value)) = byte {
            self.record(value)?;
        }
        if matches!(byte, Err(SourceError::Closed)) && self.line_open {
            writeln!(self.writer)?;
            self.writer.flush()?;
            self.line_open = false;
        }
        byte
    }
}

/// Feeds a hex capture through `pipeline` on simulated time, advancing the
/// clock by one packet period per line. Returns the number of lines read.
pub fn replay_capture<K: RevolutionSink + ?Sized>(
    path: &Path,
    revolution_secs: f64,
    pipeline: &mut Pipeline,
    sink: &mut K,
) -> anyhow::Result<usize> {
    let file = File::open(path).with_context(|| format!("opening capture {}", path.display()))?;
    let clock = ManualClock::starting_at(0.0);
    let step = revolution_secs / (REVOLUTION_SIZE / SAMPLES_PER_FRAME) as f64;
    let mut lines = 0;

    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("reading capture {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        lines += 1;
        clock.advance(step);
        if let Some(report) = pipeline.ingest_hex(&line, clock.now()) {
            sink.on_revolution(&report);
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{GeneratorConfig, SyntheticSensor};
    use lidarcore::interface::ReaderSource;
    use lidarcore::{PipelineConfig, RevolutionReport};
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    #[test]
    fn capture_writes_one_line_per_frame() {
        let bytes = vec![0x01, START_MARKER, 0xA0, 0x10, START_MARKER, 0xA1];
        let mut source = CaptureSource::new(ReaderSource::new(Cursor::new(bytes)), Vec::new());
        while source.read_byte().is_ok() {}
        let text = String::from_utf8(source.into_writer().unwrap()).unwrap();
        assert_eq!(text, "01\nfa:a0:10\nfa:a1\n");
    }

    #[test]
    fn captured_stream_replays_to_same_revolutions() {
        let sensor = SyntheticSensor::new(GeneratorConfig::default()).with_limit(3);
        let temp = NamedTempFile::new().unwrap();
        let writer = temp.reopen().unwrap();
        let mut source = CaptureSource::new(sensor, writer);
        let mut live = Pipeline::new(&PipelineConfig::default());
        let clock = ManualClock::starting_at(0.0);
        let mut live_reports = Vec::new();
        let mut collect = |report: &RevolutionReport| live_reports.push(report.nearest);
        live.run(&mut source, &clock, &mut collect).unwrap();
        source.into_writer().unwrap();

        let mut replayed = Pipeline::new(&PipelineConfig::default());
        let mut replay_reports = Vec::new();
        let mut collect = |report: &RevolutionReport| replay_reports.push(report.nearest);
        let lines = replay_capture(temp.path(), 0.2, &mut replayed, &mut collect).unwrap();

        assert_eq!(lines, 270);
        assert_eq!(live_reports.len(), 3);
        assert_eq!(replay_reports, live_reports);
    }

    #[test]
    fn bad_capture_lines_are_skipped() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "fa:a0:zz").unwrap();
        writeln!(temp).unwrap();
        writeln!(temp, "fa:a0").unwrap();
        let mut pipeline = Pipeline::new(&PipelineConfig::default());
        let mut sink = |_: &RevolutionReport| {};
        let lines = replay_capture(temp.path(), 0.2, &mut pipeline, &mut sink).unwrap();
        assert_eq!(lines, 2);
        assert_eq!(pipeline.metrics().frames_rejected, 2);
    }
}
