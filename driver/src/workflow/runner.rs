use crate::generator::profile::SyntheticSensor;
use crate::workflow::capture::{replay_capture, CaptureSource};
use crate::workflow::config::{ScanConfig, SourceConfig};
use anyhow::Context;
use lidarcore::interface::{ReaderSource, SystemClock};
use lidarcore::prelude::Sample;
use lidarcore::telemetry::PipelineMetrics;
use lidarcore::{ByteSource, Pipeline, RevolutionReport, RevolutionSink};
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPort, StopBits};

/// Aggregate of an offline run over simulated time.
#[derive(Debug, Clone, Default)]
pub struct OfflineSummary {
    pub revolutions: usize,
    pub max_approaching: usize,
    pub peak_speed_mm_s: f64,
    pub last_nearest: Option<Sample>,
    pub last_farthest: Option<Sample>,
    pub metrics: PipelineMetrics,
}

impl OfflineSummary {
    fn observe(&mut self, report: &RevolutionReport) {
        self.revolutions += 1;
        self.max_approaching = self.max_approaching.max(report.approaching_count());
        self.peak_speed_mm_s = report
            .tracked
            .values()
            .map(|object| object.closing_speed_mm_s)
            .fold(self.peak_speed_mm_s, f64::max);
        self.last_nearest = Some(report.nearest);
        self.last_farthest = Some(report.farthest);
    }
}

/// Opens the sensor port 8N1 without flow control. Reads block for at most
/// `timeout_ms`, then surface as `TimedOut`.
fn open_serial(
    path: &Path,
    baud_rate: u32,
    timeout_ms: u64,
) -> anyhow::Result<Box<dyn SerialPort>> {
    tokio_serial::new(path.to_string_lossy(), baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(timeout_ms))
        .open()
        .with_context(|| {
            format!(
                "opening serial port {} at {} baud",
                path.display(),
                baud_rate
            )
        })
}

#[derive(Clone)]
pub struct Runner {
    config: ScanConfig,
}

impl Runner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Reads the configured source until it closes, delivering every
    /// revolution to `sink` on wall-clock time (replays use simulated time).
    pub fn run_live<K: RevolutionSink + ?Sized>(
        &self,
        sink: &mut K,
    ) -> anyhow::Result<PipelineMetrics> {
        let mut pipeline = Pipeline::new(&self.config.pipeline);

        match &self.config.source {
            SourceConfig::Device {
                path,
                baud_rate,
                timeout_ms,
            } => {
                let port = open_serial(path, *baud_rate, *timeout_ms)?;
                info!(
                    "reading sensor stream from {} at {} baud",
                    path.display(),
                    baud_rate
                );
                self.drive(&mut pipeline, ReaderSource::new(port), sink)?;
            }
            SourceConfig::Raw { path } => {
                let dump = File::open(path)
                    .with_context(|| format!("opening raw dump {}", path.display()))?;
                info!("reading raw dump {}", path.display());
                self.drive(&mut pipeline, ReaderSource::new(dump), sink)?;
            }
            SourceConfig::Synthetic { revolutions } => {
                info!("running synthetic sensor at {} rpm", self.config.generator.rpm);
                let mut sensor = SyntheticSensor::new(self.config.generator.clone()).paced();
                if let Some(limit) = revolutions {
                    sensor = sensor.with_limit(*limit);
                }
                self.drive(&mut pipeline, sensor, sink)?;
            }
            SourceConfig::Replay {
                path,
                revolution_secs,
            } => {
                let lines = replay_capture(path, *revolution_secs, &mut pipeline, sink)?;
                info!("replayed {} capture lines from {}", lines, path.display());
            }
        }

        Ok(pipeline.metrics())
    }

    fn drive<S, K>(&self, pipeline: &mut Pipeline, source: S, sink: &mut K) -> anyhow::Result<()>
    where
        S: ByteSource,
        K: RevolutionSink + ?Sized,
    {
        match &self.config.capture {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("creating capture {}", path.display()))?;
                let mut source = CaptureSource::new(source, BufWriter::new(file));
                pipeline
                    .run(&mut source, &SystemClock, sink)
                    .context("reading sensor stream")?;
                source
                    .into_writer()
                    .with_context(|| format!("finishing capture {}", path.display()))?;
            }
            None => {
                let mut source = source;
                pipeline
                    .run(&mut source, &SystemClock, sink)
                    .context("reading sensor stream")?;
            }
        }
        Ok(())
    }

    /// Runs `revolutions` synthetic sweeps as fast as possible on simulated time.
    pub fn run_offline(&self, revolutions: usize) -> anyhow::Result<OfflineSummary> {
        let mut pipeline = Pipeline::new(&self.config.pipeline);
        let mut sensor = SyntheticSensor::new(self.config.generator.clone());
        let mut summary = OfflineSummary::default();

        for _ in 0..revolutions {
            let now = sensor.elapsed();
            for frame in sensor.next_revolution() {
                for &byte in frame.as_bytes() {
                    if let Some(report) = pipeline.push_byte(byte, now) {
                        summary.observe(&report);
                    }
                }
            }
        }
        if let Some(report) = pipeline.flush(sensor.elapsed()) {
            summary.observe(&report);
        }

        summary.metrics = pipeline.metrics();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::GeneratorConfig;
    use lidarcore::prelude::START_MARKER;
    use std::path::PathBuf;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn offline_run_tracks_synthetic_target() {
        let runner = Runner::new(ScanConfig::default());
        let summary = runner.run_offline(10).unwrap();
        assert_eq!(summary.revolutions, 10);
        assert_eq!(summary.metrics.frames_decoded, 900);
        assert_eq!(summary.metrics.frames_rejected, 0);
        assert_eq!(summary.metrics.objects_created, 1);
        assert_eq!(summary.max_approaching, 1);
        assert!(summary.peak_speed_mm_s > 0.0);
        assert_eq!(summary.last_nearest.unwrap().angle, 45);
    }

    #[test]
    fn far_target_is_not_tracked_offline() {
        let config = ScanConfig {
            generator: GeneratorConfig {
                room_radius_mm: 7900,
                target_start_mm: 7500,
                target_min_mm: 5200,
                ..Default::default()
            },
            ..Default::default()
        };
        let summary = Runner::new(config).run_offline(8).unwrap();
        assert_eq!(summary.max_approaching, 0);
        assert_eq!(summary.metrics.objects_created, 0);
    }

    #[test]
    fn raw_dump_reads_until_end_of_file() {
        let mut sensor = SyntheticSensor::new(GeneratorConfig::default());
        let mut device = NamedTempFile::new().unwrap();
        for _ in 0..2 {
            for frame in sensor.next_revolution() {
                device.write_all(frame.as_bytes()).unwrap();
            }
        }
        device.flush().unwrap();

        let capture = NamedTempFile::new().unwrap();
        let config = ScanConfig {
            source: SourceConfig::Raw {
                path: device.path().to_path_buf(),
            },
            capture: Some(capture.path().to_path_buf()),
            ..Default::default()
        };
        let mut nearest = Vec::new();
        let mut sink = |report: &RevolutionReport| nearest.push(report.nearest.angle);
        let metrics = Runner::new(config).run_live(&mut sink).unwrap();

        assert_eq!(nearest, vec![45, 45]);
        assert_eq!(metrics.revolutions, 2);
        let captured = std::fs::read_to_string(capture.path()).unwrap();
        assert_eq!(captured.lines().count(), 180);
    }

    #[test]
    fn missing_serial_port_is_reported() {
        let config = ScanConfig::from_args(
            SourceConfig::Device {
                path: PathBuf::from("/dev/lidar-does-not-exist"),
                baud_rate: 115_200,
                timeout_ms: 1000,
            },
            5000,
        );
        let mut sink = |_: &RevolutionReport| {};
        let err = Runner::new(config).run_live(&mut sink).unwrap_err();
        assert!(err
            .to_string()
            .contains("opening serial port /dev/lidar-does-not-exist at 115200 baud"));
    }

    #[test]
    fn regular_file_is_not_opened_as_serial_port() {
        let mut dump = NamedTempFile::new().unwrap();
        dump.write_all(&[START_MARKER, 0xA0]).unwrap();
        let config = ScanConfig::from_args(
            SourceConfig::Device {
                path: dump.path().to_path_buf(),
                baud_rate: 115_200,
                timeout_ms: 100,
            },
            5000,
        );
        let mut revolutions = 0;
        let mut sink = |_: &RevolutionReport| revolutions += 1;
        assert!(Runner::new(config).run_live(&mut sink).is_err());
        assert_eq!(revolutions, 0);
    }

    #[test]
    fn replay_source_runs_on_simulated_time() {
        let mut sensor = SyntheticSensor::new(GeneratorConfig::default());
        let mut capture = NamedTempFile::new().unwrap();
        for _ in 0..3 {
            for frame in sensor.next_revolution() {
                writeln!(capture, "{}", frame.to_hex()).unwrap();
            }
        }

        let config = ScanConfig::from_args(
            SourceConfig::Replay {
                path: capture.path().to_path_buf(),
                revolution_secs: 0.2,
            },
            5000,
        );
        let mut timestamps = Vec::new();
        let mut sink = |report: &RevolutionReport| timestamps.push(report.timestamp);
        let metrics = Runner::new(config).run_live(&mut sink).unwrap();

        assert_eq!(metrics.revolutions, 3);
        assert_eq!(timestamps.len(), 3);
        assert!((timestamps[2] - 0.6).abs() < 1e-9);
    }
}
