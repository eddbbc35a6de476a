use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use lidarcore::prelude::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Where the byte stream comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Serial port, opened 8N1 at `baud_rate`. A read that waits longer than
    /// `timeout_ms` counts as "no data".
    Device {
        path: PathBuf,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    /// Binary dump of the sensor stream, read until end of file.
    Raw { path: PathBuf },
    /// Hex capture, one frame per line, replayed on simulated time.
    Replay {
        path: PathBuf,
        #[serde(default = "default_revolution_secs")]
        revolution_secs: f64,
    },
    /// Built-in simulator, paced at the generator rpm. Runs forever unless limited.
    Synthetic {
        #[serde(default)]
        revolutions: Option<u64>,
    },
}

pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_revolution_secs() -> f64 {
    0.2
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
    pub generator: GeneratorConfig,
    pub bind: SocketAddr,
    /// Tee every byte read into a hex capture file.
    pub capture: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::Synthetic { revolutions: None },
            pipeline: PipelineConfig::default(),
            generator: GeneratorConfig::default(),
            bind: default_bind(),
            capture: None,
        }
    }
}

impl ScanConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading scan config {}", path_ref.display()))?;
        let config: ScanConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing scan config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(source: SourceConfig, proximity_gate_mm: u16) -> Self {
        Self {
            source,
            pipeline: PipelineConfig {
                proximity_gate_mm,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_keeps_sensor_defaults() {
        let cfg = ScanConfig::from_args(SourceConfig::Synthetic { revolutions: None }, 3000);
        assert_eq!(cfg.pipeline.proximity_gate_mm, 3000);
        assert_eq!(cfg.pipeline.revolution_size, 360);
        assert_eq!(cfg.bind.port(), 9000);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"source:\n  kind: device\n  path: /dev/ttyUSB0\npipeline:\n  expiry_secs: 2.0\nbind: 0.0.0.0:9100\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = ScanConfig::load(&path).unwrap();
        assert_eq!(
            cfg.source,
            SourceConfig::Device {
                path: PathBuf::from("/dev/ttyUSB0"),
                baud_rate: 115_200,
                timeout_ms: 1000,
            }
        );
        assert_eq!(cfg.pipeline.expiry_secs, 2.0);
        assert_eq!(cfg.pipeline.proximity_gate_mm, 5000);
        assert_eq!(cfg.bind.port(), 9100);
    }

    #[test]
    fn device_line_settings_can_be_overridden() {
        let cfg: ScanConfig = serde_yaml::from_str(
            "source:\n  kind: device\n  path: /dev/ttyACM0\n  baud_rate: 230400\n  timeout_ms: 250\n",
        )
        .unwrap();
        assert_eq!(
            cfg.source,
            SourceConfig::Device {
                path: PathBuf::from("/dev/ttyACM0"),
                baud_rate: 230_400,
                timeout_ms: 250,
            }
        );
    }

    #[test]
    fn synthetic_source_parses_without_limit() {
        let cfg: ScanConfig = serde_yaml::from_str("source:\n  kind: synthetic\n").unwrap();
        assert_eq!(cfg.source, SourceConfig::Synthetic { revolutions: None });
    }

    #[test]
    fn replay_source_defaults_revolution_period() {
        let cfg: ScanConfig =
            serde_yaml::from_str("source:\n  kind: replay\n  path: scan.hex\n").unwrap();
        assert!(matches!(
            cfg.source,
            SourceConfig::Replay { revolution_secs, .. } if revolution_secs == 0.2
        ));
    }
}
