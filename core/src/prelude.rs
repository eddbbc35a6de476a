use serde::{Deserialize, Serialize};

/// Byte that opens every sensor packet.
pub const START_MARKER: u8 = 0xFA;

/// Offset subtracted from the index byte to obtain the packet number.
pub const INDEX_BASE: u8 = 0xA0;

/// Number of byte fields consumed when decoding a packet.
pub const FRAME_FIELDS: usize = 21;

/// Readings carried by one packet.
pub const SAMPLES_PER_FRAME: usize = 4;

/// Samples that make up one revolution.
pub const REVOLUTION_SIZE: usize = 360;

/// Points farther than this are never flagged as approaching.
pub const PROXIMITY_GATE_MM: u16 = 5000;

/// Tracked objects not refreshed within this window are dropped.
pub const EXPIRY_SECS: f64 = 1.0;

/// One angle/distance reading with the sensor's quality indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Degrees, 0..=359.
    pub angle: u16,
    pub distance_mm: u16,
    pub quality: u16,
}

impl Sample {
    pub fn new(angle: u16, distance_mm: u16, quality: u16) -> Self {
        Self {
            angle,
            distance_mm,
            quality,
        }
    }
}

/// Tunables shared by the buffer and tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub revolution_size: usize,
    pub proximity_gate_mm: u16,
    pub expiry_secs: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            revolution_size: REVOLUTION_SIZE,
            proximity_gate_mm: PROXIMITY_GATE_MM,
            expiry_secs: EXPIRY_SECS,
        }
    }
}

/// Errors scoped to a single packet. The decoder logs and discards them.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("field {index} is not a hex byte: {token:?}")]
    FieldParse { index: usize, token: String },
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Failure reported by a byte source.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("byte source closed")]
    Closed,
    #[error("byte source failure: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_sensor_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.revolution_size, 360);
        assert_eq!(config.proximity_gate_mm, 5000);
        assert_eq!(config.expiry_secs, 1.0);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{"proximity_gate_mm": 3000}"#).unwrap();
        assert_eq!(config.proximity_gate_mm, 3000);
        assert_eq!(config.revolution_size, REVOLUTION_SIZE);
    }
}
