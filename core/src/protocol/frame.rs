use crate::prelude::{
    DecodeError, DecodeResult, Sample, FRAME_FIELDS, INDEX_BASE, REVOLUTION_SIZE,
    SAMPLES_PER_FRAME, START_MARKER,
};

/// Distance occupies the low 13 bits; the top 3 bits of the high byte are status flags.
const DISTANCE_MASK: u8 = 0x1F;

/// Highest packet number that still yields angles below 360.
const MAX_INDEX: u8 = (REVOLUTION_SIZE / SAMPLES_PER_FRAME) as u8 - 1;

/// Byte fields collected between two start markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawByteFrame {
    fields: Vec<u8>,
}

/// A validated packet: its index, the motor speed and all four readings.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub index: u8,
    pub rpm: f64,
    pub readings: [Sample; SAMPLES_PER_FRAME],
}

impl DecodedFrame {
    /// Readings the sensor marked as usable (`quality > 0`).
    pub fn valid_samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.readings.iter().copied().filter(|s| s.quality > 0)
    }

    pub fn dropped_count(&self) -> usize {
        self.readings.iter().filter(|s| s.quality == 0).count()
    }
}

impl RawByteFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(fields: Vec<u8>) -> Self {
        Self { fields }
    }

    /// Parses the colon-separated capture form, e.g. `fa:a0:2c:4b:...`.
    pub fn from_hex(line: &str) -> DecodeResult<Self> {
        let trimmed = line.trim().trim_end_matches(':');
        if trimmed.is_empty() {
            return Err(DecodeError::InvalidFrame("empty capture line".into()));
        }

        let fields = trimmed
            .split(':')
            .enumerate()
            .map(|(index, token)| {
                u8::from_str_radix(token.trim(), 16).map_err(|_| DecodeError::FieldParse {
                    index,
                    token: token.to_string(),
                })
            })
            .collect::<DecodeResult<Vec<u8>>>()?;

        Ok(Self { fields })
    }

    pub fn to_hex(&self) -> String {
        self.fields
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Builds a packet carrying `readings`. Distances are clipped to 13 bits.
    pub fn encode(index: u8, rpm: f64, readings: &[Sample; SAMPLES_PER_FRAME]) -> Self {
        let speed = (rpm * 64.0).round().clamp(0.0, u16::MAX as f64) as u16;
        let mut fields = Vec::with_capacity(FRAME_FIELDS);
        fields.push(START_MARKER);
        fields.push(INDEX_BASE.wrapping_add(index));
        fields.extend_from_slice(&speed.to_le_bytes());
        for reading in readings {
            let [lo, hi] = reading.distance_mm.to_le_bytes();
            fields.push(lo);
            fields.push(hi & DISTANCE_MASK);
            fields.extend_from_slice(&reading.quality.to_le_bytes());
        }
        fields.push(0);
        Self { fields }
    }

    pub fn push(&mut self, byte: u8) {
        self.fields.push(byte);
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.fields
    }

    /// Validates the marker and index, then extracts the four readings.
    /// Fields past the 21st (checksum) are ignored.
    pub fn decode(&self) -> DecodeResult<DecodedFrame> {
        let fields = &self.fields;
        if fields.len() < FRAME_FIELDS {
            return Err(DecodeError::InvalidFrame(format!(
                "expected {} fields, got {}",
                FRAME_FIELDS,
                fields.len()
            )));
        }
        if fields[0] != START_MARKER {
            return Err(DecodeError::InvalidFrame(format!(
                "start byte {:#04x}",
                fields[0]
            )));
        }

        let index = fields[1]
            .checked_sub(INDEX_BASE)
            .filter(|index| *index <= MAX_INDEX)
            .ok_or_else(|| {
                DecodeError::InvalidFrame(format!("index byte {:#04x} out of range", fields[1]))
            })?;

        let rpm = u16::from_le_bytes([fields[2], fields[3]]) as f64 / 64.0;
        let base_angle = index as u16 * SAMPLES_PER_FRAME as u16;

        let readings = std::array::from_fn(|i| {
            let offset = 4 + 4 * i;
            let distance_mm = u16::from_le_bytes([fields[offset], fields[offset + 1] & DISTANCE_MASK]);
            let quality = u16::from_le_bytes([fields[offset + 2], fields[offset + 3]]);
            Sample::new(base_angle + i as u16, distance_mm, quality)
        });

        Ok(DecodedFrame {
            index,
            rpm,
            readings,
        })
    }
}
