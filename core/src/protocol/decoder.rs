use crate::prelude::{DecodeError, DecodeResult, FRAME_FIELDS, START_MARKER};
use crate::protocol::frame::{DecodedFrame, RawByteFrame};

/// Bytes accumulated without a new marker before the frame is abandoned.
const MAX_PENDING: usize = FRAME_FIELDS * 4;

/// Byte-at-a-time framing state machine.
///
/// Every start marker closes the frame in progress (if any) and opens a new one,
/// so a malformed packet never affects the packets that follow it.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    frame: RawByteFrame,
    started: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one byte. Returns the outcome of the previous frame when `byte`
    /// starts a new one.
    pub fn push_byte(&mut self, byte: u8) -> Option<DecodeResult<DecodedFrame>> {
        if byte == START_MARKER {
            let completed = self.started.then(|| self.frame.decode());
            self.frame.clear();
            self.frame.push(START_MARKER);
            self.started = true;
            return completed;
        }

        if !self.started {
            return None;
        }

        self.frame.push(byte);
        if self.frame.len() > MAX_PENDING {
            let len = self.frame.len();
            self.reset();
            return Some(Err(DecodeError::InvalidFrame(format!(
                "no start marker after {} bytes",
                len
            ))));
        }
        None
    }

    /// Decodes whatever is pending, e.g. when the source closes.
    pub fn flush(&mut self) -> Option<DecodeResult<DecodedFrame>> {
        let completed = self.started.then(|| self.frame.decode());
        self.reset();
        completed
    }

    /// The frame collected so far, including its marker.
    pub fn pending(&self) -> &RawByteFrame {
        &self.frame
    }

    pub fn reset(&mut self) {
        self.frame.clear();
        self.started = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::Sample;

    fn packet(index: u8, distances: [u16; 4], quality: u16) -> Vec<u8> {
        let readings =
            std::array::from_fn(|i| Sample::new(index as u16 * 4 + i as u16, distances[i], quality));
        RawByteFrame::encode(index, 300.0, &readings)
            .as_bytes()
            .to_vec()
    }

    fn feed(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<DecodeResult<DecodedFrame>> {
        bytes
            .iter()
            .filter_map(|&byte| decoder.push_byte(byte))
            .collect()
    }

    #[test]
    fn frame_is_emitted_when_next_marker_arrives() {
        let mut decoder = FrameDecoder::new();
        let first = feed(&mut decoder, &packet(0, [1000, 1100, 1200, 1300], 5));
        assert!(first.is_empty());

        let second = feed(&mut decoder, &packet(1, [1400, 1500, 1600, 1700], 5));
        assert_eq!(second.len(), 1);
        let frame = second[0].as_ref().unwrap();
        assert_eq!(frame.valid_samples().count(), 4);
        assert_eq!(frame.readings[3].distance_mm, 1300);

        let last = decoder.flush().unwrap().unwrap();
        assert_eq!(last.readings[0].angle, 4);
        assert!(decoder.flush().is_none());
    }

    #[test]
    fn leading_noise_before_first_marker_is_ignored() {
        let mut decoder = FrameDecoder::new();
        let mut bytes = vec![0x01, 0x02, 0x03];
        bytes.extend(packet(2, [900; 4], 1));
        assert!(feed(&mut decoder, &bytes).is_empty());
        assert_eq!(decoder.pending().len(), FRAME_FIELDS);
    }

    #[test]
    fn malformed_frame_does_not_disturb_the_next_one() {
        let mut decoder = FrameDecoder::new();
        let mut bytes = packet(0, [1000; 4], 3);
        bytes.extend_from_slice(&[START_MARKER, 0xA1, 0x00]);
        bytes.extend(packet(2, [2000; 4], 3));
        bytes.extend(packet(3, [3000; 4], 3));

        let outcomes = feed(&mut decoder, &bytes);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1], Err(DecodeError::InvalidFrame(_))));
        let recovered = outcomes[2].as_ref().unwrap();
        assert_eq!(recovered.index, 2);
        assert_eq!(recovered.readings[0].distance_mm, 2000);
    }

    #[test]
    fn overlong_frame_is_abandoned_until_next_marker() {
        let mut decoder = FrameDecoder::new();
        decoder.push_byte(START_MARKER);
        let mut outcomes = Vec::new();
        for _ in 0..MAX_PENDING {
            outcomes.extend(decoder.push_byte(0x11));
        }
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_err());
        assert!(decoder.pending().is_empty());

        let outcomes = feed(&mut decoder, &packet(4, [1500; 4], 2));
        assert!(outcomes.is_empty());
        assert!(decoder.flush().unwrap().is_ok());
    }
}
