use crate::prelude::SourceError;
use std::io::{ErrorKind, Read};

/// Transport the pipeline pulls bytes from.
///
/// Implementations block for up to their read timeout before answering
/// `Ok(None)`; callers retry immediately. `Err(SourceError::Closed)` ends
/// the stream and any other error is fatal.
pub trait ByteSource {
    fn read_byte(&mut self) -> Result<Option<u8>, SourceError>;
}

/// Buffered adapter over any reader: a serial device node, a capture file or a socket.
pub struct ReaderSource<R> {
    reader: R,
    buffer: Vec<u8>,
    position: usize,
    filled: usize,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, 512)
    }

    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader,
            buffer: vec![0; capacity.max(1)],
            position: 0,
            filled: 0,
        }
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn read_byte(&mut self) -> Result<Option<u8>, SourceError> {
        if self.position == self.filled {
            match self.reader.read(&mut self.buffer) {
                Ok(0) => return Err(SourceError::Closed),
                Ok(count) => {
                    self.position = 0;
                    self.filled = count;
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) =>
                {
                    return Ok(None)
                }
                Err(err) => return Err(SourceError::Io(err)),
            }
        }

        let byte = self.buffer[self.position];
        self.position += 1;
        Ok(Some(byte))
    }
}
