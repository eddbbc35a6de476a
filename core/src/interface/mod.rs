pub mod clock;
pub mod sink;
pub mod source;

pub use clock::{Clock, ManualClock, SystemClock};
pub use sink::{RevolutionReport, RevolutionSink};
pub use source::{ByteSource, ReaderSource};
