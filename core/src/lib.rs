//! Decoding and tracking core for spinning 2D lidar sensors.
//!
//! Bytes from the transport are framed into packets, packets into
//! revolutions, and each revolution updates a short-lived table of points
//! that are getting closer to the sensor.

pub mod interface;
pub mod pipeline;
pub mod prelude;
pub mod processing;
pub mod protocol;
pub mod telemetry;

pub use interface::{ByteSource, Clock, RevolutionReport, RevolutionSink};
pub use pipeline::Pipeline;
pub use prelude::{DecodeError, PipelineConfig, Sample, SourceError};
