pub mod extrema;
pub mod revolution;
pub mod tracker;

pub use extrema::{find_extrema, Extrema};
pub use revolution::RevolutionBuffer;
pub use tracker::{estimate_speed, ObjectTracker, TrackedObject, TrackerUpdate};
