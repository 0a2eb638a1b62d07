//! Turn detection stage

mod hybrid;

pub use hybrid::{HybridTurnDetector, TurnDetectorConfig};
