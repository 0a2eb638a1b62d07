//! Speech-to-text stage

mod deepgram;

pub use deepgram::{DeepgramConfig, DeepgramStt};
