//! Voice activity detection stage

mod energy;

pub use energy::EnergyVad;
