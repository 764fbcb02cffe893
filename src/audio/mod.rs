mod analyzer;
mod capture;
mod snapshot;

pub use analyzer::SpectrumAnalyzer;
pub use capture::AudioCapture;
pub use snapshot::{AudioSnapshot, COARSE_BINS};
