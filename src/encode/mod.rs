pub mod ans;
pub mod constants;
pub mod context;
pub mod params;
pub mod predictor;
pub mod scanner;

// Re-export commonly used encoding functionality
pub use params::{CodecParams, RunParams, ThetaQuant};
pub use scanner::{EncodedBlock, decode_block, encode_block};

// Re-export error types for convenience
pub use crate::utils::error::{CodecError, Result};
