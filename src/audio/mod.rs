//! Audio preprocessing and capture
//!
//! Converts raw captured audio into canonical mono 16 kHz PCM, encodes it
//! into the WAV container the remote protocol requires, and defines the
//! capture-source interface the session controller records through.

pub mod capture;
pub mod preprocess;
pub mod wav;

pub use capture::{CaptureSource, ReplayCapture};
pub use preprocess::{decode_and_resample, peak_normalize, resample_linear};
pub use wav::{encode_wav, sample_to_f32, sample_to_i16, TARGET_SAMPLE_RATE};
