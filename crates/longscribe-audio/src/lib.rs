pub mod transcoder;

pub use transcoder::{TranscodedAudio, Transcoder};
