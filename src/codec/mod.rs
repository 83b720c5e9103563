//! Safe Rust wrappers for FFmpeg codec operations
//!
//! This module provides RAII wrappers around FFmpeg's C structures,
//! ensuring proper resource cleanup and memory safety.

pub mod context;
pub mod demuxer;
pub mod frame;
pub mod packet;
pub mod resampler;
pub mod scaler;
pub mod subtitle;

pub use context::{CodecContext, ReceiveStatus};
pub use demuxer::{DemuxerContext, MediaType, ReadStatus, StreamInfo};
pub use frame::Frame;
pub use packet::Packet;
pub use resampler::Resampler;
pub use scaler::Scaler;
pub use subtitle::{Subtitle, SubtitleRect};

use crate::ffi::{AVCodecID, AVPixelFormat};

/// Upper bound for decoder threads, more rarely helps on phones
const MAX_DECODER_THREADS: usize = 8;

/// Decoder configuration
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Number of threads (0 for auto)
    pub thread_count: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            thread_count: num_cpus::get().min(MAX_DECODER_THREADS) as u32,
        }
    }
}

/// Codec error type
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] crate::ffi::FFmpegError),

    #[error("Codec not found: {0}")]
    CodecNotFound(String),

    #[error("Decoder not found for codec: {0:?}")]
    DecoderNotFound(AVCodecID),

    #[error("Failed to allocate {0}")]
    AllocationFailed(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unsupported pixel format: {0:?}")]
    UnsupportedPixelFormat(AVPixelFormat),

    #[error("Hardware acceleration error: {0}")]
    HardwareError(String),

    #[error("Subtitle error: {0}")]
    Subtitle(String),
}

pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thread_count_is_capped() {
        let config = DecoderConfig::default();
        assert!(config.thread_count >= 1);
        assert!(config.thread_count as usize <= MAX_DECODER_THREADS);
    }

    #[test]
    fn test_error_messages() {
        let err = CodecError::DecoderNotFound(AVCodecID::Hevc);
        assert_eq!(err.to_string(), "Decoder not found for codec: Hevc");
        let err = CodecError::AllocationFailed("AVFrame");
        assert_eq!(err.to_string(), "Failed to allocate AVFrame");
    }
}
