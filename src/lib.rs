#![deny(clippy::all)]

//! Native media layer for tMediaPlayer
//!
//! FFmpeg demuxing and decoding, libass subtitle rendering and OpenSL ES
//! audio output, exposed to the Android player over JNI.

// FFmpeg, libass and OpenSL ES C bindings (hand-written, no bindgen)
pub mod ffi;

// Safe codec wrappers (RAII)
pub mod codec;

// Demux/decode contexts and frame buffers
pub mod player;

// OpenSL ES output
#[cfg(target_os = "android")]
pub mod audio;

pub mod logging;

// JNI surface
pub mod jni;

pub use player::{
  AudioBuffer, DecodeResult, FrameLoaderContext, ImageRawType, MediaInfo, MediaPlayerContext,
  OptResult, PacketHandle, PlayerError, PlayerResult, SubtitleBuffer, VideoBuffer,
};
