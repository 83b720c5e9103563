//! Hand-written FFmpeg, libass and OpenSL ES C bindings (no bindgen)
//!
//! All FFmpeg structs are opaque - we access fields via the thin C accessor library.
//! libass and OpenSL ES structs that are public ABI are declared with their real layout.

pub mod accessors;
pub mod avcodec;
pub mod avformat;
pub mod avutil;
pub mod error;
pub mod libass;
pub mod mediacodec;
#[cfg(target_os = "android")]
pub mod opensles;
pub mod swresample;
pub mod swscale;
pub mod types;

pub use error::{check_error, FFmpegError, FFmpegResult};
pub use types::*;
