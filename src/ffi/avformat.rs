//! libavformat function declarations
//!
//! Provides demuxing functionality for container formats.

use super::types::*;
use std::os::raw::{c_char, c_int, c_void};

/// I/O interrupt callback
///
/// Returning non-zero aborts the blocking operation with AVERROR_EXIT.
pub type InterruptCallbackFn = unsafe extern "C" fn(opaque: *mut c_void) -> c_int;

unsafe extern "C" {
  /// Allocate an AVFormatContext
  ///
  /// Must be freed with avformat_free_context() or avformat_close_input()
  pub fn avformat_alloc_context() -> *mut AVFormatContext;

  /// Free an AVFormatContext and all its streams
  pub fn avformat_free_context(ctx: *mut AVFormatContext);

  /// Open an input stream and read the header
  ///
  /// On failure the user-supplied context is freed and `*ps` is set to NULL.
  pub fn avformat_open_input(
    ps: *mut *mut AVFormatContext,
    url: *const c_char,
    fmt: *const AVInputFormat,
    options: *mut *mut AVDictionary,
  ) -> c_int;

  /// Close an opened input AVFormatContext
  ///
  /// Frees the context and all its contents and sets *s to NULL.
  pub fn avformat_close_input(s: *mut *mut AVFormatContext);

  /// Read packets of a media file to get stream information
  pub fn avformat_find_stream_info(
    ic: *mut AVFormatContext,
    options: *mut *mut AVDictionary,
  ) -> c_int;

  /// Return the next frame of a stream
  ///
  /// # Returns
  /// * 0 on success
  /// * AVERROR_EOF at end of file
  /// * Negative AVERROR on error
  pub fn av_read_frame(s: *mut AVFormatContext, pkt: *mut AVPacket) -> c_int;

  /// Seek to timestamp with min/max constraints
  ///
  /// With `stream_index == -1` the timestamps are in AV_TIME_BASE units.
  pub fn avformat_seek_file(
    s: *mut AVFormatContext,
    stream_index: c_int,
    min_ts: i64,
    ts: i64,
    max_ts: i64,
    flags: c_int,
  ) -> c_int;
}

// ============================================================================
// Constants
// ============================================================================

/// Seek flags
pub mod seek_flag {
  use std::os::raw::c_int;

  /// Seek backward
  pub const BACKWARD: c_int = 1;
  /// Seeking based on position in bytes
  pub const BYTE: c_int = 2;
  /// Seek to any frame (not just keyframes)
  pub const ANY: c_int = 4;
}

/// Media types (AVMediaType)
pub mod media_type {
  use std::os::raw::c_int;

  pub const UNKNOWN: c_int = -1;
  pub const VIDEO: c_int = 0;
  pub const AUDIO: c_int = 1;
  pub const DATA: c_int = 2;
  pub const SUBTITLE: c_int = 3;
  pub const ATTACHMENT: c_int = 4;
}

/// Stream discard levels (AVDiscard)
pub mod discard {
  use std::os::raw::c_int;

  pub const DEFAULT: c_int = 0;
  pub const ALL: c_int = 48;
}
