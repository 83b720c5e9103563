//! libavutil function declarations
//!
//! Provides utility functions for memory, frames, dictionaries and logging.

use super::types::*;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};

unsafe extern "C" {
  // ========================================================================
  // Frame Management
  // ========================================================================

  /// Allocate an AVFrame and set its fields to default values
  pub fn av_frame_alloc() -> *mut AVFrame;

  /// Free the frame and any dynamically allocated objects in it
  pub fn av_frame_free(frame: *mut *mut AVFrame);

  /// Unreference all buffers referenced by frame and reset to defaults
  pub fn av_frame_unref(frame: *mut AVFrame);

  /// Move everything contained in src to dst and reset src
  pub fn av_frame_move_ref(dst: *mut AVFrame, src: *mut AVFrame);

  // ========================================================================
  // Memory Allocation
  // ========================================================================

  /// Allocate a memory block with alignment suitable for all memory accesses
  pub fn av_malloc(size: usize) -> *mut c_void;

  /// Free a memory block which has been allocated with av_malloc
  pub fn av_free(ptr: *mut c_void);

  // ========================================================================
  // Error Handling
  // ========================================================================

  /// Put a description of the AVERROR code errnum in errbuf
  pub fn av_strerror(errnum: c_int, errbuf: *mut c_char, errbuf_size: usize) -> c_int;

  // ========================================================================
  // Time/Timestamp Utilities
  // ========================================================================

  /// Rescale a 64-bit integer by 2 rational numbers
  pub fn av_rescale_q(a: i64, bq: AVRational, cq: AVRational) -> i64;

  // ========================================================================
  // Dictionary
  // ========================================================================

  /// Get a dictionary entry with matching key
  ///
  /// With an empty key and `AV_DICT_IGNORE_SUFFIX` this iterates all entries.
  pub fn av_dict_get(
    m: *const AVDictionary,
    key: *const c_char,
    prev: *const AVDictionaryEntry,
    flags: c_int,
  ) -> *const AVDictionaryEntry;

  // ========================================================================
  // Logging
  // ========================================================================

  /// Set the logging level
  pub fn av_log_set_level(level: c_int);
}

pub mod log_level {
  use std::os::raw::c_int;

  pub const QUIET: c_int = -8;
  pub const ERROR: c_int = 16;
  pub const WARNING: c_int = 24;
  pub const INFO: c_int = 32;
  pub const DEBUG: c_int = 48;
}

pub mod dict_flag {
  use std::os::raw::c_int;

  pub const MATCH_CASE: c_int = 1;
  pub const IGNORE_SUFFIX: c_int = 2;
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Collect all entries of a dictionary as owned key/value pairs
///
/// # Safety
/// `dict` must be null or a valid AVDictionary that outlives the call.
pub unsafe fn dict_entries(dict: *const AVDictionary) -> Vec<(String, String)> {
  let mut entries = Vec::new();
  if dict.is_null() {
    return entries;
  }
  let empty = c"";
  let mut prev: *const AVDictionaryEntry = std::ptr::null();
  loop {
    let entry = unsafe { av_dict_get(dict, empty.as_ptr(), prev, dict_flag::IGNORE_SUFFIX) };
    if entry.is_null() {
      break;
    }
    let (key, value) = unsafe { ((*entry).key, (*entry).value) };
    if !key.is_null() && !value.is_null() {
      entries.push(unsafe {
        (
          CStr::from_ptr(key).to_string_lossy().into_owned(),
          CStr::from_ptr(value).to_string_lossy().into_owned(),
        )
      });
    }
    prev = entry;
  }
  entries
}
