//! libswresample function declarations
//!
//! Converts decoded audio into the PCM layout the audio track was configured for.

use super::types::*;
use std::os::raw::c_int;

unsafe extern "C" {
  /// Free the given SwrContext and set the pointer to NULL
  pub fn swr_free(s: *mut *mut SwrContext);

  /// Initialize context after setting user parameters
  pub fn swr_init(s: *mut SwrContext) -> c_int;

  /// Allocate and set options in one call (FFmpeg 5.1+)
  #[allow(clippy::too_many_arguments)]
  pub fn swr_alloc_set_opts2(
    ps: *mut *mut SwrContext,
    out_ch_layout: *const AVChannelLayout,
    out_sample_fmt: c_int,
    out_sample_rate: c_int,
    in_ch_layout: *const AVChannelLayout,
    in_sample_fmt: c_int,
    in_sample_rate: c_int,
    log_offset: c_int,
    log_ctx: *mut std::ffi::c_void,
  ) -> c_int;

  /// Initialize a channel layout with a default layout for a given number of channels
  pub fn av_channel_layout_default(ch_layout: *mut AVChannelLayout, nb_channels: c_int);

  /// Free any allocated data in the channel layout and reset it
  pub fn av_channel_layout_uninit(channel_layout: *mut AVChannelLayout);

  /// Convert audio data
  ///
  /// # Notes
  /// - in_count of 0 with a null input flushes remaining samples
  ///
  /// # Returns
  /// Number of samples output per channel, or negative AVERROR code on error
  pub fn swr_convert(
    s: *mut SwrContext,
    out: *mut *mut u8,
    out_count: c_int,
    r#in: *const *const u8,
    in_count: c_int,
  ) -> c_int;

  /// Get the number of samples needed for the next swr_convert call (upper bound)
  pub fn swr_get_out_samples(s: *mut SwrContext, in_samples: c_int) -> c_int;
}
