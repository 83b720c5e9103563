//! Rust declarations for C accessor functions
//!
//! These functions provide access to FFmpeg struct fields via the thin C accessor library.

use super::avformat::InterruptCallbackFn;
use super::types::*;
use std::os::raw::{c_char, c_int, c_uint, c_void};

unsafe extern "C" {
  // ========================================================================
  // AVCodecContext
  // ========================================================================

  pub fn ffctx_get_width(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_height(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_pix_fmt(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_codec_id(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_bit_rate(ctx: *const AVCodecContext) -> i64;
  pub fn ffctx_get_sample_rate(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_sample_fmt(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_channels(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_set_thread_count(ctx: *mut AVCodecContext, thread_count: c_int);
  pub fn ffctx_set_pkt_timebase(ctx: *mut AVCodecContext, num: c_int, den: c_int);
  pub fn ffctx_set_audio_format(ctx: *mut AVCodecContext, sample_rate: c_int, channels: c_int);
  pub fn ffctx_get_subtitle_header(ctx: *const AVCodecContext) -> *const u8;
  pub fn ffctx_get_subtitle_header_size(ctx: *const AVCodecContext) -> c_int;

  // ========================================================================
  // AVFrame
  // ========================================================================

  pub fn ffframe_get_width(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_height(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_format(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_pts(frame: *const AVFrame) -> i64;
  pub fn ffframe_get_best_effort_timestamp(frame: *const AVFrame) -> i64;
  pub fn ffframe_get_duration(frame: *const AVFrame) -> i64;
  pub fn ffframe_get_nb_samples(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_sample_rate(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_channels(frame: *const AVFrame) -> c_int;
  pub fn ffframe_data(frame: *mut AVFrame, plane: c_int) -> *mut u8;
  pub fn ffframe_linesize(frame: *const AVFrame, plane: c_int) -> c_int;
  pub fn ffframe_get_extended_data_const(frame: *const AVFrame) -> *const *const u8;

  // ========================================================================
  // AVPacket
  // ========================================================================

  pub fn ffpkt_data(pkt: *const AVPacket) -> *const u8;
  pub fn ffpkt_size(pkt: *const AVPacket) -> c_int;
  pub fn ffpkt_pts(pkt: *const AVPacket) -> i64;
  pub fn ffpkt_dts(pkt: *const AVPacket) -> i64;
  pub fn ffpkt_duration(pkt: *const AVPacket) -> i64;
  pub fn ffpkt_flags(pkt: *const AVPacket) -> c_int;
  pub fn ffpkt_stream_index(pkt: *const AVPacket) -> c_int;

  // ========================================================================
  // AVFormatContext
  // ========================================================================

  pub fn fffmt_get_nb_streams(ctx: *const AVFormatContext) -> c_uint;
  pub fn fffmt_get_stream(ctx: *const AVFormatContext, index: c_uint) -> *mut AVStream;
  pub fn fffmt_get_duration(ctx: *const AVFormatContext) -> i64;
  pub fn fffmt_get_metadata(ctx: *const AVFormatContext) -> *const AVDictionary;
  pub fn fffmt_get_format_name(ctx: *const AVFormatContext) -> *const c_char;
  pub fn fffmt_set_interrupt_callback(
    ctx: *mut AVFormatContext,
    callback: Option<InterruptCallbackFn>,
    opaque: *mut c_void,
  );

  // ========================================================================
  // AVStream
  // ========================================================================

  pub fn ffstream_get_codecpar_const(stream: *const AVStream) -> *const AVCodecParameters;
  pub fn ffstream_get_index(stream: *const AVStream) -> c_int;
  pub fn ffstream_get_time_base(stream: *const AVStream, num: *mut c_int, den: *mut c_int);
  pub fn ffstream_get_avg_frame_rate(stream: *const AVStream, num: *mut c_int, den: *mut c_int);
  pub fn ffstream_get_duration(stream: *const AVStream) -> i64;
  pub fn ffstream_get_disposition(stream: *const AVStream) -> c_int;
  pub fn ffstream_get_metadata(stream: *const AVStream) -> *const AVDictionary;
  pub fn ffstream_set_discard(stream: *mut AVStream, discard: c_int);
  pub fn ffstream_get_display_rotation(stream: *const AVStream) -> f64;

  // ========================================================================
  // AVCodecParameters
  // ========================================================================

  pub fn ffcodecpar_get_codec_type(par: *const AVCodecParameters) -> c_int;
  pub fn ffcodecpar_get_codec_id(par: *const AVCodecParameters) -> c_int;
  pub fn ffcodecpar_get_width(par: *const AVCodecParameters) -> c_int;
  pub fn ffcodecpar_get_height(par: *const AVCodecParameters) -> c_int;
  pub fn ffcodecpar_get_format(par: *const AVCodecParameters) -> c_int;
  pub fn ffcodecpar_get_sample_rate(par: *const AVCodecParameters) -> c_int;
  pub fn ffcodecpar_get_channels(par: *const AVCodecParameters) -> c_int;
  pub fn ffcodecpar_get_bit_rate(par: *const AVCodecParameters) -> i64;
  pub fn ffcodecpar_get_bits_per_raw_sample(par: *const AVCodecParameters) -> c_int;

  // ========================================================================
  // AVSubtitle
  // ========================================================================

  pub fn ffsub_alloc() -> *mut AVSubtitle;
  pub fn ffsub_free(sub: *mut AVSubtitle);
  pub fn ffsub_get_start_display_time(sub: *const AVSubtitle) -> u32;
  pub fn ffsub_get_end_display_time(sub: *const AVSubtitle) -> u32;
  pub fn ffsub_get_pts(sub: *const AVSubtitle) -> i64;
  pub fn ffsub_get_num_rects(sub: *const AVSubtitle) -> c_uint;
  pub fn ffsub_rect_type(sub: *const AVSubtitle, index: c_uint) -> c_int;
  pub fn ffsub_rect_ass(sub: *const AVSubtitle, index: c_uint) -> *const c_char;
  pub fn ffsub_rect_text(sub: *const AVSubtitle, index: c_uint) -> *const c_char;

  // ========================================================================
  // Version-dependent constants
  // ========================================================================

  pub fn ff_pix_fmt_mediacodec() -> c_int;
}
