//! Android MediaCodec and JNI hooks from libavcodec
//!
//! These symbols exist in every libavcodec build; without `--enable-mediacodec`
//! / `--enable-jni` they return AVERROR(ENOSYS), so callers treat any error as
//! "fall back to software decoding".

use super::types::*;
use std::os::raw::{c_int, c_void};

/// Opaque AVMediaCodecContext (created by av_mediacodec_alloc_context)
#[repr(C)]
pub struct AVMediaCodecContext {
  _opaque: [u8; 0],
}

/// Opaque AVMediaCodecBuffer (stored in `frame->data[3]` of MEDIACODEC frames)
#[repr(C)]
pub struct AVMediaCodecBuffer {
  _opaque: [u8; 0],
}

unsafe extern "C" {
  /// Hand the process JavaVM to FFmpeg so MediaCodec wrappers can call Java
  pub fn av_jni_set_java_vm(vm: *mut c_void, log_ctx: *mut c_void) -> c_int;

  /// Allocate a MediaCodec context, freed by av_mediacodec_default_free
  pub fn av_mediacodec_alloc_context() -> *mut AVMediaCodecContext;

  /// Attach `surface` (a JNI global ref to android.view.Surface) to the decoder
  ///
  /// Must be called before avcodec_open2.
  pub fn av_mediacodec_default_init(
    avctx: *mut AVCodecContext,
    ctx: *mut AVMediaCodecContext,
    surface: *mut c_void,
  ) -> c_int;

  /// Free the MediaCodec context attached with av_mediacodec_default_init
  pub fn av_mediacodec_default_free(avctx: *mut AVCodecContext);

  /// Release a decoded MediaCodec buffer, rendering it to the surface if `render` != 0
  pub fn av_mediacodec_release_buffer(buffer: *mut AVMediaCodecBuffer, render: c_int) -> c_int;
}

/// Plane index where FFmpeg stores the AVMediaCodecBuffer of a MEDIACODEC frame
pub const MEDIACODEC_BUFFER_PLANE: c_int = 3;
