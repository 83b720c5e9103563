//! `com.tans.tmediaplayer.player.tMediaPlayer` natives
//!
//! Java serializes every call on one player handle except
//! `requestInterruptNative`, which may come from any thread while a read
//! blocks.

use super::util::{
  InterruptibleHandle, copy_to_java, handle_mut, handle_ref, into_handle, java_string,
  new_java_string, new_java_string_array, null_handle, opt_result, release_handle, to_jboolean,
};
use crate::player::{
  AudioBuffer, AudioOutputConfig, DecodeResult, MediaInfo, MediaPlayerContext, PacketHandle,
  PrepareConfig, SubtitleBuffer, VideoBuffer,
};
use jni::objects::{GlobalRef, JByteArray, JObject, JString};
use jni::sys::{jboolean, jdouble, jint, jlong, jobjectArray, jstring, JNI_FALSE};
use jni::JNIEnv;
use std::os::raw::c_void;
use std::ptr::NonNull;

/// Native side of one `tMediaPlayer`
struct PlayerSession {
  context: MediaPlayerContext,
  /// Keeps the output Surface alive while MediaCodec renders into it
  surface: Option<GlobalRef>,
}

type PlayerHandle = InterruptibleHandle<PlayerSession>;

unsafe fn player_session<'a>(handle: jlong) -> Option<&'a mut PlayerSession> {
  unsafe { handle_ref::<PlayerHandle>(handle).map(|h| h.inner_mut()) }
}

fn with_context<R>(handle: jlong, f: impl FnOnce(&mut MediaPlayerContext) -> R) -> Option<R> {
  unsafe { player_session(handle) }.map(|s| f(&mut s.context))
}

fn with_info<R>(handle: jlong, default: R, f: impl FnOnce(&MediaInfo) -> R) -> R {
  unsafe { player_session(handle) }
    .and_then(|s| s.context.info())
    .map_or(default, f)
}

fn with_buffer<T, R>(handle: jlong, default: R, f: impl FnOnce(&mut T) -> R) -> R {
  unsafe { handle_mut::<T>(handle) }.map_or(default, f)
}

/// Run a decode-family call that needs a context and a packet
fn decode_with(
  player: jlong,
  packet: jlong,
  f: impl FnOnce(&mut MediaPlayerContext, &mut PacketHandle) -> DecodeResult,
) -> jint {
  let (Some(session), Some(packet)) =
    (unsafe { player_session(player) }, unsafe { handle_mut::<PacketHandle>(packet) })
  else {
    tracing::error!(target: "tmedia", "Decode called with a null handle");
    return DecodeResult::DecodeFail.as_raw();
  };
  f(&mut session.context, packet).as_raw()
}

// ============================================================================
// Lifecycle
// ============================================================================

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_createPlayerNative(
  _env: JNIEnv,
  _this: JObject,
) -> jlong {
  let context = MediaPlayerContext::new();
  let interrupt = context.interrupt_flag();
  let session = PlayerSession {
    context,
    surface: None,
  };
  into_handle(PlayerHandle::new(session, interrupt))
}

#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_prepareNative(
  mut env: JNIEnv,
  _this: JObject,
  player: jlong,
  file_path: JString,
  request_hw: jboolean,
  target_audio_channels: jint,
  target_audio_sample_rate: jint,
  target_audio_sample_bit_depth: jint,
  surface: JObject,
) -> jint {
  let Some(session) = (unsafe { player_session(player) }) else {
    return null_handle("prepare");
  };
  let Some(path) = java_string(&mut env, &file_path) else {
    return null_handle("prepare(path)");
  };

  session.context.release();
  session.surface = None;
  if !surface.is_null() {
    match env.new_global_ref(&surface) {
      Ok(global) => session.surface = Some(global),
      Err(e) => tracing::warn!(target: "tmedia", "Surface unusable, decoding to memory: {}", e),
    }
  }
  let surface_ptr = session
    .surface
    .as_ref()
    .and_then(|s| NonNull::new(s.as_obj().as_raw() as *mut c_void));

  let config = PrepareConfig {
    request_hw: request_hw != JNI_FALSE,
    audio: AudioOutputConfig {
      channels: target_audio_channels.max(0) as u32,
      sample_rate: target_audio_sample_rate.max(0) as u32,
      bit_depth: target_audio_sample_bit_depth.max(0) as u32,
    },
    ..PrepareConfig::default()
  };
  let result = session.context.prepare(&path, &config, surface_ptr);
  if result.is_err() {
    session.surface = None;
  }
  opt_result("prepare", result)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_requestInterruptNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) {
  if let Some(handle) = unsafe { handle_ref::<PlayerHandle>(player) } {
    handle.set_interrupted(true);
  }
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_resetInterruptNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) {
  if let Some(handle) = unsafe { handle_ref::<PlayerHandle>(player) } {
    handle.set_interrupted(false);
  }
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_releaseNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) {
  unsafe { release_handle::<PlayerHandle>(player) };
}

// ============================================================================
// Media info
// ============================================================================

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_durationNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jlong {
  with_info(player, 0, |i| i.duration_ms)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_containVideoStreamNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jboolean {
  to_jboolean(with_info(player, false, |i| i.video.is_some()))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_containAudioStreamNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jboolean {
  to_jboolean(with_info(player, false, |i| i.audio.is_some()))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_containSubtitleStreamNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jboolean {
  to_jboolean(with_info(player, false, |i| !i.subtitles.is_empty()))
}

/// Metadata as a flat `[key0, value0, key1, value1, ...]` array
#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getMetadataNative(
  mut env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jobjectArray {
  let Some(info) = unsafe { player_session(player) }.and_then(|s| s.context.info()) else {
    return new_java_string_array(&mut env, std::iter::empty());
  };
  let flat: Vec<&str> = info
    .metadata
    .iter()
    .flat_map(|(k, v)| [k.as_str(), v.as_str()])
    .collect();
  new_java_string_array(&mut env, flat.into_iter())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getContainerFormatNameNative(
  mut env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jstring {
  let name = with_info(player, None, |i| i.container_format.clone());
  new_java_string(&mut env, name.as_deref())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_videoWidthNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_info(player, 0, |i| i.video.as_ref().map_or(0, |v| v.width as jint))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_videoHeightNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_info(player, 0, |i| i.video.as_ref().map_or(0, |v| v.height as jint))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_videoFpsNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jdouble {
  with_info(player, 0.0, |i| i.video.as_ref().map_or(0.0, |v| v.fps))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_videoBitrateNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_info(player, 0, |i| i.video.as_ref().map_or(0, |v| v.bit_rate as jint))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_videoDurationNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jlong {
  with_info(player, 0, |i| i.video.as_ref().map_or(0, |v| v.duration_ms))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_videoCodecIdNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_info(player, 0, |i| i.video.as_ref().map_or(0, |v| v.codec_id.as_raw()))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_videoPixelFormatNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_info(player, -1, |i| i.video.as_ref().map_or(-1, |v| v.pixel_format.as_raw()))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_videoDisplayRotationNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_info(player, 0, |i| i.video.as_ref().map_or(0, |v| v.rotation))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_videoStreamIsAttachmentNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jboolean {
  to_jboolean(with_info(player, false, |i| i.video.as_ref().is_some_and(|v| v.attachment)))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_isVideoHwDecodeNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jboolean {
  to_jboolean(with_info(player, false, |i| i.video.as_ref().is_some_and(|v| v.hardware)))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_audioChannelsNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_info(player, 0, |i| i.audio.as_ref().map_or(0, |a| a.channels as jint))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_audioSampleRateNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_info(player, 0, |i| i.audio.as_ref().map_or(0, |a| a.sample_rate as jint))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_audioPerSampleBytesNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_info(player, 0, |i| i.audio.as_ref().map_or(0, |a| a.bytes_per_sample as jint))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_audioSampleBitDepthNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_info(player, 0, |i| i.audio.as_ref().map_or(0, |a| a.bit_depth as jint))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_audioBitrateNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_info(player, 0, |i| i.audio.as_ref().map_or(0, |a| a.bit_rate as jint))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_audioDurationNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jlong {
  with_info(player, 0, |i| i.audio.as_ref().map_or(0, |a| a.duration_ms))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_audioCodecIdNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_info(player, 0, |i| i.audio.as_ref().map_or(0, |a| a.codec_id.as_raw()))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_subtitleStreamCountNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_info(player, 0, |i| i.subtitles.len() as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_subtitleStreamLanguageNative(
  mut env: JNIEnv,
  _this: JObject,
  player: jlong,
  position: jint,
) -> jstring {
  let language = with_info(player, None, |i| {
    usize::try_from(position)
      .ok()
      .and_then(|p| i.subtitles.get(p))
      .and_then(|s| s.language.clone())
  });
  new_java_string(&mut env, language.as_deref())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_subtitleStreamTitleNative(
  mut env: JNIEnv,
  _this: JObject,
  player: jlong,
  position: jint,
) -> jstring {
  let title = with_info(player, None, |i| {
    usize::try_from(position)
      .ok()
      .and_then(|p| i.subtitles.get(p))
      .and_then(|s| s.title.clone())
  });
  new_java_string(&mut env, title.as_deref())
}

/// A negative position turns subtitles off
#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_selectSubtitleStreamNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
  position: jint,
) -> jint {
  let position = usize::try_from(position).ok();
  with_context(player, |c| {
    opt_result("selectSubtitleStream", c.select_subtitle_stream(position))
  })
  .unwrap_or_else(|| null_handle("selectSubtitleStream"))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_selectedSubtitleStreamNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  unsafe { player_session(player) }
    .and_then(|s| s.context.selected_subtitle_stream())
    .map_or(-1, |p| p as jint)
}

// ============================================================================
// Packets
// ============================================================================

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_readPacketNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
  packet: jlong,
) -> jint {
  let (Some(session), Some(packet)) =
    (unsafe { player_session(player) }, unsafe { handle_mut::<PacketHandle>(packet) })
  else {
    tracing::error!(target: "tmedia", "readPacket called with a null handle");
    return DecodeResult::ReadFail.as_raw();
  };
  session.context.read_packet(packet).as_raw()
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_seekToNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
  position_ms: jlong,
) -> jint {
  with_context(player, |c| opt_result("seekTo", c.seek_to(position_ms)))
    .unwrap_or_else(|| null_handle("seekTo"))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_allocPacketNative(
  _env: JNIEnv,
  _this: JObject,
) -> jlong {
  match PacketHandle::new() {
    Ok(packet) => into_handle(packet),
    Err(e) => {
      tracing::error!(target: "tmedia", "allocPacket failed: {}", e);
      0
    }
  }
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_releasePacketNative(
  _env: JNIEnv,
  _this: JObject,
  packet: jlong,
) {
  unsafe { release_handle::<PacketHandle>(packet) };
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getPacketPtsNative(
  _env: JNIEnv,
  _this: JObject,
  packet: jlong,
) -> jlong {
  with_buffer(packet, 0, |p: &mut PacketHandle| p.pts_ms())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getPacketDurationNative(
  _env: JNIEnv,
  _this: JObject,
  packet: jlong,
) -> jlong {
  with_buffer(packet, 0, |p: &mut PacketHandle| p.duration_ms())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getPacketBytesSizeNative(
  _env: JNIEnv,
  _this: JObject,
  packet: jlong,
) -> jint {
  with_buffer(packet, 0, |p: &mut PacketHandle| p.size() as jint)
}

// ============================================================================
// Video
// ============================================================================

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_decodeVideoNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
  packet: jlong,
) -> jint {
  decode_with(player, packet, |c, p| c.decode_video(p))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_flushVideoCodecBufferNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_context(player, |c| opt_result("flushVideo", c.flush_video()))
    .unwrap_or_else(|| null_handle("flushVideo"))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_allocVideoBufferNative(
  _env: JNIEnv,
  _this: JObject,
) -> jlong {
  into_handle(VideoBuffer::new())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_releaseVideoBufferNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) {
  unsafe { release_handle::<VideoBuffer>(buffer) };
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_moveDecodedVideoFrameToBufferNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
  buffer: jlong,
) -> jint {
  let (Some(session), Some(buffer)) =
    (unsafe { player_session(player) }, unsafe { handle_mut::<VideoBuffer>(buffer) })
  else {
    return null_handle("moveDecodedVideoFrameToBuffer");
  };
  opt_result("moveDecodedVideoFrameToBuffer", session.context.move_video_frame_to_buffer(buffer))
}

/// Render (or drop) the MediaCodec output held by a video buffer
#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_releaseHwBufferNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
  render: jboolean,
) -> jint {
  let released = with_buffer(buffer, false, |b: &mut VideoBuffer| {
    b.release_hw_buffer(render != JNI_FALSE)
  });
  opt_result::<(), &str>(
    "releaseHwBuffer",
    if released { Ok(()) } else { Err("no MediaCodec buffer held") },
  )
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoPtsNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jlong {
  with_buffer(buffer, 0, |b: &mut VideoBuffer| b.pts_ms)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoDurationNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jlong {
  with_buffer(buffer, 0, |b: &mut VideoBuffer| b.duration_ms)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoWidthNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jint {
  with_buffer(buffer, 0, |b: &mut VideoBuffer| b.width as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoHeightNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jint {
  with_buffer(buffer, 0, |b: &mut VideoBuffer| b.height as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoFrameTypeNativeInt(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jint {
  with_buffer(buffer, crate::player::ImageRawType::Unknown.as_raw(), |b: &mut VideoBuffer| {
    b.raw_type.as_raw()
  })
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoFrameRgbaSizeNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jint {
  with_buffer(buffer, 0, |b: &mut VideoBuffer| b.rgba.content_size() as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoFrameRgbaBytesNative(
  mut env: JNIEnv,
  _this: JObject,
  buffer: jlong,
  bytes: JByteArray,
) {
  with_buffer(buffer, (), |b: &mut VideoBuffer| copy_to_java(&mut env, b.rgba.content(), &bytes));
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoFrameYSizeNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jint {
  with_buffer(buffer, 0, |b: &mut VideoBuffer| b.y.content_size() as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoFrameYBytesNative(
  mut env: JNIEnv,
  _this: JObject,
  buffer: jlong,
  bytes: JByteArray,
) {
  with_buffer(buffer, (), |b: &mut VideoBuffer| copy_to_java(&mut env, b.y.content(), &bytes));
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoFrameUSizeNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jint {
  with_buffer(buffer, 0, |b: &mut VideoBuffer| b.u.content_size() as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoFrameUBytesNative(
  mut env: JNIEnv,
  _this: JObject,
  buffer: jlong,
  bytes: JByteArray,
) {
  with_buffer(buffer, (), |b: &mut VideoBuffer| copy_to_java(&mut env, b.u.content(), &bytes));
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoFrameVSizeNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jint {
  with_buffer(buffer, 0, |b: &mut VideoBuffer| b.v.content_size() as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoFrameVBytesNative(
  mut env: JNIEnv,
  _this: JObject,
  buffer: jlong,
  bytes: JByteArray,
) {
  with_buffer(buffer, (), |b: &mut VideoBuffer| copy_to_java(&mut env, b.v.content(), &bytes));
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoFrameUVSizeNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jint {
  with_buffer(buffer, 0, |b: &mut VideoBuffer| b.uv.content_size() as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getVideoFrameUVBytesNative(
  mut env: JNIEnv,
  _this: JObject,
  buffer: jlong,
  bytes: JByteArray,
) {
  with_buffer(buffer, (), |b: &mut VideoBuffer| copy_to_java(&mut env, b.uv.content(), &bytes));
}

// ============================================================================
// Audio
// ============================================================================

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_decodeAudioNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
  packet: jlong,
) -> jint {
  decode_with(player, packet, |c, p| c.decode_audio(p))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_flushAudioCodecBufferNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_context(player, |c| opt_result("flushAudio", c.flush_audio()))
    .unwrap_or_else(|| null_handle("flushAudio"))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_allocAudioBufferNative(
  _env: JNIEnv,
  _this: JObject,
) -> jlong {
  into_handle(AudioBuffer::new())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_releaseAudioBufferNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) {
  unsafe { release_handle::<AudioBuffer>(buffer) };
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_moveDecodedAudioFrameToBufferNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
  buffer: jlong,
) -> jint {
  let (Some(session), Some(buffer)) =
    (unsafe { player_session(player) }, unsafe { handle_mut::<AudioBuffer>(buffer) })
  else {
    return null_handle("moveDecodedAudioFrameToBuffer");
  };
  opt_result("moveDecodedAudioFrameToBuffer", session.context.move_audio_frame_to_buffer(buffer))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getAudioPtsNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jlong {
  with_buffer(buffer, 0, |b: &mut AudioBuffer| b.pts_ms)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getAudioDurationNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jlong {
  with_buffer(buffer, 0, |b: &mut AudioBuffer| b.duration_ms)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getAudioFrameSizeNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jint {
  with_buffer(buffer, 0, |b: &mut AudioBuffer| b.pcm.content_size() as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getAudioFrameBytesNative(
  mut env: JNIEnv,
  _this: JObject,
  buffer: jlong,
  bytes: JByteArray,
) {
  with_buffer(buffer, (), |b: &mut AudioBuffer| copy_to_java(&mut env, b.pcm.content(), &bytes));
}

// ============================================================================
// Subtitles
// ============================================================================

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_decodeSubtitleNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
  packet: jlong,
) -> jint {
  decode_with(player, packet, |c, p| c.decode_subtitle(p))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_flushSubtitleCodecBufferNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
) -> jint {
  with_context(player, |c| opt_result("flushSubtitle", c.flush_subtitle()))
    .unwrap_or_else(|| null_handle("flushSubtitle"))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_allocSubtitleBufferNative(
  _env: JNIEnv,
  _this: JObject,
) -> jlong {
  into_handle(SubtitleBuffer::new())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_releaseSubtitleBufferNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) {
  unsafe { release_handle::<SubtitleBuffer>(buffer) };
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_moveDecodedSubtitleFrameToBufferNative(
  _env: JNIEnv,
  _this: JObject,
  player: jlong,
  buffer: jlong,
) -> jint {
  let (Some(session), Some(buffer)) =
    (unsafe { player_session(player) }, unsafe { handle_mut::<SubtitleBuffer>(buffer) })
  else {
    return null_handle("moveDecodedSubtitleFrameToBuffer");
  };
  opt_result(
    "moveDecodedSubtitleFrameToBuffer",
    session.context.move_subtitle_frame_to_buffer(buffer),
  )
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getSubtitleStartPtsNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jlong {
  with_buffer(buffer, 0, |b: &mut SubtitleBuffer| b.start_ms)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getSubtitleEndPtsNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jlong {
  with_buffer(buffer, 0, |b: &mut SubtitleBuffer| b.end_ms)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getSubtitleWidthNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jint {
  with_buffer(buffer, 0, |b: &mut SubtitleBuffer| b.width as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getSubtitleHeightNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jint {
  with_buffer(buffer, 0, |b: &mut SubtitleBuffer| b.height as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getSubtitleTextNative(
  mut env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jstring {
  let text = with_buffer(buffer, None, |b: &mut SubtitleBuffer| Some(b.text.clone()));
  new_java_string(&mut env, text.as_deref())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getSubtitleFrameRgbaSizeNative(
  _env: JNIEnv,
  _this: JObject,
  buffer: jlong,
) -> jint {
  with_buffer(buffer, 0, |b: &mut SubtitleBuffer| b.rgba.content_size() as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_tMediaPlayer_getSubtitleFrameRgbaBytesNative(
  mut env: JNIEnv,
  _this: JObject,
  buffer: jlong,
  bytes: JByteArray,
) {
  with_buffer(buffer, (), |b: &mut SubtitleBuffer| {
    copy_to_java(&mut env, b.rgba.content(), &bytes)
  });
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_null_handles_fail_without_crashing() {
    assert_eq!(with_info(0, -1i64, |i| i.duration_ms), -1);
    assert!(with_context(0, |_| ()).is_none());
    assert_eq!(
      decode_with(0, 0, |c, p| c.decode_video(p)),
      DecodeResult::DecodeFail.as_raw()
    );
  }

  #[test]
  fn test_unprepared_player_handle() {
    let context = MediaPlayerContext::new();
    let interrupt = context.interrupt_flag();
    let session = PlayerSession {
      context,
      surface: None,
    };
    let handle = into_handle(PlayerHandle::new(session, interrupt));
    assert_eq!(with_info(handle, 7i64, |i| i.duration_ms), 7);
    let seek = with_context(handle, |c| opt_result("seekTo", c.seek_to(0)));
    assert_eq!(seek, Some(1));

    unsafe {
      let shared = handle_ref::<PlayerHandle>(handle).unwrap();
      shared.set_interrupted(true);
      assert!(shared.is_interrupted());
      release_handle::<PlayerHandle>(handle);
    }
  }

  #[test]
  fn test_buffer_getters() {
    let handle = into_handle(AudioBuffer::new());
    with_buffer(handle, (), |b: &mut AudioBuffer| {
      b.pts_ms = 40;
      b.pcm.fill_from(&[1, 2, 3, 4]);
    });
    assert_eq!(with_buffer(handle, 0, |b: &mut AudioBuffer| b.pts_ms), 40);
    assert_eq!(with_buffer(handle, 0, |b: &mut AudioBuffer| b.pcm.content_size()), 4);
    unsafe { release_handle::<AudioBuffer>(handle) };
    assert_eq!(with_buffer(0, -1, |b: &mut AudioBuffer| b.pts_ms), -1);
  }
}
