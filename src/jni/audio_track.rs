//! `com.tans.tmediaplayer.player.playerview.audiotrack.tMediaAudioTrack` natives

use super::util::{handle_mut, into_handle, null_handle, opt_result, release_handle};
use crate::audio::{BufferQueueListener, OpenSlAudioTrack};
use crate::player::{AudioBuffer, AudioOutputConfig, OptResult};
use jni::objects::{GlobalRef, JObject};
use jni::sys::{jint, jlong};
use jni::{JNIEnv, JavaVM};

/// Calls `audioTrackQueueCallback()` on the Java track from the OpenSL thread
struct JavaQueueListener {
  vm: &'static JavaVM,
  track: GlobalRef,
}

impl BufferQueueListener for JavaQueueListener {
  fn on_buffer_consumed(&self) {
    // The OpenSL thread is reused for every callback, so it stays attached
    let mut env = match self.vm.attach_current_thread_permanently() {
      Ok(env) => env,
      Err(e) => {
        tracing::warn!(target: "tmedia", "Attach OpenSL thread failed: {}", e);
        return;
      }
    };
    if let Err(e) = env.call_method(&self.track, "audioTrackQueueCallback", "()V", &[]) {
      tracing::warn!(target: "tmedia", "audioTrackQueueCallback failed: {}", e);
      if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
      }
    }
  }
}

fn with_track<R>(
  handle: jlong,
  op: &str,
  f: impl FnOnce(&mut OpenSlAudioTrack) -> R,
) -> Option<R> {
  let track = unsafe { handle_mut::<OpenSlAudioTrack>(handle) };
  if track.is_none() {
    null_handle(op);
  }
  track.map(f)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_playerview_audiotrack_tMediaAudioTrack_createAudioTrackNative(
  env: JNIEnv,
  this: JObject,
) -> jlong {
  let listener: Option<Box<dyn BufferQueueListener>> =
    match (super::java_vm(), env.new_global_ref(&this)) {
      (Some(vm), Ok(track)) => Some(Box::new(JavaQueueListener { vm, track })),
      (None, _) => {
        tracing::error!(target: "tmedia", "JNI_OnLoad did not run, no audio track callback");
        None
      }
      (_, Err(e)) => {
        tracing::error!(target: "tmedia", "Audio track callback unavailable: {}", e);
        None
      }
    };
  into_handle(OpenSlAudioTrack::new(listener))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_playerview_audiotrack_tMediaAudioTrack_prepareNative(
  _env: JNIEnv,
  _this: JObject,
  track: jlong,
  buffer_queue_size: jint,
  output_channels: jint,
  output_sample_rate: jint,
  output_sample_bit_depth: jint,
) -> jint {
  let config = AudioOutputConfig {
    channels: output_channels.max(0) as u32,
    sample_rate: output_sample_rate.max(0) as u32,
    bit_depth: output_sample_bit_depth.max(0) as u32,
  };
  let queue_size = buffer_queue_size.max(0) as u32;
  with_track(track, "audio track prepare", |t| {
    opt_result("audio track prepare", t.prepare(&config, queue_size))
  })
  .unwrap_or(OptResult::OptFail.as_raw())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_playerview_audiotrack_tMediaAudioTrack_playNative(
  _env: JNIEnv,
  _this: JObject,
  track: jlong,
) -> jint {
  with_track(track, "play", |t| opt_result("play", t.play()))
    .unwrap_or(OptResult::OptFail.as_raw())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_playerview_audiotrack_tMediaAudioTrack_pauseNative(
  _env: JNIEnv,
  _this: JObject,
  track: jlong,
) -> jint {
  with_track(track, "pause", |t| opt_result("pause", t.pause()))
    .unwrap_or(OptResult::OptFail.as_raw())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_playerview_audiotrack_tMediaAudioTrack_stopNative(
  _env: JNIEnv,
  _this: JObject,
  track: jlong,
) -> jint {
  with_track(track, "stop", |t| opt_result("stop", t.stop()))
    .unwrap_or(OptResult::OptFail.as_raw())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_playerview_audiotrack_tMediaAudioTrack_enqueueBufferNative(
  _env: JNIEnv,
  _this: JObject,
  track: jlong,
  buffer: jlong,
) -> jint {
  let Some(buffer) = (unsafe { handle_mut::<AudioBuffer>(buffer) }) else {
    return null_handle("enqueueBuffer(buffer)");
  };
  with_track(track, "enqueueBuffer", |t| {
    opt_result("enqueueBuffer", t.enqueue_buffer(buffer))
  })
  .unwrap_or(OptResult::OptFail.as_raw())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_playerview_audiotrack_tMediaAudioTrack_clearBuffersNative(
  _env: JNIEnv,
  _this: JObject,
  track: jlong,
) -> jint {
  with_track(track, "clearBuffers", |t| opt_result("clearBuffers", t.clear_buffers()))
    .unwrap_or(OptResult::OptFail.as_raw())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_playerview_audiotrack_tMediaAudioTrack_getBufferQueueCountNative(
  _env: JNIEnv,
  _this: JObject,
  track: jlong,
) -> jint {
  let count = with_track(track, "getBufferQueueCount", |t| t.buffer_queue_count());
  match count {
    Some(Ok(count)) => count as jint,
    Some(Err(e)) => {
      tracing::error!(target: "tmedia", "getBufferQueueCount failed: {}", e);
      0
    }
    None => 0,
  }
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_player_playerview_audiotrack_tMediaAudioTrack_releaseNative(
  _env: JNIEnv,
  _this: JObject,
  track: jlong,
) {
  unsafe { release_handle::<OpenSlAudioTrack>(track) };
}
