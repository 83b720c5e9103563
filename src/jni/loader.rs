//! `com.tans.tmediaplayer.frameloader.tMediaFrameLoader` natives

use super::util::{
  InterruptibleHandle, copy_to_java, handle_ref, into_handle, java_string, null_handle,
  opt_result, release_handle,
};
use crate::player::{FrameLoaderContext, LoaderConfig};
use jni::objects::{JByteArray, JObject, JString};
use jni::sys::{jboolean, jint, jlong, JNI_FALSE};
use jni::JNIEnv;

type LoaderHandle = InterruptibleHandle<FrameLoaderContext>;

unsafe fn loader<'a>(handle: jlong) -> Option<&'a mut FrameLoaderContext> {
  unsafe { handle_ref::<LoaderHandle>(handle).map(|h| h.inner_mut()) }
}

fn with_loader<R>(handle: jlong, default: R, f: impl FnOnce(&mut FrameLoaderContext) -> R) -> R {
  unsafe { loader(handle) }.map_or(default, f)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_frameloader_tMediaFrameLoader_createFrameLoaderNative(
  _env: JNIEnv,
  _this: JObject,
) -> jlong {
  let context = FrameLoaderContext::new();
  let interrupt = context.interrupt_flag();
  into_handle(LoaderHandle::new(context, interrupt))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_frameloader_tMediaFrameLoader_prepareNative(
  mut env: JNIEnv,
  _this: JObject,
  loader_handle: jlong,
  file_path: JString,
) -> jint {
  let Some(context) = (unsafe { loader(loader_handle) }) else {
    return null_handle("loader prepare");
  };
  let Some(path) = java_string(&mut env, &file_path) else {
    return null_handle("loader prepare(path)");
  };
  opt_result("loader prepare", context.prepare(&path, &LoaderConfig::default()))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_frameloader_tMediaFrameLoader_getFrameNative(
  _env: JNIEnv,
  _this: JObject,
  loader_handle: jlong,
  position_ms: jlong,
  need_real_time: jboolean,
) -> jint {
  match unsafe { loader(loader_handle) } {
    Some(c) => opt_result("getFrame", c.get_frame(position_ms, need_real_time != JNI_FALSE)),
    None => null_handle("getFrame"),
  }
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_frameloader_tMediaFrameLoader_durationNative(
  _env: JNIEnv,
  _this: JObject,
  loader_handle: jlong,
) -> jlong {
  with_loader(loader_handle, 0, |c| c.duration_ms())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_frameloader_tMediaFrameLoader_videoWidthNative(
  _env: JNIEnv,
  _this: JObject,
  loader_handle: jlong,
) -> jint {
  with_loader(loader_handle, 0, |c| c.video_size().map_or(0, |(w, _)| w as jint))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_frameloader_tMediaFrameLoader_videoHeightNative(
  _env: JNIEnv,
  _this: JObject,
  loader_handle: jlong,
) -> jint {
  with_loader(loader_handle, 0, |c| c.video_size().map_or(0, |(_, h)| h as jint))
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_frameloader_tMediaFrameLoader_getFrameWidthNative(
  _env: JNIEnv,
  _this: JObject,
  loader_handle: jlong,
) -> jint {
  with_loader(loader_handle, 0, |c| c.width() as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_frameloader_tMediaFrameLoader_getFrameHeightNative(
  _env: JNIEnv,
  _this: JObject,
  loader_handle: jlong,
) -> jint {
  with_loader(loader_handle, 0, |c| c.height() as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_frameloader_tMediaFrameLoader_getFramePtsNative(
  _env: JNIEnv,
  _this: JObject,
  loader_handle: jlong,
) -> jlong {
  with_loader(loader_handle, 0, |c| c.pts_ms())
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_frameloader_tMediaFrameLoader_getFrameRgbaSizeNative(
  _env: JNIEnv,
  _this: JObject,
  loader_handle: jlong,
) -> jint {
  with_loader(loader_handle, 0, |c| c.rgba().len() as jint)
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_frameloader_tMediaFrameLoader_getFrameRgbaBytesNative(
  mut env: JNIEnv,
  _this: JObject,
  loader_handle: jlong,
  bytes: JByteArray,
) {
  with_loader(loader_handle, (), |c| copy_to_java(&mut env, c.rgba(), &bytes));
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_frameloader_tMediaFrameLoader_requestInterruptNative(
  _env: JNIEnv,
  _this: JObject,
  loader_handle: jlong,
) {
  if let Some(handle) = unsafe { handle_ref::<LoaderHandle>(loader_handle) } {
    handle.set_interrupted(true);
  }
}

#[no_mangle]
pub extern "system" fn Java_com_tans_tmediaplayer_frameloader_tMediaFrameLoader_releaseNative(
  _env: JNIEnv,
  _this: JObject,
  loader_handle: jlong,
) {
  unsafe { release_handle::<LoaderHandle>(loader_handle) };
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_loader_handle_lifecycle() {
    let context = FrameLoaderContext::new();
    let interrupt = context.interrupt_flag();
    let handle = into_handle(LoaderHandle::new(context, interrupt));

    assert_eq!(with_loader(handle, -1, |c| c.duration_ms()), 0);
    let code = with_loader(handle, -1, |c| opt_result("getFrame", c.get_frame(0, true)));
    assert_eq!(code, 1);
    assert_eq!(with_loader(0, -1, |c| c.width() as i32), -1);

    unsafe { release_handle::<LoaderHandle>(handle) };
  }
}
