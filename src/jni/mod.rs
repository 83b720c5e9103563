//! JNI entry points
//!
//! Every native method of the Java player classes lands here. Handles are
//! heap addresses of native objects; results are the numeric codes of
//! [`crate::player::OptResult`] and [`crate::player::DecodeResult`].

#[cfg(target_os = "android")]
mod audio_track;
mod loader;
mod player;
pub mod util;

use crate::ffi::mediacodec::av_jni_set_java_vm;
use jni::sys::{jint, JNI_VERSION_1_6};
use jni::JavaVM;
use std::os::raw::c_void;
use std::sync::OnceLock;

static JAVA_VM: OnceLock<JavaVM> = OnceLock::new();

/// The VM this library was loaded into
pub fn java_vm() -> Option<&'static JavaVM> {
  JAVA_VM.get()
}

#[no_mangle]
pub extern "system" fn JNI_OnLoad(vm: JavaVM, _reserved: *mut c_void) -> jint {
  crate::logging::init();

  let raw = vm.get_java_vm_pointer();
  let ret = unsafe { av_jni_set_java_vm(raw as *mut c_void, std::ptr::null_mut()) };
  if ret < 0 {
    tracing::warn!(target: "tmedia", "FFmpeg has no JNI support ({}), MediaCodec disabled", ret);
  }
  let _ = JAVA_VM.set(vm);

  tracing::info!(target: "tmedia", "tmedia loaded");
  JNI_VERSION_1_6
}
