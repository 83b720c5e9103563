//! Handle and value marshaling shared by the JNI entry points

use crate::player::OptResult;
use jni::objects::{JByteArray, JObject, JString};
use jni::sys::{jboolean, jint, jlong, jobjectArray, jstring, JNI_FALSE, JNI_TRUE};
use jni::JNIEnv;
use std::cell::UnsafeCell;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Move `value` to the heap and hand its address to Java
pub fn into_handle<T>(value: T) -> jlong {
  Box::into_raw(Box::new(value)) as jlong
}

/// Borrow the object behind a handle created by [`into_handle`]
///
/// # Safety
/// `handle` must be 0 or come from `into_handle::<T>` and not be released yet.
/// Java serializes calls per handle, so no other reference is live.
pub unsafe fn handle_mut<'a, T>(handle: jlong) -> Option<&'a mut T> {
  unsafe { (handle as *mut T).as_mut() }
}

/// Shared borrow of a handle, for objects touched from several threads
///
/// # Safety
/// Same as [`handle_mut`].
pub unsafe fn handle_ref<'a, T>(handle: jlong) -> Option<&'a T> {
  unsafe { (handle as *const T).as_ref() }
}

/// Take a handle back and drop the object; 0 is ignored
///
/// # Safety
/// `handle` must come from `into_handle::<T>` and is invalid afterwards.
pub unsafe fn release_handle<T>(handle: jlong) {
  if handle != 0 {
    drop(unsafe { Box::from_raw(handle as *mut T) });
  }
}

/// Context whose blocking reads can be cancelled from any thread
///
/// The interrupt flag is the only part touched without Java's per-handle
/// serialization, so it lives outside the cell.
pub struct InterruptibleHandle<T> {
  interrupt: Arc<AtomicBool>,
  inner: UnsafeCell<T>,
}

impl<T> InterruptibleHandle<T> {
  pub fn new(inner: T, interrupt: Arc<AtomicBool>) -> Self {
    Self {
      interrupt,
      inner: UnsafeCell::new(inner),
    }
  }

  pub fn set_interrupted(&self, interrupted: bool) {
    self.interrupt.store(interrupted, Ordering::Release);
  }

  pub fn is_interrupted(&self) -> bool {
    self.interrupt.load(Ordering::Acquire)
  }

  /// # Safety
  /// Only one thread may hold the returned reference at a time.
  #[allow(clippy::mut_from_ref)]
  pub unsafe fn inner_mut(&self) -> &mut T {
    unsafe { &mut *self.inner.get() }
  }
}

/// Map an operation result to the code Java switches on, logging failures
pub fn opt_result<T, E: Display>(op: &str, result: Result<T, E>) -> jint {
  match result {
    Ok(_) => OptResult::OptSuccess.as_raw(),
    Err(e) => {
      tracing::error!(target: "tmedia", "{} failed: {}", op, e);
      OptResult::OptFail.as_raw()
    }
  }
}

/// `OptFail` for calls made with a released or null handle
pub fn null_handle(op: &str) -> jint {
  tracing::error!(target: "tmedia", "{} called with a null handle", op);
  OptResult::OptFail.as_raw()
}

pub fn to_jboolean(value: bool) -> jboolean {
  if value {
    JNI_TRUE
  } else {
    JNI_FALSE
  }
}

pub fn as_jbytes(bytes: &[u8]) -> &[i8] {
  // u8 and i8 share size and alignment
  unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const i8, bytes.len()) }
}

/// Copy `bytes` into the start of a Java `byte[]`
///
/// Only as many bytes as the array holds are written.
pub fn copy_to_java(env: &mut JNIEnv, bytes: &[u8], array: &JByteArray) {
  if array.is_null() || bytes.is_empty() {
    return;
  }
  let capacity = match env.get_array_length(array) {
    Ok(len) => len.max(0) as usize,
    Err(e) => {
      tracing::error!(target: "tmedia", "Read byte[] length failed: {}", e);
      return;
    }
  };
  let len = capacity.min(bytes.len());
  if let Err(e) = env.set_byte_array_region(array, 0, as_jbytes(&bytes[..len])) {
    tracing::error!(target: "tmedia", "Copy to byte[] failed: {}", e);
  }
}

pub fn java_string(env: &mut JNIEnv, value: &JString) -> Option<String> {
  if value.is_null() {
    return None;
  }
  match env.get_string(value) {
    Ok(s) => Some(s.into()),
    Err(e) => {
      tracing::error!(target: "tmedia", "Read java string failed: {}", e);
      None
    }
  }
}

/// New Java string, or null when `value` is `None` or allocation failed
pub fn new_java_string(env: &mut JNIEnv, value: Option<&str>) -> jstring {
  let Some(value) = value else {
    return std::ptr::null_mut();
  };
  match env.new_string(value) {
    Ok(s) => s.into_raw(),
    Err(e) => {
      tracing::error!(target: "tmedia", "Create java string failed: {}", e);
      std::ptr::null_mut()
    }
  }
}

fn fill_string_array<'a, I>(env: &mut JNIEnv, items: I) -> jni::errors::Result<jobjectArray>
where
  I: ExactSizeIterator<Item = &'a str>,
{
  let array = env.new_object_array(items.len() as i32, "java/lang/String", JObject::null())?;
  for (i, item) in items.enumerate() {
    let value = env.new_string(item)?;
    env.set_object_array_element(&array, i as i32, &value)?;
    env.delete_local_ref(value)?;
  }
  Ok(array.into_raw())
}

/// `String[]` holding `items` in order, or null on failure
pub fn new_java_string_array<'a, I>(env: &mut JNIEnv, items: I) -> jobjectArray
where
  I: ExactSizeIterator<Item = &'a str>,
{
  match fill_string_array(env, items) {
    Ok(array) => array,
    Err(e) => {
      tracing::error!(target: "tmedia", "Create java string array failed: {}", e);
      std::ptr::null_mut()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::player::{PlayerError, PlayerResult};

  #[test]
  fn test_handle_round_trip() {
    let handle = into_handle(vec![1u8, 2, 3]);
    assert_ne!(handle, 0);
    unsafe {
      handle_mut::<Vec<u8>>(handle).unwrap().push(4);
      assert_eq!(handle_ref::<Vec<u8>>(handle).unwrap().as_slice(), &[1, 2, 3, 4]);
      release_handle::<Vec<u8>>(handle);
    }
  }

  #[test]
  fn test_null_handle() {
    unsafe {
      assert!(handle_mut::<u32>(0).is_none());
      assert!(handle_ref::<u32>(0).is_none());
      release_handle::<u32>(0);
    }
    assert_eq!(null_handle("test"), 1);
  }

  #[test]
  fn test_opt_result() {
    let ok: PlayerResult<()> = Ok(());
    let err: PlayerResult<()> = Err(PlayerError::NotPrepared);
    assert_eq!(opt_result("ok", ok), 0);
    assert_eq!(opt_result("err", err), 1);
  }

  #[test]
  fn test_interruptible_handle() {
    let flag = Arc::new(AtomicBool::new(false));
    let handle = InterruptibleHandle::new(5u32, Arc::clone(&flag));
    handle.set_interrupted(true);
    assert!(flag.load(Ordering::Acquire));
    assert!(handle.is_interrupted());
    unsafe { *handle.inner_mut() += 1 };
    assert_eq!(unsafe { *handle.inner_mut() }, 6);
    handle.set_interrupted(false);
    assert!(!flag.load(Ordering::Acquire));
  }

  #[test]
  fn test_jbytes_view() {
    assert_eq!(as_jbytes(&[0, 127, 128, 255]), &[0, 127, -128, -1]);
    assert_eq!(to_jboolean(true), JNI_TRUE);
    assert_eq!(to_jboolean(false), JNI_FALSE);
  }
}
