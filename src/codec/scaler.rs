//! Safe wrapper around FFmpeg SwsContext
//!
//! Converts decoded frames into caller-owned planes. The context is cached and
//! only rebuilt when the source or destination geometry changes.

use crate::ffi::{
  AVPixelFormat, SwsContext,
  swscale::{
    SWS_BICUBIC, SWS_BILINEAR, SWS_FAST_BILINEAR, sws_freeContext, sws_getCachedContext,
    sws_scale,
  },
};
use std::ptr::NonNull;

use super::{CodecError, CodecResult, Frame};

/// Scaling algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleAlgorithm {
  /// Fast bilinear (fastest, lower quality)
  FastBilinear,
  /// Bilinear (good balance)
  #[default]
  Bilinear,
  /// Bicubic (higher quality, slower)
  Bicubic,
}

impl ScaleAlgorithm {
  fn to_sws_flags(self) -> i32 {
    match self {
      ScaleAlgorithm::FastBilinear => SWS_FAST_BILINEAR,
      ScaleAlgorithm::Bilinear => SWS_BILINEAR,
      ScaleAlgorithm::Bicubic => SWS_BICUBIC,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
  src_width: u32,
  src_height: u32,
  src_format: AVPixelFormat,
  dst_width: u32,
  dst_height: u32,
  dst_format: AVPixelFormat,
}

/// Cached SwsContext for pixel format conversion and scaling
pub struct Scaler {
  ptr: Option<NonNull<SwsContext>>,
  geometry: Option<Geometry>,
  algorithm: ScaleAlgorithm,
}

impl Scaler {
  pub fn new(algorithm: ScaleAlgorithm) -> Self {
    Self {
      ptr: None,
      geometry: None,
      algorithm,
    }
  }

  /// Make sure the cached context converts between the given geometries
  pub fn ensure(
    &mut self,
    src_width: u32,
    src_height: u32,
    src_format: AVPixelFormat,
    dst_width: u32,
    dst_height: u32,
    dst_format: AVPixelFormat,
  ) -> CodecResult<()> {
    let geometry = Geometry {
      src_width,
      src_height,
      src_format,
      dst_width,
      dst_height,
      dst_format,
    };
    if self.ptr.is_some() && self.geometry == Some(geometry) {
      return Ok(());
    }

    let current = self.ptr.map_or(std::ptr::null_mut(), |p| p.as_ptr());
    let ptr = unsafe {
      sws_getCachedContext(
        current,
        src_width as i32,
        src_height as i32,
        src_format.as_raw(),
        dst_width as i32,
        dst_height as i32,
        dst_format.as_raw(),
        self.algorithm.to_sws_flags(),
        std::ptr::null_mut(),
        std::ptr::null_mut(),
        std::ptr::null(),
      )
    };

    // sws_getCachedContext frees the old context when it can't reuse it,
    // including on failure
    self.ptr = NonNull::new(ptr);
    self.geometry = self.ptr.map(|_| geometry);
    if self.ptr.is_none() {
      return Err(CodecError::InvalidConfig(format!(
        "Cannot create scaler from {:?} {}x{} to {:?} {}x{}",
        src_format, src_width, src_height, dst_format, dst_width, dst_height
      )));
    }
    Ok(())
  }

  /// Scale/convert `src` into caller-owned planes
  ///
  /// `strides[i]` is the byte length of one row of `planes[i]`; every plane
  /// must hold `rows[i] * strides[i]` bytes.
  pub fn scale_into(
    &mut self,
    src: &Frame,
    planes: &mut [&mut [u8]],
    strides: &[usize],
    rows: &[usize],
  ) -> CodecResult<()> {
    let (ptr, geometry) = match (self.ptr, self.geometry) {
      (Some(ptr), Some(geometry)) => (ptr, geometry),
      _ => return Err(CodecError::InvalidState("Scaler not configured".into())),
    };
    if src.width() != geometry.src_width || src.height() != geometry.src_height {
      return Err(CodecError::InvalidConfig(
        "Frame dimensions don't match scaler configuration".into(),
      ));
    }
    if planes.len() > 4 || planes.len() != strides.len() || planes.len() != rows.len() {
      return Err(CodecError::InvalidConfig("Mismatched destination planes".into()));
    }

    let mut dst_data: [*mut u8; 4] = [std::ptr::null_mut(); 4];
    let mut dst_linesize: [i32; 4] = [0; 4];
    for (i, plane) in planes.iter_mut().enumerate() {
      if plane.len() < strides[i] * rows[i] {
        return Err(CodecError::InvalidConfig(format!("Destination plane {} too small", i)));
      }
      dst_data[i] = plane.as_mut_ptr();
      dst_linesize[i] = strides[i] as i32;
    }

    let src_data: [*const u8; 4] = [src.data(0), src.data(1), src.data(2), src.data(3)];
    let src_linesize: [i32; 4] = [
      src.linesize(0),
      src.linesize(1),
      src.linesize(2),
      src.linesize(3),
    ];

    let result = unsafe {
      sws_scale(
        ptr.as_ptr(),
        src_data.as_ptr(),
        src_linesize.as_ptr(),
        0,
        geometry.src_height as i32,
        dst_data.as_ptr(),
        dst_linesize.as_ptr(),
      )
    };

    if result != geometry.dst_height as i32 {
      return Err(CodecError::InvalidState(format!(
        "Scaling produced {} rows instead of {}",
        result, geometry.dst_height
      )));
    }
    Ok(())
  }

  /// Whether a context is currently cached
  pub fn is_configured(&self) -> bool {
    self.ptr.is_some()
  }
}

impl Default for Scaler {
  fn default() -> Self {
    Self::new(ScaleAlgorithm::default())
  }
}

impl Drop for Scaler {
  fn drop(&mut self) {
    if let Some(ptr) = self.ptr.take() {
      unsafe { sws_freeContext(ptr.as_ptr()) }
    }
  }
}

// SwsContext is thread-safe for reading, but we don't share mutable access
unsafe impl Send for Scaler {}

impl std::fmt::Debug for Scaler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Scaler")
      .field("geometry", &self.geometry)
      .field("algorithm", &self.algorithm)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_scaler_is_cached() {
    let mut scaler = Scaler::default();
    assert!(!scaler.is_configured());
    scaler
      .ensure(64, 48, AVPixelFormat::Nv12, 64, 48, AVPixelFormat::Yuv420p)
      .unwrap();
    let first = scaler.ptr;
    scaler
      .ensure(64, 48, AVPixelFormat::Nv12, 64, 48, AVPixelFormat::Yuv420p)
      .unwrap();
    assert_eq!(first, scaler.ptr);
    assert!(scaler.is_configured());
  }

  #[test]
  fn test_unconfigured_scale_fails() {
    let mut scaler = Scaler::default();
    let frame = Frame::new().unwrap();
    let err = scaler.scale_into(&frame, &mut [], &[], &[]).unwrap_err();
    assert!(matches!(err, CodecError::InvalidState(_)));
  }
}
