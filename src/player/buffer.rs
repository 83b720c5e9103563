//! Caller-owned buffers the player fills
//!
//! Each buffer is allocated once by the managed side and reused for every
//! frame. Backing storage only grows, so callers read the content size, not
//! the capacity.

use crate::codec::{CodecResult, Frame, MediaType, Packet, demuxer::pts_to_ms};
use crate::ffi::AVRational;
use crate::ffi::mediacodec::{MEDIACODEC_BUFFER_PLANE, av_mediacodec_release_buffer};

use super::ImageRawType;

/// Byte buffer whose capacity never shrinks
#[derive(Debug, Default, Clone)]
pub struct GrowBuffer {
  data: Vec<u8>,
  content_size: usize,
}

impl GrowBuffer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make room for `size` bytes of content and return them
  ///
  /// The content size becomes `size`; bytes beyond the previous content are
  /// whatever the buffer held before.
  pub fn ensure(&mut self, size: usize) -> &mut [u8] {
    if self.data.len() < size {
      self.data.resize(size, 0);
    }
    self.content_size = size;
    &mut self.data[..size]
  }

  /// Replace the content with `bytes`
  pub fn fill_from(&mut self, bytes: &[u8]) {
    self.ensure(bytes.len()).copy_from_slice(bytes);
  }

  /// Mark the buffer empty without releasing storage
  pub fn clear(&mut self) {
    self.content_size = 0;
  }

  /// Valid payload
  pub fn content(&self) -> &[u8] {
    &self.data[..self.content_size]
  }

  pub fn content_size(&self) -> usize {
    self.content_size
  }

  /// Allocated size, never smaller than any earlier `ensure`
  pub fn buffer_size(&self) -> usize {
    self.data.len()
  }

  /// Whole backing storage, for writers that report their own length
  pub(crate) fn storage(&mut self) -> &mut Vec<u8> {
    &mut self.data
  }

  pub(crate) fn set_content_size(&mut self, size: usize) {
    self.content_size = size.min(self.data.len());
  }
}

/// A demuxed packet plus what the reader learned about its stream
#[derive(Debug)]
pub struct PacketHandle {
  pub packet: Packet,
  pub media_type: Option<MediaType>,
  pub time_base: AVRational,
}

impl PacketHandle {
  pub fn new() -> CodecResult<Self> {
    Ok(Self {
      packet: Packet::new()?,
      media_type: None,
      time_base: AVRational::default(),
    })
  }

  pub fn pts_ms(&self) -> i64 {
    pts_to_ms(self.packet.pts(), self.time_base)
  }

  pub fn duration_ms(&self) -> i64 {
    pts_to_ms(self.packet.duration(), self.time_base)
  }

  pub fn size(&self) -> usize {
    self.packet.size().max(0) as usize
  }

  /// Turn the handle into a flush packet (size 0)
  pub fn reset(&mut self) {
    self.packet.unref();
    self.media_type = None;
  }
}

/// One decoded video frame, packed for upload
#[derive(Debug, Default)]
pub struct VideoBuffer {
  pub raw_type: ImageRawType,
  /// Row length in pixels, a multiple of 8
  pub width: u32,
  pub height: u32,
  pub pts_ms: i64,
  pub duration_ms: i64,
  pub rgba: GrowBuffer,
  pub y: GrowBuffer,
  pub u: GrowBuffer,
  pub v: GrowBuffer,
  /// Interleaved chroma of NV12/NV21 frames
  pub uv: GrowBuffer,
  /// MediaCodec frame waiting to be rendered or dropped
  hw_frame: Option<Frame>,
}

impl VideoBuffer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Hold a MEDIACODEC frame until [`VideoBuffer::release_hw_buffer`]
  ///
  /// A frame still held from the previous decode is dropped unrendered.
  pub(crate) fn hold_hw_frame(&mut self, frame: Frame) {
    self.release_hw_buffer(false);
    self.hw_frame = Some(frame);
  }

  pub fn has_hw_frame(&self) -> bool {
    self.hw_frame.is_some()
  }

  /// Give the MediaCodec output buffer back, drawing it to the surface if `render`
  pub fn release_hw_buffer(&mut self, render: bool) -> bool {
    let Some(frame) = self.hw_frame.take() else {
      return false;
    };
    let buffer = frame.data(MEDIACODEC_BUFFER_PLANE as usize);
    if buffer.is_null() {
      return false;
    }
    let ret = unsafe { av_mediacodec_release_buffer(buffer as *mut _, render as i32) };
    if ret < 0 {
      tracing::warn!(target: "tmedia", "Failed to release MediaCodec buffer: {}", ret);
    }
    ret >= 0
  }
}

impl Drop for VideoBuffer {
  fn drop(&mut self) {
    self.release_hw_buffer(false);
  }
}

/// One resampled audio frame as interleaved PCM
#[derive(Debug, Default)]
pub struct AudioBuffer {
  pub pts_ms: i64,
  pub duration_ms: i64,
  pub pcm: GrowBuffer,
}

impl AudioBuffer {
  pub fn new() -> Self {
    Self::default()
  }
}

/// One rendered subtitle event
#[derive(Debug, Default)]
pub struct SubtitleBuffer {
  pub start_ms: i64,
  pub end_ms: i64,
  pub width: u32,
  pub height: u32,
  /// Dialog text without override tags, lines joined by '\n'
  pub text: String,
  pub rgba: GrowBuffer,
}

impl SubtitleBuffer {
  pub fn new() -> Self {
    Self::default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_grow_buffer_never_shrinks() {
    let mut buffer = GrowBuffer::new();
    assert_eq!(buffer.buffer_size(), 0);
    buffer.ensure(100);
    assert_eq!(buffer.buffer_size(), 100);
    assert_eq!(buffer.content_size(), 100);

    buffer.ensure(10);
    assert_eq!(buffer.buffer_size(), 100);
    assert_eq!(buffer.content_size(), 10);
    assert_eq!(buffer.content().len(), 10);

    buffer.ensure(250);
    assert_eq!(buffer.buffer_size(), 250);

    let mut last = buffer.buffer_size();
    for size in [3, 400, 0, 399, 1] {
      buffer.ensure(size);
      assert!(buffer.buffer_size() >= last);
      last = buffer.buffer_size();
    }
  }

  #[test]
  fn test_grow_buffer_fill_and_clear() {
    let mut buffer = GrowBuffer::new();
    buffer.fill_from(&[1, 2, 3]);
    assert_eq!(buffer.content(), &[1, 2, 3]);
    buffer.clear();
    assert!(buffer.content().is_empty());
    assert_eq!(buffer.buffer_size(), 3);
    buffer.set_content_size(10);
    assert_eq!(buffer.content_size(), 3);
  }

  #[test]
  fn test_packet_handle_times() {
    let mut handle = PacketHandle::new().unwrap();
    assert_eq!(handle.size(), 0);
    assert_eq!(handle.pts_ms(), 0);
    handle.time_base = AVRational::new(1, 90000);
    handle.reset();
    assert_eq!(handle.media_type, None);
  }

  #[test]
  fn test_video_buffer_without_hw_frame() {
    let mut buffer = VideoBuffer::new();
    assert!(!buffer.has_hw_frame());
    assert!(!buffer.release_hw_buffer(true));
    assert_eq!(buffer.raw_type, ImageRawType::Unknown);
  }
}
