//! Demuxer context wrapper for FFmpeg libavformat
//!
//! Provides RAII wrapper around AVFormatContext for demuxing operations.

use super::{CodecError, Packet};
use crate::ffi::accessors::{
  ffcodecpar_get_bit_rate, ffcodecpar_get_bits_per_raw_sample, ffcodecpar_get_channels,
  ffcodecpar_get_codec_id, ffcodecpar_get_codec_type, ffcodecpar_get_format,
  ffcodecpar_get_height, ffcodecpar_get_sample_rate, ffcodecpar_get_width, fffmt_get_duration,
  fffmt_get_format_name, fffmt_get_metadata, fffmt_get_nb_streams, fffmt_get_stream,
  fffmt_set_interrupt_callback, ffstream_get_avg_frame_rate, ffstream_get_codecpar_const,
  ffstream_get_disposition, ffstream_get_display_rotation, ffstream_get_duration,
  ffstream_get_index, ffstream_get_metadata, ffstream_get_time_base, ffstream_set_discard,
};
use crate::ffi::avformat::{
  av_read_frame, avformat_alloc_context, avformat_close_input, avformat_find_stream_info,
  avformat_open_input, avformat_seek_file, media_type, seek_flag,
};
use crate::ffi::avutil::{av_rescale_q, dict_entries};
use crate::ffi::error::AVERROR_EOF;
use crate::ffi::{
  AVCodecID, AVCodecParameters, AVFormatContext, AVPixelFormat, AVRational, AVSampleFormat,
  AVStream, FFmpegError, AV_NOPTS_VALUE, disposition,
};
use std::ffi::{CStr, CString};
use std::os::raw::{c_int, c_void};
use std::ptr::{self, NonNull};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Media type for stream identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
  /// Video stream
  Video,
  /// Audio stream
  Audio,
  /// Subtitle stream
  Subtitle,
  /// Data stream
  Data,
  /// Attachment stream (fonts)
  Attachment,
}

impl MediaType {
  /// Convert from FFmpeg media type constant
  fn from_ffmpeg(value: c_int) -> Option<Self> {
    match value {
      x if x == media_type::VIDEO => Some(MediaType::Video),
      x if x == media_type::AUDIO => Some(MediaType::Audio),
      x if x == media_type::SUBTITLE => Some(MediaType::Subtitle),
      x if x == media_type::DATA => Some(MediaType::Data),
      x if x == media_type::ATTACHMENT => Some(MediaType::Attachment),
      _ => None,
    }
  }
}

/// Information about a stream in the container
#[derive(Debug, Clone)]
pub struct StreamInfo {
  /// Stream index
  pub index: i32,
  /// Media type (Video, Audio, etc.)
  pub media_type: MediaType,
  /// Codec ID
  pub codec_id: AVCodecID,
  /// Video width (if video)
  pub width: Option<u32>,
  /// Video height (if video)
  pub height: Option<u32>,
  /// Video pixel format (if video)
  pub pixel_format: Option<AVPixelFormat>,
  /// Audio sample rate (if audio)
  pub sample_rate: Option<u32>,
  /// Audio channels (if audio)
  pub channels: Option<u32>,
  /// Audio sample format (if audio)
  pub sample_format: Option<AVSampleFormat>,
  /// Stream time base
  pub time_base: AVRational,
  /// Stream duration in time_base units
  pub duration: Option<i64>,
  /// Average frame rate (video)
  pub avg_frame_rate: AVRational,
  /// Bit rate in bits per second, 0 when unknown
  pub bit_rate: i64,
  /// Bits per raw sample, 0 when unknown
  pub bits_per_raw_sample: i32,
  /// AV_DISPOSITION_* flags
  pub disposition: i32,
  /// Display matrix rotation in degrees
  pub rotation: f64,
  /// Stream tags (language, title, ...)
  pub metadata: Vec<(String, String)>,
}

impl StreamInfo {
  /// Cover art and other still pictures muxed as a video stream
  pub fn is_attached_picture(&self) -> bool {
    self.disposition & disposition::ATTACHED_PIC != 0
  }

  /// Stream duration in milliseconds
  pub fn duration_ms(&self) -> Option<i64> {
    self.duration.map(|d| pts_to_ms(d, self.time_base))
  }

  /// Look up a stream tag
  pub fn tag(&self, key: &str) -> Option<&str> {
    self
      .metadata
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(key))
      .map(|(_, v)| v.as_str())
  }
}

/// Convert a timestamp in `time_base` units to milliseconds
///
/// Missing timestamps (AV_NOPTS_VALUE) and invalid time bases map to 0.
pub fn pts_to_ms(pts: i64, time_base: AVRational) -> i64 {
  if pts == AV_NOPTS_VALUE || !time_base.is_valid() {
    return 0;
  }
  (pts as i128 * time_base.num as i128 * 1000 / time_base.den as i128) as i64
}

/// Outcome of reading one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
  /// A packet was read
  Packet,
  /// End of input
  Eof,
}

/// FFmpeg I/O interrupt callback, `opaque` points at the context's interrupt flag
unsafe extern "C" fn interrupt_callback(opaque: *mut c_void) -> c_int {
  if opaque.is_null() {
    return 0;
  }
  let flag = unsafe { &*(opaque as *const AtomicBool) };
  flag.load(Ordering::Acquire) as c_int
}

/// Demuxer context wrapper
///
/// Provides RAII wrapper around AVFormatContext for demuxing operations.
pub struct DemuxerContext {
  /// Pointer to AVFormatContext
  ptr: NonNull<AVFormatContext>,
  /// Flag polled by the I/O interrupt callback; the callback borrows it
  interrupt: Arc<AtomicBool>,
  /// Cached stream information
  streams: Vec<StreamInfo>,
}

impl DemuxerContext {
  /// Open a file (or any URL FFmpeg understands) for demuxing
  ///
  /// Setting `interrupt` from another thread aborts blocking I/O.
  pub fn open(path: &str, interrupt: Arc<AtomicBool>) -> Result<Self, CodecError> {
    let c_path =
      CString::new(path).map_err(|_| CodecError::InvalidConfig("Invalid path".to_string()))?;

    let mut ctx_ptr = unsafe { avformat_alloc_context() };
    if ctx_ptr.is_null() {
      return Err(CodecError::AllocationFailed("AVFormatContext"));
    }
    unsafe {
      fffmt_set_interrupt_callback(
        ctx_ptr,
        Some(interrupt_callback),
        Arc::as_ptr(&interrupt) as *mut c_void,
      );
    }

    let ret =
      unsafe { avformat_open_input(&mut ctx_ptr, c_path.as_ptr(), ptr::null(), ptr::null_mut()) };

    // On failure avformat_open_input frees the context
    if ret < 0 || ctx_ptr.is_null() {
      return Err(CodecError::Ffmpeg(FFmpegError::from_code(ret)));
    }

    let mut ctx = Self {
      ptr: unsafe { NonNull::new_unchecked(ctx_ptr) },
      interrupt,
      streams: Vec::new(),
    };

    ctx.find_stream_info()?;

    Ok(ctx)
  }

  /// Find and parse stream information
  fn find_stream_info(&mut self) -> Result<(), CodecError> {
    let ret = unsafe { avformat_find_stream_info(self.ptr.as_ptr(), ptr::null_mut()) };

    if ret < 0 {
      return Err(CodecError::Ffmpeg(FFmpegError::from_code(ret)));
    }

    self.parse_streams();

    Ok(())
  }

  /// Parse stream information from format context
  fn parse_streams(&mut self) {
    let nb_streams = unsafe { fffmt_get_nb_streams(self.ptr.as_ptr()) };

    self.streams.clear();
    self.streams.reserve(nb_streams as usize);

    for i in 0..nb_streams {
      let stream = unsafe { fffmt_get_stream(self.ptr.as_ptr(), i) };
      if stream.is_null() {
        continue;
      }

      let codecpar = unsafe { ffstream_get_codecpar_const(stream) };
      if codecpar.is_null() {
        continue;
      }

      let codec_type_raw = unsafe { ffcodecpar_get_codec_type(codecpar) };
      let media_type = match MediaType::from_ffmpeg(codec_type_raw) {
        Some(t) => t,
        None => continue,
      };

      let index = unsafe { ffstream_get_index(stream) };
      let codec_id = AVCodecID::from_raw(unsafe { ffcodecpar_get_codec_id(codecpar) });

      let mut time_base = AVRational::default();
      let mut avg_frame_rate = AVRational::default();
      unsafe {
        ffstream_get_time_base(stream, &mut time_base.num, &mut time_base.den);
        ffstream_get_avg_frame_rate(stream, &mut avg_frame_rate.num, &mut avg_frame_rate.den);
      }

      let duration_raw = unsafe { ffstream_get_duration(stream) };
      let duration = if duration_raw > 0 && duration_raw != AV_NOPTS_VALUE {
        Some(duration_raw)
      } else {
        None
      };

      let (width, height, pixel_format) = if media_type == MediaType::Video {
        unsafe {
          (
            Some(ffcodecpar_get_width(codecpar).max(0) as u32),
            Some(ffcodecpar_get_height(codecpar).max(0) as u32),
            Some(AVPixelFormat::from_raw(ffcodecpar_get_format(codecpar))),
          )
        }
      } else {
        (None, None, None)
      };

      let (sample_rate, channels, sample_format) = if media_type == MediaType::Audio {
        unsafe {
          (
            Some(ffcodecpar_get_sample_rate(codecpar).max(0) as u32),
            Some(ffcodecpar_get_channels(codecpar).max(0) as u32),
            Some(AVSampleFormat::from_raw(ffcodecpar_get_format(codecpar))),
          )
        }
      } else {
        (None, None, None)
      };

      self.streams.push(StreamInfo {
        index,
        media_type,
        codec_id,
        width,
        height,
        pixel_format,
        sample_rate,
        channels,
        sample_format,
        time_base,
        duration,
        avg_frame_rate,
        bit_rate: unsafe { ffcodecpar_get_bit_rate(codecpar) },
        bits_per_raw_sample: unsafe { ffcodecpar_get_bits_per_raw_sample(codecpar) },
        disposition: unsafe { ffstream_get_disposition(stream) },
        rotation: unsafe { ffstream_get_display_rotation(stream) },
        metadata: unsafe { dict_entries(ffstream_get_metadata(stream)) },
      });
    }
  }

  /// Get all streams
  pub fn streams(&self) -> &[StreamInfo] {
    &self.streams
  }

  /// Get stream info by index
  pub fn get_stream(&self, index: i32) -> Option<&StreamInfo> {
    self.streams.iter().find(|s| s.index == index)
  }

  fn stream_ptr(&self, index: i32) -> Option<*mut AVStream> {
    if index < 0 {
      return None;
    }
    let stream = unsafe { fffmt_get_stream(self.ptr.as_ptr(), index as u32) };
    if stream.is_null() { None } else { Some(stream) }
  }

  /// Codec parameters of a stream, valid while this context lives
  pub fn codec_parameters(&self, index: i32) -> Option<*const AVCodecParameters> {
    self
      .stream_ptr(index)
      .map(|stream| unsafe { ffstream_get_codecpar_const(stream) })
      .filter(|par| !par.is_null())
  }

  /// Keep the demuxer from returning packets of streams nobody decodes
  pub fn discard_all_except(&mut self, keep: &[i32]) {
    for info in &self.streams {
      if let Some(stream) = self.stream_ptr(info.index) {
        let level = if keep.contains(&info.index) {
          crate::ffi::avformat::discard::DEFAULT
        } else {
          crate::ffi::avformat::discard::ALL
        };
        unsafe { ffstream_set_discard(stream, level) };
      }
    }
  }

  /// Read the next packet into `packet`, replacing its previous contents
  pub fn read_packet(&mut self, packet: &mut Packet) -> Result<ReadStatus, CodecError> {
    packet.unref();
    let ret = unsafe { av_read_frame(self.ptr.as_ptr(), packet.as_mut_ptr()) };

    if ret == AVERROR_EOF {
      return Ok(ReadStatus::Eof);
    }

    if ret < 0 {
      return Err(CodecError::Ffmpeg(FFmpegError::from_code(ret)));
    }

    Ok(ReadStatus::Packet)
  }

  /// Seek to the last keyframe at or before `position_ms`
  pub fn seek_to_ms(&mut self, position_ms: i64) -> Result<(), CodecError> {
    let ts =
      unsafe { av_rescale_q(position_ms, AVRational::MILLISECONDS, AVRational::MICROSECONDS) };
    let ret = unsafe {
      avformat_seek_file(self.ptr.as_ptr(), -1, i64::MIN, ts, ts, seek_flag::BACKWARD)
    };

    if ret < 0 {
      return Err(CodecError::Ffmpeg(FFmpegError::from_code(ret)));
    }

    Ok(())
  }

  /// Get the container duration in milliseconds
  pub fn duration_ms(&self) -> Option<i64> {
    let duration = unsafe { fffmt_get_duration(self.ptr.as_ptr()) };
    if duration > 0 && duration != AV_NOPTS_VALUE {
      Some(pts_to_ms(duration, AVRational::MICROSECONDS))
    } else {
      None
    }
  }

  /// Short name of the detected container format ("matroska,webm", ...)
  pub fn format_name(&self) -> Option<String> {
    let name = unsafe { fffmt_get_format_name(self.ptr.as_ptr()) };
    if name.is_null() {
      None
    } else {
      Some(unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
    }
  }

  /// Container tags
  pub fn metadata(&self) -> Vec<(String, String)> {
    unsafe { dict_entries(fffmt_get_metadata(self.ptr.as_ptr())) }
  }

  /// Shared interrupt flag
  pub fn interrupt_flag(&self) -> &Arc<AtomicBool> {
    &self.interrupt
  }

  /// Whether `err` came from an interrupted blocking call
  pub fn is_interrupt_error(err: &CodecError) -> bool {
    matches!(err, CodecError::Ffmpeg(e) if e.is_interrupted())
  }
}

impl Drop for DemuxerContext {
  fn drop(&mut self) {
    let mut ptr = self.ptr.as_ptr();
    unsafe {
      avformat_close_input(&mut ptr);
    }
  }
}

// SAFETY: DemuxerContext owns all its resources and can be safely sent between threads
unsafe impl Send for DemuxerContext {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_media_type_conversion() {
    assert_eq!(
      MediaType::from_ffmpeg(media_type::VIDEO),
      Some(MediaType::Video)
    );
    assert_eq!(
      MediaType::from_ffmpeg(media_type::AUDIO),
      Some(MediaType::Audio)
    );
    assert_eq!(
      MediaType::from_ffmpeg(media_type::ATTACHMENT),
      Some(MediaType::Attachment)
    );
    assert_eq!(MediaType::from_ffmpeg(-1), None);
  }

  #[test]
  fn test_pts_to_ms() {
    assert_eq!(pts_to_ms(90_000, AVRational::new(1, 90_000)), 1000);
    assert_eq!(pts_to_ms(48_000, AVRational::new(1, 48_000)), 1000);
    assert_eq!(pts_to_ms(1_500_000, AVRational::MICROSECONDS), 1500);
    assert_eq!(pts_to_ms(AV_NOPTS_VALUE, AVRational::MILLISECONDS), 0);
    assert_eq!(pts_to_ms(42, AVRational::new(0, 0)), 0);
  }

  #[test]
  fn test_interrupt_callback_reads_flag() {
    let flag = AtomicBool::new(false);
    let opaque = &flag as *const AtomicBool as *mut c_void;
    assert_eq!(unsafe { interrupt_callback(opaque) }, 0);
    flag.store(true, Ordering::Release);
    assert_eq!(unsafe { interrupt_callback(opaque) }, 1);
    assert_eq!(unsafe { interrupt_callback(ptr::null_mut()) }, 0);
  }

  #[test]
  fn test_open_missing_file_fails() {
    let result = DemuxerContext::open("/nonexistent/tmedia.mp4", Arc::new(AtomicBool::new(false)));
    assert!(matches!(result, Err(CodecError::Ffmpeg(_))));
  }

  #[test]
  fn test_stream_info_helpers() {
    let info = StreamInfo {
      index: 2,
      media_type: MediaType::Subtitle,
      codec_id: AVCodecID::Ssa,
      width: None,
      height: None,
      pixel_format: None,
      sample_rate: None,
      channels: None,
      sample_format: None,
      time_base: AVRational::MILLISECONDS,
      duration: Some(2500),
      avg_frame_rate: AVRational::default(),
      bit_rate: 0,
      bits_per_raw_sample: 0,
      disposition: disposition::ATTACHED_PIC,
      rotation: 0.0,
      metadata: vec![("LANGUAGE".to_string(), "eng".to_string())],
    };
    assert!(info.is_attached_picture());
    assert_eq!(info.duration_ms(), Some(2500));
    assert_eq!(info.tag("language"), Some("eng"));
    assert_eq!(info.tag("title"), None);
  }
}
