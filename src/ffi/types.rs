//! Core FFmpeg type definitions
//!
//! All FFmpeg structs are opaque (zero-sized) to avoid version-specific layout dependencies.
//! Field access is done via the thin C accessor library in accessors.c. The only
//! structs declared with a real layout are the ones FFmpeg documents as public ABI
//! (`AVRational`, `AVChannelLayout`, `AVDictionaryEntry`).

use std::marker::PhantomData;
use std::os::raw::{c_char, c_int, c_void};

// ============================================================================
// Rational Number
// ============================================================================

/// Rational number for time bases and frame rates
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AVRational {
  /// Numerator
  pub num: c_int,
  /// Denominator
  pub den: c_int,
}

impl AVRational {
  pub const fn new(num: c_int, den: c_int) -> Self {
    Self { num, den }
  }

  pub fn as_f64(&self) -> f64 {
    if self.den == 0 {
      0.0
    } else {
      self.num as f64 / self.den as f64
    }
  }

  /// Whether this rational can be used as a time base
  pub fn is_valid(&self) -> bool {
    self.num > 0 && self.den > 0
  }

  /// Millisecond time base (1/1000)
  pub const MILLISECONDS: Self = Self { num: 1, den: 1000 };

  /// AV_TIME_BASE_Q (1/1000000)
  pub const MICROSECONDS: Self = Self {
    num: 1,
    den: 1_000_000,
  };
}

/// AV_TIME_BASE (microseconds)
pub const AV_TIME_BASE: i64 = 1_000_000;

// ============================================================================
// Codec IDs
// ============================================================================

/// Codec IDs the player cares about by name
///
/// Anything else round-trips through `Other` so stream info can still be
/// reported to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AVCodecID {
  None,
  // Video
  Mpeg2Video,
  Mpeg4,
  H264,
  Vp8,
  Vp9,
  Hevc,
  Av1,
  // Audio
  PcmS16le,
  // Subtitles
  DvdSubtitle,
  DvbSubtitle,
  Text,
  Xsub,
  Ssa,
  MovText,
  HdmvPgsSubtitle,
  Srt,
  Other(c_int),
}

impl AVCodecID {
  /// Convert from the raw FFmpeg codec ID value
  pub fn from_raw(raw: c_int) -> Self {
    match raw {
      0 => Self::None,
      2 => Self::Mpeg2Video,
      12 => Self::Mpeg4,
      27 => Self::H264,
      139 => Self::Vp8,
      167 => Self::Vp9,
      173 => Self::Hevc,
      226 => Self::Av1,
      0x10000 => Self::PcmS16le,
      0x17000 => Self::DvdSubtitle,
      0x17001 => Self::DvbSubtitle,
      0x17002 => Self::Text,
      0x17003 => Self::Xsub,
      0x17004 => Self::Ssa,
      0x17005 => Self::MovText,
      0x17006 => Self::HdmvPgsSubtitle,
      0x17008 => Self::Srt,
      other => Self::Other(other),
    }
  }

  /// Get the raw FFmpeg codec ID value
  pub fn as_raw(&self) -> c_int {
    match self {
      Self::None => 0,
      Self::Mpeg2Video => 2,
      Self::Mpeg4 => 12,
      Self::H264 => 27,
      Self::Vp8 => 139,
      Self::Vp9 => 167,
      Self::Hevc => 173,
      Self::Av1 => 226,
      Self::PcmS16le => 0x10000,
      Self::DvdSubtitle => 0x17000,
      Self::DvbSubtitle => 0x17001,
      Self::Text => 0x17002,
      Self::Xsub => 0x17003,
      Self::Ssa => 0x17004,
      Self::MovText => 0x17005,
      Self::HdmvPgsSubtitle => 0x17006,
      Self::Srt => 0x17008,
      Self::Other(raw) => *raw,
    }
  }

  /// Bitmap subtitle codecs are decoded by FFmpeg but never rendered
  pub fn is_bitmap_subtitle(&self) -> bool {
    matches!(
      self,
      Self::DvdSubtitle | Self::Xsub | Self::HdmvPgsSubtitle
    )
  }

  /// Name of the MediaCodec-backed decoder for this codec, if Android has one
  pub fn mediacodec_decoder_name(&self) -> Option<&'static str> {
    match self {
      Self::H264 => Some("h264_mediacodec"),
      Self::Hevc => Some("hevc_mediacodec"),
      Self::Mpeg2Video => Some("mpeg2_mediacodec"),
      Self::Mpeg4 => Some("mpeg4_mediacodec"),
      Self::Vp8 => Some("vp8_mediacodec"),
      Self::Vp9 => Some("vp9_mediacodec"),
      Self::Av1 => Some("av1_mediacodec"),
      _ => None,
    }
  }
}

// ============================================================================
// Pixel Formats
// ============================================================================

/// Video pixel formats the buffer converters handle directly
///
/// `Mediacodec` has no stable numeric value across FFmpeg releases, so its
/// raw value is asked from the accessor library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AVPixelFormat {
  None,
  Yuv420p,
  Nv12,
  Nv21,
  Rgba,
  Mediacodec,
  Other(c_int),
}

impl AVPixelFormat {
  /// Convert from the raw FFmpeg pixel format value
  pub fn from_raw(raw: c_int) -> Self {
    match raw {
      -1 => Self::None,
      0 => Self::Yuv420p,
      23 => Self::Nv12,
      24 => Self::Nv21,
      26 => Self::Rgba,
      other if other == unsafe { super::accessors::ff_pix_fmt_mediacodec() } => Self::Mediacodec,
      other => Self::Other(other),
    }
  }

  /// Get the raw FFmpeg pixel format value
  pub fn as_raw(&self) -> c_int {
    match self {
      Self::None => -1,
      Self::Yuv420p => 0,
      Self::Nv12 => 23,
      Self::Nv21 => 24,
      Self::Rgba => 26,
      Self::Mediacodec => unsafe { super::accessors::ff_pix_fmt_mediacodec() },
      Self::Other(raw) => *raw,
    }
  }

  /// Whether frames in this format are opaque hardware surfaces
  pub fn is_hardware(&self) -> bool {
    matches!(self, Self::Mediacodec)
  }
}

// ============================================================================
// Sample Formats
// ============================================================================

/// Audio sample formats
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AVSampleFormat {
  None = -1,
  U8 = 0,
  S16 = 1,
  S32 = 2,
  Flt = 3,
  Dbl = 4,
  U8p = 5,
  S16p = 6,
  S32p = 7,
  Fltp = 8,
  Dblp = 9,
  S64 = 10,
  S64p = 11,
}

impl AVSampleFormat {
  /// Convert from the raw FFmpeg sample format value
  pub fn from_raw(raw: c_int) -> Self {
    match raw {
      0 => Self::U8,
      1 => Self::S16,
      2 => Self::S32,
      3 => Self::Flt,
      4 => Self::Dbl,
      5 => Self::U8p,
      6 => Self::S16p,
      7 => Self::S32p,
      8 => Self::Fltp,
      9 => Self::Dblp,
      10 => Self::S64,
      11 => Self::S64p,
      _ => Self::None,
    }
  }

  /// Get the raw FFmpeg sample format value
  pub fn as_raw(&self) -> c_int {
    *self as c_int
  }

  /// Packed output format for a PCM bit depth (8, 16 or 32)
  pub fn packed_for_bit_depth(bits: u32) -> Option<Self> {
    match bits {
      8 => Some(Self::U8),
      16 => Some(Self::S16),
      32 => Some(Self::S32),
      _ => None,
    }
  }

  /// Bytes per sample of a single channel
  pub fn bytes_per_sample(&self) -> usize {
    match self {
      Self::None => 0,
      Self::U8 | Self::U8p => 1,
      Self::S16 | Self::S16p => 2,
      Self::S32 | Self::S32p | Self::Flt | Self::Fltp => 4,
      Self::Dbl | Self::Dblp | Self::S64 | Self::S64p => 8,
    }
  }

  /// Whether samples are stored one plane per channel
  pub fn is_planar(&self) -> bool {
    matches!(
      self,
      Self::U8p | Self::S16p | Self::S32p | Self::Fltp | Self::Dblp | Self::S64p
    )
  }
}

// ============================================================================
// Subtitle Rect Types
// ============================================================================

/// AVSubtitleType
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AVSubtitleType {
  None,
  Bitmap,
  Text,
  Ass,
}

impl AVSubtitleType {
  pub fn from_raw(raw: c_int) -> Self {
    match raw {
      1 => Self::Bitmap,
      2 => Self::Text,
      3 => Self::Ass,
      _ => Self::None,
    }
  }
}

// ============================================================================
// Public-ABI Structs
// ============================================================================

/// AVChannelLayout (FFmpeg 5.1+)
#[repr(C)]
pub struct AVChannelLayout {
  pub order: c_int,
  pub nb_channels: c_int,
  pub mask: u64,
  pub opaque: *mut c_void,
}

/// One key/value entry of an AVDictionary
#[repr(C)]
pub struct AVDictionaryEntry {
  pub key: *mut c_char,
  pub value: *mut c_char,
}

// ============================================================================
// Opaque FFmpeg Types
// ============================================================================

macro_rules! opaque_types {
  ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
    $(
      $(#[$meta])*
      #[repr(C)]
      pub struct $name {
        _opaque: [u8; 0],
        _marker: PhantomData<(*mut u8, std::marker::PhantomPinned)>,
      }
    )*
  };
}

opaque_types!(
  /// Opaque AVCodec structure (codec implementation descriptor)
  AVCodec,
  /// Opaque AVCodecContext structure (decoder instance)
  AVCodecContext,
  /// Opaque AVCodecParameters structure (stream codec parameters)
  AVCodecParameters,
  /// Opaque AVFrame structure (uncompressed video/audio data)
  AVFrame,
  /// Opaque AVPacket structure (compressed data)
  AVPacket,
  /// Opaque AVSubtitle structure (decoded subtitle, allocated by the accessor library)
  AVSubtitle,
  /// Opaque AVBufferRef structure (reference-counted buffer)
  AVBufferRef,
  /// Opaque SwsContext structure (software scaler context)
  SwsContext,
  /// Opaque SwrContext structure (software resampler context)
  SwrContext,
  /// Opaque AVDictionary structure (key-value options)
  AVDictionary,
  /// Opaque AVFormatContext structure (demuxer context)
  AVFormatContext,
  /// Opaque AVStream structure (stream within container)
  AVStream,
  /// Opaque AVInputFormat structure (input format descriptor)
  AVInputFormat,
);

// ============================================================================
// Constants
// ============================================================================

/// No timestamp value
pub const AV_NOPTS_VALUE: i64 = 0x8000000000000000u64 as i64;

/// Packet flags
pub mod pkt_flag {
  use std::os::raw::c_int;

  pub const KEY: c_int = 0x0001;
  pub const CORRUPT: c_int = 0x0002;
  pub const DISCARD: c_int = 0x0004;
}

/// Stream disposition flags
pub mod disposition {
  use std::os::raw::c_int;

  pub const DEFAULT: c_int = 0x0001;
  pub const ATTACHED_PIC: c_int = 0x0400;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_codec_id_round_trip_keeps_unknown_values() {
    assert_eq!(AVCodecID::from_raw(27), AVCodecID::H264);
    assert_eq!(AVCodecID::from_raw(0x17006), AVCodecID::HdmvPgsSubtitle);
    assert_eq!(AVCodecID::from_raw(0x17010), AVCodecID::Other(0x17010));
    assert_eq!(AVCodecID::from_raw(0x17010).as_raw(), 0x17010);
  }

  #[test]
  fn test_bitmap_subtitles() {
    assert!(AVCodecID::DvdSubtitle.is_bitmap_subtitle());
    assert!(AVCodecID::Xsub.is_bitmap_subtitle());
    assert!(AVCodecID::HdmvPgsSubtitle.is_bitmap_subtitle());
    assert!(!AVCodecID::DvbSubtitle.is_bitmap_subtitle());
    assert!(!AVCodecID::MovText.is_bitmap_subtitle());
    assert!(!AVCodecID::Ssa.is_bitmap_subtitle());
  }

  #[test]
  fn test_sample_format_sizes() {
    assert_eq!(AVSampleFormat::packed_for_bit_depth(16), Some(AVSampleFormat::S16));
    assert_eq!(AVSampleFormat::packed_for_bit_depth(24), None);
    assert_eq!(AVSampleFormat::S32.bytes_per_sample(), 4);
    assert!(AVSampleFormat::Fltp.is_planar());
    assert!(!AVSampleFormat::S16.is_planar());
  }

  #[test]
  fn test_rational_time_bases() {
    assert!(AVRational::MILLISECONDS.is_valid());
    assert!(!AVRational::new(0, 0).is_valid());
    assert_eq!(AVRational::new(1, 4).as_f64(), 0.25);
  }
}
