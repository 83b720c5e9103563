//! Player-side contexts driven through JNI
//!
//! A [`MediaPlayerContext`] demuxes one file and decodes its selected audio,
//! video and subtitle streams into caller-owned buffers. A
//! [`FrameLoaderContext`] pulls single RGBA frames out of a file at a given
//! position. Both report progress with the numeric result codes the managed
//! side switches on.

pub mod buffer;
pub mod convert;
pub mod loader;
pub mod media;
pub mod registry;
pub mod subtitle;

pub use buffer::{AudioBuffer, GrowBuffer, PacketHandle, SubtitleBuffer, VideoBuffer};
pub use loader::FrameLoaderContext;
pub use media::{AudioInfo, MediaInfo, MediaPlayerContext, SubtitleStreamInfo, VideoInfo};
pub use registry::HandleTable;

use crate::codec::{CodecError, CodecResult, DecoderConfig, ReceiveStatus};
use crate::ffi::AVSampleFormat;

/// Player error type
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
  #[error("No usable audio or video stream")]
  NoUsableStream,

  #[error("Context is not prepared")]
  NotPrepared,

  #[error("No {0} stream selected")]
  MissingStream(&'static str),

  #[error("Nothing decoded yet")]
  NoDecodedFrame,

  #[error("Invalid argument: {0}")]
  InvalidArgument(String),

  #[cfg(target_os = "android")]
  #[error("Audio output error: {0}")]
  Audio(#[from] crate::audio::SlError),

  #[error(transparent)]
  Codec(#[from] CodecError),
}

pub type PlayerResult<T> = Result<T, PlayerError>;

/// Outcome of a void-like operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum OptResult {
  OptSuccess = 0,
  OptFail = 1,
}

impl OptResult {
  pub fn as_raw(self) -> i32 {
    self as i32
  }
}

impl<T> From<&PlayerResult<T>> for OptResult {
  fn from(result: &PlayerResult<T>) -> Self {
    match result {
      Ok(_) => OptResult::OptSuccess,
      Err(_) => OptResult::OptFail,
    }
  }
}

/// Packet read and decode outcomes, one numbering shared by both
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum DecodeResult {
  ReadVideoSuccess = 0,
  ReadVideoAttachmentSuccess = 1,
  ReadAudioSuccess = 2,
  ReadSubtitleSuccess = 3,
  ReadEof = 4,
  ReadFail = 5,
  UnknownPkt = 6,
  DecodeSuccess = 7,
  /// A frame came out but the packet was not consumed; hand it in again
  DecodeSuccessAndSkipNextPkt = 8,
  DecodeFail = 9,
  DecodeFailAndNeedMorePkt = 10,
  DecodeEnd = 11,
}

impl DecodeResult {
  pub fn as_raw(self) -> i32 {
    self as i32
  }

  pub fn is_decode_success(self) -> bool {
    matches!(
      self,
      DecodeResult::DecodeSuccess | DecodeResult::DecodeSuccessAndSkipNextPkt
    )
  }
}

/// Map the result of one send/receive round to the code handed to the caller
///
/// `accepted` is false when the decoder refused the packet with EAGAIN, in
/// which case the caller has to hand the same packet in again.
pub fn decode_result(accepted: bool, received: CodecResult<ReceiveStatus>) -> DecodeResult {
  match received {
    Ok(ReceiveStatus::Frame) if accepted => DecodeResult::DecodeSuccess,
    Ok(ReceiveStatus::Frame) => DecodeResult::DecodeSuccessAndSkipNextPkt,
    Ok(ReceiveStatus::NeedMore) => DecodeResult::DecodeFailAndNeedMorePkt,
    Ok(ReceiveStatus::End) => DecodeResult::DecodeEnd,
    Err(e) => {
      tracing::warn!(target: "tmedia", "Receive frame failed: {}", e);
      DecodeResult::DecodeFail
    }
  }
}

/// Layout of a video buffer's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ImageRawType {
  Yuv420p = 0,
  Nv12 = 1,
  Nv21 = 2,
  Rgba = 3,
  HwSurface = 4,
  #[default]
  Unknown = 5,
}

impl ImageRawType {
  pub fn as_raw(self) -> i32 {
    self as i32
  }
}

/// PCM layout the audio path resamples to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioOutputConfig {
  /// 1 or 2
  pub channels: u32,
  pub sample_rate: u32,
  /// 8, 16 or 32
  pub bit_depth: u32,
}

impl Default for AudioOutputConfig {
  fn default() -> Self {
    Self {
      channels: 2,
      sample_rate: 48_000,
      bit_depth: 16,
    }
  }
}

impl AudioOutputConfig {
  /// Reject layouts the audio sink can't play
  pub fn validate(&self) -> PlayerResult<()> {
    if !matches!(self.channels, 1 | 2) {
      return Err(PlayerError::InvalidArgument(format!(
        "Unsupported channel count {}",
        self.channels
      )));
    }
    if self.sample_rate == 0 {
      return Err(PlayerError::InvalidArgument("Sample rate must be positive".into()));
    }
    self.sample_format()?;
    Ok(())
  }

  /// Packed sample format for the configured bit depth
  pub fn sample_format(&self) -> PlayerResult<AVSampleFormat> {
    AVSampleFormat::packed_for_bit_depth(self.bit_depth).ok_or_else(|| {
      PlayerError::InvalidArgument(format!("Unsupported bit depth {}", self.bit_depth))
    })
  }

  /// Bytes of one sample frame (all channels)
  pub fn frame_bytes(&self) -> usize {
    self.channels as usize * (self.bit_depth as usize / 8)
  }
}

/// Subtitle canvas size used when the file has no video stream
pub const DEFAULT_SUBTITLE_CANVAS: (u32, u32) = (1280, 720);

/// Font directory handed to libass, which has no system font provider on Android
#[cfg(target_os = "android")]
pub const DEFAULT_FONT_DIR: Option<&str> = Some("/system/fonts");
#[cfg(not(target_os = "android"))]
pub const DEFAULT_FONT_DIR: Option<&str> = None;

/// Settings for [`MediaPlayerContext::prepare`]
#[derive(Debug, Clone)]
pub struct PrepareConfig {
  /// Try the MediaCodec decoder for video first
  pub request_hw: bool,
  pub audio: AudioOutputConfig,
  pub decoder: DecoderConfig,
  /// Extra directory libass scans for fonts
  pub font_dir: Option<String>,
}

impl Default for PrepareConfig {
  fn default() -> Self {
    Self {
      request_hw: true,
      audio: AudioOutputConfig::default(),
      decoder: DecoderConfig::default(),
      font_dir: DEFAULT_FONT_DIR.map(str::to_string),
    }
  }
}

/// Settings for [`FrameLoaderContext::prepare`]
#[derive(Debug, Clone)]
pub struct LoaderConfig {
  pub decoder: DecoderConfig,
  /// Upper bound of read iterations for one `get_frame`
  pub max_read_iterations: u32,
}

/// Bound on the read/decode loop of the frame loader
pub const MAX_VIDEO_DO_CIRCLE_TIMES: u32 = 5000;

impl Default for LoaderConfig {
  fn default() -> Self {
    Self {
      decoder: DecoderConfig::default(),
      max_read_iterations: MAX_VIDEO_DO_CIRCLE_TIMES,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ffi::FFmpegError;

  #[test]
  fn test_result_codes() {
    assert_eq!(OptResult::OptSuccess.as_raw(), 0);
    assert_eq!(OptResult::OptFail.as_raw(), 1);
    assert_eq!(DecodeResult::ReadVideoSuccess.as_raw(), 0);
    assert_eq!(DecodeResult::UnknownPkt.as_raw(), 6);
    assert_eq!(DecodeResult::DecodeSuccess.as_raw(), 7);
    assert_eq!(DecodeResult::DecodeEnd.as_raw(), 11);
    assert_eq!(ImageRawType::Yuv420p.as_raw(), 0);
    assert_eq!(ImageRawType::HwSurface.as_raw(), 4);
    assert_eq!(ImageRawType::default(), ImageRawType::Unknown);
  }

  #[test]
  fn test_decode_result_mapping() {
    assert_eq!(
      decode_result(true, Ok(ReceiveStatus::Frame)),
      DecodeResult::DecodeSuccess
    );
    assert_eq!(
      decode_result(false, Ok(ReceiveStatus::Frame)),
      DecodeResult::DecodeSuccessAndSkipNextPkt
    );
    assert_eq!(
      decode_result(true, Ok(ReceiveStatus::NeedMore)),
      DecodeResult::DecodeFailAndNeedMorePkt
    );
    assert_eq!(
      decode_result(true, Ok(ReceiveStatus::End)),
      DecodeResult::DecodeEnd
    );
    let err = CodecError::Ffmpeg(FFmpegError::new(-22, "Invalid argument"));
    assert_eq!(decode_result(true, Err(err)), DecodeResult::DecodeFail);
    assert!(DecodeResult::DecodeSuccessAndSkipNextPkt.is_decode_success());
    assert!(!DecodeResult::DecodeFailAndNeedMorePkt.is_decode_success());
  }

  #[test]
  fn test_opt_result_from_player_result() {
    let ok: PlayerResult<()> = Ok(());
    let err: PlayerResult<()> = Err(PlayerError::NotPrepared);
    assert_eq!(OptResult::from(&ok), OptResult::OptSuccess);
    assert_eq!(OptResult::from(&err), OptResult::OptFail);
  }

  #[test]
  fn test_audio_output_config() {
    let config = AudioOutputConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.frame_bytes(), 4);
    assert_eq!(config.sample_format().unwrap(), AVSampleFormat::S16);

    let bad_channels = AudioOutputConfig {
      channels: 6,
      ..config
    };
    assert!(bad_channels.validate().is_err());
    let bad_depth = AudioOutputConfig {
      bit_depth: 24,
      ..config
    };
    assert!(matches!(
      bad_depth.validate(),
      Err(PlayerError::InvalidArgument(_))
    ));
  }

  #[test]
  fn test_prepare_config_uses_default_font_dir() {
    let config = PrepareConfig::default();
    assert_eq!(config.font_dir.as_deref(), DEFAULT_FONT_DIR);
    #[cfg(target_os = "android")]
    assert_eq!(config.font_dir.as_deref(), Some("/system/fonts"));
  }

  #[test]
  fn test_loader_config_default() {
    assert_eq!(LoaderConfig::default().max_read_iterations, 5000);
  }
}
