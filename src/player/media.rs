//! Demux/decode context behind `tMediaPlayer`
//!
//! The managed player drives everything: it reads packets, routes them to the
//! matching decode call, and moves decoded frames into its own buffers. This
//! context only owns the FFmpeg state and never spawns threads.

use crate::codec::{
  CodecContext, CodecError, CodecResult, DecoderConfig, DemuxerContext, Frame, MediaType, Packet,
  ReadStatus, Resampler, Scaler, StreamInfo, demuxer::pts_to_ms,
};
use crate::ffi::{AVCodecID, AVCodecParameters, AVPixelFormat, AVSampleFormat, disposition};
use std::os::raw::c_void;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::subtitle::SubtitleDecoder;
use super::{
  AudioBuffer, AudioOutputConfig, DEFAULT_SUBTITLE_CANVAS, DecodeResult, PacketHandle,
  PlayerError, PlayerResult, PrepareConfig, SubtitleBuffer, VideoBuffer, convert, decode_result,
};

/// Video stream facts reported to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
  pub stream_index: i32,
  pub width: u32,
  pub height: u32,
  pub fps: f64,
  pub bit_rate: i64,
  pub codec_id: AVCodecID,
  pub pixel_format: AVPixelFormat,
  pub duration_ms: i64,
  /// Clockwise rotation to apply when displaying, 0..360
  pub rotation: i32,
  /// Decoded through MediaCodec
  pub hardware: bool,
  /// The stream is a cover picture, not a movie
  pub attachment: bool,
}

/// Audio stream facts reported to the caller (source format, not the output)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
  pub stream_index: i32,
  pub channels: u32,
  pub sample_rate: u32,
  pub bit_depth: u32,
  pub bytes_per_sample: u32,
  pub bit_rate: i64,
  pub codec_id: AVCodecID,
  pub duration_ms: i64,
}

/// One renderable subtitle stream
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleStreamInfo {
  pub stream_index: i32,
  pub codec_id: AVCodecID,
  pub language: Option<String>,
  pub title: Option<String>,
}

/// Everything known about the opened file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaInfo {
  pub duration_ms: i64,
  pub container_format: Option<String>,
  /// Container tags followed by the tags of the selected streams
  pub metadata: Vec<(String, String)>,
  pub video: Option<VideoInfo>,
  pub audio: Option<AudioInfo>,
  pub subtitles: Vec<SubtitleStreamInfo>,
}

/// Turn FFmpeg's counter-clockwise display matrix angle into a clockwise
/// rotation in 0..360
pub fn display_rotation_degrees(raw: f64) -> i32 {
  if !raw.is_finite() {
    return 0;
  }
  ((-raw).round() as i32).rem_euclid(360)
}

/// Nominal frame duration from a stream's average frame rate
fn frame_duration_ms(stream: &StreamInfo) -> i64 {
  let rate = stream.avg_frame_rate;
  if rate.num > 0 && rate.den > 0 {
    (1000 * rate.den as i64) / rate.num as i64
  } else {
    0
  }
}

/// Send `packet` (a flush when empty) and try to pull one frame
pub(crate) fn decode_packet(
  codec: &mut CodecContext,
  frame: &mut Frame,
  packet: &Packet,
) -> DecodeResult {
  let packet = if packet.is_empty() { None } else { Some(packet) };
  let accepted = match codec.send_packet(packet) {
    Ok(accepted) => accepted,
    Err(e) => {
      tracing::warn!(target: "tmedia", "Send packet failed: {}", e);
      return DecodeResult::DecodeFail;
    }
  };
  decode_result(accepted, codec.receive_frame(frame))
}

struct VideoDecoder {
  stream: StreamInfo,
  codec: CodecContext,
  frame: Frame,
  scaler: Scaler,
  attachment: bool,
  frame_duration_ms: i64,
}

struct AudioDecoder {
  stream: StreamInfo,
  codec: CodecContext,
  frame: Frame,
  resampler: Resampler,
  output: AudioOutputConfig,
  output_format: AVSampleFormat,
}

impl AudioDecoder {
  /// Rebuild the resampler when decoded frames stop matching its input
  fn ensure_resampler(&mut self) -> CodecResult<()> {
    let frame = &self.frame;
    let (channels, rate, format) = (frame.channels(), frame.sample_rate(), frame.sample_format());
    if channels == 0 || rate == 0 || format == AVSampleFormat::None {
      return Ok(());
    }
    if self.resampler.src_channels() == channels
      && self.resampler.src_sample_rate() == rate
      && self.resampler.src_format() == format
    {
      return Ok(());
    }
    tracing::debug!(
      target: "tmedia",
      "Audio input changed to {} ch @ {} Hz {:?}",
      channels,
      rate,
      format
    );
    self.resampler = Resampler::new(
      channels,
      rate,
      format,
      self.output.channels,
      self.output.sample_rate,
      self.output_format,
    )?;
    Ok(())
  }

  /// Resample the last decoded frame into `buffer`
  ///
  /// Content size is output samples x output channels x output bytes per sample.
  fn move_to_buffer(&mut self, buffer: &mut AudioBuffer) -> PlayerResult<()> {
    let samples = self.frame.nb_samples();
    if samples == 0 {
      return Err(PlayerError::NoDecodedFrame);
    }
    self.ensure_resampler()?;

    let written = self.resampler.convert_into(&self.frame, buffer.pcm.storage())?;
    buffer.pcm.set_content_size(written);

    let time_base = self.stream.time_base;
    buffer.pts_ms = pts_to_ms(self.frame.best_effort_pts(), time_base);
    buffer.duration_ms = match pts_to_ms(self.frame.duration(), time_base) {
      d if d > 0 => d,
      _ => {
        let rate = self.frame.sample_rate().max(1) as i64;
        samples as i64 * 1000 / rate
      }
    };
    Ok(())
  }
}

struct PreparedMedia {
  demuxer: DemuxerContext,
  video: Option<VideoDecoder>,
  audio: Option<AudioDecoder>,
  subtitle: Option<SubtitleDecoder>,
  info: MediaInfo,
  canvas: (u32, u32),
  font_dir: Option<String>,
}

impl PreparedMedia {
  fn selected_streams(&self) -> Vec<i32> {
    self
      .video
      .as_ref()
      .map(|v| v.stream.index)
      .into_iter()
      .chain(self.audio.as_ref().map(|a| a.stream.index))
      .chain(self.subtitle.as_ref().map(|s| s.stream_index()))
      .collect()
  }
}

/// Demux/decode state for one opened file
pub struct MediaPlayerContext {
  interrupt: Arc<AtomicBool>,
  media: Option<PreparedMedia>,
}

impl Default for MediaPlayerContext {
  fn default() -> Self {
    Self::new()
  }
}

impl MediaPlayerContext {
  pub fn new() -> Self {
    Self {
      interrupt: Arc::new(AtomicBool::new(false)),
      media: None,
    }
  }

  /// Flag polled by FFmpeg's blocking I/O, shareable with other threads
  pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
    Arc::clone(&self.interrupt)
  }

  /// Make the current and following blocking reads fail
  pub fn request_interrupt(&self) {
    self.interrupt.store(true, Ordering::Release);
  }

  pub fn reset_interrupt(&self) {
    self.interrupt.store(false, Ordering::Release);
  }

  pub fn is_prepared(&self) -> bool {
    self.media.is_some()
  }

  /// Facts about the prepared file
  pub fn info(&self) -> Option<&MediaInfo> {
    self.media.as_ref().map(|m| &m.info)
  }

  fn media(&mut self) -> PlayerResult<&mut PreparedMedia> {
    self.media.as_mut().ok_or(PlayerError::NotPrepared)
  }

  // ========================================================================
  // Prepare
  // ========================================================================

  /// Open `path` and the decoders of the streams that will be played
  ///
  /// `surface` is a JNI reference to an `android.view.Surface` MediaCodec
  /// renders into. Anything previously prepared is released first, and an
  /// earlier interrupt request no longer applies.
  pub fn prepare(
    &mut self,
    path: &str,
    config: &PrepareConfig,
    surface: Option<NonNull<c_void>>,
  ) -> PlayerResult<()> {
    self.media = None;
    self.reset_interrupt();
    config.audio.validate()?;

    let demuxer = DemuxerContext::open(path, self.interrupt_flag())?;
    let streams = demuxer.streams().to_vec();

    let video_stream = streams
      .iter()
      .find(|s| s.media_type == MediaType::Video && !s.is_attached_picture())
      .or_else(|| {
        streams
          .iter()
          .find(|s| s.media_type == MediaType::Video)
      })
      .cloned();
    let audio_stream = streams
      .iter()
      .find(|s| s.media_type == MediaType::Audio)
      .cloned();
    if video_stream.is_none() && audio_stream.is_none() {
      return Err(PlayerError::NoUsableStream);
    }

    let video = match video_stream {
      Some(stream) => Some(open_video(&demuxer, stream, config, surface)?),
      None => None,
    };
    let audio = match audio_stream {
      Some(stream) => Some(open_audio(&demuxer, stream, &config.decoder, config.audio)?),
      None => None,
    };

    let subtitle_streams: Vec<&StreamInfo> = streams
      .iter()
      .filter(|s| s.media_type == MediaType::Subtitle && !s.codec_id.is_bitmap_subtitle())
      .collect();

    let canvas = match &video {
      Some(v) if !v.attachment && v.stream.width.unwrap_or(0) > 0 => (
        v.stream.width.unwrap_or(0),
        v.stream.height.unwrap_or(0),
      ),
      _ => DEFAULT_SUBTITLE_CANVAS,
    };

    let default_subtitle = subtitle_streams
      .iter()
      .find(|s| s.disposition & disposition::DEFAULT != 0)
      .or(subtitle_streams.first());
    let subtitle = default_subtitle.and_then(|stream| {
      open_subtitle(&demuxer, stream, canvas, config.font_dir.as_deref())
        .map_err(|e| {
          tracing::warn!(target: "tmedia", "Subtitle stream {} unusable: {}", stream.index, e);
        })
        .ok()
    });

    let mut metadata = demuxer.metadata();
    for stream in video
      .iter()
      .map(|v| &v.stream)
      .chain(audio.iter().map(|a| &a.stream))
    {
      metadata.extend(stream.metadata.iter().cloned());
    }

    let info = MediaInfo {
      duration_ms: demuxer.duration_ms().unwrap_or(0),
      container_format: demuxer.format_name(),
      metadata,
      video: video.as_ref().map(video_info),
      audio: audio.as_ref().map(audio_info),
      subtitles: subtitle_streams
        .iter()
        .map(|s| SubtitleStreamInfo {
          stream_index: s.index,
          codec_id: s.codec_id,
          language: s.tag("language").map(str::to_string),
          title: s.tag("title").map(str::to_string),
        })
        .collect(),
    };

    let mut media = PreparedMedia {
      demuxer,
      video,
      audio,
      subtitle,
      info,
      canvas,
      font_dir: config.font_dir.clone(),
    };
    let keep = media.selected_streams();
    media.demuxer.discard_all_except(&keep);

    tracing::info!(
      target: "tmedia",
      "Prepared {}: {} ms, video={:?}, audio={:?}, {} subtitle stream(s)",
      path,
      media.info.duration_ms,
      media.info.video.as_ref().map(|v| (v.codec_id, v.width, v.height, v.hardware)),
      media.info.audio.as_ref().map(|a| (a.codec_id, a.channels, a.sample_rate)),
      media.info.subtitles.len()
    );
    self.media = Some(media);
    Ok(())
  }

  /// Switch rendering to the `position`-th subtitle stream of
  /// [`MediaInfo::subtitles`], or turn subtitles off with `None`
  pub fn select_subtitle_stream(&mut self, position: Option<usize>) -> PlayerResult<()> {
    let media = self.media()?;
    let Some(position) = position else {
      media.subtitle = None;
      let keep = media.selected_streams();
      media.demuxer.discard_all_except(&keep);
      return Ok(());
    };

    let index = media
      .info
      .subtitles
      .get(position)
      .map(|s| s.stream_index)
      .ok_or_else(|| PlayerError::InvalidArgument(format!("No subtitle stream #{}", position)))?;
    if media.subtitle.as_ref().map(|s| s.stream_index()) == Some(index) {
      return Ok(());
    }

    let stream = media
      .demuxer
      .get_stream(index)
      .cloned()
      .ok_or(PlayerError::MissingStream("subtitle"))?;
    media.subtitle = None;
    media.subtitle = Some(open_subtitle(
      &media.demuxer,
      &stream,
      media.canvas,
      media.font_dir.as_deref(),
    )?);
    let keep = media.selected_streams();
    media.demuxer.discard_all_except(&keep);
    Ok(())
  }

  /// Position of the active subtitle stream in [`MediaInfo::subtitles`]
  pub fn selected_subtitle_stream(&self) -> Option<usize> {
    let media = self.media.as_ref()?;
    let index = media.subtitle.as_ref()?.stream_index();
    media.info.subtitles.iter().position(|s| s.stream_index == index)
  }

  // ========================================================================
  // Packets
  // ========================================================================

  /// Read the next packet into `handle` and tell which decoder wants it
  pub fn read_packet(&mut self, handle: &mut PacketHandle) -> DecodeResult {
    let Some(media) = self.media.as_mut() else {
      return DecodeResult::ReadFail;
    };
    handle.media_type = None;

    match media.demuxer.read_packet(&mut handle.packet) {
      Ok(ReadStatus::Eof) => {
        handle.packet.unref();
        return DecodeResult::ReadEof;
      }
      Ok(ReadStatus::Packet) => {}
      Err(e) => {
        if DemuxerContext::is_interrupt_error(&e) {
          tracing::debug!(target: "tmedia", "Read interrupted");
        } else {
          tracing::error!(target: "tmedia", "Read packet failed: {}", e);
        }
        return DecodeResult::ReadFail;
      }
    }

    let index = handle.packet.stream_index();
    if let Some(video) = media.video.as_ref().filter(|v| v.stream.index == index) {
      handle.media_type = Some(MediaType::Video);
      handle.time_base = video.stream.time_base;
      return if video.attachment {
        DecodeResult::ReadVideoAttachmentSuccess
      } else {
        DecodeResult::ReadVideoSuccess
      };
    }
    if let Some(audio) = media.audio.as_ref().filter(|a| a.stream.index == index) {
      handle.media_type = Some(MediaType::Audio);
      handle.time_base = audio.stream.time_base;
      return DecodeResult::ReadAudioSuccess;
    }
    if media.subtitle.as_ref().map(|s| s.stream_index()) == Some(index) {
      if let Some(stream) = media.demuxer.get_stream(index) {
        handle.media_type = Some(MediaType::Subtitle);
        handle.time_base = stream.time_base;
        return DecodeResult::ReadSubtitleSuccess;
      }
    }

    handle.packet.unref();
    DecodeResult::UnknownPkt
  }

  /// Seek every stream to the keyframe at or before `position_ms`
  ///
  /// Decoders keep their buffered data; callers flush them afterwards.
  pub fn seek_to(&mut self, position_ms: i64) -> PlayerResult<()> {
    let media = self.media()?;
    media.demuxer.seek_to_ms(position_ms.max(0))?;
    Ok(())
  }

  // ========================================================================
  // Video
  // ========================================================================

  pub fn decode_video(&mut self, handle: &PacketHandle) -> DecodeResult {
    match self.media.as_mut().and_then(|m| m.video.as_mut()) {
      Some(video) => decode_packet(&mut video.codec, &mut video.frame, &handle.packet),
      None => DecodeResult::DecodeFail,
    }
  }

  pub fn flush_video(&mut self) -> PlayerResult<()> {
    let video = self.media()?.video.as_mut().ok_or(PlayerError::MissingStream("video"))?;
    video.codec.flush();
    video.frame.unref();
    Ok(())
  }

  /// Move the last decoded video frame into `buffer`
  pub fn move_video_frame_to_buffer(&mut self, buffer: &mut VideoBuffer) -> PlayerResult<()> {
    let video = self.media()?.video.as_mut().ok_or(PlayerError::MissingStream("video"))?;
    convert::move_frame_to_buffer(
      &mut video.frame,
      video.stream.time_base,
      &mut video.scaler,
      buffer,
    )?;
    if buffer.duration_ms <= 0 {
      buffer.duration_ms = video.frame_duration_ms;
    }
    Ok(())
  }

  // ========================================================================
  // Audio
  // ========================================================================

  pub fn decode_audio(&mut self, handle: &PacketHandle) -> DecodeResult {
    match self.media.as_mut().and_then(|m| m.audio.as_mut()) {
      Some(audio) => decode_packet(&mut audio.codec, &mut audio.frame, &handle.packet),
      None => DecodeResult::DecodeFail,
    }
  }

  /// Flush the decoder and the samples buffered in the resampler
  pub fn flush_audio(&mut self) -> PlayerResult<()> {
    let audio = self.media()?.audio.as_mut().ok_or(PlayerError::MissingStream("audio"))?;
    audio.codec.flush();
    audio.frame.unref();
    audio.resampler.reset()?;
    Ok(())
  }

  /// Resample the last decoded audio frame into `buffer` as interleaved PCM
  pub fn move_audio_frame_to_buffer(&mut self, buffer: &mut AudioBuffer) -> PlayerResult<()> {
    let audio = self.media()?.audio.as_mut().ok_or(PlayerError::MissingStream("audio"))?;
    audio.move_to_buffer(buffer)
  }

  // ========================================================================
  // Subtitles
  // ========================================================================

  pub fn decode_subtitle(&mut self, handle: &PacketHandle) -> DecodeResult {
    match self.media.as_mut().and_then(|m| m.subtitle.as_mut()) {
      Some(subtitle) => subtitle.decode(handle),
      None => DecodeResult::DecodeFail,
    }
  }

  /// Forget pending subtitle packets and every queued libass event
  pub fn flush_subtitle(&mut self) -> PlayerResult<()> {
    let subtitle = self
      .media()?
      .subtitle
      .as_mut()
      .ok_or(PlayerError::MissingStream("subtitle"))?;
    subtitle.flush();
    Ok(())
  }

  /// Render the last decoded subtitle into `buffer`
  pub fn move_subtitle_frame_to_buffer(&mut self, buffer: &mut SubtitleBuffer) -> PlayerResult<()> {
    let subtitle = self
      .media()?
      .subtitle
      .as_mut()
      .ok_or(PlayerError::MissingStream("subtitle"))?;
    subtitle.move_to_buffer(buffer)
  }

  /// Close the file and every decoder
  pub fn release(&mut self) {
    self.media = None;
  }
}

impl std::fmt::Debug for MediaPlayerContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MediaPlayerContext")
      .field("interrupted", &self.interrupt.load(Ordering::Relaxed))
      .field("info", &self.info())
      .finish()
  }
}

// ============================================================================
// Stream Setup
// ============================================================================

fn stream_parameters(
  demuxer: &DemuxerContext,
  stream: &StreamInfo,
) -> PlayerResult<*const AVCodecParameters> {
  demuxer.codec_parameters(stream.index).ok_or_else(|| {
    CodecError::InvalidState(format!("Stream {} has no codec parameters", stream.index)).into()
  })
}

fn open_video(
  demuxer: &DemuxerContext,
  stream: StreamInfo,
  config: &PrepareConfig,
  surface: Option<NonNull<c_void>>,
) -> PlayerResult<VideoDecoder> {
  let par = stream_parameters(demuxer, &stream)?;
  let attachment = stream.is_attached_picture();
  let mut codec = None;

  if config.request_hw && !attachment {
    if cfg!(feature = "hwaccel") {
      match unsafe {
        CodecContext::open_mediacodec_for_stream(stream.codec_id, par, stream.time_base, surface)
      } {
        Ok(ctx) => {
          tracing::info!(
            target: "tmedia",
            "MediaCodec decoder opened for {:?}, surface output: {}",
            stream.codec_id,
            ctx.has_surface()
          );
          codec = Some(ctx);
        }
        Err(e) => tracing::warn!(
          target: "tmedia",
          "MediaCodec decoder unavailable for {:?}, using software: {}",
          stream.codec_id,
          e
        ),
      }
    } else {
      tracing::debug!(target: "tmedia", "Built without hwaccel, decoding video in software");
    }
  }

  let codec = match codec {
    Some(codec) => codec,
    None => unsafe {
      CodecContext::open_for_stream(stream.codec_id, par, stream.time_base, &config.decoder)?
    },
  };

  Ok(VideoDecoder {
    frame_duration_ms: frame_duration_ms(&stream),
    stream,
    codec,
    frame: Frame::new()?,
    scaler: Scaler::default(),
    attachment,
  })
}

fn open_audio(
  demuxer: &DemuxerContext,
  stream: StreamInfo,
  decoder: &DecoderConfig,
  output: AudioOutputConfig,
) -> PlayerResult<AudioDecoder> {
  let par = stream_parameters(demuxer, &stream)?;
  let codec =
    unsafe { CodecContext::open_for_stream(stream.codec_id, par, stream.time_base, decoder)? };
  let output_format = output.sample_format()?;
  let resampler = Resampler::new(
    codec.channels(),
    codec.sample_rate(),
    codec.sample_format(),
    output.channels,
    output.sample_rate,
    output_format,
  )?;

  Ok(AudioDecoder {
    stream,
    codec,
    frame: Frame::new()?,
    resampler,
    output,
    output_format,
  })
}

fn open_subtitle(
  demuxer: &DemuxerContext,
  stream: &StreamInfo,
  canvas: (u32, u32),
  font_dir: Option<&str>,
) -> PlayerResult<SubtitleDecoder> {
  let par = stream_parameters(demuxer, stream)?;
  unsafe { SubtitleDecoder::open(stream, par, canvas, font_dir) }
}

fn video_info(video: &VideoDecoder) -> VideoInfo {
  let stream = &video.stream;
  let bit_rate = match stream.bit_rate {
    0 => video.codec.bit_rate(),
    rate => rate,
  };
  VideoInfo {
    stream_index: stream.index,
    width: stream.width.unwrap_or_else(|| video.codec.width()),
    height: stream.height.unwrap_or_else(|| video.codec.height()),
    fps: stream.avg_frame_rate.as_f64(),
    bit_rate,
    codec_id: stream.codec_id,
    pixel_format: stream.pixel_format.unwrap_or(AVPixelFormat::None),
    duration_ms: stream.duration_ms().unwrap_or(0),
    rotation: display_rotation_degrees(stream.rotation),
    hardware: video.codec.is_hardware(),
    attachment: video.attachment,
  }
}

fn audio_info(audio: &AudioDecoder) -> AudioInfo {
  let stream = &audio.stream;
  let format = audio.codec.sample_format();
  let bytes_per_sample = format.bytes_per_sample() as u32;
  let bit_depth = match stream.bits_per_raw_sample {
    bits if bits > 0 => bits as u32,
    _ => bytes_per_sample * 8,
  };
  let bit_rate = match stream.bit_rate {
    0 => audio.codec.bit_rate(),
    rate => rate,
  };
  AudioInfo {
    stream_index: stream.index,
    channels: audio.codec.channels(),
    sample_rate: audio.codec.sample_rate(),
    bit_depth,
    bytes_per_sample,
    bit_rate,
    codec_id: stream.codec_id,
    duration_ms: stream.duration_ms().unwrap_or(0),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ffi::AVRational;

  #[test]
  fn test_display_rotation() {
    assert_eq!(display_rotation_degrees(0.0), 0);
    assert_eq!(display_rotation_degrees(-90.0), 90);
    assert_eq!(display_rotation_degrees(90.0), 270);
    assert_eq!(display_rotation_degrees(180.0), 180);
    assert_eq!(display_rotation_degrees(-180.0), 180);
    assert_eq!(display_rotation_degrees(f64::NAN), 0);
  }

  #[test]
  fn test_unprepared_context() {
    let mut ctx = MediaPlayerContext::new();
    assert!(!ctx.is_prepared());
    assert!(ctx.info().is_none());

    let mut handle = PacketHandle::new().unwrap();
    assert_eq!(ctx.read_packet(&mut handle), DecodeResult::ReadFail);
    assert_eq!(ctx.decode_video(&handle), DecodeResult::DecodeFail);
    assert_eq!(ctx.decode_audio(&handle), DecodeResult::DecodeFail);
    assert_eq!(ctx.decode_subtitle(&handle), DecodeResult::DecodeFail);
    assert!(matches!(ctx.seek_to(1000), Err(PlayerError::NotPrepared)));
    assert!(matches!(ctx.flush_video(), Err(PlayerError::NotPrepared)));
    assert!(matches!(
      ctx.select_subtitle_stream(Some(0)),
      Err(PlayerError::NotPrepared)
    ));
    assert_eq!(ctx.selected_subtitle_stream(), None);
  }

  #[test]
  fn test_interrupt_flag_is_shared() {
    let ctx = MediaPlayerContext::new();
    let flag = ctx.interrupt_flag();
    ctx.request_interrupt();
    assert!(flag.load(Ordering::Acquire));
    ctx.reset_interrupt();
    assert!(!flag.load(Ordering::Acquire));
  }

  #[test]
  fn test_prepare_missing_file_fails() {
    let mut ctx = MediaPlayerContext::new();
    let result = ctx.prepare("/nonexistent/movie.mkv", &PrepareConfig::default(), None);
    assert!(matches!(result, Err(PlayerError::Codec(_))));
    assert!(!ctx.is_prepared());
  }

  #[test]
  fn test_prepare_rejects_bad_audio_config() {
    let mut ctx = MediaPlayerContext::new();
    let mut config = PrepareConfig::default();
    config.audio.bit_depth = 12;
    let result = ctx.prepare("/nonexistent/movie.mkv", &config, None);
    assert!(matches!(result, Err(PlayerError::InvalidArgument(_))));
  }

  #[test]
  fn test_prepare_clears_interrupt_request() {
    let mut ctx = MediaPlayerContext::new();
    ctx.request_interrupt();
    let _ = ctx.prepare("/nonexistent/movie.mkv", &PrepareConfig::default(), None);
    assert!(!ctx.interrupt_flag().load(Ordering::Acquire));
  }

  /// Interleaved s16 payload of `samples` sample frames
  fn pcm_packet(samples: usize, channels: usize) -> Packet {
    let data: Vec<u8> = (0..samples * channels * 2).map(|i| (i % 251) as u8).collect();
    Packet::from_bytes(&data).unwrap()
  }

  #[test]
  fn test_decode_packet_produces_frame() {
    let mut codec = CodecContext::open_pcm_s16le(44_100, 2).unwrap();
    let mut frame = Frame::new().unwrap();
    let packet = pcm_packet(256, 2);
    assert_eq!(decode_packet(&mut codec, &mut frame, &packet), DecodeResult::DecodeSuccess);
    assert_eq!(frame.nb_samples(), 256);
  }

  #[test]
  fn test_decode_packet_full_decoder_keeps_packet() {
    let mut codec = CodecContext::open_pcm_s16le(44_100, 2).unwrap();
    let mut frame = Frame::new().unwrap();
    // One decoded frame waiting for output plus one packet queued behind it
    assert!(codec.send_packet(Some(&pcm_packet(64, 2))).unwrap());
    assert!(codec.send_packet(Some(&pcm_packet(64, 2))).unwrap());

    let packet = pcm_packet(32, 2);
    assert_eq!(
      decode_packet(&mut codec, &mut frame, &packet),
      DecodeResult::DecodeSuccessAndSkipNextPkt
    );
    assert_eq!(frame.nb_samples(), 64);
  }

  #[test]
  fn test_decode_packet_empty_packet_drains() {
    let mut codec = CodecContext::open_pcm_s16le(44_100, 2).unwrap();
    let mut frame = Frame::new().unwrap();
    let packet = pcm_packet(128, 2);
    assert_eq!(decode_packet(&mut codec, &mut frame, &packet), DecodeResult::DecodeSuccess);

    let empty = Packet::new().unwrap();
    assert_eq!(decode_packet(&mut codec, &mut frame, &empty), DecodeResult::DecodeEnd);
    assert_eq!(decode_packet(&mut codec, &mut frame, &empty), DecodeResult::DecodeEnd);
  }

  #[test]
  fn test_decode_packet_bad_payload_fails() {
    let mut codec = CodecContext::open_pcm_s16le(44_100, 2).unwrap();
    let mut frame = Frame::new().unwrap();
    // Shorter than one stereo s16 sample frame
    let packet = Packet::from_bytes(&[1]).unwrap();
    assert_eq!(decode_packet(&mut codec, &mut frame, &packet), DecodeResult::DecodeFail);
  }

  #[test]
  fn test_audio_buffer_size_follows_output_format() {
    let codec = CodecContext::open_pcm_s16le(44_100, 2).unwrap();
    let output = AudioOutputConfig {
      channels: 1,
      sample_rate: 44_100,
      bit_depth: 32,
    };
    let output_format = output.sample_format().unwrap();
    let resampler = Resampler::new(
      codec.channels(),
      codec.sample_rate(),
      codec.sample_format(),
      output.channels,
      output.sample_rate,
      output_format,
    )
    .unwrap();
    let stream = StreamInfo {
      index: 0,
      media_type: MediaType::Audio,
      codec_id: AVCodecID::PcmS16le,
      width: None,
      height: None,
      pixel_format: None,
      sample_rate: Some(44_100),
      channels: Some(2),
      sample_format: Some(AVSampleFormat::S16),
      time_base: AVRational::new(1, 44_100),
      duration: None,
      avg_frame_rate: AVRational::new(0, 0),
      bit_rate: 0,
      bits_per_raw_sample: 0,
      disposition: 0,
      rotation: 0.0,
      metadata: Vec::new(),
    };
    let mut audio = AudioDecoder {
      stream,
      codec,
      frame: Frame::new().unwrap(),
      resampler,
      output,
      output_format,
    };

    let mut buffer = AudioBuffer::new();
    assert!(matches!(
      audio.move_to_buffer(&mut buffer),
      Err(PlayerError::NoDecodedFrame)
    ));

    let packet = pcm_packet(441, 2);
    assert_eq!(
      decode_packet(&mut audio.codec, &mut audio.frame, &packet),
      DecodeResult::DecodeSuccess
    );
    audio.move_to_buffer(&mut buffer).unwrap();
    // samples x channels x bytes per sample of the output
    assert_eq!(buffer.pcm.content_size(), 441 * 4);
    assert_eq!(buffer.duration_ms, 10);
  }

  #[test]
  fn test_frame_duration_from_rate() {
    let stream = StreamInfo {
      index: 0,
      media_type: MediaType::Video,
      codec_id: AVCodecID::H264,
      width: Some(1920),
      height: Some(1080),
      pixel_format: Some(AVPixelFormat::Yuv420p),
      sample_rate: None,
      channels: None,
      sample_format: None,
      time_base: AVRational::new(1, 90000),
      duration: None,
      avg_frame_rate: AVRational::new(25, 1),
      bit_rate: 0,
      bits_per_raw_sample: 0,
      disposition: 0,
      rotation: 0.0,
      metadata: Vec::new(),
    };
    assert_eq!(frame_duration_ms(&stream), 40);
    let unknown = StreamInfo {
      avg_frame_rate: AVRational::new(0, 0),
      ..stream
    };
    assert_eq!(frame_duration_ms(&unknown), 0);
  }
}
