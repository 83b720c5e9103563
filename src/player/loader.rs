//! Single-frame extraction behind `tMediaFrameLoader`
//!
//! Opens only the video stream of a file with a software decoder and pulls
//! out the frame shown at a position, converted to RGBA. Used for thumbnails
//! and seek previews, independent of any playing [`super::MediaPlayerContext`].

use crate::codec::{
  CodecContext, DemuxerContext, Frame, MediaType, Packet, ReadStatus, Scaler, StreamInfo,
  demuxer::pts_to_ms,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::media::decode_packet;
use super::{DecodeResult, GrowBuffer, LoaderConfig, PlayerError, PlayerResult, convert};

/// Walk decode steps until one yields a frame at or after `target_ms`
///
/// Each step is one read/decode iteration and carries the pts of the frame it
/// produced, if any. Without `need_real_time` the first frame wins. At most
/// `max_iterations` steps are taken; when the target is never reached the
/// last decoded frame is used. Returns the pts of the chosen frame.
pub fn converge_to_target<I>(
  steps: I,
  target_ms: i64,
  need_real_time: bool,
  max_iterations: u32,
) -> Option<i64>
where
  I: IntoIterator<Item = Option<i64>>,
{
  let mut last = None;
  for pts in steps.into_iter().take(max_iterations as usize).flatten() {
    last = Some(pts);
    if !need_real_time || pts >= target_ms {
      break;
    }
  }
  last
}

struct LoaderMedia {
  demuxer: DemuxerContext,
  stream: StreamInfo,
  codec: CodecContext,
  packet: Packet,
  frame: Frame,
  /// Last frame that came out of the decoder
  decoded: Frame,
  scaler: Scaler,
  max_iterations: u32,
}

/// Frame-at-position loader for one file
pub struct FrameLoaderContext {
  interrupt: Arc<AtomicBool>,
  media: Option<LoaderMedia>,
  rgba: GrowBuffer,
  width: u32,
  height: u32,
  pts_ms: i64,
}

impl Default for FrameLoaderContext {
  fn default() -> Self {
    Self::new()
  }
}

impl FrameLoaderContext {
  pub fn new() -> Self {
    Self {
      interrupt: Arc::new(AtomicBool::new(false)),
      media: None,
      rgba: GrowBuffer::new(),
      width: 0,
      height: 0,
      pts_ms: 0,
    }
  }

  /// Abort blocking reads of this loader from another thread
  pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
    Arc::clone(&self.interrupt)
  }

  /// Open the video stream of `path`
  pub fn prepare(&mut self, path: &str, config: &LoaderConfig) -> PlayerResult<()> {
    self.media = None;
    self.interrupt.store(false, Ordering::Release);

    let mut demuxer = DemuxerContext::open(path, self.interrupt_flag())?;
    let stream = {
      let streams = demuxer.streams();
      streams
        .iter()
        .find(|s| s.media_type == MediaType::Video && !s.is_attached_picture())
        .or_else(|| streams.iter().find(|s| s.media_type == MediaType::Video))
        .cloned()
        .ok_or(PlayerError::MissingStream("video"))?
    };
    let par = demuxer.codec_parameters(stream.index).ok_or(PlayerError::MissingStream("video"))?;
    let codec = unsafe {
      CodecContext::open_for_stream(stream.codec_id, par, stream.time_base, &config.decoder)?
    };
    demuxer.discard_all_except(&[stream.index]);

    tracing::debug!(
      target: "tmedia",
      "Frame loader prepared {}: {:?} {}x{}",
      path,
      stream.codec_id,
      stream.width.unwrap_or(0),
      stream.height.unwrap_or(0)
    );
    self.media = Some(LoaderMedia {
      demuxer,
      stream,
      codec,
      packet: Packet::new()?,
      frame: Frame::new()?,
      decoded: Frame::new()?,
      scaler: Scaler::default(),
      max_iterations: config.max_read_iterations,
    });
    Ok(())
  }

  /// Decode the frame at `position_ms` into the RGBA buffer
  ///
  /// Seeks to the keyframe before the position; with `need_real_time` frames
  /// are decoded forward until one reaches the position, otherwise the
  /// keyframe itself is used.
  pub fn get_frame(&mut self, position_ms: i64, need_real_time: bool) -> PlayerResult<()> {
    let media = self.media.as_mut().ok_or(PlayerError::NotPrepared)?;
    let LoaderMedia {
      demuxer,
      stream,
      codec,
      packet,
      frame,
      decoded,
      scaler,
      max_iterations,
    } = media;

    demuxer.seek_to_ms(position_ms.max(0))?;
    codec.flush();
    decoded.unref();

    let stream_index = stream.index;
    let time_base = stream.time_base;
    let mut resend = false;
    let mut draining = false;
    let mut finished = false;

    let steps = std::iter::from_fn(|| {
      if finished {
        return None;
      }
      if !resend && !draining {
        match demuxer.read_packet(packet) {
          Ok(ReadStatus::Packet) if packet.stream_index() != stream_index => return Some(None),
          Ok(ReadStatus::Packet) => {}
          Ok(ReadStatus::Eof) => {
            draining = true;
            packet.unref();
          }
          Err(e) => {
            tracing::warn!(target: "tmedia", "Frame loader read failed: {}", e);
            finished = true;
            return None;
          }
        }
      }

      let result = decode_packet(codec, frame, packet);
      resend = result == DecodeResult::DecodeSuccessAndSkipNextPkt;
      match result {
        r if r.is_decode_success() => {
          std::mem::swap(frame, decoded);
          Some(Some(pts_to_ms(decoded.best_effort_pts(), time_base)))
        }
        DecodeResult::DecodeEnd => {
          finished = true;
          None
        }
        _ => Some(None),
      }
    });

    let pts = converge_to_target(steps, position_ms, need_real_time, *max_iterations)
      .ok_or(PlayerError::NoDecodedFrame)?;

    convert::scale_to_rgba(decoded, scaler, &mut self.rgba)?;
    self.width = decoded.width();
    self.height = decoded.height();
    self.pts_ms = pts;
    Ok(())
  }

  /// RGBA pixels of the last loaded frame, `width * 4` bytes per row
  pub fn rgba(&self) -> &[u8] {
    self.rgba.content()
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn pts_ms(&self) -> i64 {
    self.pts_ms
  }

  /// Container duration in milliseconds, 0 when unknown or not prepared
  pub fn duration_ms(&self) -> i64 {
    self
      .media
      .as_ref()
      .and_then(|m| m.demuxer.duration_ms().or_else(|| m.stream.duration_ms()))
      .unwrap_or(0)
  }

  /// Display size of the video stream
  pub fn video_size(&self) -> Option<(u32, u32)> {
    let stream = &self.media.as_ref()?.stream;
    Some((stream.width.unwrap_or(0), stream.height.unwrap_or(0)))
  }

  pub fn release(&mut self) {
    self.media = None;
  }
}

impl std::fmt::Debug for FrameLoaderContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FrameLoaderContext")
      .field("prepared", &self.media.is_some())
      .field("width", &self.width)
      .field("height", &self.height)
      .field("pts_ms", &self.pts_ms)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::player::MAX_VIDEO_DO_CIRCLE_TIMES;
  use std::cell::Cell;

  #[test]
  fn test_converge_stops_at_target() {
    let taken = Cell::new(0);
    let steps = [Some(0), None, Some(40), Some(80), Some(120), Some(160)]
      .into_iter()
      .inspect(|_| taken.set(taken.get() + 1));
    assert_eq!(converge_to_target(steps, 100, true, 5000), Some(120));
    assert_eq!(taken.get(), 5);
  }

  #[test]
  fn test_converge_without_real_time_takes_first_frame() {
    let steps = [None, None, Some(33), Some(66)];
    assert_eq!(converge_to_target(steps, 1_000, false, 5000), Some(33));
  }

  #[test]
  fn test_converge_is_bounded() {
    let taken = Cell::new(0u32);
    let steps = std::iter::repeat_with(|| {
      taken.set(taken.get() + 1);
      Some(taken.get() as i64)
    });
    let pts = converge_to_target(steps, i64::MAX, true, MAX_VIDEO_DO_CIRCLE_TIMES);
    assert_eq!(taken.get(), MAX_VIDEO_DO_CIRCLE_TIMES);
    assert_eq!(pts, Some(MAX_VIDEO_DO_CIRCLE_TIMES as i64));
  }

  #[test]
  fn test_converge_without_frames() {
    let steps = std::iter::repeat(None);
    assert_eq!(converge_to_target(steps, 0, true, 10), None);
    assert_eq!(converge_to_target(Vec::new(), 0, false, 10), None);
  }

  #[test]
  fn test_converge_uses_last_frame_when_stream_ends() {
    let steps = [Some(10), Some(20), None];
    assert_eq!(converge_to_target(steps, 500, true, 5000), Some(20));
  }

  #[test]
  fn test_unprepared_loader() {
    let mut loader = FrameLoaderContext::new();
    assert!(matches!(loader.get_frame(0, false), Err(PlayerError::NotPrepared)));
    assert_eq!(loader.duration_ms(), 0);
    assert_eq!(loader.video_size(), None);
    assert!(loader.rgba().is_empty());
  }

  #[test]
  fn test_prepare_missing_file_fails() {
    let mut loader = FrameLoaderContext::new();
    let result = loader.prepare("/nonexistent/clip.mp4", &LoaderConfig::default());
    assert!(result.is_err());
  }
}
