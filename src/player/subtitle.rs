//! Text subtitle decoding and rendering
//!
//! FFmpeg decodes every text subtitle format to ASS event lines. Those are
//! fed into one persistent libass track per stream and rendered on demand into
//! an RGBA canvas the size of the video.

use crate::codec::{
  CodecContext, CodecError, CodecResult, DecoderConfig, StreamInfo, Subtitle, demuxer::pts_to_ms,
};
use crate::ffi::libass::{
  ASS_Image, ASS_Library, ASS_Renderer, ASS_Track, ass_flush_events, ass_free_track,
  ass_library_done, ass_library_init, ass_new_track, ass_process_codec_private, ass_process_data,
  ass_prune_events, ass_render_frame, ass_renderer_done, ass_renderer_init, ass_set_extract_fonts,
  ass_set_fonts, ass_set_fonts_dir, ass_set_frame_size, ass_set_storage_size, font_provider,
};
use crate::ffi::{AV_NOPTS_VALUE, AVCodecParameters, AVRational, AVSubtitleType};
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::ptr::{self, NonNull};

use super::{DecodeResult, PacketHandle, PlayerError, PlayerResult, SubtitleBuffer};

/// Header used when the decoder provides none
const DEFAULT_ASS_HEADER: &str = "[Script Info]\n\
ScriptType: v4.00+\n\
PlayResX: 384\n\
PlayResY: 288\n\
ScaledBorderAndShadow: yes\n\
\n\
[V4+ Styles]\n\
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, \
Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, \
Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
Style: Default,Arial,16,&Hffffff,&Hffffff,&H0,&H0,0,0,0,0,100,100,0,0,1,1,0,2,10,10,10,0\n\
\n\
[Events]\n\
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n";

/// Format milliseconds as an ASS timestamp (`H:MM:SS.cc`)
pub fn format_ass_time(ms: i64) -> String {
  let ms = ms.max(0);
  let centis = (ms / 10) % 100;
  let total_secs = ms / 1000;
  let hours = total_secs / 3600;
  let minutes = (total_secs % 3600) / 60;
  let seconds = total_secs % 60;
  format!("{hours}:{minutes:02}:{seconds:02}.{centis:02}")
}

/// Rewrite one of FFmpeg's event lines into a full `Dialogue:` line
///
/// FFmpeg emits `ReadOrder,Layer,Style,Name,MarginL,MarginR,MarginV,Effect,Text`;
/// libass wants `Dialogue: Layer,Start,End,Style,...,Text`. Lines with fewer
/// fields are rejected.
pub fn ass_event_to_dialogue(event: &str, start_ms: i64, end_ms: i64) -> Option<String> {
  let mut fields = event.splitn(3, ',');
  let _read_order = fields.next()?;
  let layer = fields.next()?;
  let rest = fields.next()?;
  if rest.splitn(7, ',').count() < 7 {
    return None;
  }
  Some(format!(
    "Dialogue: {},{},{},{}",
    layer,
    format_ass_time(start_ms),
    format_ass_time(end_ms),
    rest
  ))
}

/// Text field of one of FFmpeg's event lines
pub fn event_text(event: &str) -> &str {
  event.splitn(9, ',').nth(8).unwrap_or("")
}

/// Remove `{...}` override blocks and turn ASS line breaks into '\n'
pub fn strip_override_tags(text: &str) -> String {
  let mut result = String::with_capacity(text.len());
  let mut in_tag = false;

  for c in text.chars() {
    if c == '{' && !in_tag {
      in_tag = true;
    } else if c == '}' && in_tag {
      in_tag = false;
    } else if !in_tag {
      result.push(c);
    }
  }

  result
    .replace("\\N", "\n")
    .replace("\\n", "\n")
    .replace("\\h", " ")
    .trim()
    .to_string()
}

/// Borrowed view of one libass glyph bitmap
#[derive(Debug, Clone, Copy)]
pub struct AssBitmap<'a> {
  pub width: usize,
  pub height: usize,
  pub stride: usize,
  /// 8-bit coverage, `stride` bytes per row
  pub coverage: &'a [u8],
  /// 0xRRGGBBAA, AA is transparency (0 = opaque)
  pub color: u32,
  pub dst_x: i32,
  pub dst_y: i32,
}

impl<'a> AssBitmap<'a> {
  /// # Safety
  /// `image` must come from `ass_render_frame` and the renderer must not
  /// have rendered again since.
  unsafe fn from_image(image: &'a ASS_Image) -> Option<Self> {
    if image.bitmap.is_null() || image.w <= 0 || image.h <= 0 || image.stride < image.w {
      return None;
    }
    let (width, height, stride) = (image.w as usize, image.h as usize, image.stride as usize);
    let len = stride * (height - 1) + width;
    Some(Self {
      width,
      height,
      stride,
      coverage: unsafe { std::slice::from_raw_parts(image.bitmap, len) },
      color: image.color,
      dst_x: image.dst_x,
      dst_y: image.dst_y,
    })
  }
}

/// Alpha-blend one glyph bitmap over a non-premultiplied RGBA canvas
///
/// Parts of the bitmap outside the canvas are clipped.
pub fn blend_bitmap(
  canvas: &mut [u8],
  canvas_width: usize,
  canvas_height: usize,
  image: &AssBitmap<'_>,
) {
  let r = (image.color >> 24) & 0xff;
  let g = (image.color >> 16) & 0xff;
  let b = (image.color >> 8) & 0xff;
  let opacity = 255 - (image.color & 0xff);
  if opacity == 0 {
    return;
  }

  for row in 0..image.height {
    let y = image.dst_y as i64 + row as i64;
    if y < 0 || y >= canvas_height as i64 {
      continue;
    }
    for col in 0..image.width {
      let x = image.dst_x as i64 + col as i64;
      if x < 0 || x >= canvas_width as i64 {
        continue;
      }
      let coverage = image.coverage[row * image.stride + col] as u32;
      let src_a = opacity * coverage / 255;
      if src_a == 0 {
        continue;
      }

      let offset = (y as usize * canvas_width + x as usize) * 4;
      let Some(px) = canvas.get_mut(offset..offset + 4) else {
        continue;
      };
      let dst_a = px[3] as u32;
      let keep = dst_a * (255 - src_a) / 255;
      let out_a = src_a + keep;
      for (channel, src) in px.iter_mut().take(3).zip([r, g, b]) {
        *channel = ((src * src_a + *channel as u32 * keep) / out_a) as u8;
      }
      px[3] = out_a as u8;
    }
  }
}

/// libass library, renderer and one track
pub struct AssRenderer {
  library: NonNull<ASS_Library>,
  renderer: NonNull<ASS_Renderer>,
  track: NonNull<ASS_Track>,
  width: u32,
  height: u32,
}

impl AssRenderer {
  /// Create a renderer drawing into a `width` x `height` canvas
  ///
  /// `header` is the decoder's ASS header; a plain default style is used
  /// without one.
  pub fn new(
    header: Option<&[u8]>,
    width: u32,
    height: u32,
    font_dir: Option<&str>,
  ) -> CodecResult<Self> {
    let library = NonNull::new(unsafe { ass_library_init() })
      .ok_or(CodecError::AllocationFailed("ASS_Library"))?;

    let renderer = match NonNull::new(unsafe { ass_renderer_init(library.as_ptr()) }) {
      Some(renderer) => renderer,
      None => {
        unsafe { ass_library_done(library.as_ptr()) };
        return Err(CodecError::AllocationFailed("ASS_Renderer"));
      }
    };

    let track = match NonNull::new(unsafe { ass_new_track(library.as_ptr()) }) {
      Some(track) => track,
      None => {
        unsafe {
          ass_renderer_done(renderer.as_ptr());
          ass_library_done(library.as_ptr());
        }
        return Err(CodecError::AllocationFailed("ASS_Track"));
      }
    };

    let this = Self {
      library,
      renderer,
      track,
      width,
      height,
    };

    let font_dir = font_dir
      .map(CString::new)
      .transpose()
      .map_err(|_| CodecError::InvalidConfig("Invalid font directory".into()))?;
    let family = c"sans-serif";
    unsafe {
      ass_set_extract_fonts(library.as_ptr(), 1);
      if let Some(dir) = &font_dir {
        ass_set_fonts_dir(library.as_ptr(), dir.as_ptr());
      }
      ass_set_frame_size(renderer.as_ptr(), width as c_int, height as c_int);
      ass_set_storage_size(renderer.as_ptr(), width as c_int, height as c_int);
      ass_set_fonts(
        renderer.as_ptr(),
        ptr::null(),
        family.as_ptr(),
        font_provider::AUTODETECT,
        ptr::null(),
        1,
      );

      let mut header = header.unwrap_or(DEFAULT_ASS_HEADER.as_bytes()).to_vec();
      ass_process_codec_private(
        track.as_ptr(),
        header.as_mut_ptr() as *mut c_char,
        header.len() as c_int,
      );
    }

    Ok(this)
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  /// Append one complete `Dialogue:` line to the track
  pub fn process_dialogue(&mut self, line: &str) {
    let mut data = line.as_bytes().to_vec();
    unsafe {
      ass_process_data(
        self.track.as_ptr(),
        data.as_mut_ptr() as *mut c_char,
        data.len() as c_int,
      );
    }
  }

  /// Drop every event from the track
  pub fn flush_events(&mut self) {
    unsafe { ass_flush_events(self.track.as_ptr()) }
  }

  /// Drop the events that ended before `deadline_ms`
  pub fn prune_events(&mut self, deadline_ms: i64) {
    unsafe { ass_prune_events(self.track.as_ptr(), deadline_ms) }
  }

  /// Events currently held by the track
  pub fn event_count(&self) -> usize {
    unsafe { (*self.track.as_ptr()).n_events.max(0) as usize }
  }

  /// Draw the events active at `now_ms` over `canvas` (RGBA, width x height)
  ///
  /// Returns the number of glyph bitmaps blended.
  pub fn render(&mut self, now_ms: i64, canvas: &mut [u8]) -> usize {
    let mut detect_change: c_int = 0;
    let mut image = unsafe {
      ass_render_frame(
        self.renderer.as_ptr(),
        self.track.as_ptr(),
        now_ms,
        &mut detect_change,
      )
    };

    let mut blended = 0;
    while let Some(current) = unsafe { image.as_ref() } {
      if let Some(bitmap) = unsafe { AssBitmap::from_image(current) } {
        blend_bitmap(canvas, self.width as usize, self.height as usize, &bitmap);
        blended += 1;
      }
      image = current.next;
    }
    blended
  }
}

impl Drop for AssRenderer {
  fn drop(&mut self) {
    unsafe {
      ass_free_track(self.track.as_ptr());
      ass_renderer_done(self.renderer.as_ptr());
      ass_library_done(self.library.as_ptr());
    }
  }
}

unsafe impl Send for AssRenderer {}

impl std::fmt::Debug for AssRenderer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AssRenderer")
      .field("width", &self.width)
      .field("height", &self.height)
      .finish()
  }
}

/// The last decoded subtitle event
#[derive(Debug, Clone, PartialEq, Eq)]
struct SubtitleEvent {
  start_ms: i64,
  end_ms: i64,
  text: String,
}

/// Decoder plus renderer for one subtitle stream
#[derive(Debug)]
pub struct SubtitleDecoder {
  stream_index: i32,
  time_base: AVRational,
  codec: CodecContext,
  subtitle: Subtitle,
  renderer: AssRenderer,
  event: Option<SubtitleEvent>,
}

impl SubtitleDecoder {
  /// Open the decoder of `stream` and a renderer for a `canvas` sized image
  ///
  /// # Safety
  /// `par` must be the codec parameters of `stream`, owned by a live demuxer.
  pub unsafe fn open(
    stream: &StreamInfo,
    par: *const AVCodecParameters,
    canvas: (u32, u32),
    font_dir: Option<&str>,
  ) -> PlayerResult<Self> {
    if stream.codec_id.is_bitmap_subtitle() {
      let msg = format!("Bitmap subtitles ({:?}) are not rendered", stream.codec_id);
      return Err(CodecError::Subtitle(msg).into());
    }
    let config = DecoderConfig { thread_count: 1 };
    let codec =
      unsafe { CodecContext::open_for_stream(stream.codec_id, par, stream.time_base, &config)? };
    let renderer = AssRenderer::new(codec.subtitle_header(), canvas.0, canvas.1, font_dir)?;
    Ok(Self {
      stream_index: stream.index,
      time_base: stream.time_base,
      codec,
      subtitle: Subtitle::new()?,
      renderer,
      event: None,
    })
  }

  pub fn stream_index(&self) -> i32 {
    self.stream_index
  }

  /// Decode one subtitle packet and queue its events on the libass track
  pub fn decode(&mut self, handle: &PacketHandle) -> DecodeResult {
    if handle.packet.is_empty() {
      return DecodeResult::DecodeEnd;
    }
    match self.codec.decode_subtitle(&handle.packet, &mut self.subtitle) {
      Ok(true) => {}
      Ok(false) => return DecodeResult::DecodeFailAndNeedMorePkt,
      Err(e) => {
        tracing::warn!(target: "tmedia", "Subtitle decode failed: {}", e);
        return DecodeResult::DecodeFail;
      }
    }

    let base_ms = match self.subtitle.pts() {
      AV_NOPTS_VALUE => handle.pts_ms(),
      pts => pts_to_ms(pts, AVRational::MICROSECONDS),
    };
    let start_ms = base_ms + self.subtitle.start_display_time() as i64;
    let end_ms = match self.subtitle.end_display_time() {
      0 | u32::MAX => start_ms + handle.duration_ms(),
      end => base_ms + end as i64,
    };

    // Only the newest event is ever rendered, so the track holds what is
    // still on screen at its start
    self.renderer.prune_events(start_ms);

    let mut lines = Vec::new();
    for rect in self.subtitle.rects() {
      match (rect.kind, rect.ass, rect.text) {
        (AVSubtitleType::Ass, Some(event), _) => {
          match ass_event_to_dialogue(&event, start_ms, end_ms) {
            Some(dialogue) => self.renderer.process_dialogue(&dialogue),
            None => tracing::debug!(target: "tmedia", "Skipping malformed ASS event: {}", event),
          }
          let text = strip_override_tags(event_text(&event));
          if !text.is_empty() {
            lines.push(text);
          }
        }
        (AVSubtitleType::Text, _, Some(text)) => lines.push(text.trim().to_string()),
        _ => {}
      }
    }
    self.subtitle.clear();

    self.event = Some(SubtitleEvent {
      start_ms,
      end_ms,
      text: lines.join("\n"),
    });
    DecodeResult::DecodeSuccess
  }

  /// Render the last decoded event into `buffer`
  pub fn move_to_buffer(&mut self, buffer: &mut SubtitleBuffer) -> PlayerResult<()> {
    let event = self.event.take().ok_or(PlayerError::NoDecodedFrame)?;
    let (width, height) = (self.renderer.width(), self.renderer.height());
    let canvas = buffer.rgba.ensure(width as usize * height as usize * 4);
    canvas.fill(0);
    self.renderer.render(event.start_ms, canvas);

    buffer.start_ms = event.start_ms;
    buffer.end_ms = event.end_ms;
    buffer.width = width;
    buffer.height = height;
    buffer.text = event.text;
    Ok(())
  }

  /// Forget buffered packets and every queued event (after a seek)
  pub fn flush(&mut self) {
    self.codec.flush();
    self.renderer.flush_events();
    self.event = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_format_ass_time() {
    assert_eq!(format_ass_time(0), "0:00:00.00");
    assert_eq!(format_ass_time(1_234), "0:00:01.23");
    assert_eq!(format_ass_time(61_005), "0:01:01.00");
    assert_eq!(format_ass_time(3_723_450), "1:02:03.45");
    assert_eq!(format_ass_time(36_000_000), "10:00:00.00");
    assert_eq!(format_ass_time(-50), "0:00:00.00");
  }

  #[test]
  fn test_event_to_dialogue() {
    let event = "3,0,Default,,0,0,0,,Hello, world";
    assert_eq!(
      ass_event_to_dialogue(event, 1_000, 2_500).as_deref(),
      Some("Dialogue: 0,0:00:01.00,0:00:02.50,Default,,0,0,0,,Hello, world")
    );
    assert_eq!(ass_event_to_dialogue("1,0,Default", 0, 10), None);
    assert_eq!(ass_event_to_dialogue("", 0, 10), None);
  }

  #[test]
  fn test_ended_events_are_pruned() {
    let mut renderer = AssRenderer::new(None, 64, 36, None).unwrap();
    let first = ass_event_to_dialogue("0,0,Default,,0,0,0,,first", 0, 1_000).unwrap();
    let second = ass_event_to_dialogue("1,0,Default,,0,0,0,,second", 2_000, 3_000).unwrap();
    renderer.process_dialogue(&first);
    renderer.process_dialogue(&second);
    assert_eq!(renderer.event_count(), 2);

    renderer.prune_events(1_500);
    assert_eq!(renderer.event_count(), 1);
    renderer.flush_events();
    assert_eq!(renderer.event_count(), 0);
  }

  #[test]
  fn test_renderer_font_dir() {
    assert!(AssRenderer::new(None, 64, 36, Some("/nonexistent/fonts")).is_ok());
    assert!(matches!(
      AssRenderer::new(None, 64, 36, Some("bad\0dir")),
      Err(CodecError::InvalidConfig(_))
    ));
  }

  #[test]
  fn test_event_text() {
    assert_eq!(event_text("3,0,Default,,0,0,0,,Hello, world"), "Hello, world");
    assert_eq!(event_text("3,0,Default"), "");
  }

  #[test]
  fn test_strip_override_tags() {
    assert_eq!(strip_override_tags("{\\i1}Hello{\\i0}"), "Hello");
    assert_eq!(strip_override_tags("Line one\\NLine two"), "Line one\nLine two");
    assert_eq!(strip_override_tags("{\\pos(10,10)}  padded\\h "), "padded");
    assert_eq!(strip_override_tags("no tags"), "no tags");
  }

  #[test]
  fn test_blend_opaque_onto_empty() {
    let mut canvas = vec![0u8; 2 * 2 * 4];
    let coverage = [255u8];
    let bitmap = AssBitmap {
      width: 1,
      height: 1,
      stride: 1,
      coverage: &coverage,
      color: 0x10_20_30_00,
      dst_x: 1,
      dst_y: 1,
    };
    blend_bitmap(&mut canvas, 2, 2, &bitmap);
    assert_eq!(&canvas[12..16], &[0x10, 0x20, 0x30, 255]);
    assert!(canvas[..12].iter().all(|&b| b == 0));
  }

  #[test]
  fn test_blend_partial_coverage() {
    let mut canvas = vec![0u8; 4];
    let coverage = [255u8];
    let bitmap = AssBitmap {
      width: 1,
      height: 1,
      stride: 1,
      coverage: &coverage,
      // half transparent white
      color: 0xff_ff_ff_80,
      dst_x: 0,
      dst_y: 0,
    };
    blend_bitmap(&mut canvas, 1, 1, &bitmap);
    assert_eq!(&canvas[..3], &[255, 255, 255]);
    assert_eq!(canvas[3], 127);

    // Black over the half transparent white pixel
    let black = AssBitmap {
      color: 0x00_00_00_00,
      ..bitmap
    };
    blend_bitmap(&mut canvas, 1, 1, &black);
    assert_eq!(&canvas, &[0, 0, 0, 255]);
  }

  #[test]
  fn test_blend_clips_to_canvas() {
    let mut canvas = vec![0u8; 2 * 2 * 4];
    let coverage = [255u8; 9];
    let bitmap = AssBitmap {
      width: 3,
      height: 3,
      stride: 3,
      coverage: &coverage,
      color: 0xff_00_00_00,
      dst_x: -1,
      dst_y: -1,
    };
    blend_bitmap(&mut canvas, 2, 2, &bitmap);
    assert_eq!(&canvas[..4], &[255, 0, 0, 255]);
    assert_eq!(&canvas[4..8], &[255, 0, 0, 255]);
    assert_eq!(&canvas[8..12], &[255, 0, 0, 255]);
    assert_eq!(&canvas[12..16], &[255, 0, 0, 255]);
  }

  #[test]
  fn test_blend_skips_fully_transparent() {
    let mut canvas = vec![9u8; 4];
    let coverage = [255u8];
    let bitmap = AssBitmap {
      width: 1,
      height: 1,
      stride: 1,
      coverage: &coverage,
      color: 0xff_ff_ff_ff,
      dst_x: 0,
      dst_y: 0,
    };
    blend_bitmap(&mut canvas, 1, 1, &bitmap);
    assert_eq!(canvas, vec![9, 9, 9, 9]);
  }
}
