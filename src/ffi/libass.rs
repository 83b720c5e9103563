//! libass function declarations
//!
//! Text subtitles are kept in a persistent ASS track and rasterized per
//! timestamp. `ASS_Image` is public ABI and declared with its real layout;
//! library, renderer and track are opaque.

#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_int, c_longlong, c_uchar};

#[repr(C)]
pub struct ASS_Library {
  _opaque: [u8; 0],
}

#[repr(C)]
pub struct ASS_Renderer {
  _opaque: [u8; 0],
}

/// Leading fields of ASS_Track; the rest is only touched by libass
#[repr(C)]
pub struct ASS_Track {
  pub n_styles: c_int,
  pub max_styles: c_int,
  pub n_events: c_int,
  pub max_events: c_int,
  _rest: [u8; 0],
}

/// One rendered glyph run: an 8-bit coverage bitmap tinted with `color`
#[repr(C)]
pub struct ASS_Image {
  pub w: c_int,
  pub h: c_int,
  pub stride: c_int,
  pub bitmap: *mut c_uchar,
  /// 0xRRGGBBAA, where AA is transparency (0 = opaque)
  pub color: u32,
  pub dst_x: c_int,
  pub dst_y: c_int,
  pub next: *mut ASS_Image,
  pub kind: c_int,
}

/// Font provider selection for `ass_set_fonts`
pub mod font_provider {
  use std::os::raw::c_int;

  pub const NONE: c_int = 0;
  pub const AUTODETECT: c_int = 1;
}

unsafe extern "C" {
  pub fn ass_library_init() -> *mut ASS_Library;
  pub fn ass_library_done(library: *mut ASS_Library);
  pub fn ass_set_extract_fonts(library: *mut ASS_Library, extract: c_int);
  /// Additional directory scanned for font files
  pub fn ass_set_fonts_dir(library: *mut ASS_Library, fonts_dir: *const c_char);

  pub fn ass_renderer_init(library: *mut ASS_Library) -> *mut ASS_Renderer;
  pub fn ass_renderer_done(renderer: *mut ASS_Renderer);
  pub fn ass_set_frame_size(renderer: *mut ASS_Renderer, w: c_int, h: c_int);
  pub fn ass_set_storage_size(renderer: *mut ASS_Renderer, w: c_int, h: c_int);

  /// Configure font lookup; `update` non-zero rebuilds the font cache immediately
  pub fn ass_set_fonts(
    renderer: *mut ASS_Renderer,
    default_font: *const c_char,
    default_family: *const c_char,
    dfp: c_int,
    config: *const c_char,
    update: c_int,
  );

  pub fn ass_new_track(library: *mut ASS_Library) -> *mut ASS_Track;
  pub fn ass_free_track(track: *mut ASS_Track);

  /// Parse the `[Script Info]`/`[V4+ Styles]` header carried as codec private data
  pub fn ass_process_codec_private(track: *mut ASS_Track, data: *mut c_char, size: c_int);

  /// Parse complete ASS lines (`Dialogue: ...`) and append them as events
  pub fn ass_process_data(track: *mut ASS_Track, data: *mut c_char, size: c_int);

  /// Drop all events from the track
  pub fn ass_flush_events(track: *mut ASS_Track);

  /// Drop the events that ended before `deadline` (ms), libass >= 0.17
  pub fn ass_prune_events(track: *mut ASS_Track, deadline: c_longlong);

  /// Render the track at `now` (ms); the returned list is owned by the renderer
  /// and stays valid until the next render call
  pub fn ass_render_frame(
    renderer: *mut ASS_Renderer,
    track: *mut ASS_Track,
    now: c_longlong,
    detect_change: *mut c_int,
  ) -> *mut ASS_Image;
}
