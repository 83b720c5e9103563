//! Packing decoded video frames into [`VideoBuffer`] planes
//!
//! Rows are written at a stride of the frame width rounded up to 8 pixels and
//! the padding bytes are zeroed, so the managed side can upload planes without
//! knowing FFmpeg's line sizes.

use crate::codec::{CodecError, Frame, Scaler, demuxer::pts_to_ms};
use crate::ffi::{AVPixelFormat, AVRational};

use super::{GrowBuffer, ImageRawType, PlayerResult, VideoBuffer};

/// Pixel alignment of packed rows
pub const ROW_ALIGNMENT: u32 = 8;

/// Round `width` up to a multiple of [`ROW_ALIGNMENT`]
pub fn align_width(width: u32) -> u32 {
  width.div_ceil(ROW_ALIGNMENT) * ROW_ALIGNMENT
}

/// Rows of a 4:2:0 chroma plane
pub fn chroma_rows(height: u32) -> u32 {
  height.div_ceil(2)
}

/// One source plane: bytes plus the distance between rows
#[derive(Debug, Clone, Copy)]
pub struct SrcPlane<'a> {
  pub data: &'a [u8],
  pub stride: usize,
}

impl<'a> SrcPlane<'a> {
  pub fn new(data: &'a [u8], stride: usize) -> Self {
    Self { data, stride }
  }

  fn from_frame(frame: &'a Frame, plane: usize, rows: u32) -> PlayerResult<Self> {
    let data = frame.plane(plane, rows as usize).ok_or_else(|| {
      CodecError::InvalidState(format!("Frame plane {} is missing", plane))
    })?;
    Ok(Self::new(data, frame.linesize(plane) as usize))
  }
}

/// Copy `rows` rows of `row_bytes` each, padding every destination row to
/// `dst_stride` with zeros
///
/// Rows missing from `src` come out as zeros.
pub fn copy_plane(
  src: SrcPlane<'_>,
  dst: &mut [u8],
  dst_stride: usize,
  row_bytes: usize,
  rows: usize,
) {
  if dst_stride == 0 {
    return;
  }
  let row_bytes = row_bytes.min(dst_stride).min(src.stride);
  for (row, dst_row) in dst.chunks_exact_mut(dst_stride).take(rows).enumerate() {
    let start = row * src.stride;
    match src.data.get(start..start + row_bytes) {
      Some(src_row) => {
        dst_row[..row_bytes].copy_from_slice(src_row);
        dst_row[row_bytes..].fill(0);
      }
      None => dst_row.fill(0),
    }
  }
}

/// Pack a planar 4:2:0 image into the y/u/v planes of `buffer`
pub fn pack_yuv420p(
  width: u32,
  height: u32,
  y: SrcPlane<'_>,
  u: SrcPlane<'_>,
  v: SrcPlane<'_>,
  buffer: &mut VideoBuffer,
) {
  let aligned = align_width(width) as usize;
  let chroma_stride = aligned / 2;
  let chroma_width = width.div_ceil(2) as usize;
  let chroma_rows = chroma_rows(height) as usize;
  let height = height as usize;

  copy_plane(y, buffer.y.ensure(aligned * height), aligned, width as usize, height);
  copy_plane(
    u,
    buffer.u.ensure(chroma_stride * chroma_rows),
    chroma_stride,
    chroma_width,
    chroma_rows,
  );
  copy_plane(
    v,
    buffer.v.ensure(chroma_stride * chroma_rows),
    chroma_stride,
    chroma_width,
    chroma_rows,
  );
  buffer.uv.clear();
  buffer.rgba.clear();
  buffer.raw_type = ImageRawType::Yuv420p;
  buffer.width = aligned as u32;
}

/// NV21 keeps V before U in its interleaved plane, everything else is NV12
fn semi_planar_type(format: AVPixelFormat) -> ImageRawType {
  match format {
    AVPixelFormat::Nv21 => ImageRawType::Nv21,
    _ => ImageRawType::Nv12,
  }
}

/// Pack an NV12 or NV21 image into the y/uv planes of `buffer`
pub fn pack_semi_planar(
  width: u32,
  height: u32,
  y: SrcPlane<'_>,
  uv: SrcPlane<'_>,
  raw_type: ImageRawType,
  buffer: &mut VideoBuffer,
) {
  let aligned = align_width(width) as usize;
  let chroma_rows = chroma_rows(height) as usize;
  let height = height as usize;

  copy_plane(y, buffer.y.ensure(aligned * height), aligned, width as usize, height);
  copy_plane(
    uv,
    buffer.uv.ensure(aligned * chroma_rows),
    aligned,
    width.div_ceil(2) as usize * 2,
    chroma_rows,
  );
  buffer.u.clear();
  buffer.v.clear();
  buffer.rgba.clear();
  buffer.raw_type = raw_type;
  buffer.width = aligned as u32;
}

/// Pack an RGBA image into the rgba plane of `buffer`
pub fn pack_rgba(width: u32, height: u32, rgba: SrcPlane<'_>, buffer: &mut VideoBuffer) {
  let aligned = align_width(width) as usize;
  let stride = aligned * 4;
  let height = height as usize;

  copy_plane(rgba, buffer.rgba.ensure(stride * height), stride, width as usize * 4, height);
  buffer.y.clear();
  buffer.u.clear();
  buffer.v.clear();
  buffer.uv.clear();
  buffer.raw_type = ImageRawType::Rgba;
  buffer.width = aligned as u32;
}

/// Convert any other software format to YUV420P through `scaler`
fn scale_to_yuv420p(
  frame: &Frame,
  scaler: &mut Scaler,
  buffer: &mut VideoBuffer,
) -> PlayerResult<()> {
  let width = frame.width();
  let height = frame.height();
  let aligned = align_width(width) as usize;
  let chroma_stride = aligned / 2;
  let chroma_rows = chroma_rows(height) as usize;

  scaler.ensure(
    width,
    height,
    frame.pixel_format(),
    width,
    height,
    AVPixelFormat::Yuv420p,
  )?;

  let y = buffer.y.ensure(aligned * height as usize);
  let u = buffer.u.ensure(chroma_stride * chroma_rows);
  let v = buffer.v.ensure(chroma_stride * chroma_rows);
  // sws only writes `width` pixels per row
  y.fill(0);
  u.fill(0);
  v.fill(0);
  scaler.scale_into(
    frame,
    &mut [y, u, v],
    &[aligned, chroma_stride, chroma_stride],
    &[height as usize, chroma_rows, chroma_rows],
  )?;

  buffer.uv.clear();
  buffer.rgba.clear();
  buffer.raw_type = ImageRawType::Yuv420p;
  buffer.width = aligned as u32;
  Ok(())
}

/// Convert `frame` to tightly packed RGBA (`width * 4` bytes per row)
pub fn scale_to_rgba(frame: &Frame, scaler: &mut Scaler, out: &mut GrowBuffer) -> PlayerResult<()> {
  let width = frame.width();
  let height = frame.height();
  let stride = width as usize * 4;

  if frame.pixel_format() == AVPixelFormat::Rgba {
    let src = SrcPlane::from_frame(frame, 0, height)?;
    copy_plane(src, out.ensure(stride * height as usize), stride, stride, height as usize);
    return Ok(());
  }

  scaler.ensure(
    width,
    height,
    frame.pixel_format(),
    width,
    height,
    AVPixelFormat::Rgba,
  )?;
  let dst = out.ensure(stride * height as usize);
  scaler.scale_into(frame, &mut [dst], &[stride], &[height as usize])?;
  Ok(())
}

/// Move one decoded video frame into `buffer`
///
/// MEDIACODEC frames are not copied: the buffer takes the frame itself and
/// keeps it until the caller renders or drops it.
pub fn move_frame_to_buffer(
  frame: &mut Frame,
  time_base: AVRational,
  scaler: &mut Scaler,
  buffer: &mut VideoBuffer,
) -> PlayerResult<()> {
  let width = frame.width();
  let height = frame.height();
  if width == 0 || height == 0 {
    return Err(CodecError::InvalidState("Frame has no picture".into()).into());
  }

  buffer.pts_ms = pts_to_ms(frame.best_effort_pts(), time_base);
  buffer.duration_ms = pts_to_ms(frame.duration(), time_base);
  buffer.height = height;

  match frame.pixel_format() {
    AVPixelFormat::Mediacodec => {
      buffer.y.clear();
      buffer.u.clear();
      buffer.v.clear();
      buffer.uv.clear();
      buffer.rgba.clear();
      buffer.raw_type = ImageRawType::HwSurface;
      buffer.width = width;
      buffer.hold_hw_frame(frame.take()?);
    }
    AVPixelFormat::Yuv420p => {
      let chroma = chroma_rows(height);
      pack_yuv420p(
        width,
        height,
        SrcPlane::from_frame(frame, 0, height)?,
        SrcPlane::from_frame(frame, 1, chroma)?,
        SrcPlane::from_frame(frame, 2, chroma)?,
        buffer,
      );
    }
    format @ (AVPixelFormat::Nv12 | AVPixelFormat::Nv21) => {
      pack_semi_planar(
        width,
        height,
        SrcPlane::from_frame(frame, 0, height)?,
        SrcPlane::from_frame(frame, 1, chroma_rows(height))?,
        semi_planar_type(format),
        buffer,
      );
    }
    AVPixelFormat::Rgba => {
      pack_rgba(width, height, SrcPlane::from_frame(frame, 0, height)?, buffer);
    }
    AVPixelFormat::None => {
      return Err(CodecError::UnsupportedPixelFormat(AVPixelFormat::None).into());
    }
    AVPixelFormat::Other(_) => scale_to_yuv420p(frame, scaler, buffer)?,
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align_width() {
    assert_eq!(align_width(0), 0);
    assert_eq!(align_width(1), 8);
    assert_eq!(align_width(8), 8);
    assert_eq!(align_width(1919), 1920);
    assert_eq!(align_width(1921), 1928);
    assert_eq!(chroma_rows(5), 3);
  }

  #[test]
  fn test_copy_plane_pads_rows() {
    // 3x2 image with a source stride of 4
    let src = [1, 2, 3, 99, 4, 5, 6, 99];
    let mut dst = [0xff; 16];
    copy_plane(SrcPlane::new(&src, 4), &mut dst, 8, 3, 2);
    assert_eq!(dst, [1, 2, 3, 0, 0, 0, 0, 0, 4, 5, 6, 0, 0, 0, 0, 0]);
  }

  #[test]
  fn test_copy_plane_short_source() {
    let src = [7, 7];
    let mut dst = [0xff; 8];
    copy_plane(SrcPlane::new(&src, 2), &mut dst, 4, 2, 2);
    assert_eq!(dst, [7, 7, 0, 0, 0, 0, 0, 0]);
  }

  #[test]
  fn test_pack_yuv420p() {
    let (width, height) = (5u32, 3u32);
    let y: Vec<u8> = (0..6 * 3).map(|i| i as u8).collect();
    let u = [10u8; 4 * 2];
    let v = [20u8; 4 * 2];
    let mut buffer = VideoBuffer::new();
    pack_yuv420p(
      width,
      height,
      SrcPlane::new(&y, 6),
      SrcPlane::new(&u, 4),
      SrcPlane::new(&v, 4),
      &mut buffer,
    );

    assert_eq!(buffer.raw_type, ImageRawType::Yuv420p);
    assert_eq!(buffer.width, 8);
    assert_eq!(buffer.y.content_size(), 8 * 3);
    assert_eq!(&buffer.y.content()[..8], &[0, 1, 2, 3, 4, 0, 0, 0]);
    assert_eq!(&buffer.y.content()[8..16], &[6, 7, 8, 9, 10, 0, 0, 0]);
    assert_eq!(buffer.u.content_size(), 4 * 2);
    assert_eq!(buffer.u.content(), &[10, 10, 10, 0, 10, 10, 10, 0]);
    assert_eq!(buffer.v.content(), &[20, 20, 20, 0, 20, 20, 20, 0]);
    assert_eq!(buffer.uv.content_size(), 0);
  }

  #[test]
  fn test_pack_nv12() {
    let (width, height) = (4u32, 2u32);
    let y = [1u8; 4 * 2];
    let uv = [2u8, 3, 2, 3];
    let mut buffer = VideoBuffer::new();
    pack_semi_planar(
      width,
      height,
      SrcPlane::new(&y, 4),
      SrcPlane::new(&uv, 4),
      ImageRawType::Nv12,
      &mut buffer,
    );

    assert_eq!(buffer.raw_type, ImageRawType::Nv12);
    assert_eq!(buffer.width, 8);
    assert_eq!(buffer.y.content(), &[1, 1, 1, 1, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0]);
    assert_eq!(buffer.uv.content(), &[2, 3, 2, 3, 0, 0, 0, 0]);
    assert_eq!(buffer.u.content_size(), 0);
  }

  #[test]
  fn test_pack_nv21_odd_size() {
    // 5x3 picture: chroma is 3 VU pairs wide and 2 rows high
    let (width, height) = (5u32, 3u32);
    let y: Vec<u8> = (1..=5 * 3).map(|i| i as u8).collect();
    let vu = [40u8, 30, 41, 31, 42, 32, 99, 43, 33, 44, 34, 45, 35, 99];
    let mut buffer = VideoBuffer::new();
    pack_semi_planar(
      width,
      height,
      SrcPlane::new(&y, 5),
      SrcPlane::new(&vu, 7),
      semi_planar_type(AVPixelFormat::Nv21),
      &mut buffer,
    );

    assert_eq!(buffer.raw_type, ImageRawType::Nv21);
    assert_eq!(buffer.width, 8);
    assert_eq!(buffer.y.content_size(), 8 * 3);
    assert_eq!(&buffer.y.content()[16..], &[11, 12, 13, 14, 15, 0, 0, 0]);
    assert_eq!(
      buffer.uv.content(),
      &[40, 30, 41, 31, 42, 32, 0, 0, 43, 33, 44, 34, 45, 35, 0, 0]
    );
    assert_eq!(buffer.u.content_size(), 0);
    assert_eq!(buffer.v.content_size(), 0);
  }

  #[test]
  fn test_semi_planar_type() {
    assert_eq!(semi_planar_type(AVPixelFormat::Nv12), ImageRawType::Nv12);
    assert_eq!(semi_planar_type(AVPixelFormat::Nv21), ImageRawType::Nv21);
  }

  #[test]
  fn test_pack_rgba() {
    let rgba: Vec<u8> = (0..4 * 9).map(|i| i as u8).collect();
    let mut buffer = VideoBuffer::new();
    pack_rgba(9, 1, SrcPlane::new(&rgba, 36), &mut buffer);

    assert_eq!(buffer.raw_type, ImageRawType::Rgba);
    assert_eq!(buffer.width, 16);
    assert_eq!(buffer.rgba.content_size(), 16 * 4);
    assert_eq!(&buffer.rgba.content()[..36], rgba.as_slice());
    assert!(buffer.rgba.content()[36..].iter().all(|&b| b == 0));
  }

  #[test]
  fn test_repacking_smaller_keeps_storage() {
    let mut buffer = VideoBuffer::new();
    let big = [0u8; 64 * 4];
    pack_rgba(64, 1, SrcPlane::new(&big, 256), &mut buffer);
    let capacity = buffer.rgba.buffer_size();
    let small = [0u8; 8 * 4];
    pack_rgba(8, 1, SrcPlane::new(&small, 32), &mut buffer);
    assert_eq!(buffer.rgba.buffer_size(), capacity);
    assert_eq!(buffer.rgba.content_size(), 32);
  }

  #[test]
  fn test_empty_frame_rejected() {
    let mut frame = Frame::new().unwrap();
    let mut scaler = Scaler::default();
    let mut buffer = VideoBuffer::new();
    let result = move_frame_to_buffer(
      &mut frame,
      AVRational::new(1, 1000),
      &mut scaler,
      &mut buffer,
    );
    assert!(result.is_err());
  }
}
