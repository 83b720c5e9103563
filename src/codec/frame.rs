//! Safe wrapper around FFmpeg AVFrame
//!
//! Provides RAII-based memory management and safe access to frame data.

use crate::ffi::{
    accessors::{
        ffframe_data, ffframe_get_best_effort_timestamp, ffframe_get_channels,
        ffframe_get_duration, ffframe_get_extended_data_const, ffframe_get_format,
        ffframe_get_height, ffframe_get_nb_samples, ffframe_get_pts, ffframe_get_sample_rate,
        ffframe_get_width, ffframe_linesize,
    },
    avutil::{av_frame_alloc, av_frame_free, av_frame_move_ref, av_frame_unref},
    AVFrame, AVPixelFormat, AVSampleFormat, AV_NOPTS_VALUE,
};
use std::ptr::NonNull;

use super::CodecError;

/// Safe wrapper around AVFrame with RAII cleanup
pub struct Frame {
    ptr: NonNull<AVFrame>,
}

impl Frame {
    /// Allocate a new empty frame
    pub fn new() -> Result<Self, CodecError> {
        let ptr = unsafe { av_frame_alloc() };
        NonNull::new(ptr)
            .map(|ptr| Self { ptr })
            .ok_or(CodecError::AllocationFailed("AVFrame"))
    }

    /// Get the raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_ptr(&self) -> *const AVFrame {
        self.ptr.as_ptr()
    }

    /// Get the mutable raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut AVFrame {
        self.ptr.as_ptr()
    }

    // ========================================================================
    // Dimensions and Format
    // ========================================================================

    /// Get frame width
    #[inline]
    pub fn width(&self) -> u32 {
        unsafe { ffframe_get_width(self.as_ptr()).max(0) as u32 }
    }

    /// Get frame height
    #[inline]
    pub fn height(&self) -> u32 {
        unsafe { ffframe_get_height(self.as_ptr()).max(0) as u32 }
    }

    /// Raw `format` field, pixel or sample format depending on the media type
    #[inline]
    pub fn raw_format(&self) -> i32 {
        unsafe { ffframe_get_format(self.as_ptr()) }
    }

    /// Get pixel format (video frames)
    pub fn pixel_format(&self) -> AVPixelFormat {
        AVPixelFormat::from_raw(self.raw_format())
    }

    /// Get sample format (audio frames)
    pub fn sample_format(&self) -> AVSampleFormat {
        AVSampleFormat::from_raw(self.raw_format())
    }

    // ========================================================================
    // Timestamps
    // ========================================================================

    /// Get presentation timestamp (in time_base units)
    #[inline]
    pub fn pts(&self) -> i64 {
        unsafe { ffframe_get_pts(self.as_ptr()) }
    }

    /// Best guess of the presentation timestamp, falls back to `pts`
    pub fn best_effort_pts(&self) -> i64 {
        let ts = unsafe { ffframe_get_best_effort_timestamp(self.as_ptr()) };
        if ts == AV_NOPTS_VALUE { self.pts() } else { ts }
    }

    /// Get duration (in time_base units)
    #[inline]
    pub fn duration(&self) -> i64 {
        unsafe { ffframe_get_duration(self.as_ptr()) }
    }

    // ========================================================================
    // Audio
    // ========================================================================

    /// Number of audio samples per channel
    #[inline]
    pub fn nb_samples(&self) -> u32 {
        unsafe { ffframe_get_nb_samples(self.as_ptr()).max(0) as u32 }
    }

    /// Audio sample rate
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        unsafe { ffframe_get_sample_rate(self.as_ptr()).max(0) as u32 }
    }

    /// Audio channel count
    #[inline]
    pub fn channels(&self) -> u32 {
        unsafe { ffframe_get_channels(self.as_ptr()).max(0) as u32 }
    }

    /// Per-channel data pointers (`extended_data`), as expected by swr_convert
    #[inline]
    pub fn extended_data(&self) -> *const *const u8 {
        unsafe { ffframe_get_extended_data_const(self.as_ptr()) }
    }

    // ========================================================================
    // Data Access
    // ========================================================================

    /// Get pointer to plane data
    ///
    /// The returned pointer is valid only while the frame is alive and unmodified
    pub fn data(&self, plane: usize) -> *const u8 {
        unsafe { ffframe_data(self.ptr.as_ptr(), plane as i32) as *const u8 }
    }

    /// Get line size (stride) for a plane
    #[inline]
    pub fn linesize(&self, plane: usize) -> i32 {
        unsafe { ffframe_linesize(self.as_ptr(), plane as i32) }
    }

    /// Get `rows` rows of plane data as a slice, `None` for empty planes
    ///
    /// Negative line sizes (bottom-up images) are rejected.
    pub fn plane(&self, plane: usize, rows: usize) -> Option<&[u8]> {
        let ptr = self.data(plane);
        let linesize = self.linesize(plane);
        if ptr.is_null() || linesize <= 0 || rows == 0 {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts(ptr, linesize as usize * rows) })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Unreference the frame data (but keep the frame structure)
    pub fn unref(&mut self) {
        unsafe { av_frame_unref(self.as_mut_ptr()) }
    }

    /// Move the contents of this frame into a new frame, leaving this one empty
    pub fn take(&mut self) -> Result<Self, CodecError> {
        let mut dst = Self::new()?;
        unsafe { av_frame_move_ref(dst.as_mut_ptr(), self.as_mut_ptr()) };
        Ok(dst)
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        unsafe {
            let mut ptr = self.ptr.as_ptr();
            av_frame_free(&mut ptr);
        }
    }
}

// Frame data can be sent between threads
unsafe impl Send for Frame {}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.raw_format())
            .field("pts", &self.pts())
            .field("nb_samples", &self.nb_samples())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_allocation() {
        let frame = Frame::new().unwrap();
        assert_eq!(frame.width(), 0);
        assert_eq!(frame.height(), 0);
        assert_eq!(frame.nb_samples(), 0);
        assert!(frame.plane(0, 1).is_none());
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let mut frame = Frame::new().unwrap();
        let taken = frame.take().unwrap();
        assert_eq!(taken.width(), 0);
        assert!(frame.data(0).is_null());
    }
}
