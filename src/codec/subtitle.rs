//! Safe wrapper around FFmpeg AVSubtitle
//!
//! AVSubtitle is a plain struct in FFmpeg (no alloc/free pair), so the
//! accessor library allocates it and frees its rects.

use crate::ffi::{
    accessors::{
        ffsub_alloc, ffsub_free, ffsub_get_end_display_time, ffsub_get_num_rects, ffsub_get_pts,
        ffsub_get_start_display_time, ffsub_rect_ass, ffsub_rect_text, ffsub_rect_type,
    },
    avcodec::avsubtitle_free,
    AVSubtitle, AVSubtitleType,
};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr::NonNull;

use super::CodecError;

/// One rect of a decoded subtitle, text rects only carry their strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleRect {
    pub kind: AVSubtitleType,
    /// FFmpeg's truncated ASS event line (`ReadOrder,Layer,Style,...,Text`)
    pub ass: Option<String>,
    pub text: Option<String>,
}

/// Safe wrapper around AVSubtitle with RAII cleanup
pub struct Subtitle {
    ptr: NonNull<AVSubtitle>,
}

impl Subtitle {
    pub fn new() -> Result<Self, CodecError> {
        let ptr = unsafe { ffsub_alloc() };
        NonNull::new(ptr)
            .map(|ptr| Self { ptr })
            .ok_or(CodecError::AllocationFailed("AVSubtitle"))
    }

    #[inline]
    pub fn as_ptr(&self) -> *const AVSubtitle {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut AVSubtitle {
        self.ptr.as_ptr()
    }

    /// Free the rects of the previous decode
    pub fn clear(&mut self) {
        unsafe { avsubtitle_free(self.as_mut_ptr()) }
    }

    /// Display start relative to `pts`, in ms
    pub fn start_display_time(&self) -> u32 {
        unsafe { ffsub_get_start_display_time(self.as_ptr()) }
    }

    /// Display end relative to `pts`, in ms
    pub fn end_display_time(&self) -> u32 {
        unsafe { ffsub_get_end_display_time(self.as_ptr()) }
    }

    /// Presentation timestamp in AV_TIME_BASE units
    pub fn pts(&self) -> i64 {
        unsafe { ffsub_get_pts(self.as_ptr()) }
    }

    pub fn num_rects(&self) -> u32 {
        unsafe { ffsub_get_num_rects(self.as_ptr()) }
    }

    /// Copy out every rect
    pub fn rects(&self) -> Vec<SubtitleRect> {
        (0..self.num_rects())
            .map(|i| unsafe {
                SubtitleRect {
                    kind: AVSubtitleType::from_raw(ffsub_rect_type(self.as_ptr(), i)),
                    ass: owned_string(ffsub_rect_ass(self.as_ptr(), i)),
                    text: owned_string(ffsub_rect_text(self.as_ptr(), i)),
                }
            })
            .collect()
    }
}

unsafe fn owned_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

impl Drop for Subtitle {
    fn drop(&mut self) {
        unsafe { ffsub_free(self.ptr.as_ptr()) }
    }
}

unsafe impl Send for Subtitle {}

impl std::fmt::Debug for Subtitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subtitle")
            .field("pts", &self.pts())
            .field("start_display_time", &self.start_display_time())
            .field("end_display_time", &self.end_display_time())
            .field("num_rects", &self.num_rects())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_subtitle() {
        let mut sub = Subtitle::new().unwrap();
        assert_eq!(sub.num_rects(), 0);
        assert!(sub.rects().is_empty());
        sub.clear();
        assert_eq!(sub.num_rects(), 0);
    }
}
