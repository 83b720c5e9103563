//! Safe wrapper around FFmpeg AVPacket
//!
//! Provides RAII-based memory management for compressed packets read from the demuxer.

use crate::ffi::{
    accessors::{
        ffpkt_data, ffpkt_dts, ffpkt_duration, ffpkt_flags, ffpkt_pts, ffpkt_size,
        ffpkt_stream_index,
    },
    avcodec::{av_packet_alloc, av_packet_free, av_packet_unref},
    pkt_flag, AVPacket,
};
use std::ptr::NonNull;

use super::CodecError;

/// Safe wrapper around AVPacket with RAII cleanup
pub struct Packet {
    ptr: NonNull<AVPacket>,
}

impl Packet {
    /// Allocate a new empty packet
    pub fn new() -> Result<Self, CodecError> {
        let ptr = unsafe { av_packet_alloc() };
        NonNull::new(ptr)
            .map(|ptr| Self { ptr })
            .ok_or(CodecError::AllocationFailed("AVPacket"))
    }

    /// Get the raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_ptr(&self) -> *const AVPacket {
        self.ptr.as_ptr()
    }

    /// Get the mutable raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut AVPacket {
        self.ptr.as_ptr()
    }

    // ========================================================================
    // Data Access
    // ========================================================================

    /// Get packet data as a slice
    pub fn as_slice(&self) -> &[u8] {
        let ptr = unsafe { ffpkt_data(self.as_ptr()) };
        let size = self.size();
        if ptr.is_null() || size <= 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(ptr, size as usize) }
        }
    }

    /// Get packet size in bytes
    #[inline]
    pub fn size(&self) -> i32 {
        unsafe { ffpkt_size(self.as_ptr()) }
    }

    /// An empty packet tells the decoder to drain
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() <= 0
    }

    /// Index of the stream this packet belongs to
    #[inline]
    pub fn stream_index(&self) -> i32 {
        unsafe { ffpkt_stream_index(self.as_ptr()) }
    }

    // ========================================================================
    // Timestamps
    // ========================================================================

    /// Get presentation timestamp
    #[inline]
    pub fn pts(&self) -> i64 {
        unsafe { ffpkt_pts(self.as_ptr()) }
    }

    /// Get decoding timestamp
    #[inline]
    pub fn dts(&self) -> i64 {
        unsafe { ffpkt_dts(self.as_ptr()) }
    }

    /// Get duration
    #[inline]
    pub fn duration(&self) -> i64 {
        unsafe { ffpkt_duration(self.as_ptr()) }
    }

    // ========================================================================
    // Flags
    // ========================================================================

    /// Get packet flags
    #[inline]
    pub fn flags(&self) -> i32 {
        unsafe { ffpkt_flags(self.as_ptr()) }
    }

    /// Check if this is a key frame packet
    #[inline]
    pub fn is_key(&self) -> bool {
        (self.flags() & pkt_flag::KEY) != 0
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Unreference the packet data
    pub fn unref(&mut self) {
        unsafe { av_packet_unref(self.as_mut_ptr()) }
    }
}

#[cfg(test)]
impl Packet {
    /// Packet owning a copy of `data`, as the demuxer would hand it out
    pub(crate) fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut packet = Self::new()?;
        let ret =
            unsafe { crate::ffi::avcodec::av_new_packet(packet.as_mut_ptr(), data.len() as i32) };
        crate::ffi::check_error(ret)?;
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                ffpkt_data(packet.as_ptr()) as *mut u8,
                data.len(),
            )
        };
        Ok(packet)
    }
}

impl Drop for Packet {
    fn drop(&mut self) {
        unsafe {
            let mut ptr = self.ptr.as_ptr();
            av_packet_free(&mut ptr);
        }
    }
}

// Packet data can be sent between threads
unsafe impl Send for Packet {}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("stream_index", &self.stream_index())
            .field("size", &self.size())
            .field("pts", &self.pts())
            .field("dts", &self.dts())
            .field("is_key", &self.is_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_allocation() {
        let pkt = Packet::new().unwrap();
        assert!(pkt.is_empty());
        assert_eq!(pkt.size(), 0);
        assert!(pkt.as_slice().is_empty());
    }

    #[test]
    fn test_packet_from_bytes() {
        let pkt = Packet::from_bytes(&[1, 2, 3, 4]).unwrap();
        assert!(!pkt.is_empty());
        assert_eq!(pkt.as_slice(), &[1, 2, 3, 4]);
    }
}
