//! Safe wrapper around FFmpeg AVCodecContext
//!
//! Provides decoding functionality (video, audio and subtitles) with RAII cleanup.

use crate::ffi::{
    self,
    accessors::{
        ffctx_get_bit_rate, ffctx_get_channels, ffctx_get_codec_id, ffctx_get_height,
        ffctx_get_pix_fmt, ffctx_get_sample_fmt, ffctx_get_sample_rate,
        ffctx_get_subtitle_header, ffctx_get_subtitle_header_size, ffctx_get_width,
        ffctx_set_pkt_timebase, ffctx_set_thread_count,
    },
    avcodec::{
        avcodec_alloc_context3, avcodec_decode_subtitle2, avcodec_find_decoder,
        avcodec_find_decoder_by_name, avcodec_flush_buffers, avcodec_free_context, avcodec_open2,
        avcodec_parameters_to_context, avcodec_receive_frame, avcodec_send_packet,
    },
    error::{AVERROR_EAGAIN, AVERROR_EOF},
    mediacodec::{
        av_mediacodec_alloc_context, av_mediacodec_default_free, av_mediacodec_default_init,
    },
    AVCodec, AVCodecContext, AVCodecID, AVCodecParameters, AVPixelFormat, AVRational,
    AVSampleFormat,
};
use std::ffi::CString;
use std::os::raw::c_void;
use std::ptr::NonNull;

use super::{CodecError, CodecResult, DecoderConfig, Frame, Packet, Subtitle};

/// Outcome of `avcodec_receive_frame`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveStatus {
    /// A frame was written into the output frame
    Frame,
    /// The decoder needs more packets (EAGAIN)
    NeedMore,
    /// The decoder is fully drained (EOF)
    End,
}

/// Safe wrapper around a decoder AVCodecContext
pub struct CodecContext {
    ptr: NonNull<AVCodecContext>,
    codec: *const AVCodec,
    /// Opened through one of the `*_mediacodec` decoders
    mediacodec: bool,
    /// A MediaCodec context was attached with av_mediacodec_default_init
    surface_attached: bool,
}

impl CodecContext {
    // ========================================================================
    // Decoder Creation
    // ========================================================================

    /// Create a new decoder context for the given codec ID
    pub fn new_decoder(codec_id: AVCodecID) -> CodecResult<Self> {
        let codec = unsafe { avcodec_find_decoder(codec_id.as_raw()) };
        if codec.is_null() {
            return Err(CodecError::DecoderNotFound(codec_id));
        }
        Self::from_codec(codec)
    }

    /// Create a new decoder context by codec name (e.g., "h264_mediacodec")
    pub fn new_decoder_by_name(name: &str) -> CodecResult<Self> {
        let c_name =
            CString::new(name).map_err(|_| CodecError::InvalidConfig("Invalid codec name".into()))?;
        let codec = unsafe { avcodec_find_decoder_by_name(c_name.as_ptr()) };
        if codec.is_null() {
            return Err(CodecError::CodecNotFound(name.to_string()));
        }
        Self::from_codec(codec)
    }

    fn from_codec(codec: *const AVCodec) -> CodecResult<Self> {
        let ptr = unsafe { avcodec_alloc_context3(codec) };
        NonNull::new(ptr)
            .map(|ptr| Self {
                ptr,
                codec,
                mediacodec: false,
                surface_attached: false,
            })
            .ok_or(CodecError::AllocationFailed("AVCodecContext"))
    }

    /// Open a software decoder for a demuxed stream
    ///
    /// # Safety
    /// `par` must point to the codec parameters of a stream owned by a live
    /// demuxer context.
    pub unsafe fn open_for_stream(
        codec_id: AVCodecID,
        par: *const AVCodecParameters,
        time_base: AVRational,
        config: &DecoderConfig,
    ) -> CodecResult<Self> {
        let mut ctx = Self::new_decoder(codec_id)?;
        unsafe { ctx.apply_parameters(par, time_base)? };
        ctx.configure_decoder(config);
        ctx.open()?;
        Ok(ctx)
    }

    /// Open the Android MediaCodec decoder for a demuxed video stream
    ///
    /// With a `surface` (a JNI reference to `android.view.Surface`) decoded
    /// frames come out as `AV_PIX_FMT_MEDIACODEC` buffers that are rendered
    /// straight to that surface.
    ///
    /// # Safety
    /// Same as [`CodecContext::open_for_stream`]; `surface` must be a valid JNI
    /// reference for the duration of the call (FFmpeg takes its own global ref).
    pub unsafe fn open_mediacodec_for_stream(
        codec_id: AVCodecID,
        par: *const AVCodecParameters,
        time_base: AVRational,
        surface: Option<NonNull<c_void>>,
    ) -> CodecResult<Self> {
        let name = codec_id.mediacodec_decoder_name().ok_or_else(|| {
            CodecError::HardwareError(format!("No MediaCodec decoder for {:?}", codec_id))
        })?;
        let mut ctx = Self::new_decoder_by_name(name)?;
        ctx.mediacodec = true;
        unsafe { ctx.apply_parameters(par, time_base)? };

        if let Some(surface) = surface {
            let mc_ctx = unsafe { av_mediacodec_alloc_context() };
            if mc_ctx.is_null() {
                return Err(CodecError::AllocationFailed("AVMediaCodecContext"));
            }
            let ret =
                unsafe { av_mediacodec_default_init(ctx.as_mut_ptr(), mc_ctx, surface.as_ptr()) };
            if ret < 0 {
                // av_mediacodec_default_init does not take ownership on failure
                unsafe { crate::ffi::avutil::av_free(mc_ctx as *mut c_void) };
                return Err(CodecError::HardwareError(format!(
                    "av_mediacodec_default_init failed: {}",
                    ffi::FFmpegError::from_code(ret)
                )));
            }
            ctx.surface_attached = true;
        }

        ctx.open()?;
        Ok(ctx)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Copy stream parameters and the packet time base into the context
    ///
    /// # Safety
    /// `par` must be a valid AVCodecParameters pointer.
    unsafe fn apply_parameters(
        &mut self,
        par: *const AVCodecParameters,
        time_base: AVRational,
    ) -> CodecResult<()> {
        let ret = unsafe { avcodec_parameters_to_context(self.as_mut_ptr(), par) };
        ffi::check_error(ret)?;
        unsafe { ffctx_set_pkt_timebase(self.as_mut_ptr(), time_base.num, time_base.den) };
        Ok(())
    }

    /// Configure the decoder with the given settings
    pub fn configure_decoder(&mut self, config: &DecoderConfig) {
        unsafe {
            // 0 lets FFmpeg pick
            ffctx_set_thread_count(self.as_mut_ptr(), config.thread_count as i32);
        }
    }

    /// Open the codec (must be called after configuration)
    pub fn open(&mut self) -> CodecResult<()> {
        let ret = unsafe { avcodec_open2(self.ptr.as_ptr(), self.codec, std::ptr::null_mut()) };
        ffi::check_error(ret)?;
        Ok(())
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// Send a packet to the decoder, `None` starts draining
    ///
    /// Returns Ok(true) if packet was accepted, Ok(false) if the decoder wants
    /// its output read first (EAGAIN). Sending to an already draining decoder
    /// is not an error.
    pub fn send_packet(&mut self, packet: Option<&Packet>) -> CodecResult<bool> {
        let pkt_ptr = packet.map(|p| p.as_ptr()).unwrap_or(std::ptr::null());
        let ret = unsafe { avcodec_send_packet(self.ptr.as_ptr(), pkt_ptr) };

        if ret == AVERROR_EAGAIN {
            return Ok(false);
        }
        if ret == AVERROR_EOF {
            return Ok(true);
        }
        ffi::check_error(ret)?;
        Ok(true)
    }

    /// Receive a decoded frame into `frame`, replacing its previous contents
    pub fn receive_frame(&mut self, frame: &mut Frame) -> CodecResult<ReceiveStatus> {
        frame.unref();
        let ret = unsafe { avcodec_receive_frame(self.ptr.as_ptr(), frame.as_mut_ptr()) };

        match ret {
            AVERROR_EAGAIN => Ok(ReceiveStatus::NeedMore),
            AVERROR_EOF => Ok(ReceiveStatus::End),
            _ => {
                ffi::check_error(ret)?;
                Ok(ReceiveStatus::Frame)
            }
        }
    }

    /// Decode one subtitle packet into `subtitle`
    ///
    /// Returns Ok(true) when a subtitle was produced.
    pub fn decode_subtitle(
        &mut self,
        packet: &Packet,
        subtitle: &mut Subtitle,
    ) -> CodecResult<bool> {
        subtitle.clear();
        let mut got_subtitle = 0;
        let ret = unsafe {
            avcodec_decode_subtitle2(
                self.ptr.as_ptr(),
                subtitle.as_mut_ptr(),
                &mut got_subtitle,
                packet.as_ptr(),
            )
        };
        ffi::check_error(ret)?;
        Ok(got_subtitle != 0)
    }

    // ========================================================================
    // Utility
    // ========================================================================

    /// Flush internal codec buffers
    pub fn flush(&mut self) {
        unsafe { avcodec_flush_buffers(self.ptr.as_ptr()) }
    }

    /// Get raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_ptr(&self) -> *const AVCodecContext {
        self.ptr.as_ptr()
    }

    /// Get mutable raw pointer
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut AVCodecContext {
        self.ptr.as_ptr()
    }

    /// Whether decoding runs on MediaCodec, with or without a surface
    #[inline]
    pub fn is_hardware(&self) -> bool {
        self.mediacodec
    }

    /// Whether decoded frames are MediaCodec buffers bound to a surface
    #[inline]
    pub fn has_surface(&self) -> bool {
        self.surface_attached
    }

    pub fn codec_id(&self) -> AVCodecID {
        AVCodecID::from_raw(unsafe { ffctx_get_codec_id(self.as_ptr()) })
    }

    /// Get configured width
    pub fn width(&self) -> u32 {
        unsafe { ffctx_get_width(self.as_ptr()).max(0) as u32 }
    }

    /// Get configured height
    pub fn height(&self) -> u32 {
        unsafe { ffctx_get_height(self.as_ptr()).max(0) as u32 }
    }

    /// Get configured pixel format
    pub fn pixel_format(&self) -> AVPixelFormat {
        AVPixelFormat::from_raw(unsafe { ffctx_get_pix_fmt(self.as_ptr()) })
    }

    pub fn bit_rate(&self) -> i64 {
        unsafe { ffctx_get_bit_rate(self.as_ptr()) }
    }

    pub fn sample_rate(&self) -> u32 {
        unsafe { ffctx_get_sample_rate(self.as_ptr()).max(0) as u32 }
    }

    pub fn sample_format(&self) -> AVSampleFormat {
        AVSampleFormat::from_raw(unsafe { ffctx_get_sample_fmt(self.as_ptr()) })
    }

    pub fn channels(&self) -> u32 {
        unsafe { ffctx_get_channels(self.as_ptr()).max(0) as u32 }
    }

    /// ASS header (`[Script Info]` and styles) produced by text subtitle decoders
    pub fn subtitle_header(&self) -> Option<&[u8]> {
        unsafe {
            let ptr = ffctx_get_subtitle_header(self.as_ptr());
            let size = ffctx_get_subtitle_header_size(self.as_ptr());
            if ptr.is_null() || size <= 0 {
                None
            } else {
                Some(std::slice::from_raw_parts(ptr, size as usize))
            }
        }
    }
}

#[cfg(test)]
impl CodecContext {
    /// Open a `pcm_s16le` decoder, which needs no stream to start from
    pub(crate) fn open_pcm_s16le(sample_rate: u32, channels: u32) -> CodecResult<Self> {
        let mut ctx = Self::new_decoder(AVCodecID::PcmS16le)?;
        unsafe {
            crate::ffi::accessors::ffctx_set_audio_format(
                ctx.as_mut_ptr(),
                sample_rate as i32,
                channels as i32,
            );
            ffctx_set_pkt_timebase(ctx.as_mut_ptr(), 1, sample_rate as i32);
        }
        ctx.open()?;
        Ok(ctx)
    }
}

impl Drop for CodecContext {
    fn drop(&mut self) {
        unsafe {
            if self.surface_attached {
                av_mediacodec_default_free(self.ptr.as_ptr());
            }
            let mut ptr = self.ptr.as_ptr();
            avcodec_free_context(&mut ptr);
        }
    }
}

// CodecContext is NOT Sync - FFmpeg contexts are not thread-safe
unsafe impl Send for CodecContext {}

impl std::fmt::Debug for CodecContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecContext")
            .field("codec_id", &self.codec_id())
            .field("hardware", &self.mediacodec)
            .field("surface", &self.surface_attached)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_decoder_name() {
        let err = CodecContext::new_decoder_by_name("not_a_real_decoder").unwrap_err();
        assert!(matches!(err, CodecError::CodecNotFound(_)));
    }

    #[test]
    fn test_software_decoder_is_not_hardware() {
        let ctx = CodecContext::new_decoder(AVCodecID::PcmS16le).unwrap();
        assert!(!ctx.is_hardware());
        assert!(!ctx.has_surface());
    }

    #[test]
    fn test_mediacodec_without_surface_is_hardware() {
        // Same flag state open_mediacodec_for_stream leaves when no surface is given
        let mut ctx = CodecContext::new_decoder(AVCodecID::PcmS16le).unwrap();
        ctx.mediacodec = true;
        assert!(ctx.is_hardware());
        assert!(!ctx.has_surface());
    }

    #[test]
    fn test_mediacodec_needs_supported_codec() {
        let err = unsafe {
            CodecContext::open_mediacodec_for_stream(
                AVCodecID::PcmS16le,
                std::ptr::null(),
                AVRational { num: 1, den: 1000 },
                None,
            )
        }
        .unwrap_err();
        assert!(matches!(err, CodecError::HardwareError(_)));
    }

    #[test]
    fn test_invalid_decoder_name() {
        let err = CodecContext::new_decoder_by_name("bad\0name").unwrap_err();
        assert!(matches!(err, CodecError::InvalidConfig(_)));
    }
}
