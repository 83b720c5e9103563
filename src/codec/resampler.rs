//! Safe wrapper around FFmpeg SwrContext
//!
//! Converts decoded audio frames to packed PCM with the output channel count,
//! sample rate and sample format the audio track was configured for.

use crate::ffi::{
    swresample::{
        av_channel_layout_default, av_channel_layout_uninit, swr_alloc_set_opts2, swr_convert,
        swr_free, swr_get_out_samples, swr_init,
    },
    AVChannelLayout, AVSampleFormat, SwrContext,
};
use std::ptr::NonNull;

use super::{CodecError, CodecResult, Frame};

/// Safe wrapper around SwrContext for audio resampling and format conversion
pub struct Resampler {
    ptr: NonNull<SwrContext>,
    src_channels: u32,
    src_sample_rate: u32,
    src_format: AVSampleFormat,
    dst_channels: u32,
    dst_sample_rate: u32,
    dst_format: AVSampleFormat,
}

impl Resampler {
    /// Create a new resampler for the given conversion
    pub fn new(
        src_channels: u32,
        src_sample_rate: u32,
        src_format: AVSampleFormat,
        dst_channels: u32,
        dst_sample_rate: u32,
        dst_format: AVSampleFormat,
    ) -> CodecResult<Self> {
        if dst_format.is_planar() {
            return Err(CodecError::InvalidConfig(format!(
                "Output format {:?} must be packed",
                dst_format
            )));
        }

        // Create channel layouts using the new FFmpeg API
        let mut src_ch_layout: AVChannelLayout = unsafe { std::mem::zeroed() };
        let mut dst_ch_layout: AVChannelLayout = unsafe { std::mem::zeroed() };

        unsafe {
            av_channel_layout_default(&mut src_ch_layout, src_channels as i32);
            av_channel_layout_default(&mut dst_ch_layout, dst_channels as i32);
        }

        let mut ctx: *mut SwrContext = std::ptr::null_mut();

        let ret = unsafe {
            swr_alloc_set_opts2(
                &mut ctx,
                &dst_ch_layout,
                dst_format.as_raw(),
                dst_sample_rate as i32,
                &src_ch_layout,
                src_format.as_raw(),
                src_sample_rate as i32,
                0,
                std::ptr::null_mut(),
            )
        };

        // Clean up channel layouts - they've been copied by FFmpeg
        unsafe {
            av_channel_layout_uninit(&mut src_ch_layout);
            av_channel_layout_uninit(&mut dst_ch_layout);
        }

        if ret < 0 {
            return Err(CodecError::InvalidConfig(format!(
                "Failed to configure resampler (err: {})",
                ret
            )));
        }

        let ptr = NonNull::new(ctx).ok_or(CodecError::AllocationFailed("SwrContext"))?;

        let ret = unsafe { swr_init(ptr.as_ptr()) };
        if ret < 0 {
            unsafe {
                let mut p = ptr.as_ptr();
                swr_free(&mut p);
            }
            return Err(CodecError::InvalidConfig(format!(
                "Failed to initialize resampler (err: {})",
                ret
            )));
        }

        Ok(Self {
            ptr,
            src_channels,
            src_sample_rate,
            src_format,
            dst_channels,
            dst_sample_rate,
            dst_format,
        })
    }

    /// Bytes of one output sample frame (all channels)
    #[inline]
    pub fn dst_frame_bytes(&self) -> usize {
        self.dst_channels as usize * self.dst_format.bytes_per_sample()
    }

    /// Upper bound of output samples per channel for `in_samples` input samples
    pub fn get_out_samples(&self, in_samples: u32) -> u32 {
        let result = unsafe { swr_get_out_samples(self.ptr.as_ptr(), in_samples as i32) };
        result.max(0) as u32
    }

    /// Convert one decoded frame into interleaved PCM at the start of `out`
    ///
    /// `out` is grown when too small and never shrunk. Returns the number of
    /// bytes written.
    pub fn convert_into(&mut self, src: &Frame, out: &mut Vec<u8>) -> CodecResult<usize> {
        let in_samples = src.nb_samples();
        let capacity = self.get_out_samples(in_samples) as usize;
        let needed = capacity * self.dst_frame_bytes();
        if out.len() < needed {
            out.resize(needed, 0);
        }

        let mut dst_ptr = out.as_mut_ptr();
        let result = unsafe {
            swr_convert(
                self.ptr.as_ptr(),
                &mut dst_ptr,
                capacity as i32,
                src.extended_data(),
                in_samples as i32,
            )
        };

        if result < 0 {
            return Err(CodecError::Ffmpeg(crate::ffi::FFmpegError::from_code(result)));
        }

        Ok(result as usize * self.dst_frame_bytes())
    }

    /// Drop samples buffered inside the resampler (used after a seek)
    pub fn reset(&mut self) -> CodecResult<()> {
        let ret = unsafe { swr_init(self.ptr.as_ptr()) };
        crate::ffi::check_error(ret)?;
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn src_channels(&self) -> u32 {
        self.src_channels
    }

    pub fn src_sample_rate(&self) -> u32 {
        self.src_sample_rate
    }

    pub fn src_format(&self) -> AVSampleFormat {
        self.src_format
    }

    pub fn dst_channels(&self) -> u32 {
        self.dst_channels
    }
}

impl Drop for Resampler {
    fn drop(&mut self) {
        unsafe {
            let mut ptr = self.ptr.as_ptr();
            swr_free(&mut ptr);
        }
    }
}

// SwrContext is thread-safe for reading
unsafe impl Send for Resampler {}

impl std::fmt::Debug for Resampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resampler")
            .field(
                "src",
                &format!(
                    "{} ch @ {} Hz {:?}",
                    self.src_channels, self.src_sample_rate, self.src_format
                ),
            )
            .field(
                "dst",
                &format!(
                    "{} ch @ {} Hz {:?}",
                    self.dst_channels, self.dst_sample_rate, self.dst_format
                ),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecContext, Packet, ReceiveStatus};

    #[test]
    fn test_resampler_creation() {
        let resampler =
            Resampler::new(2, 44100, AVSampleFormat::Fltp, 2, 48000, AVSampleFormat::S16);
        assert!(resampler.is_ok(), "Resampler creation failed: {:?}", resampler.err());
        let resampler = resampler.unwrap();
        assert_eq!(resampler.dst_frame_bytes(), 4);
        assert!(resampler.get_out_samples(1024) >= 1024);
    }

    #[test]
    fn test_planar_output_rejected() {
        let resampler =
            Resampler::new(2, 44100, AVSampleFormat::S16, 2, 44100, AVSampleFormat::Fltp);
        assert!(matches!(resampler, Err(CodecError::InvalidConfig(_))));
    }

    #[test]
    fn test_convert_into_byte_count() {
        let mut codec = CodecContext::open_pcm_s16le(48000, 1).unwrap();
        let data: Vec<u8> = (0..480 * 2).map(|i| i as u8).collect();
        let packet = Packet::from_bytes(&data).unwrap();
        assert!(codec.send_packet(Some(&packet)).unwrap());
        let mut frame = Frame::new().unwrap();
        assert_eq!(codec.receive_frame(&mut frame).unwrap(), ReceiveStatus::Frame);

        let mut resampler =
            Resampler::new(1, 48000, AVSampleFormat::S16, 2, 48000, AVSampleFormat::S16).unwrap();
        let mut out = Vec::new();
        let written = resampler.convert_into(&frame, &mut out).unwrap();
        // samples x channels x bytes per sample
        assert_eq!(written, 480 * 2 * 2);
        assert!(out.len() >= written);

        // A smaller frame reuses the grown output
        let capacity = out.len();
        let packet = Packet::from_bytes(&data[..240]).unwrap();
        assert!(codec.send_packet(Some(&packet)).unwrap());
        assert_eq!(codec.receive_frame(&mut frame).unwrap(), ReceiveStatus::Frame);
        assert_eq!(resampler.convert_into(&frame, &mut out).unwrap(), 120 * 2 * 2);
        assert_eq!(out.len(), capacity);
    }

    #[test]
    fn test_reset_keeps_configuration() {
        let mut resampler =
            Resampler::new(1, 22050, AVSampleFormat::S16, 2, 44100, AVSampleFormat::S32).unwrap();
        resampler.reset().unwrap();
        assert_eq!(resampler.dst_channels(), 2);
        assert_eq!(resampler.dst_frame_bytes(), 8);
    }
}
