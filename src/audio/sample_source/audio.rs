// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use super::error::SampleSourceError;
use crate::assets::Asset;

/// Decodes an audio asset (WAV, MP3, FLAC, OGG, ...) into interleaved f32 samples,
/// one packet at a time. No resampling happens here.
pub struct AudioSampleSource {
    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    is_finished: bool,
    // Samples decoded while probing for the channel count.
    leftover_samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl AudioSampleSource {
    /// Probes the asset's container and prepares a decoder for its first audio track.
    pub fn from_asset(asset: Asset) -> Result<Self, SampleSourceError> {
        let Asset {
            key,
            source,
            extension,
        } = asset;
        let mss = MediaSourceStream::new(source, Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = extension.as_deref() {
            hint.with_extension(extension);
        }

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();
        let probed = get_probe()
            .format(&hint, mss, &fmt_opts, &meta_opts)
            .map_err(|e| SampleSourceError::SampleConversionFailed(format!("'{}': {}", key, e)))?;

        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                SampleSourceError::SampleConversionFailed(format!("'{}': no audio track", key))
            })?;

        let track_id = track.id;
        let params = track.codec_params.clone();

        let sample_rate = params.sample_rate.ok_or_else(|| {
            SampleSourceError::SampleConversionFailed(format!("'{}': sample rate not specified", key))
        })?;

        let decoder_opts: DecoderOptions = Default::default();
        let mut decoder = get_codecs()
            .make(&params, &decoder_opts)
            .map_err(|e| SampleSourceError::SampleConversionFailed(format!("'{}': {}", key, e)))?;

        // Prefer the container's channel count; otherwise decode the first packet to find it.
        let channels = params.channels.map(|c| c.count() as u16).unwrap_or(0);
        let (channels, leftover_samples) = if channels > 0 {
            (channels, Vec::new())
        } else {
            match Self::read_and_decode_next_packet_for_track(
                format_reader.as_mut(),
                decoder.as_mut(),
                track_id,
            )? {
                Some((samples, channels)) => (channels as u16, samples),
                None => {
                    return Err(SampleSourceError::SampleConversionFailed(format!(
                        "'{}': channels not specified",
                        key
                    )))
                }
            }
        };

        Ok(Self {
            format_reader,
            decoder,
            track_id,
            is_finished: false,
            leftover_samples,
            channels,
            sample_rate,
        })
    }

    /// Returns the next decoded block of interleaved samples, or None at the end of the stream.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<f32>>, SampleSourceError> {
        if !self.leftover_samples.is_empty() {
            return Ok(Some(std::mem::take(&mut self.leftover_samples)));
        }
        if self.is_finished {
            return Ok(None);
        }

        match Self::read_and_decode_next_packet_for_track(
            self.format_reader.as_mut(),
            self.decoder.as_mut(),
            self.track_id,
        )? {
            Some((samples, _)) => Ok(Some(samples)),
            None => {
                self.is_finished = true;
                Ok(None)
            }
        }
    }

    /// Decodes everything that remains into one interleaved buffer.
    pub fn read_to_end(&mut self) -> Result<Vec<f32>, SampleSourceError> {
        let mut samples = Vec::new();
        while let Some(chunk) = self.next_chunk()? {
            samples.extend_from_slice(&chunk);
        }
        Ok(samples)
    }

    pub fn channel_count(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Reads the next packet. `Ok(None)` means end of stream.
    fn read_next_packet(
        format_reader: &mut dyn FormatReader,
    ) -> Result<Option<Packet>, SampleSourceError> {
        match format_reader.next_packet() {
            Ok(packet) => Ok(Some(packet)),
            Err(SymphoniaError::ResetRequired) => {
                Err(SampleSourceError::AudioError(SymphoniaError::ResetRequired))
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Ok(None)
            }
            // Some decoders return DecodeError at EOF instead of IoError
            Err(SymphoniaError::DecodeError(_)) => Ok(None),
            Err(e) => Err(SampleSourceError::AudioError(e)),
        }
    }

    /// Reads and decodes the next packet for the given track, resetting the decoder when
    /// the stream asks for it. Returns the interleaved samples and their channel count.
    fn read_and_decode_next_packet_for_track(
        format_reader: &mut dyn FormatReader,
        decoder: &mut dyn Decoder,
        track_id: u32,
    ) -> Result<Option<(Vec<f32>, usize)>, SampleSourceError> {
        loop {
            let packet = match Self::read_next_packet(format_reader) {
                Ok(Some(packet)) => packet,
                Ok(None) => return Ok(None),
                Err(SampleSourceError::AudioError(SymphoniaError::ResetRequired)) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => return Err(e),
            };
            if packet.track_id() != track_id {
                continue;
            }
            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    decoder.decode(&packet)?
                }
                Err(e) => return Err(SampleSourceError::AudioError(e)),
            };
            let (samples, channels) = Self::decode_buffer_to_f32(decoded);
            // Header packets (e.g. Vorbis) decode to nothing; keep reading.
            if channels > 0 && !samples.is_empty() {
                return Ok(Some((samples, channels)));
            }
        }
    }

    /// Converts a decoded buffer to interleaved f32 samples.
    fn decode_buffer_to_f32(decoded: AudioBufferRef) -> (Vec<f32>, usize) {
        match decoded {
            AudioBufferRef::F32(buf) => Self::interleave_planar_samples(&buf, |sample| sample),
            AudioBufferRef::F64(buf) => {
                Self::interleave_planar_samples(&buf, |sample| sample as f32)
            }
            AudioBufferRef::S8(buf) => Self::interleave_planar_samples(&buf, Self::scale_s8),
            AudioBufferRef::S16(buf) => Self::interleave_planar_samples(&buf, Self::scale_s16),
            AudioBufferRef::S24(buf) => {
                Self::interleave_planar_samples(&buf, |sample| Self::scale_s24(sample.inner()))
            }
            AudioBufferRef::S32(buf) => Self::interleave_planar_samples(&buf, Self::scale_s32),
            AudioBufferRef::U8(buf) => Self::interleave_planar_samples(&buf, Self::scale_u8),
            AudioBufferRef::U16(buf) => Self::interleave_planar_samples(&buf, Self::scale_u16),
            AudioBufferRef::U24(buf) => {
                Self::interleave_planar_samples(&buf, |sample| Self::scale_u24(sample.inner()))
            }
            AudioBufferRef::U32(buf) => Self::interleave_planar_samples(&buf, Self::scale_u32),
        }
    }

    fn interleave_planar_samples<T, F>(buf: &AudioBuffer<T>, convert: F) -> (Vec<f32>, usize)
    where
        T: symphonia::core::sample::Sample,
        F: Fn(T) -> f32,
    {
        let frames = buf.frames();
        let channels = buf.spec().channels.count();
        let planes = buf.planes();
        let mut samples = Vec::with_capacity(frames * channels);
        for frame_idx in 0..frames {
            for plane in planes.planes() {
                samples.push(convert(plane[frame_idx]));
            }
        }
        (samples, channels)
    }

    #[inline]
    pub(crate) fn scale_s8(sample: i8) -> f32 {
        sample as f32 / (1i64 << 7) as f32
    }

    #[inline]
    pub(crate) fn scale_s16(sample: i16) -> f32 {
        sample as f32 / (1i64 << 15) as f32
    }

    #[inline]
    pub(crate) fn scale_s24(sample: i32) -> f32 {
        sample as f32 / (1i64 << 23) as f32
    }

    #[inline]
    pub(crate) fn scale_s32(sample: i32) -> f32 {
        sample as f32 / (1i64 << 31) as f32
    }

    #[inline]
    pub(crate) fn scale_u8(sample: u8) -> f32 {
        (sample as f32 / u8::MAX as f32) * 2.0 - 1.0
    }

    #[inline]
    pub(crate) fn scale_u16(sample: u16) -> f32 {
        (sample as f32 / u16::MAX as f32) * 2.0 - 1.0
    }

    #[inline]
    pub(crate) fn scale_u24(sample: u32) -> f32 {
        let max = (1u32 << 24) - 1;
        (sample as f32 / max as f32) * 2.0 - 1.0
    }

    #[inline]
    pub(crate) fn scale_u32(sample: u32) -> f32 {
        (sample as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetSource, MemoryAssets};
    use crate::testutil;

    #[test]
    fn test_integer_scaling_signed_ranges() {
        assert_eq!(-1.0, AudioSampleSource::scale_s8(i8::MIN));
        assert_eq!(-1.0, AudioSampleSource::scale_s16(i16::MIN));
        assert_eq!(-1.0, AudioSampleSource::scale_s24(-(1 << 23)));
        assert_eq!(-1.0, AudioSampleSource::scale_s32(i32::MIN));
        assert_eq!(0.0, AudioSampleSource::scale_s16(0));
        assert!(AudioSampleSource::scale_s16(i16::MAX) < 1.0);
    }

    #[test]
    fn test_integer_scaling_unsigned_ranges() {
        assert_eq!(-1.0, AudioSampleSource::scale_u8(0));
        assert_eq!(1.0, AudioSampleSource::scale_u8(u8::MAX));
        assert_eq!(-1.0, AudioSampleSource::scale_u16(0));
        assert_eq!(1.0, AudioSampleSource::scale_u16(u16::MAX));
        assert_eq!(1.0, AudioSampleSource::scale_u24((1 << 24) - 1));
        assert_eq!(1.0, AudioSampleSource::scale_u32(u32::MAX));
    }

    #[test]
    fn test_decode_int_wav() -> Result<(), Box<dyn std::error::Error>> {
        let samples: Vec<i16> = vec![0, i16::MAX / 2, i16::MIN / 2, 0, 1000, -1000];
        let mut assets = MemoryAssets::new();
        assets.insert("c", testutil::wav_bytes_i16(&samples, 2, 44100), Some("wav"));

        let mut source = AudioSampleSource::from_asset(assets.open("c")?)?;
        assert_eq!(2, source.channel_count());
        assert_eq!(44100, source.sample_rate());

        let decoded = source.read_to_end()?;
        assert_eq!(samples.len(), decoded.len());
        for (expected, actual) in samples.iter().zip(decoded.iter()) {
            assert!((AudioSampleSource::scale_s16(*expected) - actual).abs() < 1e-6);
        }
        assert!(source.next_chunk()?.is_none());
        Ok(())
    }

    #[test]
    fn test_decode_float_wav() -> Result<(), Box<dyn std::error::Error>> {
        let samples: Vec<f32> = vec![0.0, 0.25, -0.5, 0.75];
        let mut assets = MemoryAssets::new();
        assets.insert("d", testutil::wav_bytes_f32(&samples, 1, 48000), Some("wav"));

        let mut source = AudioSampleSource::from_asset(assets.open("d")?)?;
        assert_eq!(1, source.channel_count());
        assert_eq!(48000, source.sample_rate());
        assert_eq!(samples, source.read_to_end()?);
        Ok(())
    }

    #[test]
    fn test_decode_garbage_fails() -> Result<(), Box<dyn std::error::Error>> {
        let mut assets = MemoryAssets::new();
        assets.insert("e", b"definitely not audio".to_vec(), Some("wav"));

        assert!(AudioSampleSource::from_asset(assets.open("e")?).is_err());
        Ok(())
    }
}
