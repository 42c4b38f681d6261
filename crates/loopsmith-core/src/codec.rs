use std::{
    fs,
    io::{Cursor, Write},
    path::Path,
};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::{buffer::SampleBuffer, error::EngineError};

pub const WAV_HEADER_LEN: usize = 44;
const BITS_PER_SAMPLE: u16 = 16;
/// hound switches to `WAVE_FORMAT_EXTENSIBLE` above this many channels.
const HOUND_PLAIN_PCM_CHANNELS: u16 = 2;

/// Encodes to a canonical 44-byte-header, 16-bit linear PCM WAV.
#[instrument(skip(buffer), fields(frames = buffer.frames(), channels = buffer.channel_count(), sample_rate = buffer.sample_rate()))]
pub fn encode_wav(buffer: &SampleBuffer) -> Result<Vec<u8>, EngineError> {
    let channels = u16::try_from(buffer.channel_count())
        .map_err(|_| EngineError::InvalidBuffer("too many channels for wav".to_string()))?;
    let spec = hound::WavSpec {
        channels,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let bytes = if channels <= HOUND_PLAIN_PCM_CHANNELS {
        encode_with_hound(buffer, spec)?
    } else {
        encode_multichannel(buffer, spec)?
    };
    debug!(bytes = bytes.len(), "wav encode complete");
    Ok(bytes)
}

fn encode_with_hound(buffer: &SampleBuffer, spec: hound::WavSpec) -> Result<Vec<u8>, EngineError> {
    let encode_error = |error: hound::Error| EngineError::InvalidBuffer(error.to_string());
    let data_len = buffer.frames() * usize::from(spec.channels) * 2;
    let mut cursor = Cursor::new(Vec::with_capacity(WAV_HEADER_LEN + data_len));
    let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(encode_error)?;
    for frame in 0..buffer.frames() {
        for channel in buffer.channels() {
            writer.write_sample(quantize(channel[frame])).map_err(encode_error)?;
        }
    }
    writer.finalize().map_err(encode_error)?;
    Ok(cursor.into_inner())
}

/// Plain format-1 header for more than two channels, where hound would
/// write an extensible `fmt ` chunk instead.
fn encode_multichannel(buffer: &SampleBuffer, spec: hound::WavSpec) -> Result<Vec<u8>, EngineError> {
    let too_large = || EngineError::InvalidBuffer("buffer too large for wav".to_string());
    let block_align = spec.channels * (spec.bits_per_sample / 8);
    let byte_rate = spec
        .sample_rate
        .checked_mul(u32::from(block_align))
        .ok_or_else(too_large)?;
    let data_len = buffer
        .frames()
        .checked_mul(usize::from(block_align))
        .and_then(|len| u32::try_from(len).ok())
        .filter(|len| len.checked_add(36).is_some())
        .ok_or_else(too_large)?;

    let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);
    for field in [
        &b"RIFF"[..],
        &(36 + data_len).to_le_bytes(),
        b"WAVEfmt ",
        &16_u32.to_le_bytes(),
        &1_u16.to_le_bytes(),
        &spec.channels.to_le_bytes(),
        &spec.sample_rate.to_le_bytes(),
        &byte_rate.to_le_bytes(),
        &block_align.to_le_bytes(),
        &spec.bits_per_sample.to_le_bytes(),
        b"data",
        &data_len.to_le_bytes(),
    ] {
        bytes.extend_from_slice(field);
    }
    for frame in 0..buffer.frames() {
        for channel in buffer.channels() {
            bytes.extend_from_slice(&quantize(channel[frame]).to_le_bytes());
        }
    }
    Ok(bytes)
}

/// Decodes 16-bit integer or 32-bit float PCM. Anything else is rejected.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn decode_wav(bytes: &[u8]) -> Result<SampleBuffer, EngineError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|error| EngineError::DecodeError(error.to_string()))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(EngineError::DecodeError("wav declares zero channels".to_string()));
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|sample| sample.map(dequantize))
            .collect::<Result<_, _>>(),
        (hound::SampleFormat::Float, 32) => reader.into_samples::<f32>().collect::<Result<_, _>>(),
        (format, bits) => {
            return Err(EngineError::DecodeError(format!(
                "unsupported sample format {format:?} at {bits} bits"
            )));
        }
    }
    .map_err(|error| EngineError::DecodeError(error.to_string()))?;

    let channel_count = usize::from(spec.channels);
    if interleaved.len() % channel_count != 0 {
        return Err(EngineError::DecodeError(
            "sample data ends mid-frame".to_string(),
        ));
    }

    let frames = interleaved.len() / channel_count;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for frame in interleaved.chunks_exact(channel_count) {
        for (channel, sample) in channels.iter_mut().zip(frame) {
            channel.push(*sample);
        }
    }

    let buffer = SampleBuffer::new(channels, spec.sample_rate)
        .map_err(|error| EngineError::DecodeError(error.to_string()))?;
    debug!(
        frames = buffer.frames(),
        channels = buffer.channel_count(),
        sample_rate = buffer.sample_rate(),
        "wav decode complete"
    );
    Ok(buffer)
}

#[instrument(fields(path = %path.display()))]
pub fn read_wav_file(path: &Path) -> Result<SampleBuffer> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read wav file: {}", path.display()))?;
    let buffer = decode_wav(&bytes)
        .with_context(|| format!("failed to decode wav file: {}", path.display()))?;
    Ok(buffer)
}

/// Writes through a temp file in the target directory, then persists over `path`.
#[instrument(skip(buffer), fields(path = %path.display(), frames = buffer.frames()))]
pub fn write_wav_file(path: &Path, buffer: &SampleBuffer) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| Path::new(".").to_path_buf(), Path::to_path_buf);
    fs::create_dir_all(&parent)
        .with_context(|| format!("failed to create directory: {}", parent.display()))?;

    let bytes = encode_wav(buffer).context("failed to encode wav")?;
    let mut temp_file =
        tempfile::NamedTempFile::new_in(&parent).context("failed to create temp wav file")?;
    temp_file
        .write_all(&bytes)
        .context("failed to write temp wav file")?;
    temp_file
        .persist(path)
        .map_err(|error| anyhow::anyhow!(error.error))
        .with_context(|| format!("failed to persist wav file: {}", path.display()))?;

    info!("wav file written");
    Ok(())
}

fn quantize(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32_768.0).round() as i16
    } else {
        (clamped * 32_767.0).round() as i16
    }
}

fn dequantize(sample: i16) -> f32 {
    if sample < 0 {
        f32::from(sample) / 32_768.0
    } else {
        f32::from(sample) / 32_767.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantization_hits_both_rails() {
        assert_eq!(quantize(1.0), i16::MAX);
        assert_eq!(quantize(-1.0), i16::MIN);
        assert_eq!(quantize(4.0), i16::MAX);
        assert_eq!(quantize(-4.0), i16::MIN);
        assert_eq!(quantize(0.0), 0);
    }

    #[test]
    fn header_fields_are_canonical() {
        let buffer = SampleBuffer::silent(2, 10, 44_100).expect("buffer should build");
        let bytes = encode_wav(&buffer).expect("encode should succeed");

        assert_eq!(bytes.len(), WAV_HEADER_LEN + 40);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 2);
        assert_eq!(
            u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]),
            44_100 * 4
        );
        assert_eq!(u16::from_le_bytes([bytes[32], bytes[33]]), 4);
        assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 16);
        assert_eq!(&bytes[36..40], b"data");
    }

    #[test]
    fn multichannel_header_stays_plain_pcm() {
        let buffer = SampleBuffer::silent(4, 3, 8_000).expect("buffer should build");
        let bytes = encode_wav(&buffer).expect("encode should succeed");

        assert_eq!(bytes.len(), WAV_HEADER_LEN + 4 * 3 * 2);
        assert_eq!(u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]), 16);
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 4);
        assert_eq!(u16::from_le_bytes([bytes[32], bytes[33]]), 8);

        let decoded = decode_wav(&bytes).expect("hound should read the plain header");
        assert_eq!(decoded.channel_count(), 4);
        assert_eq!(decoded.frames(), 3);
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let buffer = SampleBuffer::silent(1, 8, 8_000).expect("buffer should build");
        let mut bytes = encode_wav(&buffer).expect("encode should succeed");
        bytes[0..4].copy_from_slice(b"RIFX");
        assert!(matches!(
            decode_wav(&bytes),
            Err(EngineError::DecodeError(_))
        ));
    }
}
