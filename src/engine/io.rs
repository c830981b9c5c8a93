//! Audio file I/O for bedmix
//!
//! Handles importing and exporting audio files. WAV goes through `hound`;
//! everything else (MP3 beds, mostly) is decoded with `symphonia`. Export is
//! always WAV at the buffer's own sample rate and channel count.
//!
//! [`conform`] brings a buffer to another format so narration and bed can be
//! composited. Sample rate conversion uses linear interpolation.

use std::fs::File;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::engine::buffer::{checked_ms_to_frames, AudioBuffer};
use crate::error::{MixError, Result};

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24, or 32 (32 is float)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        Self::cd_quality()
    }
}

impl ExportFormat {
    /// Create a new export format with the given bit depth
    pub fn new(bit_depth: u16) -> Self {
        ExportFormat { bit_depth }
    }

    /// 16-bit integer PCM
    pub fn cd_quality() -> Self {
        ExportFormat { bit_depth: 16 }
    }

    /// 24-bit integer PCM
    pub fn high_quality() -> Self {
        ExportFormat { bit_depth: 24 }
    }

    /// 32-bit float PCM
    pub fn float() -> Self {
        ExportFormat { bit_depth: 32 }
    }
}

fn decode_error<E>(path: &str, reason: impl Into<String>, source: E) -> MixError
where
    E: std::error::Error + Send + Sync + 'static,
{
    MixError::Decode {
        path: path.to_string(),
        reason: reason.into(),
        source: Some(Box::new(source)),
    }
}

fn encode_error(path: &Path, err: impl std::fmt::Display) -> MixError {
    MixError::Encode {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Import an audio file
///
/// WAV files are read with `hound`; any other extension is probed with
/// `symphonia`. The buffer keeps the file's native sample rate and channels.
///
/// # Errors
/// `Decode` if the file is missing, unreadable, or holds no audio.
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    let label = path.display().to_string();
    if !path.is_file() {
        return Err(MixError::Decode {
            path: label,
            reason: "file not found".to_string(),
            source: None,
        });
    }

    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);

    let buffer = if is_wav {
        import_wav(path)?
    } else {
        let file = File::open(path).map_err(|e| decode_error(&label, "cannot open file", e))?;
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }
        decode_stream(Box::new(file), &hint, &label)?
    };

    debug!(
        path = %label,
        sample_rate = buffer.sample_rate(),
        channels = buffer.channels(),
        duration_ms = buffer.duration_ms(),
        "imported audio"
    );
    Ok(buffer)
}

/// Decode raw little-endian signed 16-bit PCM
///
/// # Errors
/// `Decode` if the byte count does not hold whole frames or is empty.
pub fn decode_pcm_s16le(
    bytes: &[u8],
    sample_rate: u32,
    channels: usize,
    label: &str,
) -> Result<AudioBuffer> {
    let frame_bytes = 2 * channels.max(1);
    if bytes.is_empty() || bytes.len() % frame_bytes != 0 {
        return Err(MixError::Decode {
            path: label.to_string(),
            reason: format!(
                "{} bytes is not a whole number of {}-channel 16-bit frames",
                bytes.len(),
                channels
            ),
            source: None,
        });
    }
    let samples: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect();
    AudioBuffer::from_interleaved(&samples, channels, sample_rate)
}

/// Export an AudioBuffer to a WAV file
///
/// Sample rate and channel count are written exactly as they are in the
/// buffer. Integer formats clamp to full scale; 32-bit float does not.
///
/// # Errors
/// `Encode` if the file cannot be written or the bit depth is unsupported.
pub fn export_audio(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    let spec = WavSpec {
        channels: buffer.channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: format.bit_depth,
        sample_format: if format.bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };
    if !matches!(format.bit_depth, 16 | 24 | 32) {
        return Err(encode_error(
            path,
            format!("{}-bit audio (only 16, 24, 32 supported)", format.bit_depth),
        ));
    }

    let mut writer = WavWriter::create(path, spec).map_err(|e| encode_error(path, e))?;
    let interleaved = buffer.to_interleaved();

    match format.bit_depth {
        16 => {
            for sample in interleaved {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(|e| encode_error(path, e))?;
            }
        }
        24 => {
            for sample in interleaved {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(|e| encode_error(path, e))?;
            }
        }
        _ => {
            for sample in interleaved {
                writer.write_sample(sample).map_err(|e| encode_error(path, e))?;
            }
        }
    }

    writer.finalize().map_err(|e| encode_error(path, e))?;
    Ok(())
}

/// Bring `buffer` to `sample_rate` and `channels`
///
/// Mono is duplicated to every output channel; anything is averaged down to
/// mono. Other channel conversions are rejected.
///
/// # Errors
/// `InvalidInput` for unsupported channel conversions or a zero rate.
pub fn conform(buffer: &AudioBuffer, sample_rate: u32, channels: usize) -> Result<AudioBuffer> {
    if buffer.sample_rate() == sample_rate && buffer.channels() == channels {
        return Ok(buffer.clone());
    }
    if sample_rate == 0 {
        return Err(MixError::invalid_input("target sample rate must be positive"));
    }

    let source: Vec<Vec<f32>> = (0..buffer.channels())
        .map(|ch| buffer.channel(ch).to_vec())
        .collect();

    let remixed = match (buffer.channels(), channels) {
        (from, to) if from == to => source,
        (1, to) => vec![source[0].clone(); to],
        (from, 1) => {
            let frames = buffer.len();
            let mono = (0..frames)
                .map(|i| source.iter().map(|ch| ch[i]).sum::<f32>() / from as f32)
                .collect();
            vec![mono]
        }
        (from, to) => {
            return Err(MixError::invalid_input(format!(
                "cannot convert {}-channel audio to {} channels",
                from, to
            )))
        }
    };

    let resampled = if buffer.sample_rate() != sample_rate {
        resample_channels(&remixed, buffer.sample_rate(), sample_rate)
    } else {
        remixed
    };

    AudioBuffer::from_channels(resampled, sample_rate)
}

/// Generate a sine test tone
///
/// # Arguments
/// * `frequency` - Frequency of the sine wave in Hz
/// * `amplitude` - Peak amplitude (1.0 = full scale)
/// * `duration_ms` - Duration in milliseconds
/// * `sample_rate` - Sample rate in Hz
/// * `channels` - Number of identical channels
///
/// A negative or unrepresentable duration gives an empty buffer.
pub fn generate_test_tone(
    frequency: f32,
    amplitude: f32,
    duration_ms: i64,
    sample_rate: u32,
    channels: usize,
) -> AudioBuffer {
    let frames = checked_ms_to_frames(duration_ms, sample_rate).unwrap_or(0);
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    let samples: Vec<f32> = (0..frames)
        .map(|i| amplitude * (angular_freq * i as f32).sin())
        .collect();
    AudioBuffer::from_owned(vec![samples; channels.max(1)], sample_rate)
}

/// Generate a buffer holding one constant sample value (a DC "tone")
///
/// Handy for level checks: every frame of the result shows the applied gain
/// directly.
pub fn generate_constant(
    value: f32,
    duration_ms: i64,
    sample_rate: u32,
    channels: usize,
) -> AudioBuffer {
    let frames = checked_ms_to_frames(duration_ms, sample_rate).unwrap_or(0);
    AudioBuffer::from_owned(vec![vec![value; frames]; channels.max(1)], sample_rate)
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn import_wav(path: &Path) -> Result<AudioBuffer> {
    let label = path.display().to_string();
    let reader =
        WavReader::open(path).map_err(|e| decode_error(&label, "failed to open WAV file", e))?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format, &label)?;

    if samples.is_empty() {
        return Err(MixError::Decode {
            path: label,
            reason: "audio contains no samples".to_string(),
            source: None,
        });
    }

    AudioBuffer::from_interleaved(&samples, channels, spec.sample_rate)
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
    label: &str,
) -> Result<Vec<f32>> {
    let read_err = |e: hound::Error| decode_error(label, "failed to read samples", e);
    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(read_err),
        SampleFormat::Int => {
            let scale = match bits_per_sample {
                8 => 128.0,
                16 => 32768.0,
                24 => 8388608.0,
                32 => 2147483648.0,
                _ => {
                    return Err(MixError::Decode {
                        path: label.to_string(),
                        reason: format!("{}-bit integer audio is not supported", bits_per_sample),
                        source: None,
                    })
                }
            };
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(read_err)
        }
    }
}

/// Decode the first audio track of a container with symphonia
fn decode_stream(source: Box<dyn MediaSource>, hint: &Hint, label: &str) -> Result<AudioBuffer> {
    let mss = MediaSourceStream::new(source, Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| decode_error(label, "unrecognized audio container", e))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| MixError::Decode {
            path: label.to_string(),
            reason: "no audio track found".to_string(),
            source: None,
        })?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| decode_error(label, "unsupported codec", e))?;

    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);
    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break; // EOF
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decode_error(label, "cannot read packet", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count();
                let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                samples.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(samples.samples());
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                // A corrupt frame in an MP3 is skipped, not fatal
                warn!(path = %label, "skipping undecodable packet: {}", msg);
            }
            Err(e) => return Err(decode_error(label, "decoder failure", e)),
        }
    }

    if interleaved.is_empty() || channels == 0 || sample_rate == 0 {
        return Err(MixError::Decode {
            path: label.to_string(),
            reason: "audio contains no samples".to_string(),
            source: None,
        });
    }

    AudioBuffer::from_interleaved(&interleaved, channels, sample_rate)
}

/// Resample audio channels to a different sample rate
fn resample_channels(channels: &[Vec<f32>], source_rate: u32, target_rate: u32) -> Vec<Vec<f32>> {
    let ratio = target_rate as f64 / source_rate as f64;

    channels
        .iter()
        .map(|channel| resample_linear(channel, ratio))
        .collect()
}

/// Linear interpolation resampling
fn resample_linear(samples: &[f32], ratio: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let source_len = samples.len();
    let target_len = ((source_len as f64) * ratio).round() as usize;
    let mut output = Vec::with_capacity(target_len);

    for i in 0..target_len {
        // Map output index to source position
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < source_len {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else if src_idx < source_len {
            samples[src_idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ============================================================================
// Tests
// ============================================================================
