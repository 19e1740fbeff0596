use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::TranscriptionError;

/// Sample rate Whisper models are trained on.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

const RESAMPLER_CHUNK: usize = 1024;

/// Decodes an audio file into 16 kHz mono PCM. Blocking.
///
/// The file extension, when present, is passed to the format probe.
pub fn decode_audio_file(path: &Path) -> Result<Vec<f32>, TranscriptionError> {
    let file = File::open(path)?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    decode_to_target(Box::new(file), hint)
}

fn decode_to_target(
    source: Box<dyn MediaSource>,
    hint: Hint,
) -> Result<Vec<f32>, TranscriptionError> {
    let track = MonoTrack::decode(source, &hint)?;
    let source_rate = track.sample_rate;

    let pcm = if source_rate == TARGET_SAMPLE_RATE {
        track.samples
    } else {
        resample_mono(&track.samples, source_rate, TARGET_SAMPLE_RATE)?
    };

    tracing::debug!(
        samples = pcm.len(),
        source_rate,
        duration_secs = pcm.len() as f32 / TARGET_SAMPLE_RATE as f32,
        "Audio decoded to 16kHz mono PCM"
    );

    Ok(pcm)
}

/// The default track of a container, averaged down to one channel.
struct MonoTrack {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl MonoTrack {
    fn decode(source: Box<dyn MediaSource>, hint: &Hint) -> Result<Self, TranscriptionError> {
        let stream = MediaSourceStream::new(source, Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| TranscriptionError::UnsupportedFormat(format!("probe: {}", e)))?;
        let mut reader = probed.format;

        let track = reader.default_track().ok_or_else(|| {
            TranscriptionError::DecodingFailed("container has no audio track".to_string())
        })?;
        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.ok_or_else(|| {
            TranscriptionError::DecodingFailed("track does not declare a sample rate".to_string())
        })?;
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| TranscriptionError::UnsupportedFormat(format!("codec: {}", e)))?;

        let samples = read_mono_samples(reader.as_mut(), decoder.as_mut(), track_id)?;
        if samples.is_empty() {
            return Err(TranscriptionError::DecodingFailed(
                "no audio samples decoded".to_string(),
            ));
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }
}

fn read_mono_samples(
    reader: &mut dyn FormatReader,
    decoder: &mut dyn Decoder,
    track_id: u32,
) -> Result<Vec<f32>, TranscriptionError> {
    let mut mono = Vec::new();

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => {
                return Err(TranscriptionError::DecodingFailed(format!("packet: {}", e)));
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(buffer) => append_downmixed(buffer, &mut mono),
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(error = %e, "Skipping corrupt audio frame");
            }
            Err(e) => {
                return Err(TranscriptionError::DecodingFailed(format!("decode: {}", e)));
            }
        }
    }

    Ok(mono)
}

/// Channel count is read per buffer; some containers omit it from the codec params.
fn append_downmixed(buffer: AudioBufferRef<'_>, mono: &mut Vec<f32>) {
    let frames = buffer.frames();
    if frames == 0 {
        return;
    }
    let spec = *buffer.spec();
    let channels = spec.channels.count().max(1);

    let mut interleaved = SampleBuffer::<f32>::new(frames as u64, spec);
    interleaved.copy_interleaved_ref(buffer);

    if channels == 1 {
        mono.extend_from_slice(interleaved.samples());
    } else {
        let scale = 1.0 / channels as f32;
        mono.extend(
            interleaved
                .samples()
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() * scale),
        );
    }
}

/// Band-limited resampling of a mono signal.
///
/// The filter delay is trimmed from the front and the tail is flushed, so the
/// result lines up with the input and has `len * to / from` samples.
fn resample_mono(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, TranscriptionError> {
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = to_rate as f64 / from_rate as f64;
    let resample_err = |e: &dyn std::fmt::Display| {
        TranscriptionError::DecodingFailed(format!("resample: {}", e))
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLER_CHUNK, 1)
        .map_err(|e| resample_err(&e))?;

    let delay = resampler.output_delay();
    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(delay + expected_len + RESAMPLER_CHUNK);

    let mut chunks = samples.chunks_exact(RESAMPLER_CHUNK);
    for chunk in chunks.by_ref() {
        let frames = resampler.process(&[chunk], None).map_err(|e| resample_err(&e))?;
        output.extend(frames.into_iter().flatten());
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let tail: [&[f32]; 1] = [remainder];
        let frames = resampler
            .process_partial(Some(&tail[..]), None)
            .map_err(|e| resample_err(&e))?;
        output.extend(frames.into_iter().flatten());
    }

    while output.len() < delay + expected_len {
        let frames = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| resample_err(&e))?;
        let produced: usize = frames.iter().map(Vec::len).sum();
        if produced == 0 {
            break;
        }
        output.extend(frames.into_iter().flatten());
    }

    let start = delay.min(output.len());
    let mut aligned = output.split_off(start);
    aligned.truncate(expected_len);
    Ok(aligned)
}
