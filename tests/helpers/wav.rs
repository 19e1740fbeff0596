fn wav_header(sample_rate: u32, channels: u16, data_size: u32) -> Vec<u8> {
    let block_align = channels * 2;
    let byte_rate = sample_rate * block_align as u32;

    let mut wav = Vec::with_capacity(44 + data_size as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_size).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    wav
}

pub fn build_wav(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    let mut wav = wav_header(sample_rate, 1, samples.len() as u32 * 2);
    for &s in samples {
        wav.extend_from_slice(&s.to_le_bytes());
    }
    wav
}

/// Interleaves `left` and `right`; both must be the same length.
pub fn build_stereo_wav(sample_rate: u32, left: &[i16], right: &[i16]) -> Vec<u8> {
    let mut wav = wav_header(sample_rate, 2, left.len() as u32 * 4);
    for (&l, &r) in left.iter().zip(right) {
        wav.extend_from_slice(&l.to_le_bytes());
        wav.extend_from_slice(&r.to_le_bytes());
    }
    wav
}
