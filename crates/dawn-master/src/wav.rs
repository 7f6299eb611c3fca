//! WAV encoding for 16-bit mono PCM.

use std::io::Write;

const NUM_CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BLOCK_ALIGN: u16 = NUM_CHANNELS * (BITS_PER_SAMPLE / 8);
const HEADER_LEN: usize = 44;

pub fn write_wav(w: &mut impl Write, samples: &[f32], sample_rate: u32) -> std::io::Result<()> {
    w.write_all(&wav_header(samples.len(), sample_rate))?;
    for &sample in samples {
        w.write_all(&to_pcm16(sample).to_le_bytes())?;
    }
    Ok(())
}

pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + samples.len() * BLOCK_ALIGN as usize);
    buf.extend_from_slice(&wav_header(samples.len(), sample_rate));
    for &sample in samples {
        buf.extend_from_slice(&to_pcm16(sample).to_le_bytes());
    }
    buf
}

/// Clip to [-1, 1] and scale to a signed 16-bit sample.
fn to_pcm16(sample: f32) -> i16 {
    let clipped = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    (clipped * i16::MAX as f32) as i16
}

/// RIFF header, `fmt ` chunk and `data` chunk header.
fn wav_header(num_samples: usize, sample_rate: u32) -> [u8; HEADER_LEN] {
    let data_size = (num_samples as u32).saturating_mul(BLOCK_ALIGN as u32);
    let byte_rate = sample_rate.saturating_mul(BLOCK_ALIGN as u32);

    let mut header = [0u8; HEADER_LEN];
    let fields: [&[u8]; 13] = [
        b"RIFF",
        &(36u32.saturating_add(data_size)).to_le_bytes(),
        b"WAVE",
        b"fmt ",
        &16u32.to_le_bytes(),
        &1u16.to_le_bytes(),
        &NUM_CHANNELS.to_le_bytes(),
        &sample_rate.to_le_bytes(),
        &byte_rate.to_le_bytes(),
        &BLOCK_ALIGN.to_le_bytes(),
        &BITS_PER_SAMPLE.to_le_bytes(),
        b"data",
        &data_size.to_le_bytes(),
    ];
    let mut pos = 0;
    for field in fields {
        header[pos..pos + field.len()].copy_from_slice(field);
        pos += field.len();
    }
    header
}
