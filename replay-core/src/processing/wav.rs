use std::io::{self, Write};

use crate::models::config::{AudioConfig, SampleEncoding};

/// Size of the canonical WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Generate the 44-byte RIFF header for a mono clip.
///
/// Format code 1 for integer PCM, 3 for IEEE float. Little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_len
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (fmt chunk size)
/// [20-21]  format code (1 = PCM, 3 = IEEE float)
/// [22-23]  1 (channels, always mono)
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * bytes_per_sample
/// [32-33]  block_align = bytes_per_sample
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_len
/// ```
pub fn wav_header(config: &AudioConfig, data_len: u32) -> [u8; WAV_HEADER_SIZE] {
    let format_code: u16 = match config.bit_depth.encoding {
        SampleEncoding::PcmInt => 1,
        SampleEncoding::PcmFloat => 3,
    };
    let byte_rate = config.byte_rate();
    let block_align = config.bytes_per_sample() as u16;
    let chunk_size = 36 + data_len;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&format_code.to_le_bytes());
    header[22..24].copy_from_slice(&1u16.to_le_bytes()); // mono
    header[24..28].copy_from_slice(&config.sample_rate_hz.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&(config.bit_depth.bits as u16).to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_len.to_le_bytes());

    header
}

/// Stream header + PCM bytes into `sink`.
///
/// PCM bytes are written verbatim after the header; sink errors
/// propagate untouched. Data that cannot fit the u32 size fields is
/// rejected before anything is written.
pub fn encode_into<W: Write>(sink: &mut W, pcm: &[u8], config: &AudioConfig) -> io::Result<()> {
    if pcm.len() as u64 > u32::MAX as u64 - 36 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "PCM data too large for a single WAV file",
        ));
    }
    sink.write_all(&wav_header(config, pcm.len() as u32))?;
    sink.write_all(pcm)?;
    Ok(())
}

/// Encode header + PCM bytes into a fresh buffer.
pub fn encode(pcm: &[u8], config: &AudioConfig) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(WAV_HEADER_SIZE + pcm.len());
    encode_into(&mut out, pcm, config)?;
    Ok(out)
}
