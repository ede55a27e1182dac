use std::io::{self, BufWriter, Seek, SeekFrom, Write};

// Decoded output is written with a fixed consumer-format header.
pub const WAV_SAMPLE_RATE: u32 = 48_000;
pub const WAV_CHANNELS: u16 = 2;
pub const WAV_BITS_PER_SAMPLE: u16 = 16;

/// Total size of the RIFF/WAVE header preceding the PCM data.
pub const WAV_HEADER_LEN: u64 = 44;

const RIFF_SIZE_POSITION: u64 = 4;
const DATA_SIZE_POSITION: u64 = 40;

/// RIFF/WAVE writer for 16-bit stereo PCM at 48 kHz.
///
/// The 44-byte header is written up front with zeroed chunk sizes and
/// patched on [`finish`](Self::finish) once the sample count is known, so
/// the writer can stream samples as they are decoded.
pub struct WavWriter<W: Write + Seek> {
    writer: BufWriter<W>,
    data_written: u64,
}

impl<W: Write + Seek> WavWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            data_written: 0,
        }
    }

    /// Write the fixed-layout header with placeholder sizes.
    pub fn write_header(&mut self) -> io::Result<()> {
        self.writer.write_all(b"RIFF")?;
        self.writer.write_all(&0u32.to_le_bytes())?; // File size - 8 (patched later)
        self.writer.write_all(b"WAVE")?;

        self.writer.write_all(b"fmt ")?;
        self.writer.write_all(&16u32.to_le_bytes())?;
        self.writer.write_all(&1u16.to_le_bytes())?; // PCM format
        self.writer.write_all(&WAV_CHANNELS.to_le_bytes())?;
        self.writer.write_all(&WAV_SAMPLE_RATE.to_le_bytes())?;

        let bytes_per_frame = u32::from(WAV_CHANNELS) * u32::from(WAV_BITS_PER_SAMPLE / 8);
        let byte_rate = WAV_SAMPLE_RATE * bytes_per_frame;
        self.writer.write_all(&byte_rate.to_le_bytes())?;
        self.writer.write_all(&(bytes_per_frame as u16).to_le_bytes())?;
        self.writer.write_all(&WAV_BITS_PER_SAMPLE.to_le_bytes())?;

        self.writer.write_all(b"data")?;
        self.writer.write_all(&0u32.to_le_bytes())?; // Data size (patched later)

        Ok(())
    }

    /// Append one 16-bit PCM value, little-endian.
    pub fn write_sample(&mut self, sample: i16) -> io::Result<()> {
        self.writer.write_all(&sample.to_le_bytes())?;
        self.data_written += 2;
        Ok(())
    }

    /// Individual channel samples written so far.
    pub fn samples_written(&self) -> u64 {
        self.data_written / 2
    }

    /// Patch the header chunk sizes and flush.
    pub fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()?;

        let end = self.writer.stream_position()?;

        self.writer.seek(SeekFrom::Start(RIFF_SIZE_POSITION))?;
        let riff_size = (WAV_HEADER_LEN - 8 + self.data_written) as u32;
        self.writer.write_all(&riff_size.to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(DATA_SIZE_POSITION))?;
        self.writer.write_all(&(self.data_written as u32).to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;

        Ok(())
    }

    /// Get the underlying writer
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_layout() -> io::Result<()> {
        let mut writer = WavWriter::new(Cursor::new(Vec::new()));
        writer.write_header()?;

        let buffer = writer.into_inner()?.into_inner();
        assert_eq!(buffer.len() as u64, WAV_HEADER_LEN);
        assert_eq!(&buffer[0..4], b"RIFF");
        assert_eq!(&buffer[8..12], b"WAVE");
        assert_eq!(&buffer[12..16], b"fmt ");
        assert_eq!(&buffer[36..40], b"data");

        // channels and sample rate
        assert_eq!(u16::from_le_bytes([buffer[22], buffer[23]]), 2);
        assert_eq!(
            u32::from_le_bytes([buffer[24], buffer[25], buffer[26], buffer[27]]),
            48_000
        );
        // block align and bit depth
        assert_eq!(u16::from_le_bytes([buffer[32], buffer[33]]), 4);
        assert_eq!(u16::from_le_bytes([buffer[34], buffer[35]]), 16);

        Ok(())
    }

    #[test]
    fn finish_patches_sizes() -> io::Result<()> {
        let mut writer = WavWriter::new(Cursor::new(Vec::new()));
        writer.write_header()?;

        for sample in [0x0123i16, 0x4567, -1, 42] {
            writer.write_sample(sample)?;
        }
        assert_eq!(writer.samples_written(), 4);
        writer.finish()?;

        let buffer = writer.into_inner()?.into_inner();
        assert_eq!(buffer.len() as u64, WAV_HEADER_LEN + 8);
        assert_eq!(
            u32::from_le_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]),
            36 + 8
        );
        assert_eq!(
            u32::from_le_bytes([buffer[40], buffer[41], buffer[42], buffer[43]]),
            8
        );
        assert_eq!(&buffer[44..46], &0x0123i16.to_le_bytes());

        Ok(())
    }
}
