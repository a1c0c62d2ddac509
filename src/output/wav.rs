use std::{fs::File, io::BufWriter, path::Path};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::{engine::ChipEngine, Error};

// -------------------------------------------------------------------------------------------------

const CHANNEL_COUNT: u16 = 2;
const BITS_PER_SAMPLE: u16 = 16;

// -------------------------------------------------------------------------------------------------

/// Offline host, which renders an engine's output into a 16 bit stereo wav file.
///
/// Frames are pulled from the engine in chunks of the engine's fragment size, just like a
/// realtime host would do, but as fast as possible and on the caller's thread.
pub struct WavOutput {
    writer: Option<WavWriter<BufWriter<File>>>,
    sample_rate: u32,
    buffer: Vec<i16>,
    frames_written: u64,
}

impl WavOutput {
    /// Create a new wav file at the given path.
    ///
    /// * `file_path`: Target file path. Should end with ".wav" extension.
    /// * `sample_rate`: The wav file's sample rate. Must match the rendered engine's rate.
    pub fn create<P: AsRef<Path>>(file_path: P, sample_rate: u32) -> Result<Self, Error> {
        let spec = WavSpec {
            channels: CHANNEL_COUNT,
            sample_rate,
            bits_per_sample: BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(file_path, spec)?;
        Ok(Self {
            writer: Some(writer),
            sample_rate,
            buffer: Vec::new(),
            frames_written: 0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of stereo frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Pull `frame_count` frames from the engine and append them to the file.
    pub fn render(&mut self, engine: &ChipEngine, frame_count: u64) -> Result<(), Error> {
        if engine.config().sample_rate != self.sample_rate {
            return Err(Error::ParameterError(format!(
                "engine sample rate {} doesn't match the wav file's rate {}",
                engine.config().sample_rate,
                self.sample_rate
            )));
        }
        let writer = self.writer.as_mut().ok_or_else(|| {
            Error::ParameterError("wav file already got finalized".to_string())
        })?;

        let fragment_size = engine.config().fragment_size;
        self.buffer.resize(fragment_size * CHANNEL_COUNT as usize, 0);

        let mut remaining = frame_count;
        while remaining > 0 {
            let frames = remaining.min(fragment_size as u64) as usize;
            let written = engine.produce(&mut self.buffer, frames);
            if written == 0 {
                break;
            }
            for sample in &self.buffer[..written * CHANNEL_COUNT as usize] {
                writer.write_sample(*sample)?;
            }
            remaining -= written as u64;
            self.frames_written += written as u64;
        }
        Ok(())
    }

    /// Flush and close the wav file.
    pub fn finalize(mut self) -> Result<(), Error> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        Ok(())
    }
}

impl Drop for WavOutput {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(err) = writer.finalize() {
                log::error!("Failed to finalize WAV file: {err}");
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------
