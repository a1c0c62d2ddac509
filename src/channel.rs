use std::sync::Arc;

use crate::{noise::NoiseGenerator, Error};

// -------------------------------------------------------------------------------------------------

pub mod wave;

pub use wave::WaveBuffer;

// -------------------------------------------------------------------------------------------------

/// Full scale value of a nibble sample.
pub const NIBBLE_MAX: u16 = 0x0F;

// -------------------------------------------------------------------------------------------------

/// A copy of all scalar parameters and the playback state of a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelState {
    pub period: u32,
    pub counter: u32,
    pub amplitude: (u16, u16),
    pub wave_len: usize,
    pub wave_pos: usize,
    pub wave_owned: bool,
    pub loop_enabled: bool,
    pub noise_enabled: bool,
    pub noise_state: u16,
    pub noise_tap: u8,
}

// -------------------------------------------------------------------------------------------------

/// Per-voice wave/noise state machine.
///
/// The wave position advances once every `period` steps. When noise is enabled, the noise
/// register advances at the same rate and replaces the wave samples in the output.
#[derive(Debug, Clone)]
pub struct Channel {
    period: u32,
    counter: u32,
    amplitude: [u16; 2],
    wave: WaveBuffer,
    wave_pos: usize,
    loop_enabled: bool,
    noise_enabled: bool,
    noise: NoiseGenerator,
}

impl Channel {
    /// Create a silent channel with a single sample owned wave and period 1. Fails when the
    /// wave can't be allocated.
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            period: 1,
            counter: 0,
            amplitude: [0, 0],
            wave: WaveBuffer::zeroed(1)?,
            wave_pos: 0,
            loop_enabled: false,
            noise_enabled: false,
            noise: NoiseGenerator::default(),
        })
    }

    /// Advance the channel by one internal (oversampled) tick.
    #[inline]
    pub fn step(&mut self) {
        if self.counter == 0 {
            self.counter = self.period - 1;
            if self.noise_enabled {
                self.noise.step();
            }
            if self.wave_pos >= self.wave.len() - 1 {
                if self.loop_enabled {
                    self.wave_pos = 0;
                }
            } else {
                self.wave_pos += 1;
            }
        } else {
            self.counter -= 1;
        }
    }

    /// Raw nibble sample at the current position: the scaled noise output bit when noise is
    /// enabled, else the wave sample.
    #[inline]
    pub fn sample(&self) -> u16 {
        if self.noise_enabled {
            NIBBLE_MAX * self.noise.output() as u16
        } else {
            self.wave.samples()[self.wave_pos]
        }
    }

    pub fn state(&self) -> ChannelState {
        ChannelState {
            period: self.period,
            counter: self.counter,
            amplitude: (self.amplitude[0], self.amplitude[1]),
            wave_len: self.wave.len(),
            wave_pos: self.wave_pos,
            wave_owned: self.wave.is_owned(),
            loop_enabled: self.loop_enabled,
            noise_enabled: self.noise_enabled,
            noise_state: self.noise.state(),
            noise_tap: self.noise.tap(),
        }
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Set a new period, clamped to at least 1. A pending countdown is shortened to fit
    /// into the new period.
    pub fn set_period(&mut self, period: u32) {
        self.period = period.max(1);
        self.counter = self.counter.min(self.period - 1);
    }

    /// Amplitude of the given side: 0 is left, 1 is right.
    #[inline(always)]
    pub fn amplitude(&self, side: usize) -> u16 {
        self.amplitude[side % 2]
    }

    pub fn set_amplitude(&mut self, left: u16, right: u16) {
        self.amplitude = [left, right];
    }

    pub fn noise_enabled(&self) -> bool {
        self.noise_enabled
    }

    pub fn set_noise_enabled(&mut self, enabled: bool) {
        self.noise_enabled = enabled;
    }

    pub fn noise_tap(&self) -> u8 {
        self.noise.tap()
    }

    /// Set the noise feedback tap. Taps above 15 are reset to 0.
    pub fn set_noise_tap(&mut self, tap: u8) {
        self.noise.set_tap(tap);
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    pub fn wave(&self) -> &WaveBuffer {
        &self.wave
    }

    pub fn wave_len(&self) -> usize {
        self.wave.len()
    }

    pub fn wave_position(&self) -> usize {
        self.wave_pos
    }

    pub fn set_wave_position(&mut self, pos: usize) -> Result<(), Error> {
        if pos >= self.wave.len() {
            return Err(Error::ParameterError(format!(
                "wave position {pos} exceeds wave length {}",
                self.wave.len()
            )));
        }
        self.wave_pos = pos;
        Ok(())
    }

    /// Install a new wave buffer and returns the replaced one, so the caller decides where it
    /// gets dropped. The position restarts when it no longer fits into the new wave.
    pub fn replace_wave(&mut self, wave: WaveBuffer, loop_enabled: bool) -> WaveBuffer {
        debug_assert!(!wave.is_empty(), "Invalid empty wave buffer");
        if self.wave_pos >= wave.len() {
            self.wave_pos = 0;
        }
        self.loop_enabled = loop_enabled;
        std::mem::replace(&mut self.wave, wave)
    }

    /// Install a caller owned wave buffer.
    pub fn set_borrowed_wave(
        &mut self,
        samples: Arc<[u16]>,
        loop_enabled: bool,
    ) -> Result<WaveBuffer, Error> {
        let wave = WaveBuffer::borrowed(samples)?;
        Ok(self.replace_wave(wave, loop_enabled))
    }

    /// Copy `samples` into the owned wave, starting at `offset`. Returns `None` when the
    /// channel plays a borrowed wave, which can't be written.
    pub fn write_wave(&mut self, offset: usize, samples: &[u16]) -> Option<Result<(), Error>> {
        let wave_len = self.wave.len();
        let target = self.wave.samples_mut()?;
        Some(match offset.checked_add(samples.len()) {
            Some(end) if end <= wave_len => {
                target[offset..end].copy_from_slice(samples);
                Ok(())
            }
            _ => Err(Error::ParameterError(format!(
                "wave write of {} samples at {offset} exceeds wave length {wave_len}",
                samples.len()
            ))),
        })
    }

    /// Append a copy of the wave's samples to `target`, but only when `target` has enough
    /// spare capacity to do so without reallocating. Returns false when it doesn't.
    pub fn copy_wave_into(&self, target: &mut Vec<u16>) -> bool {
        let samples = self.wave.samples();
        if target.capacity() - target.len() < samples.len() {
            return false;
        }
        target.extend_from_slice(samples);
        true
    }
}

// -------------------------------------------------------------------------------------------------
