use crate::channel::{Channel, NIBBLE_MAX};

// -------------------------------------------------------------------------------------------------

/// Scale factor which widens a centered nibble-amplitude product to the 16 bit range:
/// `v + (v + v * 0x11F)`.
const WIDEN_FACTOR: i32 = 0x11F;

// -------------------------------------------------------------------------------------------------

/// Mixes the oversampled output of all channels into interleaved stereo 16 bit frames.
///
/// All intermediate values are 16 bit and wrap on overflow. The resulting loudness curve is
/// part of the engine's output format and must not change.
#[derive(Debug, Clone, Copy)]
pub struct Mixer {
    rate_multiplier: u16,
    channel_count: i32,
}

impl Mixer {
    pub fn new(rate_multiplier: u16, channel_count: usize) -> Self {
        debug_assert!(rate_multiplier >= 1, "Invalid rate multiplier");
        debug_assert!(channel_count >= 1, "Invalid channel count");
        Self {
            rate_multiplier: rate_multiplier.max(1),
            channel_count: i32::try_from(channel_count.max(1)).unwrap_or(i32::MAX),
        }
    }

    /// Step the given channel `rate_multiplier` times and return the sum of its raw samples.
    #[inline]
    pub fn accumulate(&self, channel: &mut Channel) -> i16 {
        let mut sum = 0i16;
        for _ in 0..self.rate_multiplier {
            channel.step();
            sum = sum.wrapping_add(channel.sample() as i16);
        }
        sum
    }

    /// Convert an accumulated sample sum into one side's contribution to the frame.
    #[inline]
    pub fn scale(&self, sum: i16, amplitude: u16) -> i16 {
        // average the oversampled steps
        let mut value = (sum as i32 / self.rate_multiplier as i32) as i16;
        // apply amplitude
        value = value.wrapping_mul(amplitude as i16);
        // center at zero
        value = value.wrapping_sub(((NIBBLE_MAX as u32 * amplitude as u32) / 2) as i16);
        // widen to 16 bits
        let wide = value as i32;
        value = (wide + (wide + wide * WIDEN_FACTOR)) as i16;
        // share headroom with all other channels
        (value as i32 / self.channel_count) as i16
    }

    /// Step a single channel for one output frame and add its contribution to `frame`.
    #[inline]
    pub fn mix_channel(&self, channel: &mut Channel, frame: &mut [i16; 2]) {
        let sum = self.accumulate(channel);
        for (side, output) in frame.iter_mut().enumerate() {
            let value = self.scale(sum, channel.amplitude(side));
            *output = output.wrapping_add(value);
        }
    }
}

// -------------------------------------------------------------------------------------------------
