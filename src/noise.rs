// -------------------------------------------------------------------------------------------------

/// Seed value of a freshly created noise register.
pub const NOISE_SEED: u16 = 0x0001;
/// Default feedback tap of a freshly created noise register.
pub const DEFAULT_NOISE_TAP: u8 = 7;
/// Highest valid feedback tap.
pub const MAX_NOISE_TAP: u8 = 15;

// -------------------------------------------------------------------------------------------------

/// Advance a 15 bit linear feedback shift register by one step.
///
/// The feedback bit is bit 0 XOR bit `tap` of the current state. It gets shifted in at bit 14
/// while the register shifts right. Returns the new state and the feedback bit.
#[inline]
pub fn noise_step(state: u16, tap: u8) -> (u16, u8) {
    debug_assert!(tap <= MAX_NOISE_TAP, "Invalid noise tap");
    let tapped = (state >> (tap & 0x0F)) & 0x0001;
    let feedback = (state & 0x0001) ^ tapped;
    ((feedback << 14) | (state >> 1), feedback as u8)
}

// -------------------------------------------------------------------------------------------------

/// Tap-configurable LFSR noise generator, producing a 1 bit pseudorandom stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseGenerator {
    state: u16,
    tap: u8,
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new(NOISE_SEED, DEFAULT_NOISE_TAP)
    }
}

impl NoiseGenerator {
    /// Create a new generator. Taps above 15 are reset to 0.
    pub fn new(seed: u16, tap: u8) -> Self {
        let mut generator = Self { state: seed, tap: 0 };
        generator.set_tap(tap);
        generator
    }

    #[inline(always)]
    pub fn state(&self) -> u16 {
        self.state
    }

    #[inline(always)]
    pub fn tap(&self) -> u8 {
        self.tap
    }

    /// Set a new feedback tap. Out of range taps are reset to 0.
    pub fn set_tap(&mut self, tap: u8) {
        self.tap = if tap > MAX_NOISE_TAP { 0 } else { tap };
    }

    /// Current output bit: the register's lowest bit.
    #[inline(always)]
    pub fn output(&self) -> u8 {
        (self.state & 0x0001) as u8
    }

    /// Advance the register and return the emitted feedback bit.
    #[inline]
    pub fn step(&mut self) -> u8 {
        let (state, bit) = noise_step(self.state, self.tap);
        self.state = state;
        bit
    }
}

// -------------------------------------------------------------------------------------------------
