use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Default output sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
/// Default number of frames a host pulls per production call.
pub const DEFAULT_FRAGMENT_SIZE: usize = 1024;
/// Default host buffering depth in fragments.
pub const DEFAULT_FRAGMENT_COUNT: usize = 4;
/// Default oversampling factor: no oversampling.
pub const DEFAULT_RATE_MULTIPLIER: u16 = 1;

/// Default engine callback rate in Hz.
pub(crate) const DEFAULT_ENGINE_TICK_RATE: u32 = 60;

// -------------------------------------------------------------------------------------------------

/// Options to initialize a [`ChipEngine`](crate::ChipEngine).
///
/// `sample_rate` and `channel_count` are required to be non zero. Zero `fragment_size`,
/// `fragment_count` or `rate_multiplier` values fall back to their defaults when the engine gets
/// created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// By default 44100. Output sample rate in Hz.
    pub sample_rate: u32,
    /// By default 1. Number of mixed wave/noise channels.
    pub channel_count: usize,
    /// By default 1024. Frames per host production call. Only used by hosts.
    pub fragment_size: usize,
    /// By default 4. Host buffering depth. Only used by hosts.
    pub fragment_count: usize,
    /// By default 1. Internal steps per produced frame, which get averaged.
    pub rate_multiplier: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channel_count: 1,
            fragment_size: DEFAULT_FRAGMENT_SIZE,
            fragment_count: DEFAULT_FRAGMENT_COUNT,
            rate_multiplier: DEFAULT_RATE_MULTIPLIER,
        }
    }
}

impl EngineConfig {
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn channel_count(mut self, channel_count: usize) -> Self {
        self.channel_count = channel_count;
        self
    }

    pub fn fragment_size(mut self, fragment_size: usize) -> Self {
        self.fragment_size = fragment_size;
        self
    }

    pub fn fragment_count(mut self, fragment_count: usize) -> Self {
        self.fragment_count = fragment_count;
        self
    }

    pub fn rate_multiplier(mut self, rate_multiplier: u16) -> Self {
        self.rate_multiplier = rate_multiplier;
        self
    }

    /// Validate all parameters. Returns Error::ConfigError on errors.
    pub fn validate(&self) -> Result<(), Error> {
        if self.sample_rate == 0 {
            return Err(Error::ConfigError(
                "invalid sample rate '0' specified".to_string(),
            ));
        }
        if self.channel_count == 0 {
            return Err(Error::ConfigError(
                "at least one channel must be created".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate and replace missing optional values with their defaults, logging a warning
    /// for every replaced value.
    pub(crate) fn resolve(mut self) -> Result<Self, Error> {
        self.validate()?;
        if self.fragment_size == 0 {
            log::warn!("No fragment size given. Defaulting to {DEFAULT_FRAGMENT_SIZE}");
            self.fragment_size = DEFAULT_FRAGMENT_SIZE;
        }
        if self.fragment_count == 0 {
            log::warn!("No fragment count given. Defaulting to {DEFAULT_FRAGMENT_COUNT}");
            self.fragment_count = DEFAULT_FRAGMENT_COUNT;
        }
        if self.rate_multiplier == 0 {
            log::warn!("No rate multiplier given. Defaulting to {DEFAULT_RATE_MULTIPLIER}");
            self.rate_multiplier = DEFAULT_RATE_MULTIPLIER;
        }
        Ok(self)
    }

    /// Default engine tick period in frames: the sample rate divided down to 60 Hz.
    pub(crate) fn default_tick_period(&self) -> u32 {
        (self.sample_rate / DEFAULT_ENGINE_TICK_RATE).max(1)
    }
}

// -------------------------------------------------------------------------------------------------
