use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    bank::ChannelBank,
    channel::{ChannelState, WaveBuffer},
    clock::{EngineCallback, EngineClock},
    config::EngineConfig,
    mixer::Mixer,
    utils::{assert_no_alloc, clear_buffer, permit_alloc},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Wavetable and noise synthesis engine.
///
/// The engine owns a fixed bank of channels and an engine clock. Channel parameters can be
/// changed from any thread via the control functions, while a host pulls interleaved stereo
/// frames via [`produce`](Self::produce). Share the engine via an `Arc` to do both at once.
///
/// Control functions with channel indices check the index: out of range setters fail with
/// [`Error::ChannelNotFoundError`] without changing anything, out of range getters log an error
/// and return zero.
///
/// Dropping the engine drops all engine owned waves. Caller owned waves are never freed by the
/// engine.
#[derive(Debug)]
pub struct ChipEngine {
    config: EngineConfig,
    bank: ChannelBank,
    mixer: Mixer,
    clock: Mutex<EngineClock>,
}

impl ChipEngine {
    /// Create a new engine with the given configuration.
    ///
    /// Zero sample rates or channel counts, or a failed channel allocation, abort the
    /// initialization: no engine is created then.
    pub fn new(config: EngineConfig) -> Result<Self, Error> {
        let config = config.resolve().inspect_err(|err| {
            log::error!("Failed to initialize engine: {err}");
        })?;
        log::info!("Sampling rate: {}Hz", config.sample_rate);
        log::info!("Using {} channels", config.channel_count);
        log::info!(
            "Using {} fragments of {} frames",
            config.fragment_count,
            config.fragment_size
        );
        log::info!("Rate multiplier is {}", config.rate_multiplier);

        let bank = ChannelBank::new(config.channel_count).inspect_err(|err| {
            log::error!("Failed to create channel states: {err}");
        })?;
        let mixer = Mixer::new(config.rate_multiplier, config.channel_count);
        let clock = Mutex::new(EngineClock::new(config.default_tick_period()));

        Ok(Self {
            config,
            bank,
            mixer,
            clock,
        })
    }

    /// The resolved engine configuration, with defaults applied.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn channel_count(&self) -> usize {
        self.bank.len()
    }

    // ---------------------------------------------------------------------------------------------
    // Production

    /// Fill `output` with up to `frame_count` interleaved stereo frames. Returns the number of
    /// frames that got written, which is limited by the output's size.
    ///
    /// Never blocks on anything else than the short-lived channel locks, and doesn't allocate.
    /// Faults are not propagated: when producing panics, the requested frames are silenced.
    pub fn produce(&self, output: &mut [i16], frame_count: usize) -> usize {
        let frame_count = frame_count.min(output.len() / 2);
        let output = &mut output[..frame_count * 2];
        let result = catch_unwind(AssertUnwindSafe(|| {
            for frame in output.chunks_exact_mut(2) {
                let mixed = self.produce_frame();
                frame.copy_from_slice(&mixed);
            }
        }));
        if let Err(payload) = result {
            permit_alloc(|| {
                log::error!(
                    "Ouch. Engine failed to produce samples: {}",
                    panic_message::panic_message(&payload)
                );
            });
            clear_buffer(output);
        }
        frame_count
    }

    /// Produce a single stereo frame: advance the engine clock, then mix all channels.
    pub fn produce_frame(&self) -> [i16; 2] {
        self.run_clock();
        assert_no_alloc(|| {
            let mut frame = [0i16; 2];
            self.bank
                .for_each_locked(|channel| self.mixer.mix_channel(channel, &mut frame));
            frame
        })
    }

    fn run_clock(&self) {
        // invoke the callback with the clock unlocked, so it may use all control functions
        let callback = assert_no_alloc(|| self.lock_clock().tick());
        if let Some(callback) = callback {
            permit_alloc(|| {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback())) {
                    log::error!(
                        "Ouch. Engine callback panicked: {}. Removing it...",
                        panic_message::panic_message(&payload)
                    );
                    let mut clock = self.lock_clock();
                    if clock
                        .callback()
                        .is_some_and(|installed| Arc::ptr_eq(installed, &callback))
                    {
                        clock.swap_callback(None);
                    }
                }
            });
        }
    }

    fn lock_clock(&self) -> MutexGuard<'_, EngineClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---------------------------------------------------------------------------------------------
    // Engine clock control

    /// Install a callback which runs every `tick_period` produced frames, starting with the next
    /// frame. A zero `tick_period` keeps the current period, which initially is the sample rate
    /// divided down to 60 Hz.
    pub fn set_engine_callback<F>(&self, callback: F, tick_period: u32)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let callback: EngineCallback = Arc::new(callback);
        let previous = self.lock_clock().set_callback(Some(callback), tick_period);
        drop(previous);
        log::debug!("Set engine callback with period {}", self.engine_tick_period());
    }

    /// Replace the engine callback without restarting the engine clock.
    pub fn swap_engine_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let callback: EngineCallback = Arc::new(callback);
        let previous = self.lock_clock().swap_callback(Some(callback));
        drop(previous);
    }

    /// Remove the engine callback. The engine clock keeps running.
    pub fn clear_engine_callback(&self) {
        let previous = self.lock_clock().swap_callback(None);
        drop(previous);
    }

    pub fn has_engine_callback(&self) -> bool {
        self.lock_clock().callback().is_some()
    }

    /// Set the engine tick period in frames. Zero periods are ignored.
    pub fn set_engine_tick_period(&self, tick_period: u32) {
        self.lock_clock().set_tick_period(tick_period);
    }

    pub fn engine_tick_period(&self) -> u32 {
        self.lock_clock().tick_period()
    }

    // ---------------------------------------------------------------------------------------------
    // Channel control

    /// Set the channel's period so that its wave plays at the given frequency:
    /// `period = round(rate_multiplier * sample_rate / (wave_len * hz))`, at least 1.
    pub fn set_frequency(&self, channel: usize, hz: f32) -> Result<(), Error> {
        self.bank.check(channel)?;
        if !hz.is_finite() || hz <= 0.0 {
            return Err(Error::ParameterError(format!(
                "channel {channel} frequency value is '{hz}'"
            )));
        }
        let period = self.bank.with_channel(channel, |ch| {
            let period = self.frequency_to_period(hz, ch.wave_len());
            ch.set_period(period);
            period
        })?;
        log::debug!("Set channel {channel} period to {period}");
        Ok(())
    }

    /// The frequency the channel's wave currently plays at, or 0.
    pub fn frequency(&self, channel: usize) -> f32 {
        self.bank
            .with_channel(channel, |ch| {
                self.period_to_frequency(ch.period(), ch.wave_len())
            })
            .unwrap_or(0.0)
    }

    /// Set the channel's period in internal (oversampled) ticks, clamped to at least 1.
    pub fn set_period_direct(&self, channel: usize, period: u32) -> Result<(), Error> {
        self.bank.with_channel(channel, |ch| ch.set_period(period))
    }

    pub fn period(&self, channel: usize) -> u32 {
        self.bank
            .with_channel(channel, |ch| ch.period())
            .unwrap_or(0)
    }

    /// Set the left and right amplitude in nibble scale (0-15). A zero amplitude mutes the
    /// channel.
    pub fn set_amplitude(&self, channel: usize, left: u16, right: u16) -> Result<(), Error> {
        self.bank
            .with_channel(channel, |ch| ch.set_amplitude(left, right))
    }

    /// Left and right amplitude, or zeros.
    pub fn amplitude(&self, channel: usize) -> (u16, u16) {
        self.bank
            .with_channel(channel, |ch| (ch.amplitude(0), ch.amplitude(1)))
            .unwrap_or((0, 0))
    }

    /// Replace the channel's wave output with LFSR noise.
    pub fn set_noise_enable(&self, channel: usize, enabled: bool) -> Result<(), Error> {
        self.bank
            .with_channel(channel, |ch| ch.set_noise_enabled(enabled))
    }

    pub fn noise_enabled(&self, channel: usize) -> bool {
        self.bank
            .with_channel(channel, |ch| ch.noise_enabled())
            .unwrap_or(false)
    }

    /// Set the noise feedback tap (0-15). Larger taps are reset to 0.
    pub fn set_noise_tap(&self, channel: usize, tap: u8) -> Result<(), Error> {
        self.bank.with_channel(channel, |ch| ch.set_noise_tap(tap))
    }

    pub fn noise_tap(&self, channel: usize) -> u8 {
        self.bank
            .with_channel(channel, |ch| ch.noise_tap())
            .unwrap_or(0)
    }

    /// Enable or disable looping. Non looping waves hold their last sample when finished.
    pub fn set_loop(&self, channel: usize, enabled: bool) -> Result<(), Error> {
        self.bank
            .with_channel(channel, |ch| ch.set_loop_enabled(enabled))
    }

    pub fn loop_enabled(&self, channel: usize) -> bool {
        self.bank
            .with_channel(channel, |ch| ch.loop_enabled())
            .unwrap_or(false)
    }

    /// Move the channel's playback position. Positions past the wave's end are rejected.
    pub fn set_wave_position(&self, channel: usize, pos: usize) -> Result<(), Error> {
        self.bank
            .with_channel(channel, |ch| ch.set_wave_position(pos))?
    }

    pub fn wave_position(&self, channel: usize) -> usize {
        self.bank
            .with_channel(channel, |ch| ch.wave_position())
            .unwrap_or(0)
    }

    /// Play the given caller owned samples. The engine keeps a shared reference only, so the
    /// samples are never freed by the engine. A previous engine owned wave gets dropped.
    pub fn set_wave(
        &self,
        channel: usize,
        samples: Arc<[u16]>,
        loop_enabled: bool,
    ) -> Result<(), Error> {
        let wave_len = samples.len();
        let previous = self
            .bank
            .with_channel(channel, |ch| ch.set_borrowed_wave(samples, loop_enabled))??;
        drop(previous);
        log::debug!("Set channel {channel} wave with {wave_len} samples");
        Ok(())
    }

    /// Allocate a new zero-filled engine owned wave with `len` samples. A previous engine owned
    /// wave gets dropped. Zero lengths are rejected and failed allocations keep the previous
    /// wave.
    pub fn create_wave(&self, channel: usize, len: usize, loop_enabled: bool) -> Result<(), Error> {
        self.bank.check(channel)?;
        let wave = WaveBuffer::zeroed(len).inspect_err(|err| {
            log::error!("Failed to create wave for channel {channel}: {err}");
        })?;
        let previous = self
            .bank
            .with_channel(channel, |ch| ch.replace_wave(wave, loop_enabled))?;
        drop(previous);
        log::debug!("Created channel {channel} wave with {len} samples");
        Ok(())
    }

    /// Copy samples into the channel's engine owned wave, starting at `offset`.
    pub fn write_wave(&self, channel: usize, offset: usize, samples: &[u16]) -> Result<(), Error> {
        self.bank.with_channel(channel, |ch| {
            ch.write_wave(offset, samples)
                .unwrap_or_else(|| Err(Error::WaveNotOwnedError(channel)))
        })?
    }

    /// A copy of the channel's wave samples, or an empty vector.
    pub fn wave(&self, channel: usize) -> Vec<u16> {
        // allocate with the channel unlocked, then copy. retry when the wave grew meanwhile.
        let mut samples = Vec::new();
        loop {
            let Ok(wave_len) = self.bank.with_channel(channel, |ch| ch.wave_len()) else {
                return Vec::new();
            };
            samples.clear();
            samples.reserve_exact(wave_len);
            match self
                .bank
                .with_channel(channel, |ch| ch.copy_wave_into(&mut samples))
            {
                Ok(true) => return samples,
                Ok(false) => continue,
                Err(_) => return Vec::new(),
            }
        }
    }

    pub fn wave_len(&self, channel: usize) -> usize {
        self.bank
            .with_channel(channel, |ch| ch.wave_len())
            .unwrap_or(0)
    }

    /// True when the channel plays an engine owned wave.
    pub fn is_wave_owned(&self, channel: usize) -> bool {
        self.bank
            .with_channel(channel, |ch| ch.wave().is_owned())
            .unwrap_or(false)
    }

    /// A copy of all scalar parameters and the playback state of the given channel.
    pub fn channel_state(&self, channel: usize) -> Result<ChannelState, Error> {
        self.bank.with_channel(channel, |ch| ch.state())
    }

    // ---------------------------------------------------------------------------------------------

    fn frequency_to_period(&self, hz: f32, wave_len: usize) -> u32 {
        let rate = self.config.rate_multiplier as f64 * self.config.sample_rate as f64;
        let period = (rate / (wave_len as f64 * hz as f64)).round();
        period.clamp(1.0, u32::MAX as f64) as u32
    }

    fn period_to_frequency(&self, period: u32, wave_len: usize) -> f32 {
        let rate = self.config.rate_multiplier as f64 * self.config.sample_rate as f64;
        (rate / (wave_len as f64 * period as f64)) as f32
    }
}

impl Drop for ChipEngine {
    fn drop(&mut self) {
        log::debug!("Shutting down engine with {} channels", self.bank.len());
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Weak,
    };

    use super::*;

    const TRIANGLE: [u16; 32] = [
        0x0, 0x1, 0x2, 0x3, 0x4, 0x5, 0x6, 0x7, 0x8, 0x9, 0xA, 0xB, 0xC, 0xD, 0xE, 0xF, //
        0xF, 0xE, 0xD, 0xC, 0xB, 0xA, 0x9, 0x8, 0x7, 0x6, 0x5, 0x4, 0x3, 0x2, 0x1, 0x0,
    ];

    fn init_logger() {
        let _ = simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Warn)
            .init();
    }

    fn new_engine(channel_count: usize, rate_multiplier: u16) -> ChipEngine {
        init_logger();
        ChipEngine::new(
            EngineConfig::default()
                .channel_count(channel_count)
                .rate_multiplier(rate_multiplier),
        )
        .unwrap()
    }

    #[test]
    fn invalid_config() {
        init_logger();
        assert!(matches!(
            ChipEngine::new(EngineConfig::default().sample_rate(0)),
            Err(Error::ConfigError(_))
        ));
        assert!(matches!(
            ChipEngine::new(EngineConfig::default().channel_count(0)),
            Err(Error::ConfigError(_))
        ));
        let engine = ChipEngine::new(EngineConfig::default().fragment_size(0)).unwrap();
        assert_eq!(engine.config().fragment_size, 1024);
        assert_eq!(engine.engine_tick_period(), 735);
    }

    #[test]
    fn triangle_golden_frames() {
        let engine = new_engine(1, 1);
        engine.set_wave(0, Arc::from(&TRIANGLE[..]), true).unwrap();
        engine.set_amplitude(0, 15, 15).unwrap();
        engine.set_period_direct(0, 4).unwrap();
        engine.set_noise_enable(0, false).unwrap();

        let mut output = [0i16; 16];
        assert_eq!(engine.produce(&mut output, 8), 8);
        #[rustfmt::skip]
        let expected = [
            -28033, -28033, -28033, -28033, -28033, -28033, -28033, -28033,
            -23698, -23698, -23698, -23698, -23698, -23698, -23698, -23698,
        ];
        assert_eq!(output, expected);
    }

    #[test]
    fn frame_limits() {
        let engine = new_engine(1, 1);
        let mut output = [1i16; 7];
        // limited by the output size, partial frames are left untouched
        assert_eq!(engine.produce(&mut output, 100), 3);
        assert_eq!(output[6], 1);
        assert_eq!(engine.produce(&mut output, 0), 0);
        // default channels are muted and centered
        assert_eq!(&output[..6], &[0; 6]);
    }

    #[test]
    fn channel_mixing() {
        let engine = new_engine(2, 1);
        for channel in 0..2 {
            engine.set_wave(channel, Arc::from(&TRIANGLE[..]), true).unwrap();
        }
        engine.set_amplitude(0, 15, 0).unwrap();
        engine.set_amplitude(1, 0, 15).unwrap();

        // both channels play sample 1 with half the headroom each
        let frame = engine.produce_frame();
        assert_eq!(frame, [-28033 / 2, -28033 / 2]);
        // channel 0 at half the pitch: advances with every second frame only
        engine.set_period_direct(0, 2).unwrap();
        assert_eq!(engine.produce_frame(), [-23698 / 2, -23698 / 2]);
        assert_eq!(engine.produce_frame(), [-23698 / 2, -19363 / 2]);
    }

    #[test]
    fn noise_frames() {
        let engine = new_engine(1, 1);
        engine.set_noise_enable(0, true).unwrap();
        engine.set_amplitude(0, 15, 15).unwrap();
        let mut state = crate::noise::NOISE_SEED;
        for _ in 0..40 {
            state = crate::noise::noise_step(state, 7).0;
            let expected = if state & 1 == 1 { 32657 } else { -32368 };
            assert_eq!(engine.produce_frame(), [expected, expected]);
        }
    }

    #[test]
    fn frequency() {
        let engine = new_engine(1, 1);
        engine.set_wave(0, Arc::from(&TRIANGLE[..]), true).unwrap();
        engine.set_frequency(0, 220.0).unwrap();
        // 44100 / (32 * 220) = 6.26
        assert_eq!(engine.period(0), 6);
        engine.set_frequency(0, 200.0).unwrap();
        // 44100 / (32 * 200) = 6.89
        assert_eq!(engine.period(0), 7);
        assert!((engine.frequency(0) - 196.875).abs() < 0.001);
        engine.set_frequency(0, 1.0e6).unwrap();
        assert_eq!(engine.period(0), 1);

        assert!(matches!(
            engine.set_frequency(0, 0.0),
            Err(Error::ParameterError(_))
        ));
        assert!(engine.set_frequency(0, f32::NAN).is_err());
        assert_eq!(engine.period(0), 1);

        let engine = new_engine(1, 512);
        engine.set_wave(0, Arc::from(&TRIANGLE[..]), true).unwrap();
        engine.set_frequency(0, 220.0).unwrap();
        // 512 * 44100 / (32 * 220) = 3207.27
        assert_eq!(engine.period(0), 3207);
    }

    #[test]
    fn range_errors() {
        let engine = new_engine(2, 1);
        let out_of_range = |result: Result<(), Error>| {
            matches!(
                result,
                Err(Error::ChannelNotFoundError {
                    channel: 2,
                    channel_count: 2
                })
            )
        };
        assert!(out_of_range(engine.set_frequency(2, 440.0)));
        assert!(out_of_range(engine.set_period_direct(2, 10)));
        assert!(out_of_range(engine.set_amplitude(2, 15, 15)));
        assert!(out_of_range(engine.set_noise_enable(2, true)));
        assert!(out_of_range(engine.set_noise_tap(2, 3)));
        assert!(out_of_range(engine.set_loop(2, true)));
        assert!(out_of_range(engine.set_wave_position(2, 0)));
        assert!(out_of_range(engine.set_wave(2, Arc::from(&TRIANGLE[..]), true)));
        assert!(out_of_range(engine.create_wave(2, 0, true)));
        assert!(out_of_range(engine.write_wave(2, 0, &[1])));

        assert_eq!(engine.period(2), 0);
        assert_eq!(engine.frequency(2), 0.0);
        assert_eq!(engine.amplitude(2), (0, 0));
        assert!(!engine.noise_enabled(2));
        assert_eq!(engine.noise_tap(2), 0);
        assert!(!engine.loop_enabled(2));
        assert_eq!(engine.wave_position(2), 0);
        assert_eq!(engine.wave_len(2), 0);
        assert!(engine.wave(2).is_empty());
        assert!(!engine.is_wave_owned(2));
        assert!(engine.channel_state(2).is_err());

        // valid channels are unaffected
        assert_eq!(engine.period(1), 1);
    }

    #[test]
    fn setters_and_getters() {
        let engine = new_engine(1, 1);
        engine.set_amplitude(0, 3, 12).unwrap();
        assert_eq!(engine.amplitude(0), (3, 12));
        engine.set_noise_enable(0, true).unwrap();
        assert!(engine.noise_enabled(0));
        engine.set_noise_tap(0, 1).unwrap();
        assert_eq!(engine.noise_tap(0), 1);
        engine.set_noise_tap(0, 16).unwrap();
        assert_eq!(engine.noise_tap(0), 0);
        engine.set_loop(0, true).unwrap();
        assert!(engine.loop_enabled(0));
        engine.set_period_direct(0, 0).unwrap();
        assert_eq!(engine.period(0), 1);

        engine.create_wave(0, 8, false).unwrap();
        assert!(!engine.loop_enabled(0));
        engine.set_wave_position(0, 7).unwrap();
        assert_eq!(engine.wave_position(0), 7);
        assert!(matches!(
            engine.set_wave_position(0, 8),
            Err(Error::ParameterError(_))
        ));

        let state = engine.channel_state(0).unwrap();
        assert_eq!(state.amplitude, (3, 12));
        assert_eq!(state.wave_len, 8);
        assert_eq!(state.wave_pos, 7);
        assert!(state.wave_owned);
        assert!(state.noise_enabled);
    }

    #[test]
    fn borrowed_waves_are_never_freed() {
        let samples: Arc<[u16]> = Arc::from(&TRIANGLE[..]);
        let engine = new_engine(2, 1);
        engine.set_wave(0, Arc::clone(&samples), true).unwrap();
        engine.set_wave(1, Arc::clone(&samples), true).unwrap();
        assert_eq!(Arc::strong_count(&samples), 3);
        assert!(!engine.is_wave_owned(0));
        assert_eq!(engine.wave(0), TRIANGLE.to_vec());

        // writing into borrowed waves is rejected
        assert!(matches!(
            engine.write_wave(0, 0, &[1]),
            Err(Error::WaveNotOwnedError(0))
        ));

        // reassigned
        engine.create_wave(0, 4, true).unwrap();
        assert_eq!(Arc::strong_count(&samples), 2);

        // engine dropped
        drop(engine);
        assert_eq!(Arc::strong_count(&samples), 1);
        assert_eq!(&samples[..], &TRIANGLE[..]);

        let empty: Arc<[u16]> = Arc::from(Vec::new());
        let engine = new_engine(1, 1);
        assert!(matches!(
            engine.set_wave(0, empty, true),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn owned_waves() {
        let engine = new_engine(1, 1);
        assert!(engine.is_wave_owned(0));
        assert_eq!(engine.wave(0), vec![0]);

        assert!(matches!(
            engine.create_wave(0, 0, true),
            Err(Error::ConfigError(_))
        ));
        // rejected lengths keep the previous wave
        assert_eq!(engine.wave_len(0), 1);

        engine.create_wave(0, 4, true).unwrap();
        engine.write_wave(0, 0, &[15, 0, 15, 0]).unwrap();
        assert_eq!(engine.wave(0), vec![15, 0, 15, 0]);
        assert!(engine.write_wave(0, 2, &[1, 2, 3]).is_err());

        // replacing an owned wave with a new owned one starts from silence
        engine.create_wave(0, 2, true).unwrap();
        assert_eq!(engine.wave(0), vec![0, 0]);

        // replacing an owned wave with a borrowed one
        let samples: Arc<[u16]> = Arc::from(vec![1u16, 2, 3]);
        engine.set_wave(0, Arc::clone(&samples), false).unwrap();
        assert!(!engine.is_wave_owned(0));
        assert_eq!(engine.wave(0), vec![1, 2, 3]);
        assert!(matches!(
            engine.write_wave(0, 0, &[4]),
            Err(Error::WaveNotOwnedError(0))
        ));
        assert_eq!(&samples[..], &[1, 2, 3]);
    }

    #[test]
    fn wave_copies_follow_wave_changes() {
        let engine = Arc::new(new_engine(1, 1));
        let writer = std::thread::spawn({
            let engine = Arc::clone(&engine);
            move || {
                for len in 1..200 {
                    engine.create_wave(0, len, true).unwrap();
                }
            }
        });
        for _ in 0..200 {
            let wave = engine.wave(0);
            assert!(!wave.is_empty());
            assert!(wave.iter().all(|sample| *sample == 0));
        }
        writer.join().unwrap();
        assert_eq!(engine.wave(0).len(), 199);
    }

    #[test]
    fn engine_clock_rate() {
        for channel_count in [1, 3] {
            for rate_multiplier in [1, 4] {
                let engine = new_engine(channel_count, rate_multiplier);
                let count = Arc::new(AtomicUsize::new(0));
                engine.set_engine_callback(
                    {
                        let count = Arc::clone(&count);
                        move || {
                            count.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    10,
                );
                assert_eq!(engine.engine_tick_period(), 10);

                let mut output = vec![0i16; 2 * 64];
                let mut produced = 0;
                for fragment in [1, 9, 64, 17, 33, 64, 12] {
                    produced += engine.produce(&mut output, fragment);
                    // fires with the first frame and then once every 10 frames
                    assert_eq!(count.load(Ordering::Relaxed), produced.div_ceil(10));
                }
            }
        }
    }

    #[test]
    fn engine_callback_controls_channels() {
        let engine = Arc::new(new_engine(1, 1));
        engine.set_wave(0, Arc::from(&TRIANGLE[..]), true).unwrap();
        engine.set_amplitude(0, 15, 15).unwrap();

        let weak: Weak<ChipEngine> = Arc::downgrade(&engine);
        engine.set_engine_callback(
            move || {
                if let Some(engine) = weak.upgrade() {
                    let (left, right) = engine.amplitude(0);
                    engine
                        .set_amplitude(0, left.saturating_sub(1), right.saturating_sub(1))
                        .unwrap();
                }
            },
            4,
        );
        assert!(engine.has_engine_callback());

        let mut output = vec![0i16; 2 * 16];
        engine.produce(&mut output, 16);
        assert_eq!(engine.amplitude(0), (11, 11));

        engine.clear_engine_callback();
        assert!(!engine.has_engine_callback());
        engine.produce(&mut output, 16);
        assert_eq!(engine.amplitude(0), (11, 11));
    }

    #[test]
    fn panicking_callback_is_removed() {
        let engine = new_engine(1, 1);
        engine.set_amplitude(0, 15, 15).unwrap();
        engine.set_engine_callback(|| panic!("callback failure"), 2);

        let mut output = vec![1i16; 2 * 4];
        assert_eq!(engine.produce(&mut output, 4), 4);
        assert!(!engine.has_engine_callback());
        // frames still got produced: a silent one sample wave at full amplitude
        assert_eq!(output, vec![-32368; 8]);

        // swapped callbacks keep running
        let called = Arc::new(AtomicBool::new(false));
        engine.swap_engine_callback({
            let called = Arc::clone(&called);
            move || called.store(true, Ordering::Relaxed)
        });
        engine.produce(&mut output, 4);
        assert!(called.load(Ordering::Relaxed));
    }

    #[test]
    fn concurrent_control() {
        let engine = new_engine(4, 8);
        for channel in 0..4 {
            engine.set_wave(channel, Arc::from(&TRIANGLE[..]), true).unwrap();
        }
        let running = AtomicBool::new(true);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                let mut value = 0u32;
                while running.load(Ordering::Relaxed) {
                    let channel = value as usize % 4;
                    engine.set_frequency(channel, 100.0 + value as f32).unwrap();
                    engine
                        .set_amplitude(channel, (value % 16) as u16, 15)
                        .unwrap();
                    engine.create_wave(channel, 1 + value as usize % 64, true).unwrap();
                    engine.set_wave(channel, Arc::from(&TRIANGLE[..]), true).unwrap();
                    value += 1;
                }
            });
            let mut output = vec![0i16; 2 * 256];
            for _ in 0..64 {
                assert_eq!(engine.produce(&mut output, 256), 256);
            }
            running.store(false, Ordering::Relaxed);
        });
        for channel in 0..4 {
            let state = engine.channel_state(channel).unwrap();
            assert!(state.wave_pos < state.wave_len);
            assert!(state.counter < state.period);
        }
    }
}
