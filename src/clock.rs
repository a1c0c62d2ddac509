use std::sync::Arc;

// -------------------------------------------------------------------------------------------------

/// Engine tick callback, invoked from the production context at the engine tick rate.
///
/// Callbacks are shared and immutable: state they need to change must be synchronized by the
/// callback itself (e.g. atomics), or go through the engine's control functions.
pub type EngineCallback = Arc<dyn Fn() + Send + Sync + 'static>;

// -------------------------------------------------------------------------------------------------

/// Sample rate divider which runs an optional callback every `tick_period` produced frames.
pub struct EngineClock {
    tick_period: u32,
    tick_counter: u32,
    callback: Option<EngineCallback>,
}

impl EngineClock {
    pub fn new(tick_period: u32) -> Self {
        debug_assert!(tick_period >= 1, "Invalid tick period");
        Self {
            tick_period: tick_period.max(1),
            tick_counter: 0,
            callback: None,
        }
    }

    pub fn tick_period(&self) -> u32 {
        self.tick_period
    }

    pub fn callback(&self) -> Option<&EngineCallback> {
        self.callback.as_ref()
    }

    /// Set a new tick period. Zero periods leave the current period unchanged.
    pub fn set_tick_period(&mut self, tick_period: u32) {
        if tick_period != 0 {
            self.tick_period = tick_period;
            self.tick_counter = self.tick_counter.min(self.tick_period - 1);
        }
    }

    /// Install a new callback and restart the clock, so the callback fires with the next frame.
    /// Zero periods leave the current period unchanged.
    pub fn set_callback(
        &mut self,
        callback: Option<EngineCallback>,
        tick_period: u32,
    ) -> Option<EngineCallback> {
        self.set_tick_period(tick_period);
        self.tick_counter = 0;
        std::mem::replace(&mut self.callback, callback)
    }

    /// Replace the callback without touching the clock's phase.
    pub fn swap_callback(&mut self, callback: Option<EngineCallback>) -> Option<EngineCallback> {
        std::mem::replace(&mut self.callback, callback)
    }

    /// Advance the clock by one produced frame. Returns the callback when it's due.
    #[inline]
    pub fn tick(&mut self) -> Option<EngineCallback> {
        if self.tick_counter == 0 {
            self.tick_counter = self.tick_period - 1;
            self.callback.clone()
        } else {
            self.tick_counter -= 1;
            None
        }
    }
}

impl std::fmt::Debug for EngineClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineClock")
            .field("tick_period", &self.tick_period)
            .field("tick_counter", &self.tick_counter)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

// -------------------------------------------------------------------------------------------------
