use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{channel::Channel, Error};

// -------------------------------------------------------------------------------------------------

/// Fixed size array of channels, each one guarded by its own lock.
///
/// The bank's size never changes after creation, so the production context can iterate all
/// channels without any bounds checks against external indices.
#[derive(Debug)]
pub struct ChannelBank {
    channels: Vec<Mutex<Channel>>,
}

impl ChannelBank {
    /// Create a bank with `channel_count` default channels. Fails without creating any channel
    /// when the bank or one of the channels' default waves can't be allocated.
    pub fn new(channel_count: usize) -> Result<Self, Error> {
        if channel_count == 0 {
            return Err(Error::ConfigError(
                "at least one channel must be created".to_string(),
            ));
        }
        let mut channels = Vec::new();
        channels.try_reserve_exact(channel_count)?;
        for _ in 0..channel_count {
            channels.push(Mutex::new(Channel::new()?));
        }
        Ok(Self { channels })
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Check if the given channel index exists. Out of range indices are reported as
    /// [`Error::ChannelNotFoundError`] and logged.
    pub fn check(&self, channel: usize) -> Result<(), Error> {
        let channel_count = self.channels.len();
        if channel < channel_count {
            Ok(())
        } else {
            log::error!("Channel out of range ({channel} >= {channel_count})");
            Err(Error::ChannelNotFoundError {
                channel,
                channel_count,
            })
        }
    }

    /// Lock the channel with the given index, after checking its range.
    pub fn lock(&self, channel: usize) -> Result<MutexGuard<'_, Channel>, Error> {
        self.check(channel)?;
        Ok(Self::lock_mutex(&self.channels[channel]))
    }

    /// Run `func` with the locked channel and return its result.
    pub fn with_channel<T, F>(&self, channel: usize, func: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Channel) -> T,
    {
        let mut guard = self.lock(channel)?;
        Ok(func(&mut guard))
    }

    /// Iterate over all channels, locking each one while it's visited.
    pub fn for_each_locked<F>(&self, mut func: F)
    where
        F: FnMut(&mut Channel),
    {
        for mutex in &self.channels {
            let mut guard = Self::lock_mutex(mutex);
            func(&mut guard);
        }
    }

    // Every channel write is a plain field assignment, so a poisoned channel still is
    // consistent and gets used as it is.
    #[inline]
    fn lock_mutex(mutex: &Mutex<Channel>) -> MutexGuard<'_, Channel> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// -------------------------------------------------------------------------------------------------
