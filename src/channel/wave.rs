use std::sync::Arc;

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Wave sample buffer of a channel, tagged with its ownership.
///
/// `Owned` buffers are allocated by the engine and dropped when replaced or when the engine gets
/// dropped. `Borrowed` buffers belong to the caller: the engine only holds a shared reference,
/// so replacing or dropping it never frees the caller's samples.
#[derive(Debug, Clone)]
pub enum WaveBuffer {
    Owned(Box<[u16]>),
    Borrowed(Arc<[u16]>),
}

impl WaveBuffer {
    /// Allocate a zero-filled owned buffer with `len` samples.
    ///
    /// Zero lengths are rejected as a configuration error before allocating anything.
    pub fn zeroed(len: usize) -> Result<Self, Error> {
        if len == 0 {
            return Err(Error::ConfigError(
                "wave length of 0 specified".to_string(),
            ));
        }
        let mut samples = Vec::new();
        samples.try_reserve_exact(len)?;
        samples.resize(len, 0);
        Ok(Self::Owned(samples.into_boxed_slice()))
    }

    /// Wrap a caller owned buffer. Empty buffers are rejected.
    pub fn borrowed(samples: Arc<[u16]>) -> Result<Self, Error> {
        if samples.is_empty() {
            return Err(Error::ConfigError(
                "wave length of 0 specified".to_string(),
            ));
        }
        Ok(Self::Borrowed(samples))
    }

    #[inline(always)]
    pub fn samples(&self) -> &[u16] {
        match self {
            Self::Owned(samples) => &samples[..],
            Self::Borrowed(samples) => &samples[..],
        }
    }

    /// Mutable access to the samples of owned buffers only.
    pub fn samples_mut(&mut self) -> Option<&mut [u16]> {
        match self {
            Self::Owned(samples) => Some(&mut samples[..]),
            Self::Borrowed(_) => None,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.samples().len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.samples().is_empty()
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }
}

// -------------------------------------------------------------------------------------------------
