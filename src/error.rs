use std::{collections::TryReserveError, error, fmt};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by chipwave.
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Invalid engine configuration or wave length. Fatal for engine initialization.
    ConfigError(String),
    /// A channel index outside of the engine's channel bank was accessed.
    ChannelNotFoundError { channel: usize, channel_count: usize },
    /// Failed to allocate the channel bank or a wave buffer.
    ResourceError(TryReserveError),
    /// A channel parameter value is out of its valid range.
    ParameterError(String),
    /// Tried to write into a wave buffer that is owned by the caller.
    WaveNotOwnedError(usize),
    /// Failed to write rendered output.
    #[cfg(feature = "wav-output")]
    OutputDeviceError(Box<dyn error::Error + Send + Sync>),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(str) => write!(f, "Invalid configuration: {str}"),
            Self::ChannelNotFoundError {
                channel,
                channel_count,
            } => write!(
                f,
                "Channel {channel} out of range (engine has {channel_count} channels)"
            ),
            Self::ResourceError(err) => write!(f, "Allocation failed: {err}"),
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
            Self::WaveNotOwnedError(channel) => {
                write!(f, "Wave of channel {channel} is not owned by the engine")
            }
            #[cfg(feature = "wav-output")]
            Self::OutputDeviceError(err) => err.fmt(f),
        }
    }
}

impl From<TryReserveError> for Error {
    fn from(err: TryReserveError) -> Error {
        Error::ResourceError(err)
    }
}

#[cfg(feature = "wav-output")]
impl From<hound::Error> for Error {
    fn from(err: hound::Error) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}
