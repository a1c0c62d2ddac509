//! Hosts which pull produced frames from a [`ChipEngine`](crate::ChipEngine).

#[cfg(feature = "wav-output")]
pub mod wav;
