//! Chip-specific parts: register maps of the supported families and the
//! queue-driven engine for `TCA6408A` chains.
//!
//! In most cases you will not need anything from here explicitly, the exposed types at the root of
//! the crate should be enough.

pub mod family;
pub mod tca6408;
