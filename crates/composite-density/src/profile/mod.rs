//! Channel profiles and density constants.
//!
//! A [`ChannelSpec`] is what a caller names when a session begins. Once the
//! base curve has been registered the session turns it into an immutable
//! [`ChannelProfile`]. Density constants that are not given explicitly come
//! from the [`DensityRegistry`].

mod channel;
mod registry;

pub use channel::{ChannelProfile, ChannelSpec};
pub use registry::{
    ConstantOrigin, DensityRegistry, ResolvedDensity, DEFAULT_DENSITIES, FALLBACK_DENSITY,
    MAX_DENSITY,
};
