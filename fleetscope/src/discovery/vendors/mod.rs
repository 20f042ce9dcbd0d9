//! Built-in discovery chains.
//!
//! Each vendor module exposes a `chain()` function returning the
//! [`DiscoveryChain`](super::DiscoveryChain) for that OS family.

pub mod arista;
pub mod cisco;
pub mod juniper;
pub mod linux;
