//! Linux hosts running lldpd.
//!
//! `lldpctl` usually needs no privileges when the invoking user is in the
//! `_lldpd` group; otherwise the `sudo -n` variant is tried. `-n` keeps sudo
//! from prompting, so a missing sudoers entry fails fast instead of hanging
//! until the attempt timeout.

use crate::discovery::chain::DiscoveryChain;
use crate::discovery::spec::{CommandSpec, DiscoveryProtocol};
use crate::parser::ids;

/// Create the Linux discovery chain.
pub fn chain() -> DiscoveryChain {
    DiscoveryChain::new("linux")
        .with_alias("ubuntu")
        .with_alias("debian")
        .with_alias("cumulus")
        .with_alias("sonic")
        .with_spec(CommandSpec::new(
            "lldpctl",
            "lldpctl -f keyvalue",
            ids::LLDPCTL_KEYVALUE,
            DiscoveryProtocol::Lldp,
        ))
        .with_spec(CommandSpec::new(
            "lldpctl-sudo",
            "sudo -n lldpctl -f keyvalue",
            ids::LLDPCTL_KEYVALUE,
            DiscoveryProtocol::Lldp,
        ))
}
