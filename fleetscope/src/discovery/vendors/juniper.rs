//! Juniper JUNOS.

use crate::discovery::chain::DiscoveryChain;
use crate::discovery::spec::{CommandSpec, DiscoveryProtocol};
use crate::parser::ids;

/// Create the Juniper JUNOS discovery chain.
pub fn chain() -> DiscoveryChain {
    DiscoveryChain::new("juniper_junos")
        .with_alias("junos")
        .with_alias("juniper")
        .with_spec(CommandSpec::new(
            "lldp-json",
            "show lldp neighbors | display json | no-more",
            ids::JUNOS_LLDP_JSON,
            DiscoveryProtocol::Lldp,
        ))
}
