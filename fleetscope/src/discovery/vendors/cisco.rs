//! Cisco IOS, IOS-XE and NX-OS.
//!
//! LLDP is tried first because it carries management addresses more
//! consistently; CDP is the fallback for devices where LLDP is disabled
//! (`% LLDP is not enabled`), which is still the factory default on IOS.

use crate::discovery::chain::DiscoveryChain;
use crate::discovery::spec::{CommandSpec, DiscoveryProtocol};
use crate::parser::ids;

fn lldp_detail() -> CommandSpec {
    CommandSpec::new(
        "lldp-detail",
        "show lldp neighbors detail",
        ids::CISCO_LLDP_DETAIL,
        DiscoveryProtocol::Lldp,
    )
}

fn cdp_detail() -> CommandSpec {
    CommandSpec::new(
        "cdp-detail",
        "show cdp neighbors detail",
        ids::CISCO_CDP_DETAIL,
        DiscoveryProtocol::Cdp,
    )
}

/// Create the Cisco IOS / IOS-XE discovery chain.
pub fn chain() -> DiscoveryChain {
    DiscoveryChain::new("cisco_iosxe")
        .with_alias("cisco_ios")
        .with_alias("ios")
        .with_alias("iosxe")
        .with_spec(lldp_detail())
        .with_spec(cdp_detail())
}

/// Create the Cisco NX-OS discovery chain.
pub fn nxos_chain() -> DiscoveryChain {
    DiscoveryChain::new("cisco_nxos")
        .with_alias("nxos")
        .with_spec(lldp_detail())
        .with_spec(cdp_detail())
}
